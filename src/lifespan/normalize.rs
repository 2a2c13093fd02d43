//! Lifespan normalization.
//!
//! Turns user supplied lifespan functions into [`Lifespan`] entries that
//! produce a uniform `Box<dyn AsyncScope>` when invoked.
//!
//! # Accepted shapes
//! ```text
//! arity:    Fn(A, State) | Fn(A) | Fn()
//! returns:  Stream<Item = Result<Option<State>, E>>    async sequence
//!           Iterator<Item = Result<Option<State>, E>>  blocking sequence
//!           impl AsyncScope                            async scope
//!           impl SyncScope                             blocking scope
//! ```
//!
//! # Design Decisions
//! - Arity and return shape are resolved from the function's type through
//!   marker parameters, so there is exactly one call per invocation and a
//!   wrong signature is a compile error
//! - Blocking shapes are always routed through `BlockingScope`

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::stream::Stream;

use crate::lifespan::blocking::BlockingScope;
use crate::lifespan::error::BoxError;
use crate::lifespan::scope::{AsyncScope, IterScope, StreamScope, SyncScope};
use crate::lifespan::state::State;

/// Marker: the function returned an async single-suspension sequence.
pub struct AsyncSequence;
/// Marker: the function returned a blocking single-suspension sequence.
pub struct BlockingSequence;
/// Marker: the function returned an [`AsyncScope`].
pub struct AsyncScoped;
/// Marker: the function returned a [`SyncScope`].
pub struct BlockingScoped;

/// Conversion of a lifespan function's return value into a scope.
pub trait IntoScope<M> {
    fn into_scope(self) -> Box<dyn AsyncScope>;
}

impl<S, E> IntoScope<AsyncSequence> for S
where
    S: Stream<Item = Result<Option<State>, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn into_scope(self) -> Box<dyn AsyncScope> {
        Box::new(StreamScope::new(self))
    }
}

impl<I, E> IntoScope<BlockingSequence> for I
where
    I: Iterator<Item = Result<Option<State>, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn into_scope(self) -> Box<dyn AsyncScope> {
        Box::new(BlockingScope::new(IterScope::new(self)))
    }
}

impl<T> IntoScope<AsyncScoped> for T
where
    T: AsyncScope + 'static,
{
    fn into_scope(self) -> Box<dyn AsyncScope> {
        Box::new(self)
    }
}

impl<T> IntoScope<BlockingScoped> for T
where
    T: SyncScope,
{
    fn into_scope(self) -> Box<dyn AsyncScope> {
        Box::new(BlockingScope::new(self))
    }
}

/// Marker: `Fn(A, State)`.
pub struct WithAppAndState<M>(PhantomData<fn() -> M>);
/// Marker: `Fn(A)`.
pub struct WithApp<M>(PhantomData<fn() -> M>);
/// Marker: `Fn()`.
pub struct WithNothing<M>(PhantomData<fn() -> M>);

type Factory<A> = dyn Fn(A, State) -> Box<dyn AsyncScope> + Send + Sync;

/// A registered lifespan.
///
/// Cloning is cheap and preserves identity: [`LifespanManager::remove`](crate::LifespanManager::remove)
/// matches clones of the handle returned by `add`.
pub struct Lifespan<A> {
    name: Cow<'static, str>,
    factory: Arc<Factory<A>>,
}

impl<A> Lifespan<A> {
    /// Wrap a lifespan function, named after its type.
    pub fn new<F, M>(f: F) -> Self
    where
        F: IntoLifespan<A, M>,
    {
        f.into_lifespan()
    }

    /// Wrap a lifespan function under an explicit name.
    pub fn named<F, M>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: IntoLifespan<A, M>,
    {
        let mut lifespan = f.into_lifespan();
        lifespan.name = name.into();
        lifespan
    }

    fn from_factory(name: &'static str, factory: Arc<Factory<A>>) -> Self {
        Self {
            name: Cow::Borrowed(name),
            factory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the lifespan function and normalize its result.
    pub fn scope(&self, app: A, state: State) -> Box<dyn AsyncScope> {
        (self.factory)(app, state)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Lifespan<A>) -> bool {
        Arc::ptr_eq(&self.factory, &other.factory)
    }
}

impl<A> Clone for Lifespan<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<A> fmt::Debug for Lifespan<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifespan").field("name", &self.name).finish()
    }
}

/// Short name for an unnamed lifespan function.
///
/// The last path segment of the function's type, skipping closure segments,
/// so `app::db::connect` becomes `connect` and a closure defined in `main`
/// becomes `main`.
fn default_name<F>() -> &'static str {
    let full = std::any::type_name::<F>();

    let mut segments = Vec::new();
    let (mut depth, mut start) = (0usize, 0usize);
    let bytes = full.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                segments.push(&full[start..i]);
                start = i + 2;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    segments.push(&full[start..]);

    segments
        .into_iter()
        .rev()
        .find(|segment| !segment.is_empty() && !segment.starts_with("{{"))
        .unwrap_or("lifespan")
}

/// Conversion of a function (or an existing entry) into a [`Lifespan`].
pub trait IntoLifespan<A, M> {
    fn into_lifespan(self) -> Lifespan<A>;
}

impl<A> IntoLifespan<A, ()> for Lifespan<A> {
    fn into_lifespan(self) -> Lifespan<A> {
        self
    }
}

impl<A, F, R, M> IntoLifespan<A, WithAppAndState<M>> for F
where
    A: 'static,
    F: Fn(A, State) -> R + Send + Sync + 'static,
    R: IntoScope<M>,
{
    fn into_lifespan(self) -> Lifespan<A> {
        Lifespan::from_factory(
            default_name::<F>(),
            Arc::new(move |app: A, state: State| self(app, state).into_scope()),
        )
    }
}

impl<A, F, R, M> IntoLifespan<A, WithApp<M>> for F
where
    A: 'static,
    F: Fn(A) -> R + Send + Sync + 'static,
    R: IntoScope<M>,
{
    fn into_lifespan(self) -> Lifespan<A> {
        Lifespan::from_factory(
            default_name::<F>(),
            Arc::new(move |app: A, _state: State| self(app).into_scope()),
        )
    }
}

impl<A, F, R, M> IntoLifespan<A, WithNothing<M>> for F
where
    A: 'static,
    F: Fn() -> R + Send + Sync + 'static,
    R: IntoScope<M>,
{
    fn into_lifespan(self) -> Lifespan<A> {
        Lifespan::from_factory(
            default_name::<F>(),
            Arc::new(move |_app: A, _state: State| self().into_scope()),
        )
    }
}
