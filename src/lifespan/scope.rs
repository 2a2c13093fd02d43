//! Resource scopes: the uniform enter/exit protocol every lifespan is driven through.
//!
//! # Responsibilities
//! - Define the async (`AsyncScope`) and blocking (`SyncScope`) scope traits
//! - Adapt single-suspension sequences (streams, iterators) into scopes
//!
//! # Protocol
//! ```text
//! enter():  run setup up to the suspension point → Option<State>
//! exit():   resume past the suspension point → run teardown
//! ```
//!
//! A sequence is driven by pulling items: the first item is the value
//! produced at the suspension point, and pulling again runs the teardown,
//! which must end the sequence.

use async_trait::async_trait;
use futures_util::stream::{BoxStream, Stream, StreamExt, TryStreamExt};

use crate::lifespan::error::{BoxError, ScopeError};
use crate::lifespan::state::State;

/// A resource scope driven from async code.
#[async_trait]
pub trait AsyncScope: Send {
    /// Run setup and return the state published by this scope, if any.
    async fn enter(&mut self) -> Result<Option<State>, BoxError>;

    /// Run teardown.
    async fn exit(&mut self) -> Result<(), BoxError>;

    /// Release a scope whose `enter` was interrupted before it returned.
    ///
    /// Scopes whose setup can finish after the caller stopped waiting must
    /// tear that setup down here.
    async fn abandon(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[async_trait]
impl<S: AsyncScope + ?Sized> AsyncScope for Box<S> {
    async fn enter(&mut self) -> Result<Option<State>, BoxError> {
        (**self).enter().await
    }

    async fn exit(&mut self) -> Result<(), BoxError> {
        (**self).exit().await
    }

    async fn abandon(&mut self) -> Result<(), BoxError> {
        (**self).abandon().await
    }
}

/// A resource scope whose enter/exit block the calling thread.
///
/// Never driven on the async scheduler directly; see [`BlockingScope`](crate::lifespan::blocking::BlockingScope).
pub trait SyncScope: Send + 'static {
    fn enter(&mut self) -> Result<Option<State>, BoxError>;

    fn exit(&mut self) -> Result<(), BoxError>;
}

/// Async single-suspension sequence adapted into a scope.
pub struct StreamScope {
    stream: BoxStream<'static, Result<Option<State>, BoxError>>,
}

impl StreamScope {
    pub fn new<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Option<State>, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            stream: stream.map_err(Into::into).boxed(),
        }
    }
}

#[async_trait]
impl AsyncScope for StreamScope {
    async fn enter(&mut self) -> Result<Option<State>, BoxError> {
        match self.stream.next().await {
            Some(item) => item,
            None => Err(ScopeError::DidNotYield.into()),
        }
    }

    async fn exit(&mut self) -> Result<(), BoxError> {
        match self.stream.next().await {
            None => Ok(()),
            Some(Err(e)) => Err(e),
            Some(Ok(_)) => Err(ScopeError::DidNotStop.into()),
        }
    }
}

/// Blocking single-suspension sequence adapted into a scope.
pub struct IterScope<I> {
    iter: I,
}

impl<I> IterScope<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I, E> SyncScope for IterScope<I>
where
    I: Iterator<Item = Result<Option<State>, E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn enter(&mut self) -> Result<Option<State>, BoxError> {
        match self.iter.next() {
            Some(item) => item.map_err(Into::into),
            None => Err(ScopeError::DidNotYield.into()),
        }
    }

    fn exit(&mut self) -> Result<(), BoxError> {
        match self.iter.next() {
            None => Ok(()),
            Some(Err(e)) => Err(e.into()),
            Some(Ok(_)) => Err(ScopeError::DidNotStop.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn is_scope_error(err: &BoxError, expected: ScopeError) -> bool {
        err.downcast_ref::<ScopeError>() == Some(&expected)
    }

    #[tokio::test]
    async fn test_stream_scope_runs_teardown_on_exit() {
        let torn_down = Arc::new(AtomicBool::new(false));
        let flag = torn_down.clone();
        let stream = async_stream::stream! {
            yield Ok::<_, BoxError>(Some(State::new().with("k", 1u8)));
            flag.store(true, Ordering::SeqCst);
        };

        let mut scope = StreamScope::new(stream);
        let state = scope.enter().await.unwrap().unwrap();
        assert_eq!(state.get::<u8>("k"), Some(&1));
        assert!(!torn_down.load(Ordering::SeqCst));

        scope.exit().await.unwrap();
        assert!(torn_down.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_stream_scope_protocol_violations() {
        let empty = futures_util::stream::empty::<Result<Option<State>, BoxError>>();
        let err = StreamScope::new(empty).enter().await.unwrap_err();
        assert!(is_scope_error(&err, ScopeError::DidNotYield));

        let twice = futures_util::stream::iter(vec![Ok::<Option<State>, BoxError>(None), Ok(None)]);
        let mut scope = StreamScope::new(twice);
        scope.enter().await.unwrap();
        let err = scope.exit().await.unwrap_err();
        assert!(is_scope_error(&err, ScopeError::DidNotStop));
    }

    #[tokio::test]
    async fn test_stream_scope_teardown_error() {
        let stream = async_stream::try_stream! {
            yield None::<State>;
            Err::<(), _>(std::io::Error::other("close failed"))?;
        };

        let mut scope = StreamScope::new::<_, std::io::Error>(stream);
        assert!(scope.enter().await.unwrap().is_none());
        let err = scope.exit().await.unwrap_err();
        assert_eq!(err.to_string(), "close failed");
    }

    #[test]
    fn test_iter_scope() {
        let mut scope = IterScope::new(vec![Ok::<Option<State>, BoxError>(None)].into_iter());
        assert!(scope.enter().unwrap().is_none());
        scope.exit().unwrap();

        let mut empty = IterScope::new(std::iter::empty::<Result<Option<State>, BoxError>>());
        let err = empty.enter().unwrap_err();
        assert!(is_scope_error(&err, ScopeError::DidNotYield));
    }
}
