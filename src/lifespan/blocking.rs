//! Blocking adapter for synchronous scopes.
//!
//! # Responsibilities
//! - Run a `SyncScope`'s enter/exit on tokio's blocking pool
//! - Expose the result as an `AsyncScope` so the engine awaits it
//!
//! # Design Decisions
//! - The scope is moved into the blocking task and handed back with the
//!   result; no lock is held across the await
//! - The setup task handle is kept until it resolves, so an `enter` the
//!   caller stopped waiting for can still be torn down by `abandon`
//! - A panic in the blocking call is reported as an error and the scope is
//!   considered lost (later exits report `ScopeError::NotEntered`)

use async_trait::async_trait;
use tokio::task::{self, JoinHandle};

use crate::lifespan::error::{BoxError, ScopeError};
use crate::lifespan::scope::{AsyncScope, SyncScope};
use crate::lifespan::state::State;

type Setup<S> = JoinHandle<(S, Result<Option<State>, BoxError>)>;

/// Drives a [`SyncScope`] without blocking the async scheduler.
pub struct BlockingScope<S> {
    inner: Option<S>,
    setup: Option<Setup<S>>,
    entered: bool,
}

impl<S: SyncScope> BlockingScope<S> {
    pub fn new(scope: S) -> Self {
        Self {
            inner: Some(scope),
            setup: None,
            entered: false,
        }
    }

    async fn offload<T, F>(&mut self, call: F) -> Result<T, BoxError>
    where
        T: Send + 'static,
        F: FnOnce(&mut S) -> Result<T, BoxError> + Send + 'static,
    {
        let mut scope = self.inner.take().ok_or(ScopeError::NotEntered)?;
        let (scope, result) = task::spawn_blocking(move || {
            let result = call(&mut scope);
            (scope, result)
        })
        .await?;
        self.inner = Some(scope);
        result
    }

    /// Wait for the in-flight setup and take back the scope.
    async fn settle(&mut self) -> Result<Option<State>, BoxError> {
        let handle = self.setup.as_mut().ok_or(ScopeError::NotEntered)?;
        let joined = handle.await;
        self.setup = None;

        let (scope, result) = joined?;
        self.inner = Some(scope);
        let state = result?;
        self.entered = true;
        Ok(state)
    }
}

#[async_trait]
impl<S: SyncScope> AsyncScope for BlockingScope<S> {
    async fn enter(&mut self) -> Result<Option<State>, BoxError> {
        let mut scope = self.inner.take().ok_or(ScopeError::NotEntered)?;
        self.setup = Some(task::spawn_blocking(move || {
            let result = scope.enter();
            (scope, result)
        }));
        self.settle().await
    }

    async fn exit(&mut self) -> Result<(), BoxError> {
        if !self.entered {
            return Err(ScopeError::NotEntered.into());
        }
        self.entered = false;
        self.offload(|scope| scope.exit()).await
    }

    async fn abandon(&mut self) -> Result<(), BoxError> {
        if self.setup.is_none() {
            return Ok(());
        }
        match self.settle().await {
            Ok(_) => {
                tracing::debug!("Interrupted blocking setup completed; tearing it down");
                self.exit().await
            }
            // Setup never completed, so there is nothing to release
            Err(_) => Ok(()),
        }
    }
}
