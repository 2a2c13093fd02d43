//! The aggregation engine.
//!
//! # Data Flow
//! ```text
//! enter():
//!     state = {}
//!     for each lifespan (registration order):
//!         scope = lifespan(app, snapshot of state)
//!         partial = scope.enter().await      (bounded by startup timeout)
//!         state.merge(partial); stack.push(scope)
//!     → state
//!
//! exit():
//!     while let Some(scope) = stack.pop():   (reverse order)
//!         scope.exit().await                 (bounded by shutdown timeout)
//!     → all teardown failures, aggregated
//! ```
//!
//! # Design Decisions
//! - Strictly sequential: no lifespan starts before the previous is ready
//! - A startup failure unwinds what was already entered before returning
//! - Teardown failures never stop the unwind
//! - Entered scopes live on `self`, so a cancelled `enter()` can still be
//!   unwound by `exit()`
//! - A scope whose `enter` timed out or was cancelled is abandoned, not
//!   forgotten, so setup that completes late is still torn down
//! - Dropping an entered aggregate inside a runtime unwinds it on a spawned task

use std::future::Future;
use std::time::{Duration, Instant};

use crate::config::LifespanConfig;
use crate::lifespan::error::{BoxError, LifespanError, Phase};
use crate::lifespan::normalize::Lifespan;
use crate::lifespan::scope::AsyncScope;
use crate::lifespan::state::State;
use crate::observability::metrics;

struct Entered {
    index: usize,
    name: String,
    scope: Box<dyn AsyncScope>,
}

/// Scopes awaiting teardown.
#[derive(Default)]
struct ExitStack {
    /// The scope whose `enter` was started but has not returned.
    entering: Option<Entered>,
    entered: Vec<Entered>,
    shutdown_timeout: Option<Duration>,
}

impl ExitStack {
    fn is_empty(&self) -> bool {
        self.entering.is_none() && self.entered.is_empty()
    }

    /// Release the interrupted scope, then tear down the rest in reverse order.
    async fn unwind(&mut self) -> Vec<LifespanError> {
        let mut failures = Vec::new();

        if let Some(Entered { index, name, mut scope }) = self.entering.take() {
            tracing::debug!(lifespan = %name, index, "Releasing interrupted lifespan");
            if let Err(source) = bounded(self.shutdown_timeout, scope.abandon()).await {
                tracing::error!(lifespan = %name, index, error = %source, "Lifespan failed to stop");
                metrics::record_lifespan_failure(&name, Phase::Shutdown);
                failures.push(LifespanError::Shutdown { index, name, source });
            }
        }

        while let Some(Entered { index, name, mut scope }) = self.entered.pop() {
            tracing::debug!(lifespan = %name, index, "Stopping lifespan");

            let step = Instant::now();
            let result = bounded(self.shutdown_timeout, scope.exit()).await;
            metrics::record_lifespan_duration(&name, Phase::Shutdown, step.elapsed());

            if let Err(source) = result {
                tracing::error!(lifespan = %name, index, error = %source, "Lifespan failed to stop");
                metrics::record_lifespan_failure(&name, Phase::Shutdown);
                failures.push(LifespanError::Shutdown { index, name, source });
            }
        }

        failures
    }
}

/// The aggregate resource scope returned by [`LifespanManager::lifespan`](crate::LifespanManager::lifespan).
pub struct AggregateLifespan<A> {
    app: A,
    pending: Vec<Lifespan<A>>,
    stack: ExitStack,
    config: LifespanConfig,
    entered: bool,
}

impl<A> AggregateLifespan<A>
where
    A: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(app: A, lifespans: Vec<Lifespan<A>>, config: LifespanConfig) -> Self {
        let stack = ExitStack {
            shutdown_timeout: config.shutdown_timeout(),
            ..ExitStack::default()
        };
        Self {
            app,
            pending: lifespans,
            stack,
            config,
            entered: false,
        }
    }

    /// Number of lifespans currently entered.
    pub fn entered_count(&self) -> usize {
        self.stack.entered.len()
    }

    /// Start every lifespan in order and return the merged state.
    ///
    /// On failure, lifespans that already started are torn down in reverse
    /// order before the error is returned.
    pub async fn enter(&mut self) -> Result<State, LifespanError> {
        if self.entered {
            return Err(LifespanError::AlreadyEntered);
        }
        self.entered = true;

        let lifespans = std::mem::take(&mut self.pending);
        let total = lifespans.len();
        let started = Instant::now();
        let mut state = State::new();

        for (index, lifespan) in lifespans.into_iter().enumerate() {
            let name = lifespan.name().to_string();
            tracing::debug!(lifespan = %name, index, "Starting lifespan");

            let step = Instant::now();
            let scope = lifespan.scope(self.app.clone(), state.clone());
            let entering = self.stack.entering.insert(Entered { index, name, scope });
            let result = bounded(self.config.startup_timeout(), entering.scope.enter()).await;
            metrics::record_lifespan_duration(&entering.name, Phase::Startup, step.elapsed());

            match result {
                Ok(partial) => {
                    if let Some(partial) = partial {
                        let keys: Vec<&str> = partial.keys().collect();
                        tracing::debug!(lifespan = %entering.name, keys = ?keys, "Lifespan published state");
                        state.merge(partial);
                    }
                    if let Some(entry) = self.stack.entering.take() {
                        self.stack.entered.push(entry);
                    }
                }
                Err(source) => {
                    let name = entering.name.clone();
                    tracing::error!(lifespan = %name, index, error = %source, "Lifespan failed to start");
                    metrics::record_lifespan_failure(&name, Phase::Startup);

                    let startup = LifespanError::Startup { index, name, source };
                    let cleanup = self.stack.unwind().await;
                    if cleanup.is_empty() {
                        return Err(startup);
                    }
                    let mut failures = vec![startup];
                    failures.extend(cleanup);
                    return Err(LifespanError::Multiple(failures));
                }
            }
        }

        tracing::info!(
            lifespans = total,
            state_keys = state.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "All lifespans started"
        );
        Ok(state)
    }

    /// Tear down every entered lifespan in reverse order.
    pub async fn exit(&mut self) -> Result<(), LifespanError> {
        let count = self.stack.entered.len();
        let failures = self.stack.unwind().await;
        if failures.is_empty() {
            tracing::info!(lifespans = count, "All lifespans stopped");
        }
        match LifespanError::from_failures(failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Enter, run `body` with the merged state, then exit.
    ///
    /// Teardown runs even when `body` returns; its failures are returned
    /// instead of the body's output. If this future is dropped while `body`
    /// is running, teardown continues on a spawned task.
    pub async fn run<F, Fut, T>(mut self, body: F) -> Result<T, LifespanError>
    where
        F: FnOnce(State) -> Fut,
        Fut: Future<Output = T>,
    {
        let state = self.enter().await?;
        let output = body(state).await;
        self.exit().await?;
        Ok(output)
    }
}

impl<A> Drop for AggregateLifespan<A> {
    fn drop(&mut self) {
        if self.stack.is_empty() {
            return;
        }

        let lifespans = self.stack.entered.len();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::warn!(lifespans, "Aggregate lifespan dropped while entered; unwinding in background");
                let mut stack = std::mem::take(&mut self.stack);
                runtime.spawn(async move {
                    let failures = stack.unwind().await;
                    if failures.is_empty() {
                        tracing::info!(lifespans, "All lifespans stopped");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    lifespans,
                    "Aggregate lifespan dropped outside a runtime; teardown skipped"
                );
            }
        }
    }
}

async fn bounded<T, F>(limit: Option<Duration>, fut: F) -> Result<T, BoxError>
where
    F: Future<Output = Result<T, BoxError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await?,
        None => fut.await,
    }
}
