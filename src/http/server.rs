//! HTTP host wired to an aggregate lifespan.
//!
//! # Responsibilities
//! - Enter the aggregate lifespan before accepting traffic
//! - Build the Axum router from the merged state
//! - Serve with graceful shutdown
//! - Exit the aggregate lifespan after the server drained

use std::collections::BTreeMap;

use axum::{extract, routing::get, Json, Router};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::lifespan::{LifespanError, LifespanManager, State};

/// Errors from running the host.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Lifespans failed to start; nothing was served.
    #[error("startup failed: {0}")]
    Startup(#[source] LifespanError),

    /// Serving failed; lifespans were stopped cleanly.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    /// Serving succeeded but lifespans failed to stop.
    #[error("shutdown failed: {0}")]
    Shutdown(#[source] LifespanError),

    /// Serving failed and lifespans failed to stop.
    #[error("server error: {serve}; shutdown failed: {shutdown}")]
    ServeAndShutdown {
        serve: std::io::Error,
        shutdown: LifespanError,
    },
}

/// HTTP server whose startup/shutdown is driven by a [`LifespanManager`].
pub struct HttpServer<A> {
    lifespans: LifespanManager<A>,
    app: A,
}

impl<A> HttpServer<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Create a new server for `app` with the given lifespans.
    pub fn new(lifespans: LifespanManager<A>, app: A) -> Self {
        Self { lifespans, app }
    }

    /// Run the server on `listener` until `shutdown` fires.
    ///
    /// `router` receives the merged lifespan state once every lifespan has
    /// started.
    pub async fn run<F>(
        self,
        listener: TcpListener,
        router: F,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError>
    where
        F: FnOnce(State) -> Router + Send,
    {
        let mut lifespan = self.lifespans.lifespan(self.app);
        let state = lifespan.enter().await.map_err(ServerError::Startup)?;

        let addr = listener.local_addr();
        match &addr {
            Ok(addr) => tracing::info!(address = %addr, "HTTP server starting"),
            Err(e) => tracing::warn!(error = %e, "HTTP server starting on unknown address"),
        }

        let served = axum::serve(listener, router(state))
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await;

        tracing::info!("HTTP server stopped");

        let stopped = lifespan.exit().await;
        match (served, stopped) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) => Err(ServerError::Io(e)),
            (Ok(()), Err(e)) => Err(ServerError::Shutdown(e)),
            (Err(serve), Err(shutdown)) => Err(ServerError::ServeAndShutdown { serve, shutdown }),
        }
    }
}

#[derive(Debug, Serialize)]
struct StateSummary {
    keys: Vec<String>,
    values: BTreeMap<String, String>,
}

/// Routes exposing the merged state: `GET /health` and `GET /state`.
pub fn state_routes(state: State) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/state", get(list_state))
        .with_state(state)
}

async fn list_state(extract::State(state): extract::State<State>) -> Json<StateSummary> {
    let mut keys: Vec<String> = state.keys().map(str::to_string).collect();
    keys.sort_unstable();
    let values = string_values(&state);
    Json(StateSummary { keys, values })
}

/// String-typed values of a state; other values are opaque to HTTP clients.
fn string_values(state: &State) -> BTreeMap<String, String> {
    state
        .keys()
        .filter_map(|k| {
            let value = state
                .get::<String>(k)
                .cloned()
                .or_else(|| state.get::<&'static str>(k).map(|s| s.to_string()))?;
            Some((k.to_string(), value))
        })
        .collect()
}
