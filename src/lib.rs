//! Compose many application lifespans into one.
//!
//! A web host accepts a single startup/shutdown hook. [`LifespanManager`]
//! collects lifespans from independent subsystems, starts them in order,
//! merges the state each one publishes, and stops them in reverse order.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod lifespan;
pub mod observability;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use lifespan::{
    AggregateLifespan, AsyncScope, BoxError, Lifespan, LifespanError, LifespanManager, State,
    SyncScope,
};
