//! HTTP host subsystem.
//!
//! # Data Flow
//! ```text
//! LifespanManager
//!     → server.rs (enter lifespans, build router from merged state)
//!     → axum::serve until shutdown
//!     → server.rs (exit lifespans)
//! ```

pub mod server;

pub use server::{state_routes, HttpServer, ServerError};
