//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifespan engine produces:
//!     → logging.rs (structured log events per lifespan step)
//!     → metrics.rs (durations, failure counters)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
