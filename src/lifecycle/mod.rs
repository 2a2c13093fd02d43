//! Process lifecycle for the host.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Enter lifespans (in order) → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit lifespans (reverse order)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Listener starts last (traffic only when every lifespan is ready)
//! - Lifespans exit only after the server has drained

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
