//! Lifespan composition subsystem.
//!
//! # Data Flow
//! ```text
//! subsystem authors:
//!     manager.rs (add / remove / include)
//!
//! host startup:
//!     LifespanManager::lifespan(app) → aggregate.rs
//!         → normalize.rs (entry + app + state so far → AsyncScope)
//!         → blocking.rs (sync scopes run on the blocking pool)
//!         → scope.enter() → merge partial state (state.rs)
//!
//! host shutdown:
//!     aggregate.rs exit → scopes exited in reverse order
//! ```
//!
//! # Design Decisions
//! - Lifespans run one at a time, in registration order
//! - Each lifespan sees only the state published before it
//! - Every started lifespan is stopped, even after a failure

pub mod aggregate;
pub mod blocking;
pub mod error;
pub mod manager;
pub mod normalize;
pub mod scope;
pub mod state;

pub use aggregate::AggregateLifespan;
pub use blocking::BlockingScope;
pub use error::{BoxError, LifespanError, Phase, ScopeError};
pub use manager::LifespanManager;
pub use normalize::{IntoLifespan, IntoScope, Lifespan};
pub use scope::{AsyncScope, IterScope, StreamScope, SyncScope};
pub use state::{State, StateValue};
