//! Shared application state produced by lifespans.
//!
//! # Responsibilities
//! - Hold the values each lifespan publishes at its suspension point
//! - Merge partial states in registration order (later keys win)
//! - Typed lookup for consumers (handlers, later lifespans)
//!
//! # Design Decisions
//! - Values are `Arc<dyn Any>`: cloning a state is cheap and snapshots
//!   handed to lifespans never alias the engine's own map
//! - Keys are plain strings, matching how the host publishes state

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A type-erased state value.
pub type StateValue = Arc<dyn Any + Send + Sync>;

/// Mapping from string keys to arbitrary shared values.
#[derive(Clone, Default)]
pub struct State {
    values: HashMap<String, StateValue>,
}

impl State {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy at a lifespan's yield point.
    pub fn with<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.insert(key, value);
        self
    }

    /// Insert a value, replacing any previous value under `key`.
    pub fn insert<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.values.insert(key.into(), Arc::new(value));
    }

    /// Insert an already shared value.
    pub fn insert_arc(&mut self, key: impl Into<String>, value: StateValue) {
        self.values.insert(key.into(), value);
    }

    /// Borrow the value under `key` if it exists and has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Clone out the shared handle to the value under `key` if it has type `T`.
    pub fn get_arc<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.values
            .get(key)
            .and_then(|v| Arc::clone(v).downcast::<T>().ok())
    }

    /// Raw access to the value under `key`.
    pub fn get_raw(&self, key: &str) -> Option<&StateValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Merge `other` into this state. Keys present in both take `other`'s value.
    pub fn merge(&mut self, other: State) {
        self.values.extend(other.values);
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("State").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_lookup() {
        let state = State::new().with("port", 8080u16).with("name", "db");

        assert_eq!(state.get::<u16>("port"), Some(&8080));
        assert_eq!(state.get::<&str>("name"), Some(&"db"));
        // Wrong type is a miss, not a panic
        assert!(state.get::<u32>("port").is_none());
        assert!(state.get::<u16>("missing").is_none());
    }

    #[test]
    fn test_merge_overwrites() {
        let mut state = State::new().with("a", 1i32);
        state.merge(State::new().with("a", 2i32).with("b", 3i32));

        assert_eq!(state.len(), 2);
        assert_eq!(state.get::<i32>("a"), Some(&2));
        assert_eq!(state.get::<i32>("b"), Some(&3));
    }

    #[test]
    fn test_clone_is_a_snapshot() {
        let mut state = State::new().with("a", 1i32);
        let snapshot = state.clone();
        state.insert("b", 2i32);

        assert!(!snapshot.contains_key("b"));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_get_arc_shares_value() {
        let state = State::new().with("pool", vec![1, 2, 3]);
        let a = state.get_arc::<Vec<i32>>("pool").unwrap();
        let b = state.get_arc::<Vec<i32>>("pool").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_debug_lists_sorted_keys() {
        let state = State::new().with("b", 1u8).with("a", 2u8);
        assert_eq!(format!("{:?}", state), r#"State { keys: ["a", "b"] }"#);
    }
}
