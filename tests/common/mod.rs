//! Shared lifespans and helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::Stream;
use lifespan_manager::{AsyncScope, BoxError, LifespanManager, State, SyncScope};

/// Application handle used by the tests.
#[derive(Clone, Debug, PartialEq)]
pub struct App {
    pub name: &'static str,
}

pub fn app() -> App {
    App { name: "test-app" }
}

/// Ordered record of lifespan events shared between lifespans and the test.
#[derive(Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

/// Async sequence that publishes `published` and does nothing else.
pub fn async_seq(published: Option<State>) -> impl Stream<Item = Result<Option<State>, BoxError>> {
    async_stream::stream! {
        yield Ok(published);
    }
}

/// Blocking sequence that publishes `published` and does nothing else.
pub fn sync_seq(published: Option<State>) -> impl Iterator<Item = Result<Option<State>, BoxError>> {
    std::iter::once(Ok(published))
}

/// Async scope that publishes a fixed state.
pub struct Published(pub Option<State>);

#[async_trait]
impl AsyncScope for Published {
    async fn enter(&mut self) -> Result<Option<State>, BoxError> {
        Ok(self.0.clone())
    }

    async fn exit(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Blocking scope that publishes a fixed state.
pub struct BlockingPublished(pub Option<State>);

impl SyncScope for BlockingPublished {
    fn enter(&mut self) -> Result<Option<State>, BoxError> {
        Ok(self.0.clone())
    }

    fn exit(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Async scope that journals its enter/exit and can be told to fail either.
pub struct Recorder {
    pub name: &'static str,
    pub journal: Journal,
    pub publish: Option<State>,
    pub fail_enter: bool,
    pub fail_exit: bool,
}

impl Recorder {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
            publish: None,
            fail_enter: false,
            fail_exit: false,
        }
    }

    pub fn publishing(mut self, state: State) -> Self {
        self.publish = Some(state);
        self
    }

    pub fn failing_enter(mut self) -> Self {
        self.fail_enter = true;
        self
    }

    pub fn failing_exit(mut self) -> Self {
        self.fail_exit = true;
        self
    }
}

#[async_trait]
impl AsyncScope for Recorder {
    async fn enter(&mut self) -> Result<Option<State>, BoxError> {
        self.journal.record(format!("enter:{}", self.name));
        if self.fail_enter {
            return Err(format!("{} refused to start", self.name).into());
        }
        Ok(self.publish.clone())
    }

    async fn exit(&mut self) -> Result<(), BoxError> {
        self.journal.record(format!("exit:{}", self.name));
        if self.fail_exit {
            return Err(format!("{} refused to stop", self.name).into());
        }
        Ok(())
    }
}

/// Enter and exit the manager's aggregate lifespan, returning the merged state.
pub async fn get_state(manager: &LifespanManager<App>) -> State {
    manager
        .lifespan(app())
        .run(|state| async move { state })
        .await
        .expect("lifespans should start and stop cleanly")
}

/// Sorted `(key, i32)` pairs of a state whose values are all `i32`.
pub fn int_entries(state: &State) -> Vec<(String, i32)> {
    let mut entries: Vec<(String, i32)> = state
        .keys()
        .map(|k| (k.to_string(), *state.get::<i32>(k).expect("i32 value")))
        .collect();
    entries.sort();
    entries
}
