//! Lifespan registry.

use crate::config::LifespanConfig;
use crate::lifespan::aggregate::AggregateLifespan;
use crate::lifespan::error::LifespanError;
use crate::lifespan::normalize::{IntoLifespan, Lifespan};

/// Ordered collection of lifespans that run as one.
///
/// `A` is the application handle passed to every lifespan that asks for it.
pub struct LifespanManager<A> {
    lifespans: Vec<Lifespan<A>>,
    config: LifespanConfig,
}

impl<A> LifespanManager<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Create an empty manager with default timeouts.
    pub fn new() -> Self {
        Self {
            lifespans: Vec::new(),
            config: LifespanConfig::default(),
        }
    }

    /// Replace the timeout configuration.
    pub fn with_config(mut self, config: LifespanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LifespanConfig {
        &self.config
    }

    /// Register a lifespan at the end of the list.
    ///
    /// The returned handle identifies this registration for [`remove`](Self::remove).
    /// Nothing is invoked until the aggregate lifespan is entered.
    pub fn add<F, M>(&mut self, lifespan: F) -> Lifespan<A>
    where
        F: IntoLifespan<A, M>,
    {
        let lifespan = lifespan.into_lifespan();
        tracing::debug!(lifespan = %lifespan.name(), position = self.lifespans.len(), "Lifespan registered");
        self.lifespans.push(lifespan.clone());
        lifespan
    }

    /// Remove the first registration identical to `lifespan`.
    pub fn remove(&mut self, lifespan: &Lifespan<A>) -> Result<(), LifespanError> {
        let position = self
            .lifespans
            .iter()
            .position(|l| l.ptr_eq(lifespan))
            .ok_or(LifespanError::NotRegistered)?;
        self.lifespans.remove(position);
        tracing::debug!(lifespan = %lifespan.name(), position, "Lifespan removed");
        Ok(())
    }

    /// Append all of `other`'s lifespans, in order, after this manager's own.
    pub fn include(&mut self, other: &LifespanManager<A>) {
        self.lifespans.extend(other.lifespans.iter().cloned());
    }

    pub fn contains(&self, lifespan: &Lifespan<A>) -> bool {
        self.lifespans.iter().any(|l| l.ptr_eq(lifespan))
    }

    pub fn len(&self) -> usize {
        self.lifespans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lifespans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lifespan<A>> {
        self.lifespans.iter()
    }

    /// Build the aggregate lifespan for `app`.
    ///
    /// The current registrations are captured; later changes to this manager
    /// do not affect the returned scope.
    pub fn lifespan(&self, app: A) -> AggregateLifespan<A> {
        AggregateLifespan::new(app, self.lifespans.clone(), self.config.clone())
    }
}

impl<A> Default for LifespanManager<A>
where
    A: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for LifespanManager<A> {
    fn clone(&self) -> Self {
        Self {
            lifespans: self.lifespans.clone(),
            config: self.config.clone(),
        }
    }
}

impl<A> FromIterator<Lifespan<A>> for LifespanManager<A>
where
    A: Clone + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = Lifespan<A>>>(iter: I) -> Self {
        Self {
            lifespans: iter.into_iter().collect(),
            config: LifespanConfig::default(),
        }
    }
}
