//! Relationship change notifications

use std::sync::Arc;

use async_trait::async_trait;

use crate::object::{BoRef, BusinessObject};

/// A change made through a relationship
#[derive(Debug, Clone)]
pub enum RelationshipEvent {
    /// A single relationship now points at `related` (or at nothing)
    Updated {
        relationship: String,
        related: Option<BoRef>,
    },
    /// An object joined a multiple relationship
    Added { relationship: String, related: BoRef },
    /// An object left a multiple relationship
    Removed { relationship: String, related: BoRef },
}

impl RelationshipEvent {
    pub fn relationship_name(&self) -> &str {
        match self {
            RelationshipEvent::Updated { relationship, .. }
            | RelationshipEvent::Added { relationship, .. }
            | RelationshipEvent::Removed { relationship, .. } => relationship,
        }
    }
}

#[async_trait]
pub trait RelationshipObserver: Send + Sync {
    async fn updated(&self, _owner: &BusinessObject, _relationship: &str, _related: Option<&BoRef>) {}

    async fn added(&self, _owner: &BusinessObject, _relationship: &str, _related: &BoRef) {}

    async fn removed(&self, _owner: &BusinessObject, _relationship: &str, _related: &BoRef) {}
}

#[derive(Default, Clone)]
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn RelationshipObserver>>,
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn RelationshipObserver>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub async fn trigger(&self, owner: &BusinessObject, event: &RelationshipEvent) {
        for observer in &self.observers {
            match event {
                RelationshipEvent::Updated {
                    relationship,
                    related,
                } => observer.updated(owner, relationship, related.as_ref()).await,
                RelationshipEvent::Added {
                    relationship,
                    related,
                } => observer.added(owner, relationship, related).await,
                RelationshipEvent::Removed {
                    relationship,
                    related,
                } => observer.removed(owner, relationship, related).await,
            }
        }
    }
}
