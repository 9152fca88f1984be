//! Core authorization types.
//!
//! A request is evaluated for one [`Principal`] against one [`Resource`]. The
//! principal's [`Grant`]s (role verbs held on some actee) are compiled into a
//! Cedar policy set, and the resource's lineage becomes the Cedar entity
//! hierarchy, so a grant on an ancestor scope covers its descendants.
//!
//! # Security Note
//! Principals must come from an authenticated session only. Grants must be
//! loaded for the principal themselves, never for an actor named by the caller.

use entities::{Actee, ActeeEdge};
use serde::{Deserialize, Serialize};

/// The actor on whose behalf a decision is made.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// The unique identifier for this principal
    pub id: String,

    /// The Cedar entity type of the principal
    pub entity_type: String,
}

impl Principal {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
        }
    }

    /// Creates a Principal for the actor with the given id.
    pub fn actor(actor_id: i64) -> Self {
        Self::new(actor_id.to_string(), "Actor")
    }
}

/// A capability verb, e.g. `assignment.list`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// The securable resource being acted upon, with every scope it inherits from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Addressable identity of the resource
    pub id: String,

    /// The resource and its ancestors, nearest first
    pub lineage: Vec<ActeeEdge>,
}

impl Resource {
    pub fn from_actee(actee: &Actee) -> Self {
        Self {
            id: actee.id.clone(),
            lineage: actee.lineage(),
        }
    }
}

/// Verbs a principal holds on one actee through one role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub actee_id: String,
    pub verbs: Vec<String>,
}

impl Grant {
    pub fn new(actee_id: impl Into<String>, verbs: Vec<String>) -> Self {
        Self {
            actee_id: actee_id.into(),
            verbs,
        }
    }
}
