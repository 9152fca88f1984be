use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::actor::Actor;

/// The fact that an actor holds a role on an actee.
///
/// The triple is the natural key; there is no separate identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub actor_id: i64,
    pub role_id: i64,
    pub actee_id: String,
}

/// Assignment with the full actor record joined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedAssignment {
    pub actor: Actor,
    pub role_id: i64,
}

/// What a resource listing returns, depending on the requested extent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssignmentView {
    Minimal {
        #[serde(rename = "actorId")]
        actor_id: i64,
        #[serde(rename = "roleId")]
        role_id: i64,
    },
    Extended(ExtendedAssignment),
}

impl AssignmentView {
    pub fn role_id(&self) -> i64 {
        match self {
            AssignmentView::Minimal { role_id, .. } => *role_id,
            AssignmentView::Extended(extended) => extended.role_id,
        }
    }

    pub fn actor_id(&self) -> i64 {
        match self {
            AssignmentView::Minimal { actor_id, .. } => *actor_id,
            AssignmentView::Extended(extended) => extended.actor.id,
        }
    }
}

/// Paging and projection requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub extended: bool,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl QueryOptions {
    pub fn extended() -> Self {
        Self {
            extended: true,
            ..Self::default()
        }
    }

    pub fn with_paging(mut self, offset: Option<i64>, limit: Option<i64>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// Project-wide summary entry: one form and every role held on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub xml_form_id: String,
    /// Role id to the actors holding it on this form
    pub roles: BTreeMap<i64, Vec<Actor>>,
}

/// Project-wide summary entry filtered to a single role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRoleSummary {
    pub xml_form_id: String,
    pub actors: Vec<Actor>,
}
