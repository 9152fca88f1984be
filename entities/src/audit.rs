use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EntitiesError;

/// Kinds of events recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "assignment.create")]
    AssignmentCreate,
    #[serde(rename = "assignment.delete")]
    AssignmentDelete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::AssignmentCreate => "assignment.create",
            AuditAction::AssignmentDelete => "assignment.delete",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = EntitiesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assignment.create" => Ok(AuditAction::AssignmentCreate),
            "assignment.delete" => Ok(AuditAction::AssignmentDelete),
            other => Err(EntitiesError::UnknownAuditAction(other.to_string())),
        }
    }
}

/// An immutable, hash-chained record of one grant or revoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// ULID of the record
    pub id: String,
    /// Position in the chain, starting at 1
    pub seq: i64,
    /// Acting actor; `None` for system actions
    pub actor_id: Option<i64>,
    pub action: AuditAction,
    /// The actor whose assignments changed
    pub acted_actor_id: i64,
    pub details: serde_json::Value,
    pub logged_at: DateTime<Utc>,
    pub previous_hash: String,
    pub entry_hash: String,
}
