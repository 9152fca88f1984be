use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EntitiesError;

/// The kind of principal an actor represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// An interactive user account
    User,
    /// A device credential used by data collection clients
    FieldKey,
    /// An anonymous public access link
    PublicLink,
    /// A one-time credential, e.g. for password resets
    SingleUse,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::User => "user",
            ActorKind::FieldKey => "field_key",
            ActorKind::PublicLink => "public_link",
            ActorKind::SingleUse => "single_use",
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorKind {
    type Err = EntitiesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ActorKind::User),
            "field_key" => Ok(ActorKind::FieldKey),
            "public_link" => Ok(ActorKind::PublicLink),
            "single_use" => Ok(ActorKind::SingleUse),
            other => Err(EntitiesError::UnknownActorKind(other.to_string())),
        }
    }
}

/// An authenticated principal that can hold roles.
///
/// Actors are created and destroyed by the identity subsystem; this crate only
/// reads them. A soft-deleted actor keeps its row but no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: i64,
    pub kind: ActorKind,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Actor {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_kind_round_trips_through_str() {
        for kind in [
            ActorKind::User,
            ActorKind::FieldKey,
            ActorKind::PublicLink,
            ActorKind::SingleUse,
        ] {
            assert_eq!(kind.as_str().parse::<ActorKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_actor_kind() {
        let err = "robot".parse::<ActorKind>().unwrap_err();
        assert_eq!(err, EntitiesError::UnknownActorKind("robot".into()));
    }

    #[test]
    fn test_actor_serializes_camel_case() {
        let actor = Actor {
            id: 7,
            kind: ActorKind::FieldKey,
            display_name: "Tablet 3".into(),
            created_at: Utc::now(),
            deleted_at: None,
        };

        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["displayName"], "Tablet 3");
        assert_eq!(json["kind"], "field_key");
        assert!(json.get("deletedAt").is_none());
    }
}
