use chrono::{DateTime, Utc};
use entities::{Actor, AssignmentView, FormRoleSummary, FormSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// An actor as returned by assignment listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActorResponse {
    pub id: i64,
    /// One of `user`, `field_key`, `public_link`, `single_use`
    pub kind: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Actor> for ActorResponse {
    fn from(actor: Actor) -> Self {
        Self {
            id: actor.id,
            kind: actor.kind.to_string(),
            display_name: actor.display_name,
            created_at: actor.created_at,
        }
    }
}

/// One assignment on a resource.
///
/// Minimal listings carry `actorId`; extended listings (header
/// `X-Extended-Metadata: true`) carry the full `actor` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActorResponse>,
    pub role_id: i64,
}

impl From<AssignmentView> for AssignmentResponse {
    fn from(view: AssignmentView) -> Self {
        match view {
            AssignmentView::Minimal { actor_id, role_id } => Self {
                actor_id: Some(actor_id),
                actor: None,
                role_id,
            },
            AssignmentView::Extended(extended) => Self {
                actor_id: None,
                actor: Some(extended.actor.into()),
                role_id: extended.role_id,
            },
        }
    }
}

/// Every role held on one form, keyed by role id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSummaryResponse {
    pub xml_form_id: String,
    pub roles: BTreeMap<i64, Vec<ActorResponse>>,
}

impl From<FormSummary> for FormSummaryResponse {
    fn from(summary: FormSummary) -> Self {
        Self {
            xml_form_id: summary.xml_form_id,
            roles: summary
                .roles
                .into_iter()
                .map(|(role_id, actors)| {
                    (role_id, actors.into_iter().map(ActorResponse::from).collect())
                })
                .collect(),
        }
    }
}

/// The actors holding one role on one form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormRoleSummaryResponse {
    pub xml_form_id: String,
    pub actors: Vec<ActorResponse>,
}

impl From<FormRoleSummary> for FormRoleSummaryResponse {
    fn from(summary: FormRoleSummary) -> Self {
        Self {
            xml_form_id: summary.xml_form_id,
            actors: summary.actors.into_iter().map(ActorResponse::from).collect(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub database: DatabaseHealth,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub message: String,
}

/// Generic success response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Paging parameters for assignment listings
#[derive(Debug, Default, Deserialize)]
pub struct PagingParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}
