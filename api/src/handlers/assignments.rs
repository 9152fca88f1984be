//! Assignment endpoints.
//!
//! The same four handlers serve every securable resource. Each is mounted
//! under the root (`/assignments`), a project (`/projects/{projectId}`) and a
//! form (`/projects/{projectId}/forms/{xmlFormId}`); the path parameters
//! decide which resource the request addresses.

use assignments::{ActeeRef, Revocation};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use entities::QueryOptions;
use std::collections::HashMap;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    extract::{CurrentActor, ExtendedMetadata},
    models::{
        ActorResponse, AssignmentResponse, FormRoleSummaryResponse, FormSummaryResponse,
        PagingParams, SuccessResponse,
    },
    AppState,
};

/// Path parameters shared by every assignment route.
struct AssignmentPath {
    actee: ActeeRef,
    role_id: Option<String>,
    actor_id: Option<String>,
}

impl AssignmentPath {
    fn parse(mut params: HashMap<String, String>) -> ApiResult<Self> {
        let actee = match params.remove("project_id") {
            None => ActeeRef::root(),
            Some(raw) => {
                let project_id = raw
                    .parse::<i64>()
                    .map_err(|_| ApiError::NotFound(format!("project {}", raw)))?;
                match params.remove("xml_form_id") {
                    Some(xml_form_id) => ActeeRef::form(project_id, xml_form_id),
                    None => ActeeRef::project(project_id),
                }
            }
        };

        Ok(Self {
            actee,
            role_id: params.remove("role_id"),
            actor_id: params.remove("actor_id"),
        })
    }

    fn role_id(&self) -> ApiResult<&str> {
        self.role_id
            .as_deref()
            .ok_or_else(|| ApiError::NotFound("role".to_string()))
    }

    fn actor_id(&self) -> ApiResult<&str> {
        self.actor_id
            .as_deref()
            .ok_or_else(|| ApiError::NotFound("actor".to_string()))
    }
}

/// List every assignment on a resource
///
/// GET /api/v1/projects/{projectId}/assignments
#[utoipa::path(
    get,
    path = "/api/v1/projects/{projectId}/assignments",
    params(
        ("projectId" = i64, Path, description = "Project id"),
        ("offset" = Option<i64>, Query, description = "Rows to skip"),
        ("limit" = Option<i64>, Query, description = "Maximum rows to return"),
        ("X-Extended-Metadata" = Option<bool>, Header, description = "Return full actor records")
    ),
    responses(
        (status = 200, description = "Assignments on the resource", body = [AssignmentResponse]),
        (status = 401, description = "Missing or expired bearer token", body = ApiErrorResponse),
        (status = 403, description = "Caller lacks assignment.list", body = ApiErrorResponse),
        (status = 404, description = "Resource not found", body = ApiErrorResponse)
    ),
    tag = "assignments"
)]
pub async fn list_assignments(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ExtendedMetadata(extended): ExtendedMetadata,
    Path(params): Path<HashMap<String, String>>,
    Query(paging): Query<PagingParams>,
) -> ApiResult<impl IntoResponse> {
    let path = AssignmentPath::parse(params)?;
    let options = QueryOptions {
        extended,
        offset: paging.offset,
        limit: paging.limit,
    };

    let auth = state.service.auth_for(actor);
    let views = state
        .service
        .list_assignments(&auth, &path.actee, options)
        .await?;

    Ok(Json(
        views
            .into_iter()
            .map(AssignmentResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// List the actors holding one role on a resource
///
/// GET /api/v1/projects/{projectId}/assignments/{roleId}
#[utoipa::path(
    get,
    path = "/api/v1/projects/{projectId}/assignments/{roleId}",
    params(
        ("projectId" = i64, Path, description = "Project id"),
        ("roleId" = String, Path, description = "Role id or system name")
    ),
    responses(
        (status = 200, description = "Actors holding the role", body = [ActorResponse]),
        (status = 403, description = "Caller lacks assignment.list", body = ApiErrorResponse),
        (status = 404, description = "Resource or role not found", body = ApiErrorResponse)
    ),
    tag = "assignments"
)]
pub async fn list_assignments_by_role(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(params): Path<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let path = AssignmentPath::parse(params)?;
    let auth = state.service.auth_for(actor);

    let actors = state
        .service
        .list_assignments_by_role(&auth, &path.actee, path.role_id()?)
        .await?;

    Ok(Json(
        actors
            .into_iter()
            .map(ActorResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Grant a role to an actor on a resource
///
/// POST /api/v1/projects/{projectId}/assignments/{roleId}/{actorId}
#[utoipa::path(
    post,
    path = "/api/v1/projects/{projectId}/assignments/{roleId}/{actorId}",
    params(
        ("projectId" = i64, Path, description = "Project id"),
        ("roleId" = String, Path, description = "Role id or system name"),
        ("actorId" = i64, Path, description = "Actor receiving the role")
    ),
    responses(
        (status = 200, description = "Role granted", body = SuccessResponse),
        (status = 403, description = "Caller may not grant this role here",
            body = ApiErrorResponse),
        (status = 404, description = "Resource, role or actor not found", body = ApiErrorResponse)
    ),
    tag = "assignments"
)]
pub async fn grant_role(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(params): Path<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let path = AssignmentPath::parse(params)?;
    let auth = state.service.auth_for(actor);

    let outcome = state
        .service
        .grant_role(&auth, &path.actee, path.role_id()?, path.actor_id()?)
        .await?;
    info!(
        "Role {} granted to actor {} on {} (new: {})",
        outcome.assignment.role_id, outcome.assignment.actor_id, path.actee, outcome.created
    );

    Ok(Json(SuccessResponse::ok()))
}

/// Revoke a role from an actor on a resource
///
/// DELETE /api/v1/projects/{projectId}/assignments/{roleId}/{actorId}
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{projectId}/assignments/{roleId}/{actorId}",
    params(
        ("projectId" = i64, Path, description = "Project id"),
        ("roleId" = String, Path, description = "Role id or system name"),
        ("actorId" = i64, Path, description = "Actor losing the role")
    ),
    responses(
        (status = 200, description = "Role revoked", body = SuccessResponse),
        (status = 403, description = "Caller lacks assignment.delete", body = ApiErrorResponse),
        (status = 404, description = "Nothing to revoke, or a reference did not resolve",
            body = ApiErrorResponse)
    ),
    tag = "assignments"
)]
pub async fn revoke_role(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(params): Path<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let path = AssignmentPath::parse(params)?;
    let auth = state.service.auth_for(actor);

    match state
        .service
        .revoke_role(&auth, &path.actee, path.role_id()?, path.actor_id()?)
        .await?
    {
        Revocation::Revoked => Ok(Json(SuccessResponse::ok())),
        Revocation::NotAssigned => Err(ApiError::NotFound("assignment".to_string())),
    }
}

/// Every role held on every form of a project
///
/// GET /api/v1/projects/{projectId}/assignments/forms
#[utoipa::path(
    get,
    path = "/api/v1/projects/{projectId}/assignments/forms",
    params(("projectId" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "One entry per form", body = [FormSummaryResponse]),
        (status = 403, description = "Caller lacks assignment.list on the project",
            body = ApiErrorResponse),
        (status = 404, description = "Project not found", body = ApiErrorResponse)
    ),
    tag = "assignments"
)]
pub async fn form_summaries(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(project_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let project_id = parse_project_id(&project_id)?;
    let auth = state.service.auth_for(actor);

    let summaries = state.service.form_summaries(&auth, project_id).await?;
    Ok(Json(
        summaries
            .into_iter()
            .map(FormSummaryResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// The actors holding one role on every form of a project
///
/// GET /api/v1/projects/{projectId}/assignments/forms/{roleId}
#[utoipa::path(
    get,
    path = "/api/v1/projects/{projectId}/assignments/forms/{roleId}",
    params(
        ("projectId" = i64, Path, description = "Project id"),
        ("roleId" = String, Path, description = "Role id or system name")
    ),
    responses(
        (status = 200, description = "One entry per form", body = [FormRoleSummaryResponse]),
        (status = 403, description = "Caller lacks assignment.list on the project",
            body = ApiErrorResponse),
        (status = 404, description = "Project or role not found", body = ApiErrorResponse)
    ),
    tag = "assignments"
)]
pub async fn form_summaries_for_role(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_id, role_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let project_id = parse_project_id(&project_id)?;
    let auth = state.service.auth_for(actor);

    let summaries = state
        .service
        .form_summaries_for_role(&auth, project_id, &role_id)
        .await?;
    Ok(Json(
        summaries
            .into_iter()
            .map(FormRoleSummaryResponse::from)
            .collect::<Vec<_>>(),
    ))
}

fn parse_project_id(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::NotFound(format!("project {}", raw)))
}
