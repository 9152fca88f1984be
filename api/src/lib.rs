use assignments::{AssignmentService, ServiceConfig};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use database::Database;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use user::{SessionConfig, SessionStore};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware_hooks;
pub mod models;
pub mod server;

// Re-export server functions for convenience
pub use server::{spawn_server_with_config, start_server_with_config, ApiConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub service: AssignmentService,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(db: Arc<Database>, service: ServiceConfig, sessions: SessionConfig) -> Self {
        Self {
            service: AssignmentService::new(db.clone(), service),
            sessions: SessionStore::new(db.clone(), sessions),
            db,
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::assignments::list_assignments,
        handlers::assignments::list_assignments_by_role,
        handlers::assignments::grant_role,
        handlers::assignments::revoke_role,
        handlers::assignments::form_summaries,
        handlers::assignments::form_summaries_for_role,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::ActorResponse,
            models::AssignmentResponse,
            models::FormSummaryResponse,
            models::FormRoleSummaryResponse,
            models::HealthResponse,
            models::DatabaseHealth,
            models::SuccessResponse,
            error::ApiErrorResponse,
            error::ErrorDetail,
        )
    ),
    tags(
        (name = "assignments", description = "Role assignments on the root, projects and forms"),
        (name = "health", description = "Health check endpoints"),
    ),
    info(
        title = "Steward API",
        version = "0.1.0",
        description = "Role assignment and authorization service",
    ),
)]
pub struct ApiDoc;

/// Mount the four assignment routes under `base`.
///
/// The root uses an empty base; projects and forms pass their own prefix and
/// the handlers read `project_id` and `xml_form_id` from the captured path.
fn assignment_routes(router: Router<AppState>, base: &str) -> Router<AppState> {
    use handlers::assignments::*;

    router
        .route(&format!("{}/assignments", base), get(list_assignments))
        .route(
            &format!("{}/assignments/:role_id", base),
            get(list_assignments_by_role),
        )
        .route(
            &format!("{}/assignments/:role_id/:actor_id", base),
            post(grant_role).delete(revoke_role),
        )
}

/// Create the main API router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let mut api_v1 = Router::new()
        .route(
            "/projects/:project_id/assignments/forms",
            get(handlers::assignments::form_summaries),
        )
        .route(
            "/projects/:project_id/assignments/forms/:role_id",
            get(handlers::assignments::form_summaries_for_role),
        )
        .route("/health", get(handlers::health::health_check));

    for base in ["", "/projects/:project_id", "/projects/:project_id/forms/:xml_form_id"] {
        api_v1 = assignment_routes(api_v1, base);
    }

    let api_v1 = api_v1
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_hooks::request_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_hooks::response_middleware,
        ));

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(SwaggerUi::new("/api/v1/swagger").url("/api/v1/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
