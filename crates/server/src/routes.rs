use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::types::Health;

use crate::openapi::ApiDoc;
use crate::state::ServerState;

pub mod auth;
pub mod budgets;
pub mod currencies;
pub mod files;
pub mod jobs;
pub mod payments;
pub mod profiles;
pub mod search;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router: public routes, the authenticated API and
/// the shared CORS and trace layers.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    // Avatar uploads are raw bodies; leave headroom over the storage limit so
    // oversize files reach the service and get a proper 400.
    let upload_limit = state.max_upload_bytes.saturating_add(64 * 1024);

    let public = Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/files/*key", get(files::serve));

    let api = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/jobs", post(jobs::create).get(jobs::list))
        .route("/jobs/:id", get(jobs::get))
        .route("/jobs/:id/developer", put(jobs::assign_developer))
        .route("/jobs/:id/budget", get(budgets::get_for_job))
        .route("/budgets", post(budgets::create).get(budgets::list))
        .route("/budgets/:id", get(budgets::get).put(budgets::update).delete(budgets::delete))
        .route("/budgets/:id/status", put(budgets::update_status))
        .route("/budgets/:id/metrics", get(budgets::metrics))
        .route("/budgets/:id/milestones", post(budgets::add_milestone))
        .route("/budgets/:id/payments", get(payments::list_for_budget))
        .route("/milestones/:id", put(budgets::update_milestone).delete(budgets::delete_milestone))
        .route("/milestones/:id/status", put(budgets::update_milestone_status))
        .route("/payments", post(payments::process))
        .route("/payments/:id/status", put(payments::update_status))
        .route("/currencies", get(currencies::list))
        .route("/currencies/convert", get(currencies::convert))
        .route("/currencies/:code/validate", get(currencies::validate))
        .route("/exchange-rates", get(currencies::list_rates).post(currencies::upsert_rate))
        .route("/profiles", post(profiles::create))
        .route("/profiles/me", get(profiles::get_own))
        .route("/profiles/me/completion", get(profiles::completion))
        .route(
            "/profiles/me/avatar",
            post(profiles::upload_avatar).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/profiles/:user_id", get(profiles::get).put(profiles::update).delete(profiles::delete))
        .route("/search/profiles", get(search::profiles))
        .route("/search/recommendations", get(search::recommendations))
        .route("/search/trending", get(search::trending));

    public
        .merge(api)
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token_state))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
