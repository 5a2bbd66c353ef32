use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use common::types::Page;
use models::{budget, milestone};
use service::{
    budget::{
        domain::{
            BudgetDetails, BudgetListQuery, BudgetStatusInput, CreateBudgetInput, MilestoneInput,
            MilestoneStatusInput, UpdateBudgetInput, UpdateMilestoneInput,
        },
        metrics::BudgetMetrics,
    },
    Actor,
};
use uuid::Uuid;

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[utoipa::path(post, path = "/budgets", tag = "budgets", request_body = crate::openapi::CreateBudgetRequest, responses((status = 201, description = "Budget with milestones and metrics"), (status = 400, description = "Validation failed or budget already exists"), (status = 403, description = "Only the job's client")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Json(input): Json<CreateBudgetInput>,
) -> Result<(StatusCode, Json<BudgetDetails>), JsonApiError> {
    let details = state.budgets.create_budget(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

#[utoipa::path(get, path = "/budgets", tag = "budgets", params(("status" = Option<String>, Query, description = "Filter by status"), ("page" = Option<u32>, Query, description = "1-based page"), ("per_page" = Option<u32>, Query, description = "Page size")), responses((status = 200, description = "Page of budgets")))]
pub async fn list(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<BudgetListQuery>,
) -> Result<Json<Page<budget::Model>>, JsonApiError> {
    Ok(Json(state.budgets.list_budgets(&actor, query).await?))
}

#[utoipa::path(get, path = "/budgets/{id}", tag = "budgets", params(("id" = Uuid, Path, description = "Budget id")), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn get(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<BudgetDetails>, JsonApiError> {
    Ok(Json(state.budgets.get_budget(&actor, id).await?))
}

#[utoipa::path(get, path = "/jobs/{id}/budget", tag = "budgets", params(("id" = Uuid, Path, description = "Job id")), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn get_for_job(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<BudgetDetails>, JsonApiError> {
    Ok(Json(state.budgets.get_budget_for_job(&actor, job_id).await?))
}

#[utoipa::path(put, path = "/budgets/{id}", tag = "budgets", params(("id" = Uuid, Path, description = "Budget id")), request_body = crate::openapi::UpdateBudgetRequest, responses((status = 200, description = "Updated"), (status = 400, description = "Bad Request"), (status = 403, description = "Forbidden")))]
pub async fn update(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateBudgetInput>,
) -> Result<Json<BudgetDetails>, JsonApiError> {
    Ok(Json(state.budgets.update_budget(&actor, id, patch).await?))
}

#[utoipa::path(put, path = "/budgets/{id}/status", tag = "budgets", params(("id" = Uuid, Path, description = "Budget id")), request_body = crate::openapi::StatusRequest, responses((status = 200, description = "Updated"), (status = 400, description = "Invalid transition")))]
pub async fn update_status(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(input): Json<BudgetStatusInput>,
) -> Result<Json<budget::Model>, JsonApiError> {
    Ok(Json(state.budgets.update_budget_status(&actor, id, input.status).await?))
}

#[utoipa::path(delete, path = "/budgets/{id}", tag = "budgets", params(("id" = Uuid, Path, description = "Budget id")), responses((status = 204, description = "Deleted"), (status = 400, description = "Budget has payments")))]
pub async fn delete(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    state.budgets.delete_budget(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/budgets/{id}/metrics", tag = "budgets", params(("id" = Uuid, Path, description = "Budget id")), responses((status = 200, description = "Derived metrics")))]
pub async fn metrics(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<BudgetMetrics>, JsonApiError> {
    Ok(Json(state.budgets.metrics(&actor, id).await?))
}

#[utoipa::path(post, path = "/budgets/{id}/milestones", tag = "milestones", params(("id" = Uuid, Path, description = "Budget id")), request_body = crate::openapi::MilestoneRequest, responses((status = 201, description = "Created"), (status = 400, description = "Bad Request")))]
pub async fn add_milestone(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(input): Json<MilestoneInput>,
) -> Result<(StatusCode, Json<milestone::Model>), JsonApiError> {
    let m = state.budgets.add_milestone(&actor, id, input).await?;
    Ok((StatusCode::CREATED, Json(m)))
}

#[utoipa::path(put, path = "/milestones/{id}", tag = "milestones", params(("id" = Uuid, Path, description = "Milestone id")), request_body = crate::openapi::MilestoneRequest, responses((status = 200, description = "Updated")))]
pub async fn update_milestone(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateMilestoneInput>,
) -> Result<Json<milestone::Model>, JsonApiError> {
    Ok(Json(state.budgets.update_milestone(&actor, id, patch).await?))
}

#[utoipa::path(delete, path = "/milestones/{id}", tag = "milestones", params(("id" = Uuid, Path, description = "Milestone id")), responses((status = 204, description = "Deleted")))]
pub async fn delete_milestone(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    state.budgets.delete_milestone(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(put, path = "/milestones/{id}/status", tag = "milestones", params(("id" = Uuid, Path, description = "Milestone id")), request_body = crate::openapi::MilestoneStatusRequest, responses((status = 200, description = "Updated"), (status = 400, description = "Invalid transition"), (status = 403, description = "Only the client may complete")))]
pub async fn update_milestone_status(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(input): Json<MilestoneStatusInput>,
) -> Result<Json<milestone::Model>, JsonApiError> {
    let m = state
        .budgets
        .update_milestone_status(&actor, id, input.status, input.notes)
        .await?;
    Ok(Json(m))
}
