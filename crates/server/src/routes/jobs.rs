use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use models::job;
use service::{
    job::{AssignDeveloperInput, CreateJobInput},
    Actor,
};
use uuid::Uuid;

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[utoipa::path(post, path = "/jobs", tag = "jobs", request_body = crate::openapi::CreateJobRequest, responses((status = 201, description = "Created"), (status = 403, description = "Clients only")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Json(input): Json<CreateJobInput>,
) -> Result<(StatusCode, Json<job::Model>), JsonApiError> {
    let job = state.jobs.create_job(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[utoipa::path(get, path = "/jobs", tag = "jobs", responses((status = 200, description = "Jobs visible to the caller")))]
pub async fn list(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<job::Model>>, JsonApiError> {
    Ok(Json(state.jobs.list_jobs(&actor).await?))
}

#[utoipa::path(get, path = "/jobs/{id}", tag = "jobs", params(("id" = Uuid, Path, description = "Job id")), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn get(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<job::Model>, JsonApiError> {
    Ok(Json(state.jobs.get_job(&actor, id).await?))
}

#[utoipa::path(put, path = "/jobs/{id}/developer", tag = "jobs", params(("id" = Uuid, Path, description = "Job id")), request_body = crate::openapi::AssignDeveloperRequest, responses((status = 200, description = "Assigned"), (status = 400, description = "Bad Request"), (status = 403, description = "Forbidden")))]
pub async fn assign_developer(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(input): Json<AssignDeveloperInput>,
) -> Result<Json<job::Model>, JsonApiError> {
    Ok(Json(state.jobs.assign_developer(&actor, id, input.developer_id).await?))
}
