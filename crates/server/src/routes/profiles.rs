use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Extension, Json,
};
use models::profile;
use serde::Serialize;
use service::{
    profile::{
        completion::CompletionReport,
        domain::{CreateProfileInput, UpdateProfileInput},
    },
    storage::StoredFile,
    Actor,
};
use uuid::Uuid;

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Serialize)]
pub struct AvatarOutput {
    pub profile: profile::Model,
    pub file: StoredFile,
}

#[utoipa::path(post, path = "/profiles", tag = "profiles", request_body = crate::openapi::ProfileRequest, responses((status = 201, description = "Created"), (status = 400, description = "Invalid or duplicate profile")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Json(input): Json<CreateProfileInput>,
) -> Result<(StatusCode, Json<profile::Model>), JsonApiError> {
    let p = state.profiles.create_profile(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(p)))
}

#[utoipa::path(get, path = "/profiles/me", tag = "profiles", responses((status = 200, description = "Own profile"), (status = 404, description = "No profile yet")))]
pub async fn get_own(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<profile::Model>, JsonApiError> {
    Ok(Json(state.profiles.get_own_profile(&actor).await?))
}

#[utoipa::path(get, path = "/profiles/me/completion", tag = "profiles", responses((status = 200, description = "Completion report")))]
pub async fn completion(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<CompletionReport>, JsonApiError> {
    Ok(Json(state.profiles.completion(&actor).await?))
}

/// Raw image body; the `Content-Type` header picks the file extension.
#[utoipa::path(post, path = "/profiles/me/avatar", tag = "profiles", request_body(content = String, description = "Raw image bytes (png, jpeg, webp or gif)", content_type = "application/octet-stream"), responses((status = 201, description = "Avatar stored"), (status = 400, description = "Unsupported type or too large")))]
pub async fn upload_avatar(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<AvatarOutput>), JsonApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| JsonApiError::bad_request("Content-Type header is required"))?;
    let (profile, file) = state.profiles.upload_avatar(&actor, &body, content_type).await?;
    Ok((StatusCode::CREATED, Json(AvatarOutput { profile, file })))
}

#[utoipa::path(get, path = "/profiles/{user_id}", tag = "profiles", params(("user_id" = Uuid, Path, description = "Owner user id")), responses((status = 200, description = "OK"), (status = 404, description = "Not Found or private")))]
pub async fn get(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<profile::Model>, JsonApiError> {
    Ok(Json(state.profiles.get_profile(&actor, user_id).await?))
}

#[utoipa::path(put, path = "/profiles/{user_id}", tag = "profiles", params(("user_id" = Uuid, Path, description = "Owner user id")), request_body = crate::openapi::ProfileRequest, responses((status = 200, description = "Updated"), (status = 403, description = "Forbidden")))]
pub async fn update(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<Uuid>,
    Json(patch): Json<UpdateProfileInput>,
) -> Result<Json<profile::Model>, JsonApiError> {
    Ok(Json(state.profiles.update_profile(&actor, user_id, patch).await?))
}

#[utoipa::path(delete, path = "/profiles/{user_id}", tag = "profiles", params(("user_id" = Uuid, Path, description = "Owner user id")), responses((status = 204, description = "Deleted"), (status = 403, description = "Forbidden")))]
pub async fn delete(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    state.profiles.delete_profile(&actor, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
