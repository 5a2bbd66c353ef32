use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use service::storage::content_type_for;

use crate::errors::JsonApiError;
use crate::state::ServerState;

/// Serves objects written by the local storage backend under its public base URL.
pub async fn serve(
    State(state): State<ServerState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, JsonApiError> {
    let bytes = state.storage.read(&key).await.map_err(service::ServiceError::from)?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&key))], bytes))
}
