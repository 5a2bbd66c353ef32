use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use models::payment;
use service::{
    budget::domain::{PaymentReceipt, PaymentStatusInput, ProcessPaymentInput},
    Actor,
};
use uuid::Uuid;

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[utoipa::path(post, path = "/payments", tag = "payments", request_body = crate::openapi::ProcessPaymentRequest, responses((status = 201, description = "Payment recorded"), (status = 400, description = "Milestone not completed, budget not active or amount too large"), (status = 403, description = "Only the job's client")))]
pub async fn process(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Json(input): Json<ProcessPaymentInput>,
) -> Result<(StatusCode, Json<PaymentReceipt>), JsonApiError> {
    let receipt = state.budgets.process_payment(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[utoipa::path(get, path = "/budgets/{id}/payments", tag = "payments", params(("id" = Uuid, Path, description = "Budget id")), responses((status = 200, description = "Payments, newest first")))]
pub async fn list_for_budget(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<Vec<payment::Model>>, JsonApiError> {
    Ok(Json(state.budgets.list_payments(&actor, budget_id).await?))
}

#[utoipa::path(put, path = "/payments/{id}/status", tag = "payments", params(("id" = Uuid, Path, description = "Payment id")), request_body = crate::openapi::StatusRequest, responses((status = 200, description = "Updated"), (status = 400, description = "Invalid transition")))]
pub async fn update_status(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(input): Json<PaymentStatusInput>,
) -> Result<Json<payment::Model>, JsonApiError> {
    Ok(Json(state.budgets.update_payment_status(&actor, id, input.status).await?))
}
