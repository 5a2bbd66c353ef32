use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use models::exchange_rate;
use rust_decimal::Decimal;
use serde::Deserialize;
use service::{
    budget::{
        currency::{ConversionResult, ExchangeRateInput},
        validator::{validate_currency, Currency, CurrencyValidation, SUPPORTED_CURRENCIES},
    },
    Actor,
};

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub amount: Decimal,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RatesQuery {
    #[serde(default)]
    pub active_only: Option<bool>,
}

#[utoipa::path(get, path = "/currencies", tag = "currencies", responses((status = 200, description = "Supported currencies")))]
pub async fn list() -> Json<&'static [Currency]> {
    Json(SUPPORTED_CURRENCIES)
}

#[utoipa::path(get, path = "/currencies/{code}/validate", tag = "currencies", params(("code" = String, Path, description = "ISO 4217 code")), responses((status = 200, description = "Validation result")))]
pub async fn validate(Path(code): Path<String>) -> Json<CurrencyValidation> {
    Json(validate_currency(&code))
}

#[utoipa::path(get, path = "/currencies/convert", tag = "currencies", params(("amount" = String, Query, description = "Decimal amount"), ("from" = String, Query, description = "Source currency"), ("to" = String, Query, description = "Target currency")), responses((status = 200, description = "Converted amount"), (status = 400, description = "Unsupported currency or missing rate")))]
pub async fn convert(
    State(state): State<ServerState>,
    Query(q): Query<ConvertQuery>,
) -> Result<Json<ConversionResult>, JsonApiError> {
    Ok(Json(state.currency.convert(q.amount, &q.from, &q.to).await?))
}

#[utoipa::path(get, path = "/exchange-rates", tag = "currencies", params(("active_only" = Option<bool>, Query, description = "Only active rates")), responses((status = 200, description = "Stored rates")))]
pub async fn list_rates(
    State(state): State<ServerState>,
    Query(q): Query<RatesQuery>,
) -> Result<Json<Vec<exchange_rate::Model>>, JsonApiError> {
    Ok(Json(state.currency.list_exchange_rates(q.active_only.unwrap_or(true)).await?))
}

#[utoipa::path(post, path = "/exchange-rates", tag = "currencies", request_body = crate::openapi::ExchangeRateRequest, responses((status = 201, description = "Rate stored"), (status = 403, description = "Admins only")))]
pub async fn upsert_rate(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    Json(input): Json<ExchangeRateInput>,
) -> Result<(StatusCode, Json<exchange_rate::Model>), JsonApiError> {
    let rate = state.currency.update_exchange_rate(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(rate)))
}
