//! Currency conversion over stored exchange rates.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use models::exchange_rate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::validator::{find_currency, Currency, MAX_BUDGET_AMOUNT};
use crate::actor::Actor;
use crate::errors::ServiceError;
use crate::repo::Repository;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub original_amount: Decimal,
    pub converted_amount: Decimal,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    /// `None` for same-currency conversions.
    pub rate_effective_date: Option<DateTime<FixedOffset>>,
    pub inverse: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateInput {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    #[serde(default)]
    pub effective_date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<FixedOffset>>,
}

/// Admin-entered rates outside this band are rejected so inverses stay representable.
pub const MIN_EXCHANGE_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 6);
pub const MAX_EXCHANGE_RATE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

fn supported(code: &str) -> Result<&'static Currency, ServiceError> {
    find_currency(code).ok_or_else(|| ServiceError::Validation(format!("Unsupported currency: {}", code.trim())))
}

pub struct CurrencyService {
    repo: Arc<dyn Repository>,
}

impl CurrencyService {
    pub fn new(repo: Arc<dyn Repository>) -> Self { Self { repo } }

    pub async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<ConversionResult, ServiceError> {
        self.convert_at(amount, from, to, Utc::now().into()).await
    }

    /// Direct rate first, then the inverse of the reverse pair. No chaining through a third currency.
    #[instrument(skip(self), fields(%amount))]
    pub async fn convert_at(&self, amount: Decimal, from: &str, to: &str, now: DateTime<FixedOffset>) -> Result<ConversionResult, ServiceError> {
        let source = supported(from)?;
        let target = supported(to)?;
        if amount <= Decimal::ZERO {
            return Err(ServiceError::Validation("Amount must be greater than zero".into()));
        }
        if amount > MAX_BUDGET_AMOUNT {
            return Err(ServiceError::Validation(format!("Amount must not exceed {MAX_BUDGET_AMOUNT}")));
        }
        if source.code == target.code {
            return Ok(ConversionResult {
                original_amount: amount,
                converted_amount: amount,
                from_currency: source.code.to_string(),
                to_currency: target.code.to_string(),
                rate: Decimal::ONE,
                rate_effective_date: None,
                inverse: false,
            });
        }

        let (rate, effective, inverse) = if let Some(direct) = self.repo.latest_rate(source.code, target.code, now).await? {
            (direct.rate, direct.effective_date, false)
        } else if let Some(reverse) = self.repo.latest_rate(target.code, source.code, now).await? {
            if reverse.rate.is_zero() {
                return Err(ServiceError::Validation("Exchange rate not available".into()));
            }
            let inverted = Decimal::ONE.checked_div(reverse.rate).ok_or_else(|| ServiceError::Validation("Exchange rate not available".into()))?;
            (inverted.round_dp(10), reverse.effective_date, true)
        } else {
            return Err(ServiceError::Validation("Exchange rate not available".into()));
        };

        let converted = amount
            .checked_mul(rate)
            .map(|v| target.round(v))
            .ok_or_else(|| ServiceError::Validation("Converted amount is out of range".into()))?;

        Ok(ConversionResult {
            original_amount: amount,
            converted_amount: converted,
            from_currency: source.code.to_string(),
            to_currency: target.code.to_string(),
            rate,
            rate_effective_date: Some(effective),
            inverse,
        })
    }

    #[instrument(skip(self, input), fields(actor = %actor.user_id))]
    pub async fn update_exchange_rate(&self, actor: &Actor, input: ExchangeRateInput) -> Result<exchange_rate::Model, ServiceError> {
        actor.require_admin()?;
        let from = supported(&input.from_currency)?;
        let to = supported(&input.to_currency)?;
        if from.code == to.code {
            return Err(ServiceError::Validation("Exchange rate currencies must differ".into()));
        }
        if input.rate <= Decimal::ZERO {
            return Err(ServiceError::Validation("Exchange rate must be greater than zero".into()));
        }
        if input.rate < MIN_EXCHANGE_RATE || input.rate > MAX_EXCHANGE_RATE {
            return Err(ServiceError::Validation(format!("Exchange rate must be between {MIN_EXCHANGE_RATE} and {MAX_EXCHANGE_RATE}")));
        }
        let now: DateTime<FixedOffset> = Utc::now().into();
        let effective = input.effective_date.unwrap_or(now);
        if input.expiry_date.is_some_and(|exp| exp <= effective) {
            return Err(ServiceError::Validation("Expiry date must be after the effective date".into()));
        }
        let saved = self
            .repo
            .replace_rate(exchange_rate::Model {
                id: Uuid::new_v4(),
                from_currency: from.code.to_string(),
                to_currency: to.code.to_string(),
                rate: input.rate,
                effective_date: effective,
                expiry_date: input.expiry_date,
                is_active: true,
                created_at: now,
            })
            .await?;
        info!(from = from.code, to = to.code, rate = %saved.rate, "exchange_rate_updated");
        Ok(saved)
    }

    pub async fn list_exchange_rates(&self, active_only: bool) -> Result<Vec<exchange_rate::Model>, ServiceError> {
        self.repo.list_rates(active_only).await
    }
}
