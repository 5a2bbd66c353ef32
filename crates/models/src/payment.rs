use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{budget, errors, milestone};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub budget_id: Uuid,
    pub milestone_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub budget_amount: Decimal,
    pub status: String,
    pub payer_id: Uuid,
    pub payee_id: Option<Uuid>,
    #[sea_orm(unique)]
    pub reference: String,
    pub notes: Option<String>,
    pub processed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Budget, Milestone }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Budget => Entity::belongs_to(budget::Entity)
                .from(Column::BudgetId)
                .to(budget::Column::Id)
                .into(),
            Relation::Milestone => Entity::belongs_to(milestone::Entity)
                .from(Column::MilestoneId)
                .to(milestone::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn allowed_transitions(&self) -> &'static [PaymentStatus] {
        use PaymentStatus::*;
        match self {
            Pending => &[Processing, Cancelled],
            Processing => &[Completed, Failed, Cancelled],
            Completed => &[Refunded],
            Failed => &[Pending],
            Cancelled | Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Money that has left (or is about to leave) the budget.
    pub fn reserves_funds(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing | PaymentStatus::Completed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PaymentStatus {
    type Err = errors::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PROCESSING" => Ok(PaymentStatus::Processing),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "FAILED" => Ok(PaymentStatus::Failed),
            "CANCELLED" => Ok(PaymentStatus::Cancelled),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(errors::ModelError::Validation(format!("unknown payment status: {other}"))),
        }
    }
}

impl Model {
    pub fn status(&self) -> Result<PaymentStatus, errors::ModelError> { self.status.parse() }
}
