use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{errors, job};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budget")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[sea_orm(unique)]
    pub job_id: Uuid,
    pub budget_type: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub hourly_rate: Option<Decimal>,
    pub estimated_hours: Option<Decimal>,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Job }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Job => Entity::belongs_to(job::Entity)
                .from(Column::JobId)
                .to(job::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetType {
    Fixed,
    Hourly,
    Milestone,
    Hybrid,
}

impl BudgetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetType::Fixed => "FIXED",
            BudgetType::Hourly => "HOURLY",
            BudgetType::Milestone => "MILESTONE",
            BudgetType::Hybrid => "HYBRID",
        }
    }

    /// MILESTONE and HYBRID budgets must be split into at least one milestone.
    pub fn requires_milestones(&self) -> bool {
        matches!(self, BudgetType::Milestone | BudgetType::Hybrid)
    }
}

impl fmt::Display for BudgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for BudgetType {
    type Err = errors::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIXED" => Ok(BudgetType::Fixed),
            "HOURLY" => Ok(BudgetType::Hourly),
            "MILESTONE" => Ok(BudgetType::Milestone),
            "HYBRID" => Ok(BudgetType::Hybrid),
            other => Err(errors::ModelError::Validation(format!("unknown budget type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
    Draft,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Draft => "DRAFT",
            BudgetStatus::Active => "ACTIVE",
            BudgetStatus::OnHold => "ON_HOLD",
            BudgetStatus::Completed => "COMPLETED",
            BudgetStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn allowed_transitions(&self) -> &'static [BudgetStatus] {
        use BudgetStatus::*;
        match self {
            Draft => &[Active, Cancelled],
            Active => &[OnHold, Completed, Cancelled],
            OnHold => &[Active, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: BudgetStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// COMPLETED and CANCELLED budgets no longer accept edits.
    pub fn is_closed(&self) -> bool {
        matches!(self, BudgetStatus::Completed | BudgetStatus::Cancelled)
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for BudgetStatus {
    type Err = errors::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(BudgetStatus::Draft),
            "ACTIVE" => Ok(BudgetStatus::Active),
            "ON_HOLD" => Ok(BudgetStatus::OnHold),
            "COMPLETED" => Ok(BudgetStatus::Completed),
            "CANCELLED" => Ok(BudgetStatus::Cancelled),
            other => Err(errors::ModelError::Validation(format!("unknown budget status: {other}"))),
        }
    }
}

impl Model {
    pub fn status(&self) -> Result<BudgetStatus, errors::ModelError> { self.status.parse() }
    pub fn budget_type(&self) -> Result<BudgetType, errors::ModelError> { self.budget_type.parse() }
}
