//! Inputs and views of the budget service.

use chrono::NaiveDate;
use models::{
    budget::{self, BudgetStatus, BudgetType},
    milestone::{self, MilestoneStatus},
    payment::{self, PaymentStatus},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metrics::BudgetMetrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub percentage: Option<Decimal>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBudgetInput {
    pub job_id: Uuid,
    pub budget_type: BudgetType,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub hourly_rate: Option<Decimal>,
    #[serde(default)]
    pub estimated_hours: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub milestones: Vec<MilestoneInput>,
}

/// Partial update; absent fields stay as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBudgetInput {
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub estimated_hours: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMilestoneInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatusInput {
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneStatusInput {
    pub status: MilestoneStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPaymentInput {
    pub milestone_id: Uuid,
    pub amount: Decimal,
    /// Defaults to the budget currency.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusInput {
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetListQuery {
    pub status: Option<BudgetStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetDetails {
    pub budget: budget::Model,
    pub milestones: Vec<milestone::Model>,
    pub payments: Vec<payment::Model>,
    pub metrics: BudgetMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payment: payment::Model,
    pub budget_status: String,
    pub metrics: BudgetMetrics,
}
