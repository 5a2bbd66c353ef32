//! Derived budget figures; recomputed on read, never stored.

use models::{budget, milestone, milestone::MilestoneStatus, payment, payment::PaymentStatus};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetMetrics {
    pub total_paid: Decimal,
    pub pending_payments: Decimal,
    pub remaining: Decimal,
    pub utilization_percentage: Decimal,
    pub milestone_count: usize,
    pub completed_milestones: usize,
    pub completion_percentage: Decimal,
}

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (part / whole * Decimal::ONE_HUNDRED).round_dp(2)
}

fn status_of(p: &payment::Model) -> Option<PaymentStatus> { p.status().ok() }

/// Only COMPLETED payments count as paid; PENDING/PROCESSING are reported separately.
pub fn compute(budget: &budget::Model, milestones: &[milestone::Model], payments: &[payment::Model]) -> BudgetMetrics {
    let total_paid: Decimal = payments
        .iter()
        .filter(|p| status_of(p) == Some(PaymentStatus::Completed))
        .map(|p| p.budget_amount)
        .sum();
    let pending_payments: Decimal = payments
        .iter()
        .filter(|p| matches!(status_of(p), Some(PaymentStatus::Pending | PaymentStatus::Processing)))
        .map(|p| p.budget_amount)
        .sum();
    let completed_milestones = milestones
        .iter()
        .filter(|m| m.status().ok() == Some(MilestoneStatus::Completed))
        .count();

    BudgetMetrics {
        total_paid,
        pending_payments,
        remaining: budget.amount - total_paid,
        utilization_percentage: percent(total_paid, budget.amount),
        milestone_count: milestones.len(),
        completed_milestones,
        completion_percentage: percent(Decimal::from(completed_milestones as u64), Decimal::from(milestones.len() as u64)),
    }
}
