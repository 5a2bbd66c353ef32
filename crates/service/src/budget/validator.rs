//! Stateless budget rules.
//!
//! Hard failures land in [`ValidationReport::errors`]; inconsistencies that
//! clients are allowed to plan around (milestone totals that do not add up)
//! land in `warnings` and are only logged by callers.

use chrono::NaiveDate;
use models::budget::BudgetType;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::domain::{CreateBudgetInput, MilestoneInput};

pub const MAX_BUDGET_AMOUNT: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);
pub const MAX_MILESTONES: usize = 50;
/// Allowed drift between milestone totals and the budget, in currency units / percent points.
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Currency {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimal_places: u32,
}

impl Currency {
    /// Round half away from zero to this currency's minor unit.
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.decimal_places, RoundingStrategy::MidpointAwayFromZero)
    }
}

pub const SUPPORTED_CURRENCIES: &[Currency] = &[
    Currency { code: "USD", name: "US Dollar", symbol: "$", decimal_places: 2 },
    Currency { code: "EUR", name: "Euro", symbol: "€", decimal_places: 2 },
    Currency { code: "GBP", name: "British Pound", symbol: "£", decimal_places: 2 },
    Currency { code: "JPY", name: "Japanese Yen", symbol: "¥", decimal_places: 0 },
    Currency { code: "CAD", name: "Canadian Dollar", symbol: "C$", decimal_places: 2 },
    Currency { code: "AUD", name: "Australian Dollar", symbol: "A$", decimal_places: 2 },
    Currency { code: "CHF", name: "Swiss Franc", symbol: "CHF", decimal_places: 2 },
    Currency { code: "CNY", name: "Chinese Yuan", symbol: "¥", decimal_places: 2 },
    Currency { code: "INR", name: "Indian Rupee", symbol: "₹", decimal_places: 2 },
    Currency { code: "BRL", name: "Brazilian Real", symbol: "R$", decimal_places: 2 },
];

pub fn find_currency(code: &str) -> Option<&'static Currency> {
    let code = code.trim().to_ascii_uppercase();
    SUPPORTED_CURRENCIES.iter().find(|c| c.code == code)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyValidation {
    pub is_valid: bool,
    pub currency: Option<Currency>,
    pub error: Option<String>,
}

pub fn validate_currency(code: &str) -> CurrencyValidation {
    match find_currency(code) {
        Some(c) => CurrencyValidation { is_valid: true, currency: Some(*c), error: None },
        None => CurrencyValidation {
            is_valid: false,
            currency: None,
            error: Some(format!("Unsupported currency: {}", code.trim())),
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool { self.errors.is_empty() }

    fn error(&mut self, msg: impl Into<String>) { self.errors.push(msg.into()) }

    fn warn(&mut self, msg: impl Into<String>) { self.warnings.push(msg.into()) }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

pub fn validate_amount(amount: Decimal, currency: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    if amount <= Decimal::ZERO {
        report.error("Amount must be greater than zero");
    }
    if amount > MAX_BUDGET_AMOUNT {
        report.error(format!("Amount must not exceed {MAX_BUDGET_AMOUNT}"));
    }
    match find_currency(currency) {
        Some(c) if amount.normalize().scale() > c.decimal_places => {
            report.error(format!("{} amounts allow at most {} decimal places", c.code, c.decimal_places));
        }
        Some(_) => {}
        None => report.error(format!("Unsupported currency: {}", currency.trim())),
    }
    report
}

pub fn validate_budget(input: &CreateBudgetInput) -> ValidationReport {
    let mut report = validate_amount(input.amount, &input.currency);

    match input.budget_type {
        BudgetType::Hourly => match (input.hourly_rate, input.estimated_hours) {
            (Some(rate), Some(hours)) if rate > Decimal::ZERO && hours > Decimal::ZERO => {
                if (rate * hours - input.amount).abs() > TOLERANCE {
                    report.warn(format!(
                        "hourly rate {rate} x {hours} hours = {} differs from budget amount {}",
                        rate * hours,
                        input.amount
                    ));
                }
            }
            _ => report.error("Hourly budgets require a positive hourly rate and estimated hours"),
        },
        t if t.requires_milestones() && input.milestones.is_empty() => {
            report.error(format!("{t} budgets require at least one milestone"));
        }
        _ => {}
    }

    if !input.milestones.is_empty() {
        report.merge(validate_milestones(&input.milestones, input.amount));
    }
    report
}

/// Check a milestone plan against the budget amount it splits.
pub fn validate_milestones(milestones: &[MilestoneInput], budget_amount: Decimal) -> ValidationReport {
    let mut report = ValidationReport::default();
    if milestones.len() > MAX_MILESTONES {
        report.error(format!("A budget may have at most {MAX_MILESTONES} milestones"));
    }

    let hundred = Decimal::ONE_HUNDRED;
    let mut amount_total = Decimal::ZERO;
    let mut percentage_total = Decimal::ZERO;
    for (i, m) in milestones.iter().enumerate() {
        let n = i + 1;
        report.merge(validate_milestone(n, m));

        if budget_amount <= Decimal::ZERO {
            continue;
        }
        let amount = m.amount.or_else(|| m.percentage.map(|p| budget_amount * p / hundred));
        let percentage = m.percentage.or_else(|| m.amount.map(|a| a / budget_amount * hundred));
        amount_total += amount.unwrap_or_default();
        percentage_total += percentage.unwrap_or_default();

        if let (Some(a), Some(p)) = (m.amount, m.percentage) {
            let implied = budget_amount * p / hundred;
            if (a - implied).abs() > TOLERANCE {
                report.warn(format!("milestone {n}: amount {a} does not match {p}% of {budget_amount}"));
            }
        }
    }

    if !milestones.is_empty() && budget_amount > Decimal::ZERO {
        if (amount_total - budget_amount).abs() > TOLERANCE {
            report.warn(format!("milestone amounts total {amount_total} but the budget is {budget_amount}"));
        }
        if (percentage_total - hundred).abs() > TOLERANCE {
            report.warn(format!("milestone percentages total {}%", percentage_total.round_dp(2)));
        }
    }
    report
}

/// Field-level checks for a single milestone; `n` is its 1-based position.
pub fn validate_milestone(n: usize, m: &MilestoneInput) -> ValidationReport {
    let mut report = ValidationReport::default();
    if m.title.trim().is_empty() {
        report.error(format!("milestone {n}: title is required"));
    }
    match (m.amount, m.percentage) {
        (None, None) => report.error(format!("milestone {n}: amount or percentage is required")),
        (amount, percentage) => {
            if amount.is_some_and(|a| a <= Decimal::ZERO) {
                report.error(format!("milestone {n}: amount must be greater than zero"));
            }
            if percentage.is_some_and(|p| p <= Decimal::ZERO || p > Decimal::ONE_HUNDRED) {
                report.error(format!("milestone {n}: percentage must be greater than 0 and at most 100"));
            }
        }
    }
    report
}

/// Reject due dates in the past relative to `today`.
pub fn validate_due_date(n: usize, due: Option<NaiveDate>, today: NaiveDate) -> ValidationReport {
    let mut report = ValidationReport::default();
    if due.is_some_and(|d| d < today) {
        report.warn(format!("milestone {n}: due date is in the past"));
    }
    report
}
