//! Budgets, milestones and payments for jobs.

pub mod domain;
pub mod validator;
pub mod currency;
pub mod metrics;
pub mod service;

pub use currency::CurrencyService;
pub use service::BudgetService;
