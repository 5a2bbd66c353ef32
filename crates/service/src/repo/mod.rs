//! Persistence seams for the service layer.
//!
//! Each aggregate gets its own trait so services can be exercised against
//! [`InMemoryRepository`] in tests and [`SeaOrmRepository`] in production.
//! [`Repository`] bundles them for the HTTP state.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use models::{budget, exchange_rate, job, milestone, payment, profile, user};
use uuid::Uuid;

use crate::auth::repository::AuthRepository;
use crate::errors::ServiceError;
use crate::profile::search::ProfileFilter;

pub mod memory;
pub mod seaorm;

pub use memory::InMemoryRepository;
pub use seaorm::SeaOrmRepository;

pub type RepoResult<T> = Result<T, ServiceError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<user::Model>>;
}

/// Narrowing applied when listing jobs; `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub client_id: Option<Uuid>,
    pub developer_id: Option<Uuid>,
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert_job(&self, job: job::Model) -> RepoResult<job::Model>;
    async fn find_job(&self, id: Uuid) -> RepoResult<Option<job::Model>>;
    async fn list_jobs(&self, tenant_id: Uuid, filter: &JobFilter) -> RepoResult<Vec<job::Model>>;
    async fn update_job(&self, job: job::Model) -> RepoResult<job::Model>;
}

#[derive(Debug, Clone, Default)]
pub struct BudgetFilter {
    pub tenant_id: Uuid,
    /// Restrict to budgets of these jobs; `None` lists the whole tenant.
    pub job_ids: Option<Vec<Uuid>>,
    pub status: Option<String>,
}

#[async_trait]
pub trait BudgetRepository: Send + Sync {
    async fn find_budget(&self, id: Uuid) -> RepoResult<Option<budget::Model>>;
    async fn find_budget_by_job(&self, job_id: Uuid) -> RepoResult<Option<budget::Model>>;
    async fn list_budgets(&self, filter: &BudgetFilter) -> RepoResult<Vec<budget::Model>>;
    /// Persist a budget together with its milestones atomically.
    async fn create_budget_with_milestones(
        &self,
        budget: budget::Model,
        milestones: Vec<milestone::Model>,
    ) -> RepoResult<(budget::Model, Vec<milestone::Model>)>;
    async fn update_budget(&self, budget: budget::Model) -> RepoResult<budget::Model>;
    /// Removes the budget with its milestones and payments.
    async fn delete_budget(&self, id: Uuid) -> RepoResult<bool>;

    /// Milestones of a budget ordered by position.
    async fn list_milestones(&self, budget_id: Uuid) -> RepoResult<Vec<milestone::Model>>;
    async fn find_milestone(&self, id: Uuid) -> RepoResult<Option<milestone::Model>>;
    async fn insert_milestone(&self, milestone: milestone::Model) -> RepoResult<milestone::Model>;
    async fn update_milestone(&self, milestone: milestone::Model) -> RepoResult<milestone::Model>;
    async fn delete_milestone(&self, id: Uuid) -> RepoResult<bool>;

    /// Payments of a budget, oldest first.
    async fn list_payments(&self, budget_id: Uuid) -> RepoResult<Vec<payment::Model>>;
    async fn find_payment(&self, id: Uuid) -> RepoResult<Option<payment::Model>>;
    async fn insert_payment(&self, payment: payment::Model) -> RepoResult<payment::Model>;
    async fn update_payment(&self, payment: payment::Model) -> RepoResult<payment::Model>;
}

#[async_trait]
pub trait ExchangeRateRepository: Send + Sync {
    /// Most recent row for the pair that is usable at `now`.
    async fn latest_rate(&self, from: &str, to: &str, now: DateTime<FixedOffset>) -> RepoResult<Option<exchange_rate::Model>>;
    /// Deactivate every active row of the pair and insert `rate` as the new active one.
    async fn replace_rate(&self, rate: exchange_rate::Model) -> RepoResult<exchange_rate::Model>;
    async fn list_rates(&self, active_only: bool) -> RepoResult<Vec<exchange_rate::Model>>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile_by_user(&self, user_id: Uuid) -> RepoResult<Option<profile::Model>>;
    async fn insert_profile(&self, profile: profile::Model) -> RepoResult<profile::Model>;
    async fn update_profile(&self, profile: profile::Model) -> RepoResult<profile::Model>;
    async fn delete_profile_by_user(&self, user_id: Uuid) -> RepoResult<bool>;
    async fn increment_view_count(&self, profile_id: Uuid) -> RepoResult<()>;
    /// Profiles matching `filter`; ordering is left to the caller.
    async fn search_profiles(&self, filter: &ProfileFilter) -> RepoResult<Vec<profile::Model>>;
}

/// Everything the HTTP layer needs from one backing store.
pub trait Repository:
    AuthRepository + UserRepository + JobRepository + BudgetRepository + ExchangeRateRepository + ProfileRepository
{
}

impl<T> Repository for T where
    T: AuthRepository + UserRepository + JobRepository + BudgetRepository + ExchangeRateRepository + ProfileRepository
{
}
