//! Process-local repository used by tests and the demo server.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use models::{budget, exchange_rate, job, milestone, payment, profile, tenant, user, user::UserRole};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::*;
use crate::auth::domain::{AuthUser, Credentials};
use crate::auth::errors::AuthError;

#[derive(Default)]
struct Tables {
    tenants: HashMap<Uuid, tenant::Model>,
    users: HashMap<Uuid, user::Model>,
    credentials: HashMap<Uuid, Credentials>,
    jobs: HashMap<Uuid, job::Model>,
    budgets: HashMap<Uuid, budget::Model>,
    milestones: HashMap<Uuid, milestone::Model>,
    payments: HashMap<Uuid, payment::Model>,
    rates: Vec<exchange_rate::Model>,
    profiles: HashMap<Uuid, profile::Model>,
}

#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self { Self::default() }

    /// Insert a user directly, bypassing registration. Handy for admin fixtures.
    pub async fn seed_user(&self, tenant_id: Uuid, email: &str, name: &str, role: UserRole) -> user::Model {
        let now = Utc::now().into();
        let model = user::Model {
            id: Uuid::new_v4(),
            tenant_id,
            email: email.trim().to_ascii_lowercase(),
            name: name.to_string(),
            role: role.as_str().to_string(),
            status: "active".into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.tables.write().await.users.insert(model.id, model.clone());
        model
    }
}

#[async_trait]
impl AuthRepository for InMemoryRepository {
    async fn find_user_by_tenant_email(&self, tenant_id: Uuid, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let t = self.tables.read().await;
        t.users
            .values()
            .find(|u| u.tenant_id == tenant_id && u.email == email && u.deleted_at.is_none())
            .cloned()
            .map(AuthUser::try_from)
            .transpose()
            .map_err(AuthError::from)
    }

    async fn find_auth_user(&self, user_id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let t = self.tables.read().await;
        t.users.get(&user_id).cloned().map(AuthUser::try_from).transpose().map_err(AuthError::from)
    }

    async fn create_user(&self, tenant_id: Uuid, email: &str, name: &str, role: UserRole) -> Result<AuthUser, AuthError> {
        if self.find_user_by_tenant_email(tenant_id, email).await?.is_some() {
            return Err(AuthError::Conflict);
        }
        let model = self.seed_user(tenant_id, email, name, role).await;
        Ok(AuthUser::try_from(model)?)
    }

    async fn ensure_tenant(&self, tenant_id: Uuid) -> Result<(), AuthError> {
        let mut t = self.tables.write().await;
        t.tenants.entry(tenant_id).or_insert_with(|| tenant::Model {
            id: tenant_id,
            name: format!("tenant-{}", tenant_id.simple()),
            created_at: Utc::now().into(),
        });
        Ok(())
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        Ok(self.tables.read().await.credentials.get(&user_id).cloned())
    }

    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        let c = Credentials { user_id, password_hash, password_algorithm };
        self.tables.write().await.credentials.insert(user_id, c.clone());
        Ok(c)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<user::Model>> {
        Ok(self.tables.read().await.users.get(&id).filter(|u| u.deleted_at.is_none()).cloned())
    }
}

#[async_trait]
impl JobRepository for InMemoryRepository {
    async fn insert_job(&self, job: job::Model) -> RepoResult<job::Model> {
        self.tables.write().await.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_job(&self, id: Uuid) -> RepoResult<Option<job::Model>> {
        Ok(self.tables.read().await.jobs.get(&id).cloned())
    }

    async fn list_jobs(&self, tenant_id: Uuid, filter: &JobFilter) -> RepoResult<Vec<job::Model>> {
        let t = self.tables.read().await;
        let mut jobs: Vec<_> = t
            .jobs
            .values()
            .filter(|j| j.tenant_id == tenant_id)
            .filter(|j| filter.client_id.map_or(true, |c| j.client_id == c))
            .filter(|j| filter.developer_id.map_or(true, |d| j.developer_id == Some(d)))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn update_job(&self, job: job::Model) -> RepoResult<job::Model> {
        let mut t = self.tables.write().await;
        if !t.jobs.contains_key(&job.id) {
            return Err(ServiceError::not_found("job"));
        }
        t.jobs.insert(job.id, job.clone());
        Ok(job)
    }
}

#[async_trait]
impl BudgetRepository for InMemoryRepository {
    async fn find_budget(&self, id: Uuid) -> RepoResult<Option<budget::Model>> {
        Ok(self.tables.read().await.budgets.get(&id).cloned())
    }

    async fn find_budget_by_job(&self, job_id: Uuid) -> RepoResult<Option<budget::Model>> {
        Ok(self.tables.read().await.budgets.values().find(|b| b.job_id == job_id).cloned())
    }

    async fn list_budgets(&self, filter: &BudgetFilter) -> RepoResult<Vec<budget::Model>> {
        let t = self.tables.read().await;
        let mut out: Vec<_> = t
            .budgets
            .values()
            .filter(|b| b.tenant_id == filter.tenant_id)
            .filter(|b| filter.job_ids.as_ref().map_or(true, |ids| ids.contains(&b.job_id)))
            .filter(|b| filter.status.as_ref().map_or(true, |s| &b.status == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn create_budget_with_milestones(
        &self,
        budget: budget::Model,
        milestones: Vec<milestone::Model>,
    ) -> RepoResult<(budget::Model, Vec<milestone::Model>)> {
        let mut t = self.tables.write().await;
        // mirrors the unique index on budget.job_id
        if t.budgets.values().any(|b| b.job_id == budget.job_id) {
            return Err(ServiceError::Validation("Budget already exists for this job".into()));
        }
        t.budgets.insert(budget.id, budget.clone());
        for m in &milestones {
            t.milestones.insert(m.id, m.clone());
        }
        Ok((budget, milestones))
    }

    async fn update_budget(&self, budget: budget::Model) -> RepoResult<budget::Model> {
        let mut t = self.tables.write().await;
        if !t.budgets.contains_key(&budget.id) {
            return Err(ServiceError::not_found("budget"));
        }
        t.budgets.insert(budget.id, budget.clone());
        Ok(budget)
    }

    async fn delete_budget(&self, id: Uuid) -> RepoResult<bool> {
        let mut t = self.tables.write().await;
        let existed = t.budgets.remove(&id).is_some();
        t.milestones.retain(|_, m| m.budget_id != id);
        t.payments.retain(|_, p| p.budget_id != id);
        Ok(existed)
    }

    async fn list_milestones(&self, budget_id: Uuid) -> RepoResult<Vec<milestone::Model>> {
        let t = self.tables.read().await;
        let mut out: Vec<_> = t.milestones.values().filter(|m| m.budget_id == budget_id).cloned().collect();
        out.sort_by_key(|m| (m.position, m.id));
        Ok(out)
    }

    async fn find_milestone(&self, id: Uuid) -> RepoResult<Option<milestone::Model>> {
        Ok(self.tables.read().await.milestones.get(&id).cloned())
    }

    async fn insert_milestone(&self, milestone: milestone::Model) -> RepoResult<milestone::Model> {
        self.tables.write().await.milestones.insert(milestone.id, milestone.clone());
        Ok(milestone)
    }

    async fn update_milestone(&self, milestone: milestone::Model) -> RepoResult<milestone::Model> {
        let mut t = self.tables.write().await;
        if !t.milestones.contains_key(&milestone.id) {
            return Err(ServiceError::not_found("milestone"));
        }
        t.milestones.insert(milestone.id, milestone.clone());
        Ok(milestone)
    }

    async fn delete_milestone(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.tables.write().await.milestones.remove(&id).is_some())
    }

    async fn list_payments(&self, budget_id: Uuid) -> RepoResult<Vec<payment::Model>> {
        let t = self.tables.read().await;
        let mut out: Vec<_> = t.payments.values().filter(|p| p.budget_id == budget_id).cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn find_payment(&self, id: Uuid) -> RepoResult<Option<payment::Model>> {
        Ok(self.tables.read().await.payments.get(&id).cloned())
    }

    async fn insert_payment(&self, payment: payment::Model) -> RepoResult<payment::Model> {
        self.tables.write().await.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn update_payment(&self, payment: payment::Model) -> RepoResult<payment::Model> {
        let mut t = self.tables.write().await;
        if !t.payments.contains_key(&payment.id) {
            return Err(ServiceError::not_found("payment"));
        }
        t.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }
}

#[async_trait]
impl ExchangeRateRepository for InMemoryRepository {
    async fn latest_rate(&self, from: &str, to: &str, now: DateTime<FixedOffset>) -> RepoResult<Option<exchange_rate::Model>> {
        let t = self.tables.read().await;
        Ok(t.rates
            .iter()
            .filter(|r| r.from_currency == from && r.to_currency == to && r.is_usable_at(now))
            .max_by_key(|r| (r.effective_date, r.created_at))
            .cloned())
    }

    async fn replace_rate(&self, rate: exchange_rate::Model) -> RepoResult<exchange_rate::Model> {
        let mut t = self.tables.write().await;
        for r in t.rates.iter_mut() {
            if r.from_currency == rate.from_currency && r.to_currency == rate.to_currency {
                r.is_active = false;
            }
        }
        t.rates.push(rate.clone());
        Ok(rate)
    }

    async fn list_rates(&self, active_only: bool) -> RepoResult<Vec<exchange_rate::Model>> {
        let t = self.tables.read().await;
        let mut out: Vec<_> = t.rates.iter().filter(|r| !active_only || r.is_active).cloned().collect();
        out.sort_by(|a, b| {
            (a.from_currency.as_str(), a.to_currency.as_str())
                .cmp(&(b.from_currency.as_str(), b.to_currency.as_str()))
                .then(b.effective_date.cmp(&a.effective_date))
        });
        Ok(out)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn find_profile_by_user(&self, user_id: Uuid) -> RepoResult<Option<profile::Model>> {
        Ok(self.tables.read().await.profiles.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn insert_profile(&self, profile: profile::Model) -> RepoResult<profile::Model> {
        let mut t = self.tables.write().await;
        if t.profiles.values().any(|p| p.user_id == profile.user_id) {
            return Err(ServiceError::Validation("Profile already exists".into()));
        }
        t.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn update_profile(&self, profile: profile::Model) -> RepoResult<profile::Model> {
        let mut t = self.tables.write().await;
        if !t.profiles.contains_key(&profile.id) {
            return Err(ServiceError::not_found("profile"));
        }
        t.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn delete_profile_by_user(&self, user_id: Uuid) -> RepoResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.profiles.len();
        t.profiles.retain(|_, p| p.user_id != user_id);
        Ok(t.profiles.len() != before)
    }

    async fn increment_view_count(&self, profile_id: Uuid) -> RepoResult<()> {
        if let Some(p) = self.tables.write().await.profiles.get_mut(&profile_id) {
            p.view_count += 1;
        }
        Ok(())
    }

    async fn search_profiles(&self, filter: &ProfileFilter) -> RepoResult<Vec<profile::Model>> {
        let t = self.tables.read().await;
        Ok(t.profiles.values().filter(|p| filter.matches(p)).cloned().collect())
    }
}
