use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use models::{
    budget::{self, BudgetStatus, BudgetType},
    job,
    milestone::{self, MilestoneStatus},
    payment::{self, PaymentStatus},
};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::currency::CurrencyService;
use super::domain::*;
use super::metrics::{self, BudgetMetrics};
use super::validator::{self, find_currency, ValidationReport};
use crate::actor::Actor;
use crate::errors::ServiceError;
use crate::notification::{dispatch, NotificationEvent, Notifier};
use crate::pagination::Pagination;
use crate::repo::{BudgetFilter, JobFilter, Repository};
use common::types::Page;

/// Budget, milestone and payment workflows for jobs.
pub struct BudgetService {
    repo: Arc<dyn Repository>,
    currency: Arc<CurrencyService>,
    notifier: Arc<dyn Notifier>,
}

fn now() -> DateTime<FixedOffset> { Utc::now().into() }

fn into_result(report: ValidationReport, context: &str) -> Result<(), ServiceError> {
    for w in &report.warnings {
        warn!(%context, warning = %w, "budget_validation_warning");
    }
    if report.is_valid() {
        Ok(())
    } else {
        Err(ServiceError::Validation(report.errors.join("; ")))
    }
}

/// Amount and percentage of a milestone, deriving whichever one is missing.
fn resolve_split(
    amount: Option<Decimal>,
    percentage: Option<Decimal>,
    budget_amount: Decimal,
    currency: &validator::Currency,
) -> (Decimal, Decimal) {
    let hundred = Decimal::ONE_HUNDRED;
    match (amount, percentage) {
        (Some(a), Some(p)) => (a, p),
        (Some(a), None) if budget_amount > Decimal::ZERO => (a, (a / budget_amount * hundred).round_dp(2)),
        (Some(a), None) => (a, Decimal::ZERO),
        (None, Some(p)) => (currency.round(budget_amount * p / hundred), p),
        (None, None) => (Decimal::ZERO, Decimal::ZERO),
    }
}

fn milestone_inputs(milestones: &[milestone::Model]) -> Vec<MilestoneInput> {
    milestones
        .iter()
        .map(|m| MilestoneInput {
            title: m.title.clone(),
            description: m.description.clone(),
            amount: Some(m.amount),
            percentage: Some(m.percentage),
            due_date: m.due_date,
        })
        .collect()
}

fn clean(text: Option<String>) -> Option<String> {
    text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl BudgetService {
    pub fn new(repo: Arc<dyn Repository>, currency: Arc<CurrencyService>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repo, currency, notifier }
    }

    async fn load_job(&self, actor: &Actor, job_id: Uuid) -> Result<job::Model, ServiceError> {
        let job = self.repo.find_job(job_id).await?.ok_or_else(|| ServiceError::not_found("job"))?;
        actor.ensure_tenant(job.tenant_id, "job")?;
        Ok(job)
    }

    async fn load_budget(&self, actor: &Actor, budget_id: Uuid) -> Result<(budget::Model, job::Model), ServiceError> {
        let budget = self.repo.find_budget(budget_id).await?.ok_or_else(|| ServiceError::not_found("budget"))?;
        actor.ensure_tenant(budget.tenant_id, "budget")?;
        let job = self.load_job(actor, budget.job_id).await?;
        Ok((budget, job))
    }

    async fn load_milestone(&self, actor: &Actor, milestone_id: Uuid) -> Result<(milestone::Model, budget::Model, job::Model), ServiceError> {
        let m = self.repo.find_milestone(milestone_id).await?.ok_or_else(|| ServiceError::not_found("milestone"))?;
        let (budget, job) = self.load_budget(actor, m.budget_id).await.map_err(|e| match e {
            ServiceError::NotFound(_) => ServiceError::not_found("milestone"),
            other => other,
        })?;
        Ok((m, budget, job))
    }

    fn can_manage(actor: &Actor, job: &job::Model) -> bool { actor.is_admin() || job.client_id == actor.user_id }

    fn require_manage(actor: &Actor, job: &job::Model) -> Result<(), ServiceError> {
        if Self::can_manage(actor, job) {
            Ok(())
        } else {
            Err(ServiceError::forbidden("only the job's client or an admin can manage its budget"))
        }
    }

    fn require_view(actor: &Actor, job: &job::Model) -> Result<(), ServiceError> {
        if actor.is_admin() || job.is_participant(actor.user_id) {
            Ok(())
        } else {
            Err(ServiceError::forbidden("not a participant of this job"))
        }
    }

    fn require_open(budget: &budget::Model) -> Result<BudgetStatus, ServiceError> {
        let status = budget.status()?;
        if status.is_closed() {
            return Err(ServiceError::Validation(format!("Budget is {status} and can no longer be changed")));
        }
        Ok(status)
    }

    async fn details(&self, budget: budget::Model) -> Result<BudgetDetails, ServiceError> {
        let milestones = self.repo.list_milestones(budget.id).await?;
        let payments = self.repo.list_payments(budget.id).await?;
        let metrics = metrics::compute(&budget, &milestones, &payments);
        Ok(BudgetDetails { budget, milestones, payments, metrics })
    }

    /// Re-check the stored milestone plan after a change; only warnings are possible here.
    async fn revalidate_plan(&self, budget: &budget::Model) -> Result<(), ServiceError> {
        let milestones = self.repo.list_milestones(budget.id).await?;
        let live: Vec<_> = milestones
            .into_iter()
            .filter(|m| m.status().ok() != Some(MilestoneStatus::Cancelled))
            .collect();
        let report = validator::validate_milestones(&milestone_inputs(&live), budget.amount);
        for w in &report.warnings {
            warn!(budget_id = %budget.id, warning = %w, "milestone_plan_warning");
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(actor = %actor.user_id, job_id = %input.job_id))]
    pub async fn create_budget(&self, actor: &Actor, input: CreateBudgetInput) -> Result<BudgetDetails, ServiceError> {
        let job = self.load_job(actor, input.job_id).await?;
        Self::require_manage(actor, &job)?;
        if self.repo.find_budget_by_job(job.id).await?.is_some() {
            return Err(ServiceError::Validation("Budget already exists for this job".into()));
        }

        let mut report = validator::validate_budget(&input);
        let today = Utc::now().date_naive();
        for (i, m) in input.milestones.iter().enumerate() {
            report.merge(validator::validate_due_date(i + 1, m.due_date, today));
        }
        into_result(report, "create_budget")?;
        let currency = find_currency(&input.currency)
            .ok_or_else(|| ServiceError::Validation(format!("Unsupported currency: {}", input.currency)))?;

        let ts = now();
        let budget = budget::Model {
            id: Uuid::new_v4(),
            tenant_id: job.tenant_id,
            job_id: job.id,
            budget_type: input.budget_type.as_str().to_string(),
            amount: input.amount,
            currency: currency.code.to_string(),
            status: BudgetStatus::Draft.as_str().to_string(),
            hourly_rate: input.hourly_rate,
            estimated_hours: input.estimated_hours,
            description: clean(input.description),
            created_by: actor.user_id,
            created_at: ts,
            updated_at: ts,
        };
        let milestones = input
            .milestones
            .into_iter()
            .enumerate()
            .map(|(i, m)| {
                let (amount, percentage) = resolve_split(m.amount, m.percentage, budget.amount, currency);
                milestone::Model {
                    id: Uuid::new_v4(),
                    budget_id: budget.id,
                    title: m.title.trim().to_string(),
                    description: clean(m.description),
                    amount,
                    percentage,
                    status: MilestoneStatus::Pending.as_str().to_string(),
                    due_date: m.due_date,
                    position: i as i32,
                    completed_at: None,
                    created_at: ts,
                    updated_at: ts,
                }
            })
            .collect();

        let (budget, milestones) = self.repo.create_budget_with_milestones(budget, milestones).await?;
        info!(budget_id = %budget.id, milestones = milestones.len(), amount = %budget.amount, currency = %budget.currency, "budget_created");

        dispatch(
            self.notifier.as_ref(),
            NotificationEvent::BudgetCreated { budget_id: budget.id, job_id: job.id, recipients: job.developer_id.into_iter().collect() },
        )
        .await;

        let metrics = metrics::compute(&budget, &milestones, &[]);
        Ok(BudgetDetails { budget, milestones, payments: Vec::new(), metrics })
    }

    pub async fn get_budget(&self, actor: &Actor, budget_id: Uuid) -> Result<BudgetDetails, ServiceError> {
        let (budget, job) = self.load_budget(actor, budget_id).await?;
        Self::require_view(actor, &job)?;
        self.details(budget).await
    }

    pub async fn get_budget_for_job(&self, actor: &Actor, job_id: Uuid) -> Result<BudgetDetails, ServiceError> {
        let job = self.load_job(actor, job_id).await?;
        Self::require_view(actor, &job)?;
        let budget = self.repo.find_budget_by_job(job.id).await?.ok_or_else(|| ServiceError::not_found("budget"))?;
        self.details(budget).await
    }

    pub async fn list_budgets(&self, actor: &Actor, query: BudgetListQuery) -> Result<Page<budget::Model>, ServiceError> {
        let job_ids = match actor.role {
            models::user::UserRole::Admin => None,
            models::user::UserRole::Client => {
                let jobs = self.repo.list_jobs(actor.tenant_id, &JobFilter { client_id: Some(actor.user_id), developer_id: None }).await?;
                Some(jobs.into_iter().map(|j| j.id).collect())
            }
            models::user::UserRole::Developer => {
                let jobs = self.repo.list_jobs(actor.tenant_id, &JobFilter { client_id: None, developer_id: Some(actor.user_id) }).await?;
                Some(jobs.into_iter().map(|j| j.id).collect())
            }
        };
        let filter = BudgetFilter {
            tenant_id: actor.tenant_id,
            job_ids,
            status: query.status.map(|s| s.as_str().to_string()),
        };
        let all = self.repo.list_budgets(&filter).await?;
        let p = Pagination { page: query.page.unwrap_or(1), per_page: query.per_page.unwrap_or(20) };
        Ok(p.paginate(all))
    }

    #[instrument(skip(self, patch), fields(actor = %actor.user_id))]
    pub async fn update_budget(&self, actor: &Actor, budget_id: Uuid, patch: UpdateBudgetInput) -> Result<BudgetDetails, ServiceError> {
        let (mut budget, job) = self.load_budget(actor, budget_id).await?;
        Self::require_manage(actor, &job)?;
        Self::require_open(&budget)?;

        if let Some(code) = &patch.currency {
            let currency = find_currency(code).ok_or_else(|| ServiceError::Validation(format!("Unsupported currency: {}", code.trim())))?;
            if currency.code != budget.currency {
                if !self.repo.list_payments(budget.id).await?.is_empty() {
                    return Err(ServiceError::Validation("Currency cannot change once payments exist".into()));
                }
                budget.currency = currency.code.to_string();
            }
        }
        if let Some(amount) = patch.amount {
            budget.amount = amount;
        }
        if patch.hourly_rate.is_some() {
            budget.hourly_rate = patch.hourly_rate;
        }
        if patch.estimated_hours.is_some() {
            budget.estimated_hours = patch.estimated_hours;
        }
        if let Some(desc) = patch.description {
            budget.description = clean(Some(desc));
        }

        let probe = CreateBudgetInput {
            job_id: budget.job_id,
            budget_type: budget.budget_type()?,
            amount: budget.amount,
            currency: budget.currency.clone(),
            hourly_rate: budget.hourly_rate,
            estimated_hours: budget.estimated_hours,
            description: None,
            milestones: Vec::new(),
        };
        let mut report = validator::validate_amount(probe.amount, &probe.currency);
        if probe.budget_type == BudgetType::Hourly {
            report.merge(validator::validate_budget(&probe));
        }
        into_result(report, "update_budget")?;

        budget.updated_at = now();
        let budget = self.repo.update_budget(budget).await?;
        self.revalidate_plan(&budget).await?;
        info!(budget_id = %budget.id, "budget_updated");
        self.details(budget).await
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn update_budget_status(&self, actor: &Actor, budget_id: Uuid, next: BudgetStatus) -> Result<budget::Model, ServiceError> {
        let (mut budget, job) = self.load_budget(actor, budget_id).await?;
        Self::require_manage(actor, &job)?;
        let current = budget.status()?;
        if !current.can_transition_to(next) {
            return Err(ServiceError::Validation(format!("Invalid budget status transition from {current} to {next}")));
        }
        budget.status = next.as_str().to_string();
        budget.updated_at = now();
        let budget = self.repo.update_budget(budget).await?;
        info!(budget_id = %budget.id, from = %current, to = %next, "budget_status_changed");
        Ok(budget)
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete_budget(&self, actor: &Actor, budget_id: Uuid) -> Result<(), ServiceError> {
        let (budget, job) = self.load_budget(actor, budget_id).await?;
        Self::require_manage(actor, &job)?;
        let payments = self.repo.list_payments(budget.id).await?;
        if payments.iter().any(|p| p.status().ok() == Some(PaymentStatus::Completed)) {
            return Err(ServiceError::Validation("Cannot delete a budget with completed payments".into()));
        }
        self.repo.delete_budget(budget.id).await?;
        info!(budget_id = %budget.id, "budget_deleted");
        Ok(())
    }

    #[instrument(skip(self, input), fields(actor = %actor.user_id))]
    pub async fn add_milestone(&self, actor: &Actor, budget_id: Uuid, input: MilestoneInput) -> Result<milestone::Model, ServiceError> {
        let (budget, job) = self.load_budget(actor, budget_id).await?;
        Self::require_manage(actor, &job)?;
        Self::require_open(&budget)?;
        let existing = self.repo.list_milestones(budget.id).await?;
        if existing.len() >= validator::MAX_MILESTONES {
            return Err(ServiceError::Validation(format!("A budget may have at most {} milestones", validator::MAX_MILESTONES)));
        }
        let n = existing.len() + 1;
        let mut report = validator::validate_milestone(n, &input);
        report.merge(validator::validate_due_date(n, input.due_date, Utc::now().date_naive()));
        into_result(report, "add_milestone")?;

        let currency = find_currency(&budget.currency).ok_or_else(|| ServiceError::Validation(format!("Unsupported currency: {}", budget.currency)))?;
        let (amount, percentage) = resolve_split(input.amount, input.percentage, budget.amount, currency);
        let ts = now();
        let position = existing.iter().map(|m| m.position + 1).max().unwrap_or(0);
        let saved = self
            .repo
            .insert_milestone(milestone::Model {
                id: Uuid::new_v4(),
                budget_id: budget.id,
                title: input.title.trim().to_string(),
                description: clean(input.description),
                amount,
                percentage,
                status: MilestoneStatus::Pending.as_str().to_string(),
                due_date: input.due_date,
                position,
                completed_at: None,
                created_at: ts,
                updated_at: ts,
            })
            .await?;
        self.revalidate_plan(&budget).await?;
        info!(milestone_id = %saved.id, budget_id = %budget.id, "milestone_added");
        Ok(saved)
    }

    #[instrument(skip(self, patch), fields(actor = %actor.user_id))]
    pub async fn update_milestone(&self, actor: &Actor, milestone_id: Uuid, patch: UpdateMilestoneInput) -> Result<milestone::Model, ServiceError> {
        let (mut m, budget, job) = self.load_milestone(actor, milestone_id).await?;
        Self::require_manage(actor, &job)?;
        Self::require_open(&budget)?;
        if m.status()? == MilestoneStatus::Completed {
            return Err(ServiceError::Validation("Completed milestones cannot be edited".into()));
        }

        if let Some(title) = patch.title {
            m.title = title.trim().to_string();
        }
        if let Some(desc) = patch.description {
            m.description = clean(Some(desc));
        }
        if patch.due_date.is_some() {
            m.due_date = patch.due_date;
        }
        let currency = find_currency(&budget.currency).ok_or_else(|| ServiceError::Validation(format!("Unsupported currency: {}", budget.currency)))?;
        if patch.amount.is_some() || patch.percentage.is_some() {
            let (amount, percentage) = resolve_split(patch.amount, patch.percentage, budget.amount, currency);
            m.amount = amount;
            m.percentage = percentage;
        }

        let probe = MilestoneInput {
            title: m.title.clone(),
            description: None,
            amount: Some(m.amount),
            percentage: Some(m.percentage),
            due_date: m.due_date,
        };
        into_result(validator::validate_milestone(m.position as usize + 1, &probe), "update_milestone")?;

        m.updated_at = now();
        let saved = self.repo.update_milestone(m).await?;
        self.revalidate_plan(&budget).await?;
        Ok(saved)
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete_milestone(&self, actor: &Actor, milestone_id: Uuid) -> Result<(), ServiceError> {
        let (m, budget, job) = self.load_milestone(actor, milestone_id).await?;
        Self::require_manage(actor, &job)?;
        if m.status()? == MilestoneStatus::Completed {
            return Err(ServiceError::Validation("Completed milestones cannot be deleted".into()));
        }
        let payments = self.repo.list_payments(budget.id).await?;
        if payments.iter().any(|p| p.milestone_id == m.id) {
            return Err(ServiceError::Validation("Milestones with payments cannot be deleted".into()));
        }
        let remaining = self.repo.list_milestones(budget.id).await?.len().saturating_sub(1);
        if remaining == 0 && budget.budget_type()?.requires_milestones() {
            return Err(ServiceError::Validation(format!("{} budgets require at least one milestone", budget.budget_type)));
        }
        self.repo.delete_milestone(m.id).await?;
        self.revalidate_plan(&budget).await?;
        info!(milestone_id = %m.id, "milestone_deleted");
        Ok(())
    }

    #[instrument(skip(self, notes), fields(actor = %actor.user_id))]
    pub async fn update_milestone_status(
        &self,
        actor: &Actor,
        milestone_id: Uuid,
        next: MilestoneStatus,
        notes: Option<String>,
    ) -> Result<milestone::Model, ServiceError> {
        let (mut m, budget, job) = self.load_milestone(actor, milestone_id).await?;
        Self::require_view(actor, &job)?;
        let current = m.status()?;
        if !current.can_transition_to(next) {
            return Err(ServiceError::Validation(format!("Invalid status transition from {current} to {next}")));
        }
        if next == MilestoneStatus::Completed && !Self::can_manage(actor, &job) {
            return Err(ServiceError::forbidden("only the client or an admin can approve a milestone"));
        }

        let ts = now();
        m.status = next.as_str().to_string();
        m.completed_at = if next == MilestoneStatus::Completed { Some(ts) } else { None };
        m.updated_at = ts;
        let saved = self.repo.update_milestone(m).await?;
        info!(milestone_id = %saved.id, from = %current, to = %next, "milestone_status_changed");

        let recipients = [Some(job.client_id), job.developer_id]
            .into_iter()
            .flatten()
            .filter(|id| *id != actor.user_id)
            .collect();
        dispatch(
            self.notifier.as_ref(),
            NotificationEvent::MilestoneStatusChanged {
                milestone_id: saved.id,
                budget_id: budget.id,
                from: current.as_str().to_string(),
                to: next.as_str().to_string(),
                notes: clean(notes),
                recipients,
            },
        )
        .await;
        Ok(saved)
    }

    #[instrument(skip(self, input), fields(actor = %actor.user_id, milestone_id = %input.milestone_id))]
    pub async fn process_payment(&self, actor: &Actor, input: ProcessPaymentInput) -> Result<PaymentReceipt, ServiceError> {
        let (m, mut budget, job) = self.load_milestone(actor, input.milestone_id).await?;
        Self::require_manage(actor, &job)?;
        if m.status()? != MilestoneStatus::Completed {
            return Err(ServiceError::Validation("Payment can only be processed for completed milestones".into()));
        }
        let budget_status = budget.status()?;
        if budget_status != BudgetStatus::Active {
            return Err(ServiceError::Validation(format!("Payments require an active budget (current status: {budget_status})")));
        }

        let currency = input.currency.clone().unwrap_or_else(|| budget.currency.clone());
        into_result(validator::validate_amount(input.amount, &currency), "process_payment")?;
        let conversion = self.currency.convert(input.amount, &currency, &budget.currency).await?;

        let payments = self.repo.list_payments(budget.id).await?;
        let settled: Decimal = payments
            .iter()
            .filter(|p| p.milestone_id == m.id && p.status().is_ok_and(|s| s.reserves_funds()))
            .map(|p| p.budget_amount)
            .sum();
        if settled + conversion.converted_amount > m.amount {
            return Err(ServiceError::Validation(format!(
                "Payment exceeds remaining milestone balance of {} {}",
                m.amount - settled,
                budget.currency
            )));
        }

        let ts = now();
        let payment = self
            .repo
            .insert_payment(payment::Model {
                id: Uuid::new_v4(),
                budget_id: budget.id,
                milestone_id: m.id,
                amount: input.amount,
                currency: conversion.from_currency.clone(),
                exchange_rate: conversion.rate,
                budget_amount: conversion.converted_amount,
                status: PaymentStatus::Completed.as_str().to_string(),
                payer_id: actor.user_id,
                payee_id: job.developer_id,
                reference: format!("PAY-{}", Uuid::new_v4().simple().to_string().to_ascii_uppercase()),
                notes: clean(input.notes),
                processed_at: Some(ts),
                created_at: ts,
                updated_at: ts,
            })
            .await?;
        info!(payment_id = %payment.id, amount = %payment.amount, currency = %payment.currency, budget_amount = %payment.budget_amount, "payment_processed");

        let mut all = payments;
        all.push(payment.clone());
        let milestones = self.repo.list_milestones(budget.id).await?;
        let mut metrics = metrics::compute(&budget, &milestones, &all);
        if metrics.total_paid >= budget.amount && budget_status.can_transition_to(BudgetStatus::Completed) {
            budget.status = BudgetStatus::Completed.as_str().to_string();
            budget.updated_at = ts;
            budget = self.repo.update_budget(budget).await?;
            metrics = metrics::compute(&budget, &milestones, &all);
            info!(budget_id = %budget.id, "budget_fully_paid");
        }

        dispatch(
            self.notifier.as_ref(),
            NotificationEvent::PaymentProcessed {
                payment_id: payment.id,
                milestone_id: m.id,
                amount: payment.amount,
                currency: payment.currency.clone(),
                recipients: job.developer_id.into_iter().collect(),
            },
        )
        .await;

        Ok(PaymentReceipt { payment, budget_status: budget.status, metrics })
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn update_payment_status(&self, actor: &Actor, payment_id: Uuid, next: PaymentStatus) -> Result<payment::Model, ServiceError> {
        let mut p = self.repo.find_payment(payment_id).await?.ok_or_else(|| ServiceError::not_found("payment"))?;
        let (_budget, job) = self.load_budget(actor, p.budget_id).await.map_err(|e| match e {
            ServiceError::NotFound(_) => ServiceError::not_found("payment"),
            other => other,
        })?;
        Self::require_manage(actor, &job)?;
        let current = p.status()?;
        if !current.can_transition_to(next) {
            return Err(ServiceError::Validation(format!("Invalid payment status transition from {current} to {next}")));
        }
        let ts = now();
        p.status = next.as_str().to_string();
        if next == PaymentStatus::Completed {
            p.processed_at = Some(ts);
        }
        p.updated_at = ts;
        let saved = self.repo.update_payment(p).await?;
        debug!(payment_id = %saved.id, from = %current, to = %next, "payment_status_changed");
        Ok(saved)
    }

    pub async fn list_payments(&self, actor: &Actor, budget_id: Uuid) -> Result<Vec<payment::Model>, ServiceError> {
        let (budget, job) = self.load_budget(actor, budget_id).await?;
        Self::require_view(actor, &job)?;
        self.repo.list_payments(budget.id).await
    }

    pub async fn metrics(&self, actor: &Actor, budget_id: Uuid) -> Result<BudgetMetrics, ServiceError> {
        Ok(self.get_budget(actor, budget_id).await?.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::currency::ExchangeRateInput;
    use crate::notification::testing::{FailingNotifier, RecordingNotifier};
    use crate::test_support::Marketplace;

    fn service(mp: &Marketplace, notifier: Arc<dyn Notifier>) -> BudgetService {
        let currency = Arc::new(CurrencyService::new(mp.repo.clone()));
        BudgetService::new(mp.repo.clone(), currency, notifier)
    }

    fn half(title: &str) -> MilestoneInput {
        MilestoneInput { title: title.into(), description: None, amount: Some(Decimal::from(2500)), percentage: Some(Decimal::from(50)), due_date: None }
    }

    fn fixed_5000(job_id: Uuid) -> CreateBudgetInput {
        CreateBudgetInput {
            job_id,
            budget_type: BudgetType::Fixed,
            amount: Decimal::from(5000),
            currency: "USD".into(),
            hourly_rate: None,
            estimated_hours: None,
            description: Some("MVP".into()),
            milestones: vec![half("Design"), half("Build")],
        }
    }

    async fn complete(svc: &BudgetService, mp: &Marketplace, id: Uuid) {
        for (actor, status) in [
            (&mp.developer, MilestoneStatus::InProgress),
            (&mp.developer, MilestoneStatus::UnderReview),
            (&mp.client, MilestoneStatus::Completed),
        ] {
            svc.update_milestone_status(actor, id, status, None).await.unwrap();
        }
    }

    #[tokio::test]
    async fn fixed_budget_with_even_split_starts_unused() {
        let mp = Marketplace::new().await;
        let rec = Arc::new(RecordingNotifier::default());
        let svc = service(&mp, rec.clone());
        let details = svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();
        assert_eq!(details.budget.status, "DRAFT");
        assert_eq!(details.milestones.len(), 2);
        assert_eq!(details.metrics.utilization_percentage, Decimal::ZERO);
        assert_eq!(details.metrics.remaining, Decimal::from(5000));

        let events = rec.events.lock().await;
        assert!(matches!(&events[0], NotificationEvent::BudgetCreated { recipients, .. } if recipients == &vec![mp.developer.user_id]));
    }

    #[tokio::test]
    async fn second_budget_for_job_is_rejected() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(RecordingNotifier::default()));
        svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();
        let err = svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap_err();
        assert!(matches!(&err, ServiceError::Validation(m) if m.starts_with("Budget already exists")));
    }

    #[tokio::test]
    async fn only_client_or_admin_creates_budgets() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(RecordingNotifier::default()));
        let err = svc.create_budget(&mp.developer, fixed_5000(mp.job.id)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let stranger = Actor::new(Uuid::new_v4(), Uuid::new_v4(), models::user::UserRole::Admin);
        assert!(matches!(svc.create_budget(&stranger, fixed_5000(mp.job.id)).await, Err(ServiceError::NotFound(_))));
        svc.create_budget(&mp.admin, fixed_5000(mp.job.id)).await.unwrap();
    }

    #[tokio::test]
    async fn missing_split_values_are_derived() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(RecordingNotifier::default()));
        let mut input = fixed_5000(mp.job.id);
        input.budget_type = BudgetType::Milestone;
        input.milestones = vec![
            MilestoneInput { title: "A".into(), description: None, amount: None, percentage: Some(Decimal::new(3333, 2)), due_date: None },
            MilestoneInput { title: "B".into(), description: None, amount: Some(Decimal::from(1000)), percentage: None, due_date: None },
        ];
        let d = svc.create_budget(&mp.client, input).await.unwrap();
        assert_eq!(d.milestones[0].amount, Decimal::new(166650, 2));
        assert_eq!(d.milestones[1].percentage, Decimal::from(20));
    }

    #[tokio::test]
    async fn payment_requires_completed_milestone() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(RecordingNotifier::default()));
        let d = svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();
        let input = ProcessPaymentInput { milestone_id: d.milestones[0].id, amount: Decimal::from(1500), currency: None, notes: None };
        let err = svc.process_payment(&mp.client, input).await.unwrap_err();
        assert_eq!(err.detail(), "Payment can only be processed for completed milestones");
    }

    #[tokio::test]
    async fn milestone_transitions_follow_the_table() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(RecordingNotifier::default()));
        let d = svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();
        let id = d.milestones[0].id;

        let err = svc.update_milestone_status(&mp.client, id, MilestoneStatus::Completed, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        svc.update_milestone_status(&mp.developer, id, MilestoneStatus::InProgress, None).await.unwrap();
        svc.update_milestone_status(&mp.developer, id, MilestoneStatus::UnderReview, None).await.unwrap();
        let err = svc.update_milestone_status(&mp.developer, id, MilestoneStatus::Completed, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let done = svc.update_milestone_status(&mp.client, id, MilestoneStatus::Completed, Some("great".into())).await.unwrap();
        assert!(done.completed_at.is_some());
        let reopened = svc.update_milestone_status(&mp.client, id, MilestoneStatus::UnderReview, None).await.unwrap();
        assert!(reopened.completed_at.is_none());

        let outsider = svc.update_milestone_status(&mp.other_developer, id, MilestoneStatus::InProgress, None).await;
        assert!(matches!(outsider, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn full_payment_completes_budget() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(FailingNotifier));
        let d = svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();
        svc.update_budget_status(&mp.client, d.budget.id, BudgetStatus::Active).await.unwrap();

        for m in &d.milestones {
            complete(&svc, &mp, m.id).await;
        }
        let first = svc
            .process_payment(&mp.client, ProcessPaymentInput { milestone_id: d.milestones[0].id, amount: Decimal::from(1500), currency: None, notes: None })
            .await
            .unwrap();
        assert_eq!(first.metrics.utilization_percentage, Decimal::from(30));
        assert_eq!(first.payment.payee_id, Some(mp.developer.user_id));

        let over = svc
            .process_payment(&mp.client, ProcessPaymentInput { milestone_id: d.milestones[0].id, amount: Decimal::from(1001), currency: None, notes: None })
            .await;
        assert!(matches!(over, Err(ServiceError::Validation(_))));

        svc.process_payment(&mp.client, ProcessPaymentInput { milestone_id: d.milestones[0].id, amount: Decimal::from(1000), currency: None, notes: None })
            .await
            .unwrap();
        let last = svc
            .process_payment(&mp.admin, ProcessPaymentInput { milestone_id: d.milestones[1].id, amount: Decimal::from(2500), currency: None, notes: None })
            .await
            .unwrap();
        assert_eq!(last.budget_status, "COMPLETED");
        assert_eq!(last.metrics.remaining, Decimal::ZERO);

        let err = svc.delete_budget(&mp.client, d.budget.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn foreign_currency_payment_is_converted() {
        let mp = Marketplace::new().await;
        let currency = Arc::new(CurrencyService::new(mp.repo.clone()));
        currency
            .update_exchange_rate(&mp.admin, ExchangeRateInput { from_currency: "EUR".into(), to_currency: "USD".into(), rate: Decimal::new(110, 2), effective_date: None, expiry_date: None })
            .await
            .unwrap();
        let svc = BudgetService::new(mp.repo.clone(), currency, Arc::new(RecordingNotifier::default()));
        let d = svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();
        svc.update_budget_status(&mp.client, d.budget.id, BudgetStatus::Active).await.unwrap();
        complete(&svc, &mp, d.milestones[0].id).await;

        let r = svc
            .process_payment(&mp.client, ProcessPaymentInput { milestone_id: d.milestones[0].id, amount: Decimal::from(1000), currency: Some("eur".into()), notes: None })
            .await
            .unwrap();
        assert_eq!(r.payment.currency, "EUR");
        assert_eq!(r.payment.budget_amount, Decimal::from(1100));
        assert_eq!(r.metrics.total_paid, Decimal::from(1100));

        let missing = svc
            .process_payment(&mp.client, ProcessPaymentInput { milestone_id: d.milestones[0].id, amount: Decimal::from(10), currency: Some("GBP".into()), notes: None })
            .await
            .unwrap_err();
        assert_eq!(missing.detail(), "Exchange rate not available");
    }

    #[tokio::test]
    async fn payments_need_an_active_budget() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(RecordingNotifier::default()));
        let d = svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();
        complete(&svc, &mp, d.milestones[0].id).await;
        let pay = || ProcessPaymentInput { milestone_id: d.milestones[0].id, amount: Decimal::from(2500), currency: None, notes: None };

        let err = svc.process_payment(&mp.client, pay()).await.unwrap_err();
        assert!(matches!(&err, ServiceError::Validation(m) if m.starts_with("Payments require an active budget")));
        let after = svc.get_budget(&mp.client, d.budget.id).await.unwrap();
        assert_eq!(after.budget.status, "DRAFT");
        assert_eq!(after.metrics.total_paid, Decimal::ZERO);

        svc.update_budget_status(&mp.client, d.budget.id, BudgetStatus::Active).await.unwrap();
        svc.update_budget_status(&mp.client, d.budget.id, BudgetStatus::OnHold).await.unwrap();
        assert!(matches!(svc.process_payment(&mp.client, pay()).await, Err(ServiceError::Validation(_))));
        assert_eq!(svc.get_budget(&mp.client, d.budget.id).await.unwrap().budget.status, "ON_HOLD");

        svc.update_budget_status(&mp.client, d.budget.id, BudgetStatus::Active).await.unwrap();
        let r = svc.process_payment(&mp.client, pay()).await.unwrap();
        assert_eq!(r.budget_status, "ACTIVE");
    }

    #[tokio::test]
    async fn payment_status_changes_follow_the_table() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(RecordingNotifier::default()));
        let d = svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();
        svc.update_budget_status(&mp.client, d.budget.id, BudgetStatus::Active).await.unwrap();
        complete(&svc, &mp, d.milestones[0].id).await;
        let r = svc
            .process_payment(&mp.client, ProcessPaymentInput { milestone_id: d.milestones[0].id, amount: Decimal::from(2500), currency: None, notes: None })
            .await
            .unwrap();
        let id = r.payment.id;

        let err = svc.update_payment_status(&mp.client, id, PaymentStatus::Pending).await.unwrap_err();
        assert_eq!(err.detail(), "Invalid payment status transition from COMPLETED to PENDING");
        assert!(matches!(svc.update_payment_status(&mp.developer, id, PaymentStatus::Refunded).await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(svc.update_payment_status(&mp.client, Uuid::new_v4(), PaymentStatus::Refunded).await, Err(ServiceError::NotFound(_))));

        let refunded = svc.update_payment_status(&mp.client, id, PaymentStatus::Refunded).await.unwrap();
        assert_eq!(refunded.status, "REFUNDED");
        let metrics = svc.metrics(&mp.client, d.budget.id).await.unwrap();
        assert_eq!(metrics.total_paid, Decimal::ZERO);
        assert_eq!(metrics.remaining, Decimal::from(5000));

        assert!(matches!(svc.update_payment_status(&mp.admin, id, PaymentStatus::Completed).await, Err(ServiceError::Validation(_))));

        // the refunded amount can be paid again
        svc.process_payment(&mp.client, ProcessPaymentInput { milestone_id: d.milestones[0].id, amount: Decimal::from(2500), currency: None, notes: None })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn refund_leaves_a_completed_budget_closed() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(RecordingNotifier::default()));
        let d = svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();
        svc.update_budget_status(&mp.client, d.budget.id, BudgetStatus::Active).await.unwrap();
        let mut last = None;
        for m in &d.milestones {
            complete(&svc, &mp, m.id).await;
            let r = svc
                .process_payment(&mp.client, ProcessPaymentInput { milestone_id: m.id, amount: Decimal::from(2500), currency: None, notes: None })
                .await
                .unwrap();
            last = Some(r);
        }
        let last = last.unwrap();
        assert_eq!(last.budget_status, "COMPLETED");

        svc.update_payment_status(&mp.admin, last.payment.id, PaymentStatus::Refunded).await.unwrap();
        let after = svc.get_budget(&mp.client, d.budget.id).await.unwrap();
        assert_eq!(after.budget.status, "COMPLETED");
        assert_eq!(after.metrics.total_paid, Decimal::from(2500));
        assert_eq!(after.metrics.remaining, Decimal::from(2500));
    }

    #[tokio::test]
    async fn budget_status_and_edit_rules() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(RecordingNotifier::default()));
        let d = svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();
        assert!(svc.update_budget_status(&mp.client, d.budget.id, BudgetStatus::Completed).await.is_err());
        svc.update_budget_status(&mp.client, d.budget.id, BudgetStatus::Active).await.unwrap();
        svc.update_budget_status(&mp.client, d.budget.id, BudgetStatus::OnHold).await.unwrap();

        let patch = UpdateBudgetInput { amount: Some(Decimal::from(6000)), ..Default::default() };
        let updated = svc.update_budget(&mp.client, d.budget.id, patch).await.unwrap();
        assert_eq!(updated.budget.amount, Decimal::from(6000));

        svc.update_budget_status(&mp.client, d.budget.id, BudgetStatus::Cancelled).await.unwrap();
        let patch = UpdateBudgetInput { description: Some("late".into()), ..Default::default() };
        assert!(matches!(svc.update_budget(&mp.client, d.budget.id, patch).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn milestone_crud() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(RecordingNotifier::default()));
        let d = svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();

        let added = svc
            .add_milestone(&mp.client, d.budget.id, MilestoneInput { title: "Polish".into(), description: None, amount: None, percentage: Some(Decimal::from(10)), due_date: None })
            .await
            .unwrap();
        assert_eq!(added.amount, Decimal::from(500));
        assert_eq!(added.position, 2);

        let edited = svc
            .update_milestone(&mp.client, added.id, UpdateMilestoneInput { amount: Some(Decimal::from(250)), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(edited.percentage, Decimal::from(5));

        svc.delete_milestone(&mp.client, added.id).await.unwrap();
        complete(&svc, &mp, d.milestones[0].id).await;
        assert!(svc.delete_milestone(&mp.client, d.milestones[0].id).await.is_err());
        assert_eq!(svc.get_budget(&mp.developer, d.budget.id).await.unwrap().milestones.len(), 2);
    }

    #[tokio::test]
    async fn listing_is_scoped_by_role() {
        let mp = Marketplace::new().await;
        let svc = service(&mp, Arc::new(RecordingNotifier::default()));
        svc.create_budget(&mp.client, fixed_5000(mp.job.id)).await.unwrap();
        assert_eq!(svc.list_budgets(&mp.client, BudgetListQuery::default()).await.unwrap().total, 1);
        assert_eq!(svc.list_budgets(&mp.developer, BudgetListQuery::default()).await.unwrap().total, 1);
        assert_eq!(svc.list_budgets(&mp.other_developer, BudgetListQuery::default()).await.unwrap().total, 0);
        let q = BudgetListQuery { status: Some(BudgetStatus::Active), ..Default::default() };
        assert_eq!(svc.list_budgets(&mp.admin, q).await.unwrap().total, 0);
        assert!(matches!(svc.get_budget_for_job(&mp.other_developer, mp.job.id).await, Err(ServiceError::Forbidden(_))));
    }
}
