//! Postgres-backed repository built on SeaORM entities from `models`.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use models::{budget, exchange_rate, job, milestone, payment, profile, tenant, user, user::UserRole, user_credentials};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use super::*;
use crate::auth::domain::{AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::errors::ServiceError;

#[derive(Clone)]
pub struct SeaOrmRepository {
    db: DatabaseConnection,
}

impl SeaOrmRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    pub fn connection(&self) -> &DatabaseConnection { &self.db }
}

fn repo_err(e: sea_orm::DbErr) -> AuthError { AuthError::Repository(e.to_string()) }

/// The unique `job_id` index catches a budget created concurrently after the service-level check.
fn budget_insert_err(e: sea_orm::DbErr) -> ServiceError {
    match e.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => ServiceError::Validation("Budget already exists for this job".into()),
        _ => e.into(),
    }
}

#[async_trait]
impl AuthRepository for SeaOrmRepository {
    async fn find_user_by_tenant_email(&self, tenant_id: Uuid, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let found = user::Entity::find()
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(found.map(AuthUser::try_from).transpose()?)
    }

    async fn find_auth_user(&self, user_id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let found = user::Entity::find_by_id(user_id).one(&self.db).await.map_err(repo_err)?;
        Ok(found.map(AuthUser::try_from).transpose()?)
    }

    async fn create_user(&self, tenant_id: Uuid, email: &str, name: &str, role: UserRole) -> Result<AuthUser, AuthError> {
        let model = user::create(&self.db, tenant_id, email, name, role).await?;
        Ok(AuthUser::try_from(model)?)
    }

    async fn ensure_tenant(&self, tenant_id: Uuid) -> Result<(), AuthError> {
        if tenant::Entity::find_by_id(tenant_id).one(&self.db).await.map_err(repo_err)?.is_none() {
            tenant::create_with_id(&self.db, tenant_id, &format!("tenant-{}", tenant_id.simple())).await?;
        }
        Ok(())
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let found = user_credentials::Entity::find()
            .filter(user_credentials::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(found.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }

    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        let c = user_credentials::upsert_password(&self.db, user_id, password_hash, &password_algorithm).await?;
        Ok(Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm })
    }
}

#[async_trait]
impl UserRepository for SeaOrmRepository {
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?)
    }
}

#[async_trait]
impl JobRepository for SeaOrmRepository {
    async fn insert_job(&self, job: job::Model) -> RepoResult<job::Model> {
        Ok(job.into_active_model().reset_all().insert(&self.db).await?)
    }

    async fn find_job(&self, id: Uuid) -> RepoResult<Option<job::Model>> {
        Ok(job::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn list_jobs(&self, tenant_id: Uuid, filter: &JobFilter) -> RepoResult<Vec<job::Model>> {
        let mut q = job::Entity::find().filter(job::Column::TenantId.eq(tenant_id));
        if let Some(c) = filter.client_id {
            q = q.filter(job::Column::ClientId.eq(c));
        }
        if let Some(d) = filter.developer_id {
            q = q.filter(job::Column::DeveloperId.eq(d));
        }
        Ok(q.order_by_desc(job::Column::CreatedAt).order_by_asc(job::Column::Id).all(&self.db).await?)
    }

    async fn update_job(&self, job: job::Model) -> RepoResult<job::Model> {
        Ok(job.into_active_model().reset_all().update(&self.db).await?)
    }
}

#[async_trait]
impl BudgetRepository for SeaOrmRepository {
    async fn find_budget(&self, id: Uuid) -> RepoResult<Option<budget::Model>> {
        Ok(budget::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_budget_by_job(&self, job_id: Uuid) -> RepoResult<Option<budget::Model>> {
        Ok(budget::Entity::find().filter(budget::Column::JobId.eq(job_id)).one(&self.db).await?)
    }

    async fn list_budgets(&self, filter: &BudgetFilter) -> RepoResult<Vec<budget::Model>> {
        let mut q = budget::Entity::find().filter(budget::Column::TenantId.eq(filter.tenant_id));
        if let Some(ids) = &filter.job_ids {
            q = q.filter(budget::Column::JobId.is_in(ids.iter().copied()));
        }
        if let Some(status) = &filter.status {
            q = q.filter(budget::Column::Status.eq(status.as_str()));
        }
        Ok(q.order_by_desc(budget::Column::CreatedAt).order_by_asc(budget::Column::Id).all(&self.db).await?)
    }

    async fn create_budget_with_milestones(
        &self,
        budget: budget::Model,
        milestones: Vec<milestone::Model>,
    ) -> RepoResult<(budget::Model, Vec<milestone::Model>)> {
        let txn = self.db.begin().await?;
        let saved = budget.into_active_model().reset_all().insert(&txn).await.map_err(budget_insert_err)?;
        let mut saved_milestones = Vec::with_capacity(milestones.len());
        for m in milestones {
            saved_milestones.push(m.into_active_model().reset_all().insert(&txn).await?);
        }
        txn.commit().await?;
        Ok((saved, saved_milestones))
    }

    async fn update_budget(&self, budget: budget::Model) -> RepoResult<budget::Model> {
        Ok(budget.into_active_model().reset_all().update(&self.db).await?)
    }

    async fn delete_budget(&self, id: Uuid) -> RepoResult<bool> {
        let txn = self.db.begin().await?;
        payment::Entity::delete_many().filter(payment::Column::BudgetId.eq(id)).exec(&txn).await?;
        milestone::Entity::delete_many().filter(milestone::Column::BudgetId.eq(id)).exec(&txn).await?;
        let res = budget::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(res.rows_affected > 0)
    }

    async fn list_milestones(&self, budget_id: Uuid) -> RepoResult<Vec<milestone::Model>> {
        Ok(milestone::Entity::find()
            .filter(milestone::Column::BudgetId.eq(budget_id))
            .order_by_asc(milestone::Column::Position)
            .order_by_asc(milestone::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn find_milestone(&self, id: Uuid) -> RepoResult<Option<milestone::Model>> {
        Ok(milestone::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn insert_milestone(&self, milestone: milestone::Model) -> RepoResult<milestone::Model> {
        Ok(milestone.into_active_model().reset_all().insert(&self.db).await?)
    }

    async fn update_milestone(&self, milestone: milestone::Model) -> RepoResult<milestone::Model> {
        Ok(milestone.into_active_model().reset_all().update(&self.db).await?)
    }

    async fn delete_milestone(&self, id: Uuid) -> RepoResult<bool> {
        Ok(milestone::Entity::delete_by_id(id).exec(&self.db).await?.rows_affected > 0)
    }

    async fn list_payments(&self, budget_id: Uuid) -> RepoResult<Vec<payment::Model>> {
        Ok(payment::Entity::find()
            .filter(payment::Column::BudgetId.eq(budget_id))
            .order_by_asc(payment::Column::CreatedAt)
            .order_by_asc(payment::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn find_payment(&self, id: Uuid) -> RepoResult<Option<payment::Model>> {
        Ok(payment::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn insert_payment(&self, payment: payment::Model) -> RepoResult<payment::Model> {
        Ok(payment.into_active_model().reset_all().insert(&self.db).await?)
    }

    async fn update_payment(&self, payment: payment::Model) -> RepoResult<payment::Model> {
        Ok(payment.into_active_model().reset_all().update(&self.db).await?)
    }
}

#[async_trait]
impl ExchangeRateRepository for SeaOrmRepository {
    async fn latest_rate(&self, from: &str, to: &str, now: DateTime<FixedOffset>) -> RepoResult<Option<exchange_rate::Model>> {
        Ok(exchange_rate::Entity::find()
            .filter(exchange_rate::Column::FromCurrency.eq(from))
            .filter(exchange_rate::Column::ToCurrency.eq(to))
            .filter(exchange_rate::Column::IsActive.eq(true))
            .filter(exchange_rate::Column::EffectiveDate.lte(now))
            .filter(
                Condition::any()
                    .add(exchange_rate::Column::ExpiryDate.is_null())
                    .add(exchange_rate::Column::ExpiryDate.gt(now)),
            )
            .order_by_desc(exchange_rate::Column::EffectiveDate)
            .order_by_desc(exchange_rate::Column::CreatedAt)
            .one(&self.db)
            .await?)
    }

    async fn replace_rate(&self, rate: exchange_rate::Model) -> RepoResult<exchange_rate::Model> {
        let txn = self.db.begin().await?;
        exchange_rate::Entity::update_many()
            .col_expr(exchange_rate::Column::IsActive, Expr::value(false))
            .filter(exchange_rate::Column::FromCurrency.eq(rate.from_currency.as_str()))
            .filter(exchange_rate::Column::ToCurrency.eq(rate.to_currency.as_str()))
            .filter(exchange_rate::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;
        let saved = rate.into_active_model().reset_all().insert(&txn).await?;
        txn.commit().await?;
        Ok(saved)
    }

    async fn list_rates(&self, active_only: bool) -> RepoResult<Vec<exchange_rate::Model>> {
        let mut q = exchange_rate::Entity::find();
        if active_only {
            q = q.filter(exchange_rate::Column::IsActive.eq(true));
        }
        Ok(q.order_by_asc(exchange_rate::Column::FromCurrency)
            .order_by_asc(exchange_rate::Column::ToCurrency)
            .order_by_desc(exchange_rate::Column::EffectiveDate)
            .all(&self.db)
            .await?)
    }
}

#[async_trait]
impl ProfileRepository for SeaOrmRepository {
    async fn find_profile_by_user(&self, user_id: Uuid) -> RepoResult<Option<profile::Model>> {
        Ok(profile::Entity::find().filter(profile::Column::UserId.eq(user_id)).one(&self.db).await?)
    }

    async fn insert_profile(&self, profile: profile::Model) -> RepoResult<profile::Model> {
        Ok(profile.into_active_model().reset_all().insert(&self.db).await?)
    }

    async fn update_profile(&self, profile: profile::Model) -> RepoResult<profile::Model> {
        Ok(profile.into_active_model().reset_all().update(&self.db).await?)
    }

    async fn delete_profile_by_user(&self, user_id: Uuid) -> RepoResult<bool> {
        let res = profile::Entity::delete_many().filter(profile::Column::UserId.eq(user_id)).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    async fn increment_view_count(&self, profile_id: Uuid) -> RepoResult<()> {
        profile::Entity::update_many()
            .col_expr(profile::Column::ViewCount, Expr::col(profile::Column::ViewCount).add(1))
            .filter(profile::Column::Id.eq(profile_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn search_profiles(&self, filter: &ProfileFilter) -> RepoResult<Vec<profile::Model>> {
        let mut q = profile::Entity::find()
            .filter(profile::Column::TenantId.eq(filter.tenant_id))
            .filter(profile::Column::Role.eq(filter.role.as_str()));
        if filter.public_only {
            q = q.filter(profile::Column::IsPublic.eq(true));
        }
        if let Some(min) = filter.min_rate {
            q = q.filter(profile::Column::HourlyRate.gte(min));
        }
        if let Some(max) = filter.max_rate {
            q = q.filter(profile::Column::HourlyRate.lte(max));
        }
        if let Some(min) = filter.min_rating {
            q = q.filter(profile::Column::Rating.gte(min));
        }
        if let Some(min) = filter.min_experience {
            q = q.filter(profile::Column::YearsExperience.gte(min));
        }
        if let Some(a) = filter.availability {
            q = q.filter(profile::Column::Availability.eq(a.as_str()));
        }
        // text, location and skills are case-insensitive and checked in memory
        let rows = q.all(&self.db).await?;
        Ok(rows.into_iter().filter(|p| filter.matches(p)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use chrono::Utc;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn budget_with_milestones_is_created_and_deleted_atomically() -> anyhow::Result<()> {
        let Some(db) = get_db().await? else { return Ok(()) };
        let repo = SeaOrmRepository::new(db);
        let tid = Uuid::new_v4();
        repo.ensure_tenant(tid).await?;
        let client = repo.create_user(tid, &format!("c{}@example.com", Uuid::new_v4().simple()), "Client", UserRole::Client).await?;

        let now: DateTime<FixedOffset> = Utc::now().into();
        let job = repo
            .insert_job(job::Model {
                id: Uuid::new_v4(),
                tenant_id: tid,
                client_id: client.id,
                developer_id: None,
                title: "Build API".into(),
                description: None,
                status: "open".into(),
                created_at: now,
                updated_at: now,
            })
            .await?;
        let b = budget::Model {
            id: Uuid::new_v4(),
            tenant_id: tid,
            job_id: job.id,
            budget_type: "MILESTONE".into(),
            amount: Decimal::new(500000, 2),
            currency: "USD".into(),
            status: "DRAFT".into(),
            hourly_rate: None,
            estimated_hours: None,
            description: None,
            created_by: client.id,
            created_at: now,
            updated_at: now,
        };
        let m = milestone::Model {
            id: Uuid::new_v4(),
            budget_id: b.id,
            title: "Design".into(),
            description: None,
            amount: Decimal::new(500000, 2),
            percentage: Decimal::new(100, 0),
            status: "PENDING".into(),
            due_date: None,
            position: 0,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        let (saved, ms) = repo.create_budget_with_milestones(b, vec![m]).await?;
        assert_eq!(ms.len(), 1);
        assert_eq!(repo.find_budget_by_job(job.id).await?.map(|x| x.id), Some(saved.id));

        let duplicate = budget::Model { id: Uuid::new_v4(), ..saved.clone() };
        let err = repo.create_budget_with_milestones(duplicate, vec![]).await.unwrap_err();
        assert!(matches!(&err, ServiceError::Validation(m) if m == "Budget already exists for this job"), "{err:?}");

        assert!(repo.delete_budget(saved.id).await?);
        assert!(repo.list_milestones(saved.id).await?.is_empty());
        Ok(())
    }

    #[test]
    fn other_insert_failures_stay_storage_errors() {
        let err = budget_insert_err(sea_orm::DbErr::RecordNotInserted);
        assert!(matches!(err, ServiceError::Db(_)));
    }
}
