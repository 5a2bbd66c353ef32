use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users: email unique per tenant
        manager
            .create_index(
                Index::create()
                    .name("uniq_user_tenant_email")
                    .table(User::Table)
                    .col(User::TenantId)
                    .col(User::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_job_tenant_client")
                    .table(Job::Table)
                    .col(Job::TenantId)
                    .col(Job::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_milestone_budget")
                    .table(Milestone::Table)
                    .col(Milestone::BudgetId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_milestone")
                    .table(Payment::Table)
                    .col(Payment::MilestoneId)
                    .to_owned(),
            )
            .await?;

        // ExchangeRate: latest active lookup per pair
        manager
            .create_index(
                Index::create()
                    .name("idx_exchange_rate_pair")
                    .table(ExchangeRate::Table)
                    .col(ExchangeRate::FromCurrency)
                    .col(ExchangeRate::ToCurrency)
                    .col(ExchangeRate::IsActive)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profile_role_public")
                    .table(Profile::Table)
                    .col(Profile::Role)
                    .col(Profile::IsPublic)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uniq_user_tenant_email").table(User::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_job_tenant_client").table(Job::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_milestone_budget").table(Milestone::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_payment_milestone").table(Payment::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_exchange_rate_pair").table(ExchangeRate::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_profile_role_public").table(Profile::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum User { Table, TenantId, Email }

#[derive(DeriveIden)]
enum Job { Table, TenantId, ClientId }

#[derive(DeriveIden)]
enum Milestone { Table, BudgetId }

#[derive(DeriveIden)]
enum Payment { Table, MilestoneId }

#[derive(DeriveIden)]
enum ExchangeRate { Table, FromCurrency, ToCurrency, IsActive }

#[derive(DeriveIden)]
enum Profile { Table, Role, IsPublic }
