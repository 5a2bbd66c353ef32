//! Create `budget` table.
//!
//! One budget per job (unique `job_id`); money columns are NUMERIC(14, 2).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Budget::Table)
                    .if_not_exists()
                    .col(uuid(Budget::Id).primary_key())
                    .col(uuid(Budget::TenantId).not_null())
                    .col(uuid(Budget::JobId).unique_key().not_null())
                    .col(string_len(Budget::BudgetType, 16).not_null())
                    .col(decimal_len(Budget::Amount, 14, 2).not_null())
                    .col(string_len(Budget::Currency, 3).not_null())
                    .col(string_len(Budget::Status, 16).not_null())
                    .col(decimal_len_null(Budget::HourlyRate, 14, 2))
                    .col(decimal_len_null(Budget::EstimatedHours, 10, 2))
                    .col(text_null(Budget::Description))
                    .col(uuid(Budget::CreatedBy).not_null())
                    .col(timestamp_with_time_zone(Budget::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Budget::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budget_job")
                            .from(Budget::Table, Budget::JobId)
                            .to(Job::Table, Job::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Budget::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Budget {
    Table,
    Id,
    TenantId,
    JobId,
    BudgetType,
    Amount,
    Currency,
    Status,
    HourlyRate,
    EstimatedHours,
    Description,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Job { Table, Id }
