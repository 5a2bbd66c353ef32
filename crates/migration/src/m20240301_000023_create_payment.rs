//! Create `payment` table.
//!
//! `amount` is in the payment currency; `budget_amount` is the same value converted
//! into the budget currency at `exchange_rate`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(uuid(Payment::Id).primary_key())
                    .col(uuid(Payment::BudgetId).not_null())
                    .col(uuid(Payment::MilestoneId).not_null())
                    .col(decimal_len(Payment::Amount, 14, 2).not_null())
                    .col(string_len(Payment::Currency, 3).not_null())
                    .col(decimal_len(Payment::ExchangeRate, 18, 8).not_null())
                    .col(decimal_len(Payment::BudgetAmount, 14, 2).not_null())
                    .col(string_len(Payment::Status, 16).not_null())
                    .col(uuid(Payment::PayerId).not_null())
                    .col(uuid_null(Payment::PayeeId))
                    .col(string_len(Payment::Reference, 64).unique_key().not_null())
                    .col(text_null(Payment::Notes))
                    .col(timestamp_with_time_zone_null(Payment::ProcessedAt))
                    .col(timestamp_with_time_zone(Payment::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Payment::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_budget")
                            .from(Payment::Table, Payment::BudgetId)
                            .to(Budget::Table, Budget::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_milestone")
                            .from(Payment::Table, Payment::MilestoneId)
                            .to(Milestone::Table, Milestone::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Payment::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Payment {
    Table,
    Id,
    BudgetId,
    MilestoneId,
    Amount,
    Currency,
    ExchangeRate,
    BudgetAmount,
    Status,
    PayerId,
    PayeeId,
    Reference,
    Notes,
    ProcessedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Budget { Table, Id }

#[derive(DeriveIden)]
enum Milestone { Table, Id }
