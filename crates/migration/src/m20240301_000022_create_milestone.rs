//! Create `milestone` table; rows are removed together with their budget.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Milestone::Table)
                    .if_not_exists()
                    .col(uuid(Milestone::Id).primary_key())
                    .col(uuid(Milestone::BudgetId).not_null())
                    .col(string_len(Milestone::Title, 200).not_null())
                    .col(text_null(Milestone::Description))
                    .col(decimal_len(Milestone::Amount, 14, 2).not_null())
                    .col(decimal_len(Milestone::Percentage, 5, 2).not_null())
                    .col(string_len(Milestone::Status, 16).not_null())
                    .col(date_null(Milestone::DueDate))
                    .col(integer(Milestone::Position).not_null())
                    .col(timestamp_with_time_zone_null(Milestone::CompletedAt))
                    .col(timestamp_with_time_zone(Milestone::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Milestone::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_milestone_budget")
                            .from(Milestone::Table, Milestone::BudgetId)
                            .to(Budget::Table, Budget::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Milestone::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Milestone {
    Table,
    Id,
    BudgetId,
    Title,
    Description,
    Amount,
    Percentage,
    Status,
    DueDate,
    Position,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Budget { Table, Id }
