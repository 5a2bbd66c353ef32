//! Create `exchange_rate` table.
//!
//! Old rows are deactivated rather than deleted so rate history stays queryable.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ExchangeRate::Table)
                    .if_not_exists()
                    .col(uuid(ExchangeRate::Id).primary_key())
                    .col(string_len(ExchangeRate::FromCurrency, 3).not_null())
                    .col(string_len(ExchangeRate::ToCurrency, 3).not_null())
                    .col(decimal_len(ExchangeRate::Rate, 18, 8).not_null())
                    .col(timestamp_with_time_zone(ExchangeRate::EffectiveDate).not_null())
                    .col(timestamp_with_time_zone_null(ExchangeRate::ExpiryDate))
                    .col(boolean(ExchangeRate::IsActive).not_null())
                    .col(timestamp_with_time_zone(ExchangeRate::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ExchangeRate::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ExchangeRate {
    Table,
    Id,
    FromCurrency,
    ToCurrency,
    Rate,
    EffectiveDate,
    ExpiryDate,
    IsActive,
    CreatedAt,
}
