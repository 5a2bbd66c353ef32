//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20220101_000011_create_tenant;
mod m20220101_000012_create_user;
mod m20220101_000018_create_user_credentials;
mod m20240301_000020_create_job;
mod m20240301_000021_create_budget;
mod m20240301_000022_create_milestone;
mod m20240301_000023_create_payment;
mod m20240301_000024_create_exchange_rate;
mod m20240301_000025_create_profile;
mod m20220101_000002_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20220101_000011_create_tenant::Migration),
            Box::new(m20220101_000012_create_user::Migration),
            Box::new(m20220101_000018_create_user_credentials::Migration),
            Box::new(m20240301_000020_create_job::Migration),
            Box::new(m20240301_000021_create_budget::Migration),
            Box::new(m20240301_000022_create_milestone::Migration),
            Box::new(m20240301_000023_create_payment::Migration),
            Box::new(m20240301_000024_create_exchange_rate::Migration),
            Box::new(m20240301_000025_create_profile::Migration),
            // Indexes should always be applied last
            Box::new(m20220101_000002_add_indexes::Migration),
        ]
    }
}
