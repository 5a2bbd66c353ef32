//! Create `job` table.
//!
//! A job is posted by a client and may be assigned to one developer; it owns at most one budget.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Job::Table)
                    .if_not_exists()
                    .col(uuid(Job::Id).primary_key())
                    .col(uuid(Job::TenantId).not_null())
                    .col(uuid(Job::ClientId).not_null())
                    .col(uuid_null(Job::DeveloperId))
                    .col(string_len(Job::Title, 200).not_null())
                    .col(text_null(Job::Description))
                    .col(string_len(Job::Status, 32).not_null())
                    .col(timestamp_with_time_zone(Job::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Job::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_tenant")
                            .from(Job::Table, Job::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_client")
                            .from(Job::Table, Job::ClientId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_developer")
                            .from(Job::Table, Job::DeveloperId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Job::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Job { Table, Id, TenantId, ClientId, DeveloperId, Title, Description, Status, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Tenant { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
