//! Create `profile` table.
//!
//! One profile per user. Role-specific columns are nullable; `skills` is a JSON array.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profile::Table)
                    .if_not_exists()
                    .col(uuid(Profile::Id).primary_key())
                    .col(uuid(Profile::UserId).unique_key().not_null())
                    .col(uuid(Profile::TenantId).not_null())
                    .col(string_len(Profile::Role, 16).not_null())
                    .col(string_len(Profile::DisplayName, 100).not_null())
                    .col(text_null(Profile::Bio))
                    .col(string_len_null(Profile::AvatarUrl, 512))
                    .col(string_len_null(Profile::Location, 200))
                    .col(string_len_null(Profile::Timezone, 64))
                    .col(string_len_null(Profile::Website, 512))
                    .col(boolean(Profile::IsPublic).not_null())
                    .col(string_len_null(Profile::Title, 120))
                    .col(json_binary(Profile::Skills).not_null())
                    .col(decimal_len_null(Profile::HourlyRate, 10, 2))
                    .col(integer_null(Profile::YearsExperience))
                    .col(string_len_null(Profile::Availability, 16))
                    .col(string_len_null(Profile::GithubUrl, 512))
                    .col(string_len_null(Profile::LinkedinUrl, 512))
                    .col(string_len_null(Profile::PortfolioUrl, 512))
                    .col(string_len_null(Profile::CompanyName, 200))
                    .col(string_len_null(Profile::CompanySize, 32))
                    .col(string_len_null(Profile::Industry, 100))
                    .col(string_len_null(Profile::CompanyWebsite, 512))
                    .col(string_len_null(Profile::Department, 100))
                    .col(double_null(Profile::Rating))
                    .col(integer(Profile::CompletedJobs).not_null())
                    .col(big_integer(Profile::ViewCount).not_null())
                    .col(timestamp_with_time_zone(Profile::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Profile::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profile_user")
                            .from(Profile::Table, Profile::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Profile::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Profile {
    Table,
    Id,
    UserId,
    TenantId,
    Role,
    DisplayName,
    Bio,
    AvatarUrl,
    Location,
    Timezone,
    Website,
    IsPublic,
    Title,
    Skills,
    HourlyRate,
    YearsExperience,
    Availability,
    GithubUrl,
    LinkedinUrl,
    PortfolioUrl,
    CompanyName,
    CompanySize,
    Industry,
    CompanyWebsite,
    Department,
    Rating,
    CompletedJobs,
    ViewCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }
