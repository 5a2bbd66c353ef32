#![cfg(test)]
//! Fixtures shared by service tests.

use std::sync::Arc;

use chrono::Utc;
use migration::MigratorTrait;
use models::{job, user::UserRole};
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::actor::Actor;
use crate::repo::{InMemoryRepository, JobRepository};

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Connection to the test database, or `None` when `DATABASE_URL` is unset.
pub async fn get_db() -> Result<Option<DatabaseConnection>, anyhow::Error> {
    if std::env::var("DATABASE_URL").is_err() {
        return Ok(None);
    }
    MIGRATED
        .get_or_try_init(|| async {
            let db = models::db::connect().await?;
            migration::Migrator::up(&db, None).await?;
            Ok::<(), anyhow::Error>(())
        })
        .await?;
    Ok(Some(models::db::connect().await?))
}

/// One tenant with a client, an assigned developer, an outsider developer and an admin.
pub struct Marketplace {
    pub repo: Arc<InMemoryRepository>,
    pub tenant_id: Uuid,
    pub client: Actor,
    pub developer: Actor,
    pub other_developer: Actor,
    pub admin: Actor,
    pub job: job::Model,
}

impl Marketplace {
    pub async fn new() -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let tenant_id = Uuid::new_v4();
        let client = repo.seed_user(tenant_id, "client@example.com", "Client", UserRole::Client).await;
        let dev = repo.seed_user(tenant_id, "dev@example.com", "Dev", UserRole::Developer).await;
        let other = repo.seed_user(tenant_id, "other@example.com", "Other", UserRole::Developer).await;
        let admin = repo.seed_user(tenant_id, "admin@example.com", "Admin", UserRole::Admin).await;
        let now = Utc::now().into();
        let job = repo
            .insert_job(job::Model {
                id: Uuid::new_v4(),
                tenant_id,
                client_id: client.id,
                developer_id: Some(dev.id),
                title: "Marketplace MVP".into(),
                description: Some("Build the first release".into()),
                status: "in_progress".into(),
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("insert job");
        Self {
            repo,
            tenant_id,
            client: Actor::new(client.id, tenant_id, UserRole::Client),
            developer: Actor::new(dev.id, tenant_id, UserRole::Developer),
            other_developer: Actor::new(other.id, tenant_id, UserRole::Developer),
            admin: Actor::new(admin.id, tenant_id, UserRole::Admin),
            job,
        }
    }
}
