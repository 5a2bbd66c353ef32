use async_trait::async_trait;
use models::user::UserRole;
use uuid::Uuid;

use super::domain::{AuthUser, Credentials};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
///
/// Implemented by `repo::SeaOrmRepository` and `repo::InMemoryRepository`.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_tenant_email(&self, tenant_id: Uuid, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_auth_user(&self, user_id: Uuid) -> Result<Option<AuthUser>, AuthError>;
    async fn create_user(&self, tenant_id: Uuid, email: &str, name: &str, role: UserRole) -> Result<AuthUser, AuthError>;
    /// Create the tenant row on first registration; no-op when it exists.
    async fn ensure_tenant(&self, tenant_id: Uuid) -> Result<(), AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;
}
