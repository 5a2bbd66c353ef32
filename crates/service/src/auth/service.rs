use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use models::user::UserRole;
use rand::rngs::OsRng;
use tracing::{info, debug, instrument};
use uuid::Uuid;

use super::domain::{RegisterInput, LoginInput, AuthUser, AuthSession};
use super::errors::AuthError;
use super::repository::AuthRepository;
use super::token::issue_token;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub password_algorithm: String,
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: None, password_algorithm: "argon2".into(), token_ttl_hours: 12 }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository + ?Sized> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository + ?Sized> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Register a new client or developer account with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, domain::RegisterInput};
    /// use service::repo::InMemoryRepository;
    /// use models::user::UserRole;
    /// use std::sync::Arc;
    /// let repo = Arc::new(InMemoryRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::default());
    /// let input = RegisterInput { tenant_id: uuid::Uuid::new_v4(), email: "user@example.com".into(), name: "Test".into(), password: "Secret123".into(), role: UserRole::Client };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "user@example.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email, tenant_id = %input.tenant_id, role = %input.role))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        if input.role == UserRole::Admin {
            return Err(AuthError::Validation("admin accounts cannot self-register".into()));
        }
        models::user::validate_email(&input.email)?;
        models::user::validate_name(&input.name)?;
        if input.password.len() < 8 {
            return Err(AuthError::Validation("password too short (>=8)".into()));
        }
        let email = input.email.trim().to_ascii_lowercase();
        if let Some(existing) = self.repo.find_user_by_tenant_email(input.tenant_id, &email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        self.repo.ensure_tenant(input.tenant_id).await?;
        let user = self.repo.create_user(input.tenant_id, &email, &input.name, input.role).await?;
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        let _cred = self.repo.upsert_password(user.id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %user.id, tenant_id = %user.tenant_id, email = %user.email, "user_registered");
        Ok(user)
    }

    /// Authenticate a user and issue a token when a secret is configured.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, domain::{RegisterInput, LoginInput}};
    /// use service::repo::InMemoryRepository;
    /// use models::user::UserRole;
    /// use std::sync::Arc;
    /// let repo = Arc::new(InMemoryRepository::default());
    /// let cfg = AuthConfig { jwt_secret: Some("secret-secret-secret".into()), ..AuthConfig::default() };
    /// let svc = AuthService::new(repo, cfg);
    /// let tid = uuid::Uuid::new_v4();
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { tenant_id: tid, email: "u@e.com".into(), name: "N".into(), password: "Passw0rd".into(), role: UserRole::Developer }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { tenant_id: tid, email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// assert!(session.token.is_some());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email, tenant_id = %input.tenant_id))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let email = input.email.trim().to_ascii_lowercase();
        let user = self.repo
            .find_user_by_tenant_email(input.tenant_id, &email)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::Unauthorized);
        }

        let token = match &self.cfg.jwt_secret {
            Some(secret) => Some(issue_token(secret, &user, self.cfg.token_ttl_hours)?),
            None => None,
        };
        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user, token })
    }

    pub async fn me(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
        self.repo.find_auth_user(user_id).await?.ok_or(AuthError::NotFound)
    }
}
