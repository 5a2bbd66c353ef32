use std::sync::Arc;

use service::{
    auth::service::{AuthConfig, AuthService},
    budget::{BudgetService, CurrencyService},
    job::JobService,
    notification::Notifier,
    profile::{ProfileService, SearchService},
    repo::Repository,
    storage::StorageService,
};

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

/// Shared handler state. Every service sits behind an `Arc` so cloning per request is cheap.
#[derive(Clone)]
pub struct ServerState {
    pub auth_cfg: ServerAuthConfig,
    pub auth: Arc<AuthService<dyn Repository>>,
    pub jobs: Arc<JobService>,
    pub budgets: Arc<BudgetService>,
    pub currency: Arc<CurrencyService>,
    pub profiles: Arc<ProfileService>,
    pub search: Arc<SearchService>,
    pub storage: Arc<StorageService>,
    pub max_upload_bytes: usize,
}

impl ServerState {
    pub fn new(
        repo: Arc<dyn Repository>,
        storage: Arc<StorageService>,
        notifier: Arc<dyn Notifier>,
        auth_cfg: ServerAuthConfig,
        max_upload_bytes: usize,
    ) -> Self {
        let auth = AuthService::new(
            Arc::clone(&repo),
            AuthConfig {
                jwt_secret: Some(auth_cfg.jwt_secret.clone()),
                password_algorithm: "argon2".into(),
                token_ttl_hours: auth_cfg.token_ttl_hours,
            },
        );
        let currency = Arc::new(CurrencyService::new(Arc::clone(&repo)));
        Self {
            auth_cfg,
            auth: Arc::new(auth),
            jobs: Arc::new(JobService::new(Arc::clone(&repo))),
            budgets: Arc::new(BudgetService::new(Arc::clone(&repo), Arc::clone(&currency), notifier)),
            currency,
            profiles: Arc::new(ProfileService::new(Arc::clone(&repo), Arc::clone(&storage))),
            search: Arc::new(SearchService::new(repo)),
            storage,
            max_upload_bytes,
        }
    }
}
