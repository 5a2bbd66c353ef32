use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::{init_logging, LogFormat};
use configs::{AppConfig, ServerConfig};
use dotenvy::dotenv;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes;
use crate::state::{ServerAuthConfig, ServerState};
use service::{
    notification::LogNotifier,
    repo::{Repository, SeaOrmRepository},
    runtime,
    storage::{self, StorageService},
};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(server: &ServerConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", server.host, server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address {}:{}: {e}", server.host, server.port)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
    }
    info!(event = "shutdown_signal", "draining connections");
}

/// Wire repositories, storage and services into a router for the given config.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    runtime::ensure_env(&cfg.storage.local_root)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None)
        .await
        .map_err(|e| StartupError::Runtime(format!("migrations failed: {e}")))?;
    let repo: Arc<dyn Repository> = Arc::new(SeaOrmRepository::new(db));

    let backend = storage::from_config(&cfg.storage).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let storage = Arc::new(StorageService::new(backend, cfg.storage.max_upload_bytes));

    let state = ServerState::new(
        repo,
        storage,
        Arc::new(LogNotifier),
        ServerAuthConfig {
            jwt_secret: cfg.auth.jwt_secret.clone(),
            token_ttl_hours: cfg.auth.token_ttl_hours,
        },
        cfg.storage.max_upload_bytes,
    );
    Ok(routes::build_router(state, build_cors()))
}

/// Public entry: load config, build the app and serve until Ctrl+C.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = AppConfig::load_and_validate()?;
    init_logging(cfg.server.log_format.parse::<LogFormat>().unwrap_or_default());

    let app = build_app(&cfg).await?;

    let addr = bind_addr(&cfg.server)?;
    info!(%addr, storage = %cfg.storage.provider, "starting server crate");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_rejects_bad_host() {
        let ok = ServerConfig { host: "127.0.0.1".into(), port: 8080, worker_threads: None, log_format: "compact".into() };
        assert_eq!(bind_addr(&ok).unwrap().port(), 8080);
        let bad = ServerConfig { host: "not a host".into(), ..ok };
        assert!(matches!(bind_addr(&bad), Err(StartupError::InvalidConfig(_))));
    }
}
