//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so binaries can import
//! `service::runtime::ensure_env` without depending directly on `common`.

/// Ensure the local upload directory exists.
pub async fn ensure_env(data_dir: &str) -> anyhow::Result<()> {
    common::env::ensure_env(data_dir).await
}
