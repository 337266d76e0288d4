//! Startup orchestration.
//!
//! Fail fast: a bad config file or an unbindable address ends the process.
//! A missing shop domain or token does not; those surface per request.

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::loader::{load_config, load_from_env, ConfigError};
use crate::config::watcher::ConfigWatcher;
use crate::config::RelayConfig;
use crate::http::RelayServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};

/// Path of the optional config file.
pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "relay.toml";

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[error("server: {0}")]
    Serve(#[from] std::io::Error),
}

/// Config file to load: `RELAY_CONFIG` if set, else `relay.toml` when it
/// exists in the working directory.
pub fn config_path() -> Option<PathBuf> {
    match std::env::var(ENV_CONFIG_PATH) {
        Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path)),
        _ => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        }
    }
}

/// Load, initialize, serve until a signal arrives.
pub async fn run() -> Result<(), StartupError> {
    let path = config_path();
    let config = match &path {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?path,
        "shop-media-relay starting"
    );
    log_summary(&config);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.server.bind_address.clone(),
            source,
        })?;

    // Held for the life of the server; dropping it stops the watch.
    let (updates, _watcher) = match &path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (updates, Some(handle)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload unavailable");
                    (updates, None)
                }
            }
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let shutdown = Shutdown::new();
    let server = RelayServer::new(config);
    let serving = tokio::spawn(server.run(listener, updates, shutdown.subscribe()));

    signals::wait_for_signal().await;
    shutdown.trigger();

    match serving.await {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "Server task failed"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn log_summary(config: &RelayConfig) {
    tracing::info!(
        bind_address = %config.server.bind_address,
        endpoint = config.shop.endpoint().as_deref().unwrap_or("<unset>"),
        rate_limit_enabled = config.rate_limit.enabled,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        removal_enabled = config.removal.admin_password.is_some(),
        "Configuration loaded"
    );
}
