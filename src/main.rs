//! SuaTalk client demo binary.
//!
//! Checks backend health and, when stored credentials exist, restores the
//! session by refreshing the token pair and fetching the user profile.

#![deny(clippy::all)]

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use suatalk_client::{ApiClient, BrowserNavigator, Config, FileStore, Session};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        // .env file is optional - only log if it's not a "file not found" error
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    init_logging();

    info!("Starting SuaTalk client v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load().context("Failed to load configuration")?;
    info!("Configuration loaded, API base: {}", config.api.base_url);

    let store = FileStore::open_default().context("Failed to open credential store")?;
    let navigator = BrowserNavigator::new(config.auth.login_url.clone());
    let session = Arc::new(Session::new(Arc::new(store), Arc::new(navigator)));

    let client = ApiClient::new(&config, Arc::clone(&session))
        .context("Failed to create API client")?;

    match client.auth().health().await {
        Ok(payload) => info!("Backend healthy: {:?}", payload),
        Err(e) => warn!("Backend health check failed: {}", e),
    }

    if session.has_credentials() {
        if let Err(e) = try_restore_session(&client).await {
            info!("No existing session to restore: {}", e);
        }
    } else {
        info!("No stored credentials, sign-in required");
    }

    Ok(())
}

/// Initialize tracing/logging.
fn init_logging() {
    // Create log directory
    if let Err(e) = init_log_directory() {
        eprintln!("Warning: Could not create log directory: {}", e);
    }

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

/// Create the log directory under the platform data dir.
fn init_log_directory() -> std::io::Result<()> {
    if let Some(data_dir) = dirs::data_local_dir() {
        fs::create_dir_all(data_dir.join("suatalk").join("logs"))?;
    }
    Ok(())
}

/// Try to restore a previous session from the credential store.
async fn try_restore_session(client: &ApiClient) -> Result<()> {
    info!("Attempting to restore previous session");

    client
        .auth()
        .refresh()
        .await
        .context("Failed to refresh token")?;

    let profile = client
        .users()
        .profile()
        .await
        .context("Failed to fetch user profile")?;

    info!(
        "Session restored for {} {}",
        profile.first_name.as_deref().unwrap_or(""),
        profile.last_name.as_deref().unwrap_or("")
    );
    Ok(())
}
