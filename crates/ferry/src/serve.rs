// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ferry serve` command implementation.
//!
//! Opens storage, verifies the configured credential, starts the relay and
//! runs until SIGINT/SIGTERM, logging a status line every minute.

use std::sync::Arc;
use std::time::Duration;

use ferry_config::model::FerryConfig;
use ferry_core::{FerryError, HealthStatus, PlatformAdapter, PluginAdapter};
use ferry_relay::{recording, shutdown, RelayEngine, SessionState};
use ferry_storage::SqliteStorage;
use ferry_telegram::TelegramClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the relay until a shutdown signal arrives.
pub async fn run_serve(config: FerryConfig) -> Result<(), FerryError> {
    recording::register_metrics();

    let mut session = SessionState::from_config(&config.relay);
    session.ensure_startable()?;

    let storage = Arc::new(SqliteStorage::open(config.storage.clone()).await?);
    let platform = Arc::new(TelegramClient::new(&config.telegram)?);
    info!(
        api_url = platform.base_url(),
        database = %config.storage.database_path,
        "adapters ready"
    );

    let engine = RelayEngine::new(platform.clone(), storage.clone(), &config.relay);
    let cancel = shutdown::install_signal_handler();
    serve_engine(&engine, &mut session, &*platform, cancel).await?;

    storage.shutdown().await?;
    platform.shutdown().await?;
    info!("ferry stopped");
    Ok(())
}

/// Verifies, starts, and supervises the relay until `cancel` fires.
///
/// A rejected credential is fatal. An unreachable platform is not: the relay
/// starts anyway and every cycle retries.
async fn serve_engine(
    engine: &RelayEngine,
    session: &mut SessionState,
    platform: &dyn PlatformAdapter,
    cancel: CancellationToken,
) -> Result<(), FerryError> {
    match engine.verify_credential(&session.credential).await {
        Ok(identity) => session.resolved_name = Some(identity.resolved_name),
        Err(e @ FerryError::Auth { .. }) => return Err(e),
        Err(e) => warn!(error = %e, "could not verify credential; relaying anyway"),
    }

    engine.start_relay(session.clone()).await?;
    info!(
        bot = session.resolved_name.as_deref().unwrap_or("<unverified>"),
        "relay running"
    );

    let mut status = tokio::time::interval(STATUS_INTERVAL);
    status.tick().await;
    loop {
        tokio::select! {
            _ = status.tick() => log_status(engine, platform).await,
            _ = cancel.cancelled() => break,
        }
    }

    engine.shutdown().await;
    Ok(())
}

async fn log_status(engine: &RelayEngine, platform: &dyn PlatformAdapter) {
    let session = engine.session().await;
    let state = engine.relay_state().await;
    let logged = engine.get_messages().await.map(|m| m.len()).unwrap_or_default();
    info!(
        %state,
        progress = engine.get_progress(),
        watermark = session.watermark,
        logged,
        "relay status"
    );

    match platform.health_check().await {
        Ok(HealthStatus::Healthy) => {}
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(%reason, "platform health check failed");
        }
        Err(e) => warn!(error = %e, "platform health check errored"),
    }
}
