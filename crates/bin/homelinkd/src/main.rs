//! # homelinkd — homelink daemon
//!
//! Composition root that wires the controllers, storage and client channel
//! together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (`homelink.toml` plus `HOMELINK_*` overrides)
//! - Install logging
//! - Open the `SQLite` history database and the controller settings file
//! - Build the automation bus and the controller registration table
//! - Boot the registry, construct the hub, serve the axum router
//! - On SIGINT/SIGTERM destroy every controller and persist settings
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod settings;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use homelink_adapter_bridge::BridgeLightsController;
use homelink_adapter_mesh::{MeshConfig, MeshController};
use homelink_adapter_storage_sqlite_sqlx::SqliteHistoryStore;
use homelink_adapter_virtual::networks::{bridge_demo, mesh_demo};
use homelink_adapter_ws_axum::router;
use homelink_adapter_ws_axum::state::AppState;
use homelink_app::automation_bus::InProcessAutomation;
use homelink_app::clients::ConnectedClients;
use homelink_app::context::ControllerContext;
use homelink_app::controllers::general::GeneralController;
use homelink_app::hub::Hub;
use homelink_app::ports::{Controller, HistoryStore, SceneInfo, SettingsStore};
use homelink_app::registry::{BootOutcome, ControllerRegistry, Registration};

use crate::config::{Config, IntegrationsConfig};
use crate::settings::TomlSettingsStore;

const AUTOMATION_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "homelinkd starting");

    // Collaborators
    let db = homelink_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let history: Arc<dyn HistoryStore> = Arc::new(SqliteHistoryStore::new(db.pool().clone()));

    let settings = Arc::new(TomlSettingsStore::load(&config.settings.path)?);
    tracing::info!(path = %settings.path().display(), "settings file");

    let scenes = config
        .scenes
        .iter()
        .map(|scene| SceneInfo::new(&scene.id, &scene.name))
        .collect();
    let automation = Arc::new(InProcessAutomation::new(AUTOMATION_CAPACITY, scenes));
    spawn_trigger_log(&automation);

    // Controllers
    let clients = Arc::new(ConnectedClients::new());
    let ctx = ControllerContext::new(
        Arc::clone(&clients),
        automation,
        history,
        Arc::clone(&settings) as Arc<dyn SettingsStore>,
    );
    let registry = Arc::new(ControllerRegistry::new());
    let booting = registry.boot(registrations(&config.integrations), &ctx);
    tracing::info!(controllers = ?booting.identifiers(), "booting controllers");
    tokio::spawn(async move {
        for (controller, outcome) in booting.finish().await {
            match outcome {
                BootOutcome::Ready => {}
                BootOutcome::Failed(reason) => {
                    tracing::warn!(%controller, %reason, "controller unavailable");
                }
                BootOutcome::Panicked => {
                    tracing::error!(%controller, "controller panicked during boot");
                }
            }
        }
    });

    // HTTP + websocket
    let hub = Arc::new(Hub::new(registry, clients));
    let app = router::build(AppState::new(Arc::clone(&hub)));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "homelinkd listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    hub.shutdown().await;
    if let Err(err) = settings.persist() {
        tracing::error!(error = %err, "failed to persist settings");
    }
    tracing::info!("homelinkd stopped");
    Ok(())
}

/// The controllers this daemon runs, in boot order.
fn registrations(integrations: &IntegrationsConfig) -> Vec<Registration> {
    let mut table = vec![Registration::new("general", || {
        Arc::new(GeneralController::new()) as Arc<dyn Controller>
    })];
    if integrations.mesh_enabled {
        let config = MeshConfig {
            rgbw_scale: integrations.rgbw_scale,
        };
        table.push(Registration::new("mesh", move || {
            Arc::new(MeshController::new(mesh_demo(), config)) as Arc<dyn Controller>
        }));
    }
    if integrations.bridge_enabled {
        table.push(Registration::new("bridge", || {
            Arc::new(BridgeLightsController::new(bridge_demo())) as Arc<dyn Controller>
        }));
    }
    table
}

/// Log published triggers; the automation engine itself runs out of process.
fn spawn_trigger_log(automation: &InProcessAutomation) {
    let mut triggers = automation.subscribe();
    tokio::spawn(async move {
        loop {
            match triggers.recv().await {
                Ok(event) => tracing::debug!(trigger = ?event, "trigger published"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "trigger log lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
