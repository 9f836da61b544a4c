//! chatwire terminal client entry point.
//!
//! Loads configuration and the persisted identity, spawns the session
//! task, and hands the terminal over to the console adapter.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use chatwire::config::ClientConfig;
use chatwire::console::{self, Console};
use chatwire::domain::EventBus;
use chatwire::metrics::SessionMetrics;
use chatwire::persistence::IdentityStore;
use chatwire::session::{ConnectionManager, SessionSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ClientConfig::from_env()?;

    // Load or collect the identity
    let store = IdentityStore::new(&config.identity_file);
    let client_id = match store.load() {
        Some(id) => id,
        None => {
            let Some(id) = console::prompt_identity().await else {
                return Ok(());
            };
            store.save(&id);
            id
        }
    };
    tracing::info!(client_id = %client_id, endpoint = %config.server_url, "starting chatwire");

    // Build the session
    let bus = EventBus::new(config.event_bus_capacity);
    let metrics = Arc::new(SessionMetrics::new());
    let settings = SessionSettings::from_config(&config)?;
    let handle = ConnectionManager::spawn(
        settings,
        client_id.clone(),
        bus.clone(),
        Arc::clone(&metrics),
    );
    handle.connect().await?;

    // Run the console until /quit, EOF, or Ctrl-C
    let console = Console::new(handle.clone(), client_id);
    tokio::select! {
        () = console.run(bus.subscribe()) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, disconnecting");
        }
    }

    let _ = handle.disconnect().await;
    tracing::info!(metrics = ?metrics.snapshot(), "session finished");

    Ok(())
}
