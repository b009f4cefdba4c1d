use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tidewatch::catalog::Catalog;
use tidewatch::config::load_config;
use tidewatch::persistence::MemoryProfileStore;
use tidewatch::tilemap::{Atlas, Tilemap};
use tidewatch::{GameServer, Simulation};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config();
    let map = match std::env::args().nth(1) {
        Some(path) => {
            Tilemap::load(&path).with_context(|| format!("loading level from {path}"))?
        }
        None => {
            tracing::info!("no level given, using the built-in test level");
            Tilemap::test_level()
        }
    };

    let sim = Simulation::new(Atlas::single(map), Catalog::standard(), config);
    let server = GameServer::new(sim, Arc::new(MemoryProfileStore::new()));
    let handle = server.handle();
    let loop_task = tokio::spawn(server.run());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    tracing::info!("ctrl-c received, shutting down");
    handle.shutdown()?;
    loop_task.await.context("tick loop panicked")?;
    Ok(())
}
