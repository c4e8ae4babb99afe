//! Duel Arena Server
//!
//! WebSocket matchmaking server for dice and rock-paper-scissors duels.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use duel_arena::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ServerConfig::from_env();
    info!("Duel Arena Server v{}", VERSION);
    info!(
        "Max connections: {}, idle timeout: {:?}, queue timeout: {:?}",
        config.max_connections, config.idle_timeout, config.queue_timeout,
    );
    if let Some(seed) = config.rng_seed {
        info!("Using fixed RNG seed {}", seed);
    }

    let server = Arc::new(GameServer::new(config));
    let runner = server.clone();
    let mut handle = tokio::spawn(async move { runner.run().await });

    let finished = tokio::select! {
        result = &mut handle => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match finished {
        Some(result) => result??,
        None => {
            info!("Ctrl-C received, shutting down");
            server.shutdown();
            if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
                warn!("Server did not stop within 5s");
            }
        }
    }

    Ok(())
}
