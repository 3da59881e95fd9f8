use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use till_agent::{AlwaysEligible, Config, MemorySettings, Services, init_logger_with_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_logger_with_file(None, config.log_dir.as_deref());

    tracing::info!("Till agent starting...");

    let services = Services::new(
        &config,
        Arc::new(MemorySettings::new()),
        Arc::new(AlwaysEligible),
    );

    // The commerce poller (external collaborator) feeds new orders here
    let (_orders_tx, orders_rx) = mpsc::channel(64);

    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(
        services
            .coordinator
            .clone()
            .run(orders_rx, shutdown.clone()),
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    shutdown.cancel();
    worker.await?;
    services.shutdown().await;

    Ok(())
}
