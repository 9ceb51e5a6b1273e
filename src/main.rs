use achievement_ledger::api;
use achievement_ledger::config::Config;
use achievement_ledger::ledger::Ledger;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Configuration, resolved once:
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!("Usage: achievement-api [--bind <ip:port>] [--store-file <path>]");
            std::process::exit(2);
        }
    };
    tracing::info!("Storage configuration: {:?}", config.storage);

    // 2. Ledger over the selected strategy:
    let ledger = Ledger::open(&config.storage).await?;

    // 3. HTTP Router:
    let app = api::router(ledger);

    // 4. Start HTTP server:
    tracing::info!("Achievement API listening on {}", config.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Achievement API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
