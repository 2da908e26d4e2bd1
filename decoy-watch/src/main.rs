use clap::Parser;
use decoy_watch::config::AppConfig;
use decoy_watch::services::ServiceContainer;
use decoy_watch::{logging, panic_hook};
use tracing::info;

/// Decoy check status monitor.
#[derive(Debug, Parser)]
#[command(name = "decoy-watch", version, about)]
struct Args {
    /// Directory for rolling log files (overrides LOG_DIR).
    #[arg(long)]
    log_dir: Option<String>,

    /// Status API port (overrides API_PORT).
    #[arg(long)]
    api_port: Option<u16>,

    /// Log filter directive, e.g. `decoy_watch=debug` (overrides RUST_LOG).
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(log_dir) = args.log_dir {
        config.log_dir = log_dir;
    }
    if let Some(port) = args.api_port {
        config.api_port = port;
    }

    let (logging_config, _log_guard) = logging::init_logging(&config.log_dir)?;
    panic_hook::install(&config.log_dir);
    if let Some(directive) = &args.log_filter {
        logging_config.set_filter(directive)?;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        target_channel = %config.target_channel_id,
        output_channel = %config.output_channel_id,
        check_interval = config.check_interval_secs,
        "Starting decoy-watch"
    );

    let container = ServiceContainer::new(config)?.with_logging_config(logging_config);
    container.start()?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    container.shutdown().await;

    Ok(())
}
