//! Trainwatch - conversational train ticket search with price monitoring

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize logging; stdout belongs to the console transport
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trainwatch=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Trainwatch v{}", env!("CARGO_PKG_VERSION"));

    // Run CLI
    trainwatch::cli::run()?;

    Ok(())
}
