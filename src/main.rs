//! dspace-submission-worker - submits packages from a queue into a DSpace
//! repository and reports outcomes on a per-request result queue.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dsw::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dsw=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = cli::run().await {
        tracing::error!(error = %err, "worker halted");
        std::process::exit(1);
    }

    Ok(())
}
