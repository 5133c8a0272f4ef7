use clap::Parser;
use tracing::info;

use client::{App, CliArgs, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so replies on stdout stay readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenv::dotenv();

    let args = CliArgs::parse();
    let config = ClientConfig::from_env().with_args(&args);
    info!("Starting chat client against {}", config.api_url);

    let app = App::new(config, std::io::stdout()).map_err(|e| anyhow::anyhow!(e.notice()))?;
    app.run_stdin().await
}
