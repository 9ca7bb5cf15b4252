use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use urlshrink::config::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load(&cli)?;

    init_tracing(&config.log_level, &config.log_format);
    config.print_summary();

    urlshrink::server::run(config).await
}

/// Installs the global subscriber; `format` is `text` or `json`.
fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
