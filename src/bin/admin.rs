//! CLI administration tool for urlshrink.
//!
//! Inspects a storage backend directly, without going through the HTTP
//! server, and computes short codes offline.
//!
//! # Usage
//!
//! ```bash
//! # Compute the short code for a URL
//! cargo run --bin admin -- code https://example.com
//!
//! # Check that storage answers
//! cargo run --bin admin -- --dsn postgres://localhost/urls ping
//!
//! # Show live URL and user counts
//! cargo run --bin admin -- --file ./records.json stats
//!
//! # List a user's live URLs
//! cargo run --bin admin -- --file ./records.json list 4f1c...
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

use urlshrink::application::services::url_service::PING_TIMEOUT;
use urlshrink::config::StorageBackend;
use urlshrink::domain::repositories::UrlRepository;
use urlshrink::server::open_repository;
use urlshrink::utils::short_code::{
    DEFAULT_CODE_LENGTH, MAX_CODE_LENGTH, hash_to_short_with_attempt,
};
use urlshrink::utils::url_validator::validate_url;

#[derive(Parser)]
#[command(name = "admin")]
#[command(about = "urlshrink administration tool", long_about = None)]
#[command(version)]
struct Cli {
    /// PostgreSQL connection string
    #[arg(short, long, env = "DATABASE_DSN", global = true)]
    dsn: Option<String>,

    /// Path to the JSON-lines storage file
    #[arg(short, long, env = "FILE_STORAGE_PATH", global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the short code of a URL without touching storage
    Code {
        /// URL to encode (http or https)
        url: String,

        /// Code length (1-11)
        #[arg(short, long, default_value_t = DEFAULT_CODE_LENGTH)]
        length: usize,

        /// Collision attempt number; 0 hashes the URL itself
        #[arg(short, long, default_value_t = 0)]
        attempt: u32,
    },

    /// Check that storage answers
    Ping,

    /// Show storage statistics
    Stats,

    /// List live URLs owned by a user
    List {
        /// Owner id as carried in the user token
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Code {
            url,
            length,
            attempt,
        } => handle_code(&url, length, attempt),
        Commands::Ping => handle_ping(connect(cli.dsn, cli.file).await?).await,
        Commands::Stats => handle_stats(connect(cli.dsn, cli.file).await?).await,
        Commands::List { user_id } => {
            handle_list(connect(cli.dsn, cli.file).await?, &user_id).await
        }
    }
}

/// Opens the backend named on the command line. PostgreSQL wins over a file.
async fn connect(dsn: Option<String>, file: Option<PathBuf>) -> Result<Arc<dyn UrlRepository>> {
    let backend = match (dsn, file) {
        (Some(dsn), _) if !dsn.trim().is_empty() => StorageBackend::Postgres(dsn),
        (_, Some(path)) => StorageBackend::File(path),
        _ => bail!("No storage configured: pass --dsn or --file"),
    };

    open_repository(backend, 1).await
}

fn handle_code(url: &str, length: usize, attempt: u32) -> Result<()> {
    if !(1..=MAX_CODE_LENGTH).contains(&length) {
        bail!("Code length must be between 1 and {MAX_CODE_LENGTH}");
    }
    let url = validate_url(url).context("Invalid URL")?;

    let code = hash_to_short_with_attempt(url, attempt, length);

    println!("{}", "🔗 Short code".bright_blue().bold());
    println!();
    println!("  URL:     {}", url.cyan());
    if attempt > 0 {
        println!("  Attempt: {}", attempt.to_string().bright_black());
    }
    println!("  Code:    {}", code.bright_yellow().bold());
    println!();

    Ok(())
}

async fn handle_ping(repo: Arc<dyn UrlRepository>) -> Result<()> {
    match repo.ping(PING_TIMEOUT).await {
        Ok(()) => {
            println!("{}", "✅ Storage is reachable".green().bold());
            Ok(())
        }
        Err(e) => {
            println!("{}", "❌ Storage did not answer".red().bold());
            Err(e).context("Ping failed")
        }
    }
}

/// Displays live URL and distinct user counts.
async fn handle_stats(repo: Arc<dyn UrlRepository>) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let stats = repo.stats().await.context("Failed to read statistics")?;

    println!(
        "  URLs:  {}",
        stats.urls.to_string().bright_white().bold()
    );
    println!(
        "  Users: {}",
        stats.users.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Prints a table of the user's live URLs in creation order.
async fn handle_list(repo: Arc<dyn UrlRepository>, user_id: &str) -> Result<()> {
    println!("{}", "📋 User URLs".bright_blue().bold());
    println!();

    let records = repo
        .find_by_user(user_id)
        .await
        .context("Failed to list URLs")?;

    if records.is_empty() {
        println!("{}", "  No URLs found".yellow());
        return Ok(());
    }

    println!(
        "  {:<12} {}",
        "Code".bright_white().bold(),
        "Original URL".bright_white().bold()
    );
    println!("  {}", "─".repeat(75).bright_black());

    for record in &records {
        println!("  {:<12} {}", record.short.cyan(), record.original);
    }

    println!();
    println!(
        "  Total: {}",
        records.len().to_string().bright_white().bold()
    );
    println!();

    Ok(())
}
