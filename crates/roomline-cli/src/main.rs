//! roomline terminal client.
//!
//! # Usage
//!
//! ```bash
//! # In-memory session token, two accounts on the in-process server
//! roomline --user alice:secret --user bob:hunter2
//!
//! # Remember the session token between runs
//! roomline --db roomline.redb --user alice:secret
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use roomline_app::{Runtime, RuntimeConfig};
use roomline_cli::LineDriver;
use roomline_client::{MemoryBackend, MemoryCredentialStore, MemoryRoom, RedbCredentialStore};
use roomline_core::HISTORY_PAGE_SIZE;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Line-oriented chat client
#[derive(Parser)]
#[command(name = "roomline")]
#[command(about = "Line-oriented chat client running against an in-process server")]
#[command(version)]
struct Args {
    /// Credential database. Without it the session token is kept in memory
    #[arg(long)]
    db: Option<PathBuf>,

    /// Account on the in-process server, as NAME:PASSWORD (repeatable)
    #[arg(long = "user", value_name = "NAME:PASSWORD", value_parser = parse_account)]
    users: Vec<(String, String)>,

    /// Upper bound on every backend call, in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Messages fetched per history page
    #[arg(long, default_value_t = HISTORY_PAGE_SIZE)]
    page_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn parse_account(value: &str) -> Result<(String, String), String> {
    match value.split_once(':') {
        Some((name, password)) if !name.is_empty() && !password.is_empty() => {
            Ok((name.to_string(), password.to_string()))
        },
        _ => Err("expected NAME:PASSWORD".to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout belongs to the chat; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let room = MemoryRoom::new();
    if args.users.is_empty() {
        tracing::warn!("no accounts configured, every login will be refused");
    }
    for (username, password) in args.users {
        tracing::info!(%username, "account registered");
        room.add_account(username, password);
    }

    let backend = MemoryBackend::new(room);
    let driver = LineDriver::new(BufReader::new(tokio::io::stdin()), std::io::stdout());
    let config = RuntimeConfig {
        call_timeout: Duration::from_secs(args.timeout_secs),
        history_page_size: args.page_size,
        ..RuntimeConfig::default()
    };

    match args.db {
        Some(path) => {
            tracing::info!(path = %path.display(), "using credential database");
            let store = RedbCredentialStore::open(&path)?;
            Runtime::new(backend, store, driver, config).run().await?;
        },
        None => {
            Runtime::new(backend, MemoryCredentialStore::new(), driver, config).run().await?;
        },
    }

    Ok(())
}
