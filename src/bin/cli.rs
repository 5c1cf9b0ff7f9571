//! KvStash CLI
//!
//! Opens the selected backend, runs one command against it and closes it.

use std::io::{self, Write};
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use kvstash::{Config, Engine, KvStore, PutOutcome, StashError, StoreMode};
use tracing_subscriber::{fmt, EnvFilter};

/// KvStash CLI
#[derive(Parser, Debug)]
#[command(name = "kvstash-cli")]
#[command(about = "Pluggable key-value storage engine")]
#[command(version)]
struct Args {
    /// Backend: in-memory, in-memory-snapshotted, persistent, persistent-cached
    #[arg(short, long, default_value = "persistent")]
    mode: String,

    /// Data directory (store root or snapshot directory)
    #[arg(short, long, default_value = "./kvstash_data")]
    data_dir: String,

    /// Seconds between checkpoints (in-memory-snapshotted)
    #[arg(short = 'i', long, default_value = "30")]
    snapshot_interval: u64,

    /// LRU cache capacity in entries (persistent-cached)
    #[arg(short, long, default_value = "1024")]
    cache_capacity: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Delete {
        /// The key to delete
        key: String,
    },

    /// List every key-value pair
    Entries,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvstash=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mode = match StoreMode::from_str(&args.mode) {
        Ok(mode) => mode,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!("KvStash v{}", kvstash::VERSION);

    let config = Config::builder()
        .mode(mode)
        .data_dir(&args.data_dir)
        .snapshot_interval_secs(args.snapshot_interval)
        .cache_capacity(args.cache_capacity)
        .build();

    let engine = match Engine::open(config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&engine, args.command);

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        return ExitCode::FAILURE;
    }

    match outcome {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(engine: &Engine, command: Commands) -> kvstash::Result<ExitCode> {
    let mut out = io::stdout().lock();

    match command {
        Commands::Get { key } => match engine.get(&key) {
            Ok(value) => {
                out.write_all(&value)?;
                writeln!(out)?;
            }
            Err(StashError::KeyNotFound) => {
                eprintln!("not found: {}", key);
                return Ok(ExitCode::from(2));
            }
            Err(e) => return Err(e),
        },
        Commands::Put { key, value } => {
            let outcome = engine.upsert(&key, value.as_bytes())?;
            match outcome {
                PutOutcome::Created => writeln!(out, "created")?,
                PutOutcome::Updated => writeln!(out, "updated")?,
            }
        }
        Commands::Delete { key } => {
            engine.delete(&key)?;
            writeln!(out, "deleted")?;
        }
        Commands::Entries => {
            let mut entries = engine.entries()?;
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            for entry in entries {
                writeln!(out, "{}\t{}", entry.key, String::from_utf8_lossy(&entry.value))?;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
