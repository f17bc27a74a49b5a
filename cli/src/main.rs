//! warden — policy store CLI
//!
//! Opens one SQLite policy store and runs a single operation against it.
//!
//! Usage:
//!   warden --db policy.db init
//!   warden --db policy.db import policy.csv
//!   warden --db policy.db export
//!   warden --db policy.db add p alice data1 read
//!   warden --db policy.db remove-filtered p 1 data1
//!   warden --config warden.toml count

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use warden_contracts::{
    error::{AdapterError, AdapterResult},
    rule::section_of,
};
use warden_core::traits::Adapter;
use warden_model::MemoryModel;
use warden_sqlite::{SqliteAdapter, StoreConfig};

// ── CLI definition ────────────────────────────────────────────────────────────

/// warden — relational storage for policy rules.
#[derive(Parser)]
#[command(
    name = "warden",
    about = "Inspect and edit a policy rule store",
    long_about = "Loads, saves and edits policy rules kept in a SQLite table of\n\
                  seven columns (p_type, v0..v5)."
)]
struct Cli {
    /// TOML store configuration (path, table, timeouts).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file; overrides the configuration file.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Policy table; overrides the configuration file.
    #[arg(long, global = true)]
    table: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the policy table if it does not exist.
    Init,
    /// Drop the policy table and every rule in it.
    Drop,
    /// Replace all stored rules with the rules in a policy file.
    Import {
        /// Policy text: one comma-joined rule per line.
        file: PathBuf,
    },
    /// Print every stored rule.
    Export {
        #[arg(long, value_enum, default_value_t = Format::Lines)]
        format: Format,
    },
    /// Store one rule.
    Add {
        ptype: String,
        fields: Vec<String>,
    },
    /// Delete every stored rule equal to this one.
    Remove {
        ptype: String,
        fields: Vec<String>,
    },
    /// Delete rules matching values from a starting column (empty = any).
    RemoveFiltered {
        ptype: String,
        field_index: usize,
        values: Vec<String>,
    },
    /// Print the number of stored rules.
    Count,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Lines,
    Json,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("warden error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> AdapterResult<()> {
    let config = resolve_config(&cli)?;
    debug!(path = %config.path.display(), table = %config.table, "resolved store config");

    let adapter = SqliteAdapter::open(&config)?;
    let result = dispatch(&adapter, cli.command);
    let closed = adapter.close();
    result.and(closed)
}

fn resolve_config(cli: &Cli) -> AdapterResult<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.path = db.clone();
    }
    if let Some(table) = &cli.table {
        config.table = table.clone();
    }
    config.validate()?;
    Ok(config)
}

// ── Command dispatch ──────────────────────────────────────────────────────────

fn dispatch(adapter: &SqliteAdapter, command: Command) -> AdapterResult<()> {
    match command {
        Command::Init => {
            adapter.ensure_schema()?;
            println!("table '{}' ready", adapter.table());
        }
        Command::Drop => {
            adapter.drop_schema()?;
            println!("table '{}' dropped", adapter.table());
        }
        Command::Import { file } => {
            let text = std::fs::read_to_string(&file).map_err(|e| AdapterError::Config {
                reason: format!("failed to read policy file '{}': {}", file.display(), e),
            })?;
            let model = MemoryModel::from_policy_text(&text)?;
            adapter.save_policy(&model)?;
            println!("imported {} rules into '{}'", model.len(), adapter.table());
        }
        Command::Export { format } => {
            let mut model = MemoryModel::new();
            adapter.load_policy(&mut model)?;
            match format {
                Format::Lines => print!("{}", model.to_policy_text()),
                Format::Json => {
                    let rules: Vec<_> = model.iter().collect();
                    let json = serde_json::to_string_pretty(&rules).map_err(|e| {
                        AdapterError::Config {
                            reason: format!("failed to render JSON: {}", e),
                        }
                    })?;
                    println!("{}", json);
                }
            }
        }
        Command::Add { ptype, fields } => {
            adapter.add_policy(section_of(&ptype), &ptype, &fields)?;
        }
        Command::Remove { ptype, fields } => {
            adapter.remove_policy(section_of(&ptype), &ptype, &fields)?;
        }
        Command::RemoveFiltered {
            ptype,
            field_index,
            values,
        } => {
            adapter.remove_filtered_policy(section_of(&ptype), &ptype, field_index, &values)?;
        }
        Command::Count => {
            println!("{}", adapter.row_count()?);
        }
    }
    Ok(())
}
