//! STH CLI - operator tools for the scenario test helper.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sth_core::config::LogFormat;
use sth_core::query::TableKind;
use sth_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit codes for CLI operations.
///
/// Following Unix conventions:
/// - 0: Success
/// - 1-127: Application errors
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitCode {
    /// Successful execution
    Success = 0,
    /// Configuration error (invalid config file, missing required fields)
    ConfigError = 1,
    /// Schema file error (unknown type, undeclared key or family)
    SchemaError = 2,
    /// IO error (missing or unreadable file)
    IoError = 3,
    /// General runtime error
    RuntimeError = 10,
}

impl ExitCode {
    /// Convert an error to an exit code by inspecting the error message.
    fn from_error(error: &anyhow::Error) -> Self {
        let error_str = error.to_string().to_lowercase();

        if error_str.contains("schema") || error_str.contains("column") {
            ExitCode::SchemaError
        } else if error_str.contains("config")
            || error_str.contains("toml")
            || error_str.contains("parse")
            || error_str.contains("database")
        {
            ExitCode::ConfigError
        } else if error_str.contains("io error") || error_str.contains("no such file") {
            ExitCode::IoError
        } else {
            ExitCode::RuntimeError
        }
    }
}

mod commands;

#[derive(Parser)]
#[command(name = "sth")]
#[command(about = "Scenario test helper tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (default: config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the database name
    #[arg(long, global = true)]
    database: Option<String>,

    /// Override the tables path prefix
    #[arg(long, global = true)]
    tables_path: Option<String>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    Validate,

    /// Print the absolute cluster path of a relative name
    Resolve {
        /// Relative path inside the test namespace
        #[arg(default_value = "")]
        path: String,

        /// Scenario suite name
        #[arg(long)]
        suite: Option<String>,

        /// Scenario test name
        #[arg(long)]
        test: Option<String>,
    },

    /// Render a schema file as a CREATE TABLE statement
    Render {
        /// TOML file with columns, key_columns and column_families
        schema: PathBuf,

        /// Table name, relative to the namespace
        #[arg(long)]
        table: String,

        /// Table storage layout
        #[arg(long, value_enum, default_value = "column")]
        store: StoreArg,

        /// Hash-partition by these columns
        #[arg(long, value_delimiter = ',')]
        partition_by: Vec<String>,

        /// Minimum number of partitions
        #[arg(long)]
        min_partitions: Option<u64>,

        /// Scenario suite name
        #[arg(long)]
        suite: Option<String>,

        /// Scenario test name
        #[arg(long)]
        test: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum StoreArg {
    Row,
    Column,
}

impl From<StoreArg> for TableKind {
    fn from(store: StoreArg) -> Self {
        match store {
            StoreArg::Row => TableKind::Row,
            StoreArg::Column => TableKind::Column,
        }
    }
}

fn main() {
    let exit_code = run_cli();
    std::process::exit(exit_code as i32);
}

/// Main CLI execution logic with proper error handling.
fn run_cli() -> ExitCode {
    let cli = Cli::parse();

    // Log format comes from the config file when it parses, text otherwise
    let log_format = config_path(&cli.config)
        .and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|content| toml::from_str::<Config>(&content).ok())
        .map(|config| config.logging.log_format)
        .unwrap_or(LogFormat::Text);

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match cli.verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    match log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    }

    match execute_command(cli) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::from_error(&e)
        }
    }
}

/// Execute the CLI command.
fn execute_command(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config, cli.database.clone(), cli.tables_path.clone())?;

    match cli.command {
        Commands::Validate => {
            commands::validate::run(&config)?;
        }

        Commands::Resolve { path, suite, test } => {
            let resolved = commands::resolve::run(&config, &path, suite, test);
            println!("{}", resolved);
        }

        Commands::Render {
            schema,
            table,
            store,
            partition_by,
            min_partitions,
            suite,
            test,
        } => {
            let options = commands::render::RenderOptions {
                table,
                kind: store.into(),
                partition_by,
                min_partitions,
                suite,
                test,
            };
            let yql = commands::render::run(&config, &schema, options)?;
            println!("{}", yql);
        }
    }

    Ok(())
}

/// Explicit config path, or `config.toml` when it exists.
fn config_path(path: &Option<PathBuf>) -> Option<PathBuf> {
    path.clone().or_else(|| {
        let default = PathBuf::from("config.toml");
        default.exists().then_some(default)
    })
}

fn load_config(
    path: &Option<PathBuf>,
    database: Option<String>,
    tables_path: Option<String>,
) -> Result<Config> {
    let mut config = match (config_path(path), &database) {
        (Some(path), _) => {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str::<Config>(&content)?
        }
        (None, Some(database)) => Config::for_database(database),
        (None, None) => bail!("No config file found and no --database given"),
    };

    if let Some(database) = database {
        config.cluster.database = database;
    }
    if let Some(tables_path) = tables_path {
        config.cluster.tables_path = tables_path;
    }

    config.validate()?;
    Ok(config)
}
