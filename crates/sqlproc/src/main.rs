//! # sqlproc CLI
//!
//! Watches directories for SQL script files and prints every statement they
//! contain, tagged with its file, line and dialect.
//!
//! ## Commands
//!
//! - `sqlproc watch [DIRECTIVES]...` - Watch directories until Ctrl+C
//! - `sqlproc split <FILE> --type <TYPE>` - Print the statements of one file
//! - `sqlproc config show|init|path` - Inspect configuration
//!
//! ## Examples
//!
//! ```bash
//! # Watch two directories with different dialects
//! sqlproc watch ./sql/pg:postgres ./sql/my:mysql
//!
//! # Split a single script, one JSON object per statement
//! sqlproc split schema.sql --type sqlite --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlproc_core::{Sink, SqlFile, SqlType};
use sqlproc_export::{ConsoleSink, Dispatcher};
use sqlproc_extract::extract_statements;
use sqlproc_index::Pipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

mod config;

use config::{Config, OutputFormat};

#[derive(Parser)]
#[command(name = "sqlproc")]
#[command(about = "Watch directories for SQL scripts and stream their statements")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/sqlproc/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (default: from config, else text)
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch directories and print the statements of every new script
    Watch {
        /// Directory directives, `<path>:<type>` (default: from config)
        directives: Vec<String>,
    },

    /// Print the statements of a single script
    Split {
        /// Script to split
        file: PathBuf,

        /// Dialect of the script (postgres, mysql, sqlite)
        #[arg(short = 't', long = "type")]
        sql_type: SqlType,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        Config::load_from(Some(path.clone()))
            .context(format!("Failed to load config from {}", path.display()))?
    } else {
        Config::load().context("Failed to load config")?
    };

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config
            .logging
            .level
            .parse::<Level>()
            .with_context(|| format!("Invalid log level {:?}", config.logging.level))?
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let format = cli.format.unwrap_or(config.output.format);

    match cli.command {
        Commands::Watch { directives } => {
            let directives = if directives.is_empty() {
                config.directories.clone()
            } else {
                directives
            };

            let sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(ConsoleSink::stdout(format.into()))];
            let pipeline = Pipeline::new(&directives, sinks, config.pipeline_config())
                .context("Failed to start pipeline")?;

            let cancel = CancellationToken::new();
            tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => info!("Stopping"),
                        Err(e) => error!("Failed to wait for Ctrl+C: {e}"),
                    }
                    cancel.cancel();
                }
            });

            info!("Watching for new scripts. Press Ctrl+C to stop.");
            pipeline.run(cancel).await.context("Pipeline failed")?;
        }

        Commands::Split { file, sql_type } => {
            let file = SqlFile::new(file, sql_type);
            let statements = extract_statements(&file)
                .await
                .context("Failed to split script")?;
            debug!(count = statements.len(), "split {}", file.path.display());

            let sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(ConsoleSink::stdout(format.into()))];
            Dispatcher::new(sinks)
                .dispatch_batch(&statements)
                .await
                .context("Failed to print statements")?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config)
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                print!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}
