//! db-scripter CLI - script SQL Server schema objects to JSON and flat SQL.

use clap::{Args, Parser, Subcommand};
use db_scripter::{orchestrator, Config, ExtractionSummary, ScriptError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "db-scripter")]
#[command(about = "Script SQL Server schema objects to JSON and a flat SQL file")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the configuration file.
#[derive(Args)]
struct SourceOverrides {
    /// Override the database to script
    #[arg(long)]
    database: Option<String>,

    /// Override the JSON output path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Connect to a local named instance
    #[arg(long)]
    local: bool,

    /// Bearer token for directory authentication on remote servers
    #[arg(long, env = "DB_SCRIPTER_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract scripts to JSON, then write the flat .pretty file
    Run {
        #[command(flatten)]
        overrides: SourceOverrides,
    },

    /// Extract scripts to the JSON bundle only
    Extract {
        #[command(flatten)]
        overrides: SourceOverrides,
    },

    /// Reformat an existing JSON bundle into <input>.pretty
    Pretty {
        /// JSON bundle written by a previous extract
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Test the database connection
    HealthCheck {
        #[command(flatten)]
        overrides: SourceOverrides,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), ScriptError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    match cli.command {
        Commands::Pretty { input } => {
            let out = db_scripter::write_pretty(&input).await?;
            if cli.output_json {
                println!("{}", serde_json::json!({ "input": input, "output": out }));
            } else {
                println!("Wrote {}", out.display());
            }
        }

        Commands::Run { overrides } => {
            let config = load_config(&cli.config, overrides)?;
            let summary = orchestrator::run(&config).await?;
            print_summary(&summary, cli.output_json)?;
        }

        Commands::Extract { overrides } => {
            let config = load_config(&cli.config, overrides)?;
            let summary = orchestrator::extract(&config).await?;
            print_summary(&summary, cli.output_json)?;
        }

        Commands::HealthCheck { overrides } => {
            let config = load_config(&cli.config, overrides)?;
            let result = orchestrator::health_check(&config).await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Server: {} ({}ms)",
                    if result.connected { "OK" } else { "FAILED" },
                    result.latency_ms
                );
                if let Some(ref version) = result.server_version {
                    println!("    Version: {}", version);
                }
                println!(
                    "  Database '{}': {}",
                    result.database,
                    if result.database_found { "FOUND" } else { "MISSING" }
                );
                if let Some(ref err) = result.error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy() { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.connected {
                return Err(ScriptError::Config("Health check failed".to_string()));
            }
            if !result.database_found {
                return Err(ScriptError::DatabaseNotFound(result.database));
            }
        }
    }

    Ok(())
}

fn load_config(path: &Path, overrides: SourceOverrides) -> Result<Config, ScriptError> {
    let mut config = Config::load_unvalidated(path)?;

    if let Some(database) = overrides.database {
        config.source.database = database;
    }
    if let Some(output) = overrides.output {
        config.output.path = output;
    }
    if overrides.local {
        config.source.is_local = true;
    }
    if let Some(token) = overrides.access_token {
        config.source.access_token = Some(token);
    }

    config.validate()?;
    info!("Loaded configuration from {:?}", path);
    Ok(config)
}

fn print_summary(summary: &ExtractionSummary, as_json: bool) -> Result<(), ScriptError> {
    if as_json {
        println!("{}", summary.to_json()?);
        return Ok(());
    }

    println!("\nScripting completed!");
    println!("  Database: {}", summary.database);
    println!("  Server version: {}", summary.server_version);
    println!("  Duration: {:.2}s", summary.duration_seconds);
    println!("  Tables: {}", summary.tables);
    println!("  Functions: {}", summary.functions);
    println!("  Stored procedures: {}", summary.stored_procedures);
    println!("  Sequences: {}", summary.sequences);
    println!("  JSON: {}", summary.json_path.display());
    if let Some(ref pretty) = summary.pretty_path {
        println!("  Pretty: {}", pretty.display());
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };
    // RUST_LOG wins over --verbosity
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for results
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
