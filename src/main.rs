use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

#[derive(Parser)]
#[command(name = "delphi")]
#[command(version, about = "Delphi-style expert review ledger")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Access token issued to the expert (the expert's roster name in debug identity mode)
    #[arg(long, global = true, env = "DELPHI_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new review project
    Init,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// List documents with reviewed/pending status
    Documents,
    /// Show how many documents the expert has reviewed
    Progress,
    /// Submit scores for one document
    Submit {
        /// Document ID
        #[arg(long)]
        doc: String,

        /// Quantitative scores, comma-separated (e.g. 7,8,6,7)
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        scores: Vec<f64>,

        /// Human-comparison score
        #[arg(long, allow_negative_numbers = true)]
        human: f64,

        /// Free-text field as NAME=TEXT (repeatable)
        #[arg(long = "field", value_parser = cmd::parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Review documents interactively
    Review,
    /// Export all submissions as JSON lines
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep only the latest submission per expert and document
        #[arg(long)]
        latest: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration, roster, and corpus
    Validate,
    /// Write a default delphi.toml
    Init,
}

fn init_tracing(verbose: bool, log_dir: &Path) -> Option<WorkerGuard> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("DELPHI_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    let log_json = std::env::var("DELPHI_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");

    let (file_layer, guard) = if log_dir.is_dir() {
        let appender = tracing_appender::rolling::daily(log_dir, "delphi.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().json().with_writer(writer)), Some(guard))
    } else {
        (None, None)
    };

    // The file layer goes first so it sits on the same subscriber in both branches.
    let subscriber = tracing_subscriber::registry().with(filter).with(file_layer);
    if log_json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let _log_guard = init_tracing(cli.verbose, &delphi::config::log_dir(&project_dir));

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
        Commands::Documents => cmd::cmd_documents(&cli, &project_dir).await?,
        Commands::Progress => cmd::cmd_progress(&cli, &project_dir).await?,
        Commands::Submit {
            doc,
            scores,
            human,
            fields,
        } => {
            cmd::cmd_submit(&cli, &project_dir, doc, scores, *human, fields).await?;
        }
        Commands::Review => cmd::cmd_review(&cli, &project_dir).await?,
        Commands::Export { output, latest } => {
            cmd::cmd_export(&cli, &project_dir, output.as_deref(), *latest).await?;
        }
    }

    Ok(())
}
