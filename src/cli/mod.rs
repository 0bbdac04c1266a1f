//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod common;
pub mod config;
pub mod run;
pub mod serve;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "helmsman")]
#[command(version)]
#[command(about = "Agent orchestration backend for a conversational coding assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read message events as JSON lines from stdin and run jobs against the remote store
    Serve,
    /// Answer a single message against an in-memory project (local smoke test)
    Run {
        /// The user message to answer
        #[arg(short, long)]
        message: String,
        /// Project id the file tools operate on
        #[arg(long, default_value = "local")]
        project: String,
        /// Print the job report as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration with secrets redacted
    Show,
    /// Validate the config file for unknown fields and missing settings
    Check,
}

/// Entry point for the CLI, called from main().
pub async fn run() -> Result<()> {
    // Load config early so logging respects it; fall back to defaults if the
    // file is missing or unreadable.
    let logging_cfg = helmsman::config::Config::load()
        .map(|c| c.logging)
        .unwrap_or_default();
    if let Err(e) = helmsman::utils::logging::init_logging(&logging_cfg) {
        eprintln!("Warning: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Version) => {
            cmd_version();
        }
        Some(Commands::Serve) => {
            serve::cmd_serve().await?;
        }
        Some(Commands::Run {
            message,
            project,
            json,
        }) => {
            run::cmd_run(message, project, json).await?;
        }
        Some(Commands::Config { action }) => {
            config::cmd_config(action).await?;
        }
    }

    Ok(())
}

fn cmd_version() {
    println!("helmsman {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Agent orchestration backend for a conversational coding assistant");
}
