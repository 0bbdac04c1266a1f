//! Config show/check command handler.

use anyhow::{Context, Result};

use helmsman::config::validate::{validate_config, DiagnosticLevel};
use helmsman::config::Config;

use super::ConfigAction;

pub(crate) async fn cmd_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load().with_context(|| "Failed to load configuration")?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);

            let problems = config.validate();
            if !problems.is_empty() {
                println!();
                for problem in &problems {
                    println!("[WARN] {}", problem);
                }
            }
        }
        ConfigAction::Check => {
            let config_path = Config::path();
            println!("Config file: {}", config_path.display());

            if config_path.exists() {
                let content = std::fs::read_to_string(&config_path)
                    .context("Failed to read config file")?;

                let raw: serde_json::Value = match serde_json::from_str(&content) {
                    Ok(v) => v,
                    Err(e) => {
                        println!("[ERROR] Invalid JSON: {}", e);
                        return Ok(());
                    }
                };

                let diagnostics = validate_config(&raw);
                for diag in &diagnostics {
                    println!("{}", diag);
                }

                let errors = diagnostics
                    .iter()
                    .filter(|d| d.level == DiagnosticLevel::Error)
                    .count();
                let warnings = diagnostics
                    .iter()
                    .filter(|d| d.level == DiagnosticLevel::Warn)
                    .count();
                println!("\nFound {} error(s), {} warning(s)", errors, warnings);
            } else {
                println!("[OK] No config file found (using defaults)");
            }

            let config = Config::load().with_context(|| "Failed to load configuration")?;
            let problems = config.validate();
            if problems.is_empty() {
                println!("\nConfiguration looks good!");
            } else {
                println!();
                for problem in &problems {
                    println!("[WARN] {}", problem);
                }
            }
        }
    }
    Ok(())
}
