//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use aetherlore_core::Config;

use crate::output::{mask_secret, print_json, Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "data_dir": config.data_dir,
            "gemini_api_key_set": config.gemini_api_key.is_some(),
            "log_file": config.log_file,
            "debounce_ms": config.debounce_ms,
        })),
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:       {}", config.data_dir.display());
            println!(
                "  gemini_api_key: {}",
                mask_secret(config.gemini_api_key.as_deref())
            );
            println!(
                "  log_file:       {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(stderr)".to_string())
            );
            println!("  debounce_ms:    {}", config.debounce_ms);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    let unset = value.is_empty() || value == "none";
    match key.as_str() {
        "data_dir" => {
            if unset {
                bail!("data_dir cannot be empty");
            }
            config.data_dir = value.clone().into();
        }
        "gemini_api_key" => {
            config.gemini_api_key = if unset { None } else { Some(value.clone()) };
        }
        "log_file" => {
            config.log_file = if unset { None } else { Some(value.clone().into()) };
        }
        "debounce_ms" => {
            config.debounce_ms = value
                .parse()
                .context("Invalid value for debounce_ms. Use a whole number of milliseconds.")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, gemini_api_key, log_file, debounce_ms",
                key
            );
        }
    }

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key == "gemini_api_key" {
        mask_secret(config.gemini_api_key.as_deref())
    } else {
        value
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}
