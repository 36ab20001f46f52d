//! Settings command handlers
//!
//! Settings live in the store's settings record, unlike `config` which is
//! the TOML file read at startup.

use anyhow::{bail, Context, Result};

use aetherlore_core::{AiProvider, AppSettings, Store, Theme};

use crate::output::{mask_secret, print_json, Output, OutputFormat};

const VALID_KEYS: &str = "theme, provider, gemini_model, local_base_url, local_model, \
                          novelai_api_key, temperature, max_tokens";

/// Show current settings
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let settings = store.settings();
    let ai = &settings.ai;

    match output.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "theme": settings.theme.to_string(),
            "provider": ai.provider.to_string(),
            "gemini_model": ai.gemini_model_name,
            "local_base_url": ai.local_base_url,
            "local_model": ai.local_model_name,
            "novelai_api_key_set": ai.novel_ai_api_key.as_deref().is_some_and(|k| !k.is_empty()),
            "temperature": ai.temperature,
            "max_tokens": ai.max_tokens,
        })),
        OutputFormat::Quiet => {
            println!("{}", ai.provider);
        }
        OutputFormat::Human => {
            println!("Settings:");
            println!("  theme:           {}", settings.theme);
            println!("  provider:        {}", ai.provider);
            println!("  gemini_model:    {}", ai.gemini_model_name);
            println!("  local_base_url:  {}", ai.local_base_url);
            println!("  local_model:     {}", ai.local_model_name);
            println!(
                "  novelai_api_key: {}",
                mask_secret(ai.novel_ai_api_key.as_deref())
            );
            println!("  temperature:     {}", ai.temperature);
            println!("  max_tokens:      {}", ai.max_tokens);
        }
    }

    Ok(())
}

/// Set a settings value
pub fn set(store: &mut Store, key: String, value: String, output: &Output) -> Result<()> {
    let settings = apply(store.settings().clone(), &key, &value)?;
    store
        .update_settings(settings)
        .context("Failed to save settings")?;

    let shown = if key == "novelai_api_key" {
        mask_secret(Some(&value))
    } else {
        value
    };
    output.success(&format!("Set {} = {}", key, shown));
    Ok(())
}

/// Apply one `key = value` change to a copy of the settings
fn apply(mut settings: AppSettings, key: &str, value: &str) -> Result<AppSettings> {
    let ai = &mut settings.ai;
    match key {
        "theme" => settings.theme = value.parse::<Theme>().map_err(anyhow::Error::msg)?,
        "provider" => ai.provider = value.parse::<AiProvider>().map_err(anyhow::Error::msg)?,
        "gemini_model" => ai.gemini_model_name = non_empty(key, value)?,
        "local_base_url" => ai.local_base_url = non_empty(key, value)?,
        "local_model" => ai.local_model_name = non_empty(key, value)?,
        "novelai_api_key" => {
            let key = if value == "none" { "" } else { value.trim() };
            ai.novel_ai_api_key = Some(key.to_string());
        }
        "temperature" => {
            let temperature: f32 = value
                .parse()
                .context("Invalid value for temperature. Use a number like 0.7.")?;
            if !(0.1..=2.0).contains(&temperature) {
                bail!("Temperature must be between 0.1 and 2.0");
            }
            ai.temperature = temperature;
        }
        "max_tokens" => {
            let max_tokens: u32 = value
                .parse()
                .context("Invalid value for max_tokens. Use a positive whole number.")?;
            if max_tokens == 0 {
                bail!("max_tokens must be greater than zero");
            }
            ai.max_tokens = max_tokens;
        }
        _ => bail!(
            "Unknown settings key: '{}'\nValid keys: {}",
            key,
            VALID_KEYS
        ),
    }
    Ok(settings)
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        bail!("{} cannot be empty", key);
    }
    Ok(value.to_string())
}
