//! Status command handler

use anyhow::Result;

use aetherlore_core::document::EntryStats;
use aetherlore_core::{AiProvider, Store};

use crate::output::{print_json, Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let stats = store.storage_stats();
    let config = store.config();
    let book = store.book();
    let ai = &store.settings().ai;
    let words: usize = book
        .entries
        .iter()
        .map(|e| EntryStats::of(&e.content).words)
        .sum();

    let recovered: Vec<String> = store
        .recovered_records()
        .iter()
        .map(|e| e.to_string())
        .collect();

    let credential_ready = match ai.provider {
        AiProvider::Gemini => config.gemini_api_key.is_some(),
        AiProvider::NovelAi => ai.novel_ai_api_key.as_deref().is_some_and(|k| !k.is_empty()),
        AiProvider::Local => true,
    };

    match output.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "book": book.name,
            "storage": {
                "data_dir": config.data_dir,
                "book_exists": stats.book_exists,
                "settings_exists": stats.settings_exists,
                "book_size": stats.book_size,
                "settings_size": stats.settings_size,
                "total_size": stats.total_size(),
                "recovered": recovered
            },
            "counts": {
                "entries": book.entries.len(),
                "categories": book.categories.len(),
                "words": words
            },
            "generation": {
                "provider": ai.provider.to_string(),
                "credential_ready": credential_ready
            }
        })),
        OutputFormat::Quiet => {
            println!("{}", book.name);
        }
        OutputFormat::Human => {
            println!("AetherLore Status");
            println!("=================");
            println!();
            println!("Book: {}", book.name);
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  Size:     {}", stats.total_size_human());
            if !stats.book_exists {
                println!("  (nothing saved yet, showing the starter book)");
            }
            for problem in &recovered {
                println!("  Recovered: {}", problem);
            }
            println!();
            println!("Contents:");
            println!("  Entries:    {}", book.entries.len());
            println!("  Categories: {}", book.categories.len());
            println!("  Words:      {}", words);
            println!();
            println!("Generation:");
            println!("  Provider:   {}", ai.provider);
            println!(
                "  Credential: {}",
                if credential_ready { "ready" } else { "missing" }
            );
        }
    }

    Ok(())
}
