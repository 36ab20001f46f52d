//! Command handlers

pub mod book;
pub mod category;
pub mod config;
pub mod entry;
pub mod generate;
pub mod settings;
pub mod status;

use anyhow::{bail, Result};

use aetherlore_core::document::resolve_entry_id;
use aetherlore_core::{DocumentError, Store};

/// Resolve an entry ID (full ID or unique prefix)
pub(crate) fn parse_entry_id(id: &str, store: &Store) -> Result<String> {
    match resolve_entry_id(store.book(), id) {
        Ok(id) => Ok(id),
        Err(DocumentError::Ambiguous { query, .. }) => {
            eprintln!("Multiple entries match '{}':", query);
            for entry in store.book().entries.iter().filter(|e| e.id.starts_with(&query)) {
                eprintln!("  {} - {}", entry.id, entry.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
        Err(e) => Err(e.into()),
    }
}
