//! Lorebook document operations
//!
//! Every operation here takes the current `LoreBook` by reference and
//! returns a new value. Inputs are never mutated, so a caller can keep the
//! previous snapshot around and swap in the result as a whole.
//!
//! Serialization uses the same pretty-printed JSON for durable storage and
//! for file export.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::{LoreBook, LoreEntry, UNCATEGORIZED};

/// Errors raised when reading a lorebook payload
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Failed to parse lorebook JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Invalid lorebook format: expected an object with an `entries` array")]
    MissingEntries,

    #[error("Invalid lorebook contents: {0}")]
    InvalidContents(String),
}

/// Errors raised by document lookups and updates
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("No entry found matching: {0}")]
    NoMatch(String),

    #[error("Ambiguous entry ID '{query}' matches {count} entries. Please provide more characters.")]
    Ambiguous { query: String, count: usize },
}

/// A change to the category list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryAction {
    /// Append a category (ignored if it already exists)
    Add(String),
    /// Remove a category and move its entries to "Uncategorized"
    Delete(String),
    /// Rename in place and move entries along with it
    Rename { old_name: String, new_name: String },
}

/// Append a blank entry, returning the new book and the entry's ID
pub fn add_entry(book: &LoreBook) -> (LoreBook, String) {
    let mut entry = LoreEntry::new();
    while book.entry(&entry.id).is_some() {
        entry = LoreEntry::new();
    }

    let id = entry.id.clone();
    let mut next = book.clone();
    next.entries.push(entry);
    debug!(entry_id = %id, "Added entry");
    (next, id)
}

/// Replace the entry with the same ID
///
/// The caller is responsible for bumping `last_updated`.
pub fn update_entry(book: &LoreBook, entry: &LoreEntry) -> Result<LoreBook, DocumentError> {
    let position = book
        .entries
        .iter()
        .position(|e| e.id == entry.id)
        .ok_or_else(|| DocumentError::EntryNotFound(entry.id.clone()))?;

    let mut next = book.clone();
    next.entries[position] = entry.clone();
    Ok(next)
}

/// Remove an entry (no-op if it does not exist)
pub fn delete_entry(book: &LoreBook, id: &str) -> LoreBook {
    let mut next = book.clone();
    next.entries.retain(|e| e.id != id);
    next
}

pub fn rename_book(book: &LoreBook, name: impl Into<String>) -> LoreBook {
    LoreBook {
        name: name.into(),
        ..book.clone()
    }
}

/// Apply a category change to the list and every referencing entry at once
pub fn manage_category(book: &LoreBook, action: &CategoryAction) -> LoreBook {
    let mut next = book.clone();

    match action {
        CategoryAction::Add(name) => {
            if !next.has_category(name) {
                next.categories.push(name.clone());
            }
        }
        CategoryAction::Delete(name) => {
            if let Some(index) = next.categories.iter().position(|c| c == name) {
                next.categories.remove(index);
            }
            for entry in next.entries.iter_mut().filter(|e| &e.category == name) {
                entry.category = UNCATEGORIZED.to_string();
            }
        }
        CategoryAction::Rename { old_name, new_name } => {
            if book.has_category(new_name) && old_name != new_name {
                debug!(%old_name, %new_name, "Renaming onto an existing category");
            }
            if let Some(slot) = next
                .categories
                .iter_mut()
                .find(|c| c.as_str() == old_name.as_str())
            {
                *slot = new_name.clone();
            }
            for entry in next.entries.iter_mut().filter(|e| &e.category == old_name) {
                entry.category = new_name.clone();
            }
        }
    }

    next
}

/// Encode a book as pretty-printed JSON
pub fn serialize(book: &LoreBook) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec_pretty(book)
}

/// Decode a book, rejecting anything without a top-level `entries` array
pub fn deserialize(bytes: &[u8]) -> Result<LoreBook, ValidationError> {
    let value: Value = serde_json::from_slice(bytes).map_err(ValidationError::Malformed)?;

    if !matches!(value.get("entries"), Some(Value::Array(_))) {
        return Err(ValidationError::MissingEntries);
    }

    serde_json::from_value(value).map_err(|e| ValidationError::InvalidContents(e.to_string()))
}

/// File name used when exporting a book
///
/// Lowercases the name and collapses each whitespace run to `_`. Path
/// separators and other characters not allowed in file names also become
/// `_`, so the result is always a single path component.
pub fn export_file_name(book: &LoreBook) -> String {
    let mut stem = String::with_capacity(book.name.len());
    let mut in_whitespace = false;
    for c in book.name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                stem.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if is_path_unsafe(c) {
            stem.push('_');
        } else {
            stem.extend(c.to_lowercase());
        }
    }
    format!("{}_lorebook.json", stem)
}

fn is_path_unsafe(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

/// Entries whose title or any key contains `term` (case-insensitive)
pub fn search<'a>(book: &'a LoreBook, term: &str) -> Vec<&'a LoreEntry> {
    if term.is_empty() {
        return book.entries.iter().collect();
    }

    let needle = term.to_lowercase();
    book.entries
        .iter()
        .filter(|e| {
            e.title.to_lowercase().contains(&needle)
                || e.keys.iter().any(|k| k.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Group entries under their display category
///
/// Groups follow the book's category order, with "Uncategorized" last.
/// Empty groups are kept so callers can show every category.
pub fn group_by_category<'a>(
    book: &LoreBook,
    entries: &[&'a LoreEntry],
) -> Vec<(String, Vec<&'a LoreEntry>)> {
    let mut groups: Vec<(String, Vec<&'a LoreEntry>)> = Vec::new();
    let names = book
        .categories
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(UNCATEGORIZED));
    for name in names {
        if !groups.iter().any(|(existing, _)| existing.as_str() == name) {
            groups.push((name.to_string(), Vec::new()));
        }
    }

    for &entry in entries {
        let category = book.display_category(entry);
        if let Some((_, members)) = groups
            .iter_mut()
            .find(|(name, _)| name.as_str() == category)
        {
            members.push(entry);
        }
    }

    groups
}

/// Find an entry ID by exact match or unique prefix
pub fn resolve_entry_id(book: &LoreBook, query: &str) -> Result<String, DocumentError> {
    if let Some(entry) = book.entry(query) {
        return Ok(entry.id.clone());
    }

    let matches: Vec<&LoreEntry> = book
        .entries
        .iter()
        .filter(|e| e.id.starts_with(query))
        .collect();

    match matches.as_slice() {
        [] => Err(DocumentError::NoMatch(query.to_string())),
        [only] => Ok(only.id.clone()),
        _ => Err(DocumentError::Ambiguous {
            query: query.to_string(),
            count: matches.len(),
        }),
    }
}

/// Word and character counts for an entry body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStats {
    pub words: usize,
    pub chars: usize,
}

impl EntryStats {
    pub fn of(content: &str) -> Self {
        Self {
            words: content.split_whitespace().count(),
            chars: content.chars().count(),
        }
    }
}
