//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::Local;
use serde::Serialize;

use aetherlore_core::document::{group_by_category, EntryStats};
use aetherlore_core::{LoreBook, LoreEntry};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single entry with its body
    pub fn print_entry(&self, book: &LoreBook, entry: &LoreEntry) {
        match self.format {
            OutputFormat::Human => {
                let layout = entry.entry_type.layout();
                let stats = EntryStats::of(&entry.content);

                println!("ID:       {}", entry.id);
                println!("Title:    {}", entry.title);
                println!("Type:     {}", layout.label);
                println!("Category: {}", book.display_category(entry));
                if !entry.keys.is_empty() {
                    println!("Keys:     {}", entry.keys_text());
                }
                if let (Some(slot), Some(size)) = (layout.image_slot, entry.image_size()) {
                    println!("{}: {} bytes", pad_label(slot.label()), size);
                }
                println!(
                    "Updated:  {}",
                    entry
                        .last_updated
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M")
                );
                println!("Length:   {} words, {} chars", stats.words, stats.chars);
                println!();
                if entry.content.is_empty() {
                    println!("(empty)");
                } else {
                    println!("{}", entry.content);
                }
            }
            OutputFormat::Json => print_json(entry),
            OutputFormat::Quiet => {
                println!("{}", entry.id);
            }
        }
    }

    /// Print entries grouped under their categories
    pub fn print_entries(&self, book: &LoreBook, entries: &[&LoreEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return;
                }
                for (category, group) in group_by_category(book, entries) {
                    if group.is_empty() {
                        continue;
                    }
                    println!("── {} ({}) ──", category, group.len());
                    for entry in group {
                        println!(
                            "{} | {:<9} | {}",
                            short_id(&entry.id),
                            entry.entry_type.as_str(),
                            truncate(&entry.title, 50)
                        );
                    }
                    println!();
                }
                println!("{} entr{}", entries.len(), plural_y(entries.len()));
            }
            OutputFormat::Json => print_json(&entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.id);
                }
            }
        }
    }

    /// Print book summary
    pub fn print_book(&self, book: &LoreBook) {
        match self.format {
            OutputFormat::Human => {
                println!("Name:       {}", book.name);
                println!("Entries:    {}", book.entries.len());
                println!("Categories: {}", book.categories.join(", "));
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "name": book.name,
                "categories": book.categories,
                "entry_count": book.entries.len(),
            })),
            OutputFormat::Quiet => {
                println!("{}", book.name);
            }
        }
    }

    /// Print categories with entry counts
    pub fn print_categories(&self, book: &LoreBook) {
        let counts: Vec<(&str, usize)> = book
            .categories
            .iter()
            .map(|c| {
                let count = book.entries.iter().filter(|e| &e.category == c).count();
                (c.as_str(), count)
            })
            .collect();

        match self.format {
            OutputFormat::Human => {
                if counts.is_empty() {
                    println!("No categories.");
                    return;
                }
                for (name, count) in &counts {
                    println!("{} ({})", name, count);
                }
                println!("\n{} categor{}", counts.len(), plural_y(counts.len()));
            }
            OutputFormat::Json => {
                let json: Vec<_> = counts
                    .iter()
                    .map(|(name, count)| serde_json::json!({"name": name, "count": count}))
                    .collect();
                print_json(&json);
            }
            OutputFormat::Quiet => {
                for (name, _) in &counts {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Pretty-print a value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON output: {}", e),
    }
}

/// First eight characters of an id
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Mask a secret for display, keeping the last four characters
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None | Some("") => "(not set)".to_string(),
        Some(s) if s.chars().count() <= 4 => "****".to_string(),
        Some(s) => {
            let tail: String = s.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("****{}", tail)
        }
    }
}

fn plural_y(count: usize) -> &'static str {
    if count == 1 {
        "y"
    } else {
        "ies"
    }
}

fn pad_label(label: &str) -> String {
    format!("{:<8}", label)
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
pub fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
