//! Entry command handlers

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;

use aetherlore_core::document::search;
use aetherlore_core::models::UNCATEGORIZED;
use aetherlore_core::{EntryType, LoreBook, Session, Store};

use super::parse_entry_id;
use crate::editor::{confirm, edit_entry_body};
use crate::output::{short_id, truncate_line, Output};

/// Images above this size are accepted with a warning
const LARGE_IMAGE_BYTES: usize = 2_000_000;

/// Field changes for `entry edit`
#[derive(Args, Debug, Default)]
pub struct EditArgs {
    /// New title
    #[arg(short = 'T', long)]
    pub title: Option<String>,
    /// Activation keys, comma-separated
    #[arg(short, long)]
    pub keys: Option<String>,
    /// Entry type (character, location, item, journal)
    #[arg(short = 't', long = "type")]
    pub entry_type: Option<EntryType>,
    /// Category name
    #[arg(short, long)]
    pub category: Option<String>,
    /// Attach an image file
    #[arg(long, conflicts_with = "clear_image")]
    pub image: Option<PathBuf>,
    /// Remove the attached image
    #[arg(long)]
    pub clear_image: bool,
    /// Replace the body text (opens editor if no field is given)
    #[arg(short, long)]
    pub body: Option<String>,
}

impl EditArgs {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.keys.is_none()
            && self.entry_type.is_none()
            && self.category.is_none()
            && self.image.is_none()
            && !self.clear_image
            && self.body.is_none()
    }
}

/// Create a new entry
pub fn add(
    store: &mut Store,
    title: Option<String>,
    entry_type: Option<EntryType>,
    category: Option<String>,
    output: &Output,
) -> Result<()> {
    if let Some(ref category) = category {
        check_category(store.book(), category)?;
    }

    let mut session = Session::from_config(store.config());
    let id = session.add_entry(store).context("Failed to create entry")?;

    if title.is_some() || entry_type.is_some() || category.is_some() {
        let mut entry = store
            .entry(&id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Entry not found: {}", id))?;
        if let Some(title) = title {
            entry.set_title(title);
        }
        if let Some(entry_type) = entry_type {
            entry.set_type(entry_type);
        }
        if let Some(category) = category {
            entry.set_category(category);
        }
        store.update_entry(&entry)?;
    }

    output.success(&format!("Created entry: {}", id));
    if let Some(entry) = store.entry(&id) {
        output.print_entry(store.book(), entry);
    }
    Ok(())
}

/// List entries, optionally filtered by search term and category
pub fn list(
    store: &Store,
    term: Option<String>,
    category: Option<String>,
    output: &Output,
) -> Result<()> {
    let book = store.book();
    let mut entries = search(book, term.as_deref().unwrap_or(""));
    if let Some(ref category) = category {
        entries.retain(|e| book.display_category(e).eq_ignore_ascii_case(category));
    }

    output.print_entries(book, &entries);
    Ok(())
}

/// Show a single entry
pub fn show(store: &Store, id: String, output: &Output) -> Result<()> {
    let id = parse_entry_id(&id, store)?;
    let entry = store
        .entry(&id)
        .ok_or_else(|| anyhow::anyhow!("Entry not found: {}", id))?;

    output.print_entry(store.book(), entry);
    Ok(())
}

/// Edit an entry's fields
///
/// With no field flags the body opens in $EDITOR.
pub fn edit(store: &mut Store, id: String, mut args: EditArgs, output: &Output) -> Result<()> {
    let id = parse_entry_id(&id, store)?;
    if let Some(ref category) = args.category {
        check_category(store.book(), category)?;
    }

    if args.is_empty() {
        let entry = store
            .entry(&id)
            .ok_or_else(|| anyhow::anyhow!("Entry not found: {}", id))?;
        let edited = edit_entry_body(store.book(), entry).context("Failed to edit entry")?;
        args.body = Some(edited);
    }

    // Text fields go through the session so unchanged values are not rewritten
    let mut session = Session::from_config(store.config());
    session.select(store, &id)?;
    let now = Instant::now();
    if let Some(ref title) = args.title {
        session.stage_title(store, now, title)?;
    }
    if let Some(ref keys) = args.keys {
        session.stage_keys(store, now, keys)?;
    }
    if let Some(ref body) = args.body {
        session.stage_content(store, now, body)?;
    }
    session.flush(store).context("Failed to update entry")?;

    let mut entry = store
        .entry(&id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Entry not found: {}", id))?;
    let mut changed = false;

    if let Some(entry_type) = args.entry_type {
        entry.set_type(entry_type);
        changed = true;
    }
    if let Some(category) = args.category {
        entry.set_category(category);
        changed = true;
    }
    if args.clear_image {
        entry.clear_image();
        changed = true;
    }
    if let Some(ref path) = args.image {
        let mime = image_mime(path)?;
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
        if bytes.len() > LARGE_IMAGE_BYTES {
            output.warn("Image is large and might affect performance. Recommended size < 1MB.");
        }
        if entry.entry_type.layout().image_slot.is_none() {
            output.warn("Journal entries do not display images.");
        }
        entry.set_image_bytes(mime, &bytes);
        changed = true;
    }

    if changed {
        store.update_entry(&entry).context("Failed to update entry")?;
    }

    output.success("Entry updated");
    if let Some(entry) = store.entry(&id) {
        output.print_entry(store.book(), entry);
    }
    Ok(())
}

/// Delete an entry
pub fn delete(store: &mut Store, id: String, output: &Output) -> Result<()> {
    let id = parse_entry_id(&id, store)?;
    let entry = store
        .entry(&id)
        .ok_or_else(|| anyhow::anyhow!("Entry not found: {}", id))?;

    if output.should_prompt() {
        println!(
            "Delete entry: {} - {}",
            short_id(&entry.id),
            truncate_line(&entry.title, 50)
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let mut session = Session::from_config(store.config());
    session
        .delete_entry(store, &id)
        .context("Failed to delete entry")?;

    output.success(&format!("Deleted entry: {}", short_id(&id)));
    Ok(())
}

/// Only listed categories (or "Uncategorized") may be assigned
fn check_category(book: &LoreBook, name: &str) -> Result<()> {
    if name == UNCATEGORIZED || book.has_category(name) {
        return Ok(());
    }
    bail!(
        "Unknown category: '{}'\nAvailable: {}",
        name,
        book.categories.join(", ")
    );
}

/// MIME type for an image file, from its extension
fn image_mime(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    Ok(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        _ => bail!(
            "Unsupported image type: {}. Use png, jpg, gif, webp, svg, bmp or avif.",
            path.display()
        ),
    })
}
