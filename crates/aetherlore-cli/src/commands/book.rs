//! Book command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use aetherlore_core::{Session, Store};

use crate::output::{Output, OutputFormat};

/// Show the book summary
pub fn show(store: &Store, output: &Output) -> Result<()> {
    output.print_book(store.book());
    Ok(())
}

/// Rename the book
pub fn rename(store: &mut Store, name: String, output: &Output) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Book name cannot be empty");
    }

    store.rename_book(name).context("Failed to rename book")?;
    output.success(&format!("Renamed book to: {}", name));
    Ok(())
}

/// Export the book as JSON into a directory (current directory by default)
pub fn export(store: &Store, dir: Option<PathBuf>, output: &Output) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let path = store.export_to(&dir)?;

    match output.format {
        OutputFormat::Quiet => println!("{}", path.display()),
        _ => output.success(&format!("Exported to {}", path.display())),
    }
    Ok(())
}

/// Replace the book with an exported file
///
/// An invalid file is reported and the current book is kept.
pub fn import(store: &mut Store, file: PathBuf, output: &Output) -> Result<()> {
    let mut session = Session::from_config(store.config());
    let first = session
        .import(store, &file)
        .context("Import failed, the current lorebook was kept")?;

    output.success(&format!(
        "Imported \"{}\" ({} entries)",
        store.book().name,
        store.book().entries.len()
    ));
    if let Some(id) = first {
        output.message(&format!("Selected: {}", id));
    }
    Ok(())
}
