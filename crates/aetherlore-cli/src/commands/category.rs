//! Category command handlers

use anyhow::{bail, Context, Result};

use aetherlore_core::models::UNCATEGORIZED;
use aetherlore_core::{CategoryAction, Store};

use crate::editor::confirm;
use crate::output::Output;

/// List categories with entry counts
pub fn list(store: &Store, output: &Output) -> Result<()> {
    output.print_categories(store.book());
    Ok(())
}

/// Add a category
pub fn add(store: &mut Store, name: String, output: &Output) -> Result<()> {
    let name = valid_name(&name)?;
    if store.book().has_category(name) {
        output.message(&format!("Category already exists: {}", name));
        return Ok(());
    }

    store
        .manage_category(&CategoryAction::Add(name.to_string()))
        .context("Failed to add category")?;
    output.success(&format!("Added category: {}", name));
    Ok(())
}

/// Delete a category, moving its entries to "Uncategorized"
pub fn delete(store: &mut Store, name: String, output: &Output) -> Result<()> {
    if !store.book().has_category(&name) {
        bail!("Category not found: {}", name);
    }

    let affected = store
        .book()
        .entries
        .iter()
        .filter(|e| e.category == name)
        .count();

    if output.should_prompt() {
        println!(
            "Delete category '{}'? {} entr{} will move to {}.",
            name,
            affected,
            if affected == 1 { "y" } else { "ies" },
            UNCATEGORIZED
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .manage_category(&CategoryAction::Delete(name.clone()))
        .context("Failed to delete category")?;
    output.success(&format!("Deleted category: {}", name));
    Ok(())
}

/// Rename a category and move its entries along
pub fn rename(store: &mut Store, old_name: String, new_name: String, output: &Output) -> Result<()> {
    if !store.book().has_category(&old_name) {
        bail!("Category not found: {}", old_name);
    }
    let new_name = valid_name(&new_name)?.to_string();
    if store.book().has_category(&new_name) {
        output.warn(&format!(
            "'{}' already exists; entries from both will share one name",
            new_name
        ));
    }

    store
        .manage_category(&CategoryAction::Rename {
            old_name: old_name.clone(),
            new_name: new_name.clone(),
        })
        .context("Failed to rename category")?;
    output.success(&format!("Renamed category: {} → {}", old_name, new_name));
    Ok(())
}

fn valid_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Category name cannot be empty");
    }
    Ok(name)
}
