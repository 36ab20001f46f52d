//! Interactive editing support
//!
//! Entry bodies are edited in $EDITOR through a temp file. The file opens
//! with a short comment header naming the entry; header lines are removed
//! again when the file is read back.

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;

use aetherlore_core::{LoreBook, LoreEntry};

use crate::output::short_id;

const HEADER_OPEN: &str = "<!--";
const HEADER_CLOSE: &str = "-->";

/// Edit an entry's body in the user's editor and return the new body
pub fn edit_entry_body(book: &LoreBook, entry: &LoreEntry) -> Result<String> {
    let editor = find_editor()?;
    let temp_path = temp_path_for(entry);

    fs::write(&temp_path, compose_buffer(book, entry))
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;

    let status = editor_command(&editor)
        .arg(&temp_path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor));
    let status = match status {
        Ok(status) => status,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
    };

    if !status.success() {
        let _ = fs::remove_file(&temp_path);
        bail!(
            "Editor '{}' exited with non-zero status. The entry was not changed.",
            editor
        );
    }

    let edited = fs::read_to_string(&temp_path)
        .with_context(|| format!("Failed to read edited file: {:?}", temp_path));
    let _ = fs::remove_file(&temp_path);

    Ok(strip_header(&edited?))
}

/// `aetherlore_<short id>_<pid>.md` in the system temp dir
fn temp_path_for(entry: &LoreEntry) -> PathBuf {
    let id: String = short_id(&entry.id)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    env::temp_dir().join(format!("aetherlore_{}_{}.md", id, std::process::id()))
}

fn compose_buffer(book: &LoreBook, entry: &LoreEntry) -> String {
    let mut buffer = format!(
        "{} {} ({}, {}) {}\n",
        HEADER_OPEN,
        entry.title,
        entry.entry_type.layout().label,
        book.display_category(entry),
        HEADER_CLOSE
    );
    if !entry.keys.is_empty() {
        buffer.push_str(&format!(
            "{} Keys: {} {}\n",
            HEADER_OPEN,
            entry.keys_text(),
            HEADER_CLOSE
        ));
    }
    buffer.push_str(&format!(
        "{} Lines like these are dropped on save. {}\n\n",
        HEADER_OPEN, HEADER_CLOSE
    ));
    buffer.push_str(&entry.content);
    buffer
}

/// Remove leading header comment lines and the blank line after them
fn strip_header(text: &str) -> String {
    let mut lines = text.lines().peekable();
    let mut had_header = false;
    while let Some(line) = lines.peek() {
        let trimmed = line.trim();
        if trimmed.starts_with(HEADER_OPEN) && trimmed.ends_with(HEADER_CLOSE) {
            had_header = true;
            lines.next();
        } else {
            break;
        }
    }
    if had_header && lines.peek().is_some_and(|l| l.trim().is_empty()) {
        lines.next();
    }
    lines.collect::<Vec<_>>().join("\n").trim_end().to_string()
}

/// $EDITOR may carry arguments, e.g. `code --wait`
fn editor_command(editor: &str) -> Command {
    let mut parts = editor.split_whitespace();
    let mut command = Command::new(parts.next().unwrap_or(editor));
    command.args(parts);
    command
}

fn find_editor() -> Result<String> {
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = env::var(var) {
            if !editor.trim().is_empty() {
                return Ok(editor);
            }
        }
    }

    for editor in ["nano", "vim", "vi", "emacs", "notepad"] {
        if command_exists(editor) {
            return Ok(editor.to_string());
        }
    }

    bail!("No editor found. Set $EDITOR (for example: export EDITOR=nano) or pass --body.")
}

fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Ask a yes/no question; without a TTY the answer is no
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
