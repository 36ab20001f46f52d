//! Editing session
//!
//! Front-ends drive the store through a `Session`, which tracks the
//! selected entry, debounced edits that have not been committed yet, and
//! which entries have a generation request in flight. None of this state is
//! persisted.
//!
//! Time is passed in explicitly (`now: Instant`) so callers decide how
//! often to poll and tests control the clock.

use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, DEFAULT_DEBOUNCE_MS};
use crate::generation::GenerationError;
use crate::models::{parse_keys, LoreEntry};
use crate::store::Store;

/// Errors from session-level operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No entry selected")]
    NoSelection,

    #[error("A generation is already running for entry {0}")]
    Busy(String),

    #[error("Entry not found: {0}")]
    EntryMissing(String),
}

/// Field edits waiting for the quiet period to elapse
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    pub entry_id: String,
    pub title: String,
    pub content: String,
    pub keys: Vec<String>,
    pub due_at: Instant,
}

impl PendingEdit {
    fn differs_from(&self, entry: &LoreEntry) -> bool {
        self.title != entry.title || self.content != entry.content || self.keys != entry.keys
    }
}

/// A generation request that has been started but not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    /// Entry the result belongs to
    pub entry_id: String,
    pub prompt: String,
    /// Entry content when the request started
    pub context: String,
}

impl GenerationTicket {
    /// Ignore existing content: the result replaces the body
    pub fn without_context(mut self) -> Self {
        self.context.clear();
        self
    }
}

/// Transient UI state over a [`Store`]
#[derive(Debug)]
pub struct Session {
    selected: Option<String>,
    pending: Option<PendingEdit>,
    in_flight: HashSet<String>,
    quiet_period: Duration,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }
}

impl Session {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            selected: None,
            pending: None,
            in_flight: HashSet::new(),
            quiet_period,
        }
    }

    /// Session using the configured debounce period
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.debounce())
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_entry<'a>(&self, store: &'a Store) -> Option<&'a LoreEntry> {
        self.selected.as_deref().and_then(|id| store.entry(id))
    }

    pub fn pending(&self) -> Option<&PendingEdit> {
        self.pending.as_ref()
    }

    /// Whether a generation request is running for `entry_id`
    pub fn is_busy(&self, entry_id: &str) -> bool {
        self.in_flight.contains(entry_id)
    }

    // ==================== Selection ====================

    /// Select an entry, committing any pending edit first
    pub fn select(&mut self, store: &mut Store, id: &str) -> Result<()> {
        if store.entry(id).is_none() {
            return Err(SessionError::EntryMissing(id.to_string()).into());
        }
        self.flush(store)?;
        self.selected = Some(id.to_string());
        Ok(())
    }

    /// Create a blank entry and select it
    pub fn add_entry(&mut self, store: &mut Store) -> Result<String> {
        self.flush(store)?;
        let id = store.add_entry()?;
        self.selected = Some(id.clone());
        Ok(id)
    }

    /// Delete an entry, clearing the selection if it pointed there
    pub fn delete_entry(&mut self, store: &mut Store, id: &str) -> Result<bool> {
        if self.pending.as_ref().is_some_and(|p| p.entry_id == id) {
            self.pending = None;
        } else {
            self.flush(store)?;
        }

        let existed = store.delete_entry(id)?;
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Ok(existed)
    }

    /// Replace the book from a file and select its first entry
    pub fn import(&mut self, store: &mut Store, path: &Path) -> Result<Option<String>> {
        self.flush(store)?;
        let first = store.import_from(path)?;
        self.selected = first.clone();
        Ok(first)
    }

    // ==================== Debounced Edits ====================

    pub fn stage_title(&mut self, store: &Store, now: Instant, title: &str) -> Result<()> {
        self.staged(store, now)?.title = title.to_string();
        Ok(())
    }

    pub fn stage_content(&mut self, store: &Store, now: Instant, content: &str) -> Result<()> {
        self.staged(store, now)?.content = content.to_string();
        Ok(())
    }

    /// Stage comma-separated keys
    pub fn stage_keys(&mut self, store: &Store, now: Instant, keys_text: &str) -> Result<()> {
        self.staged(store, now)?.keys = parse_keys(keys_text);
        Ok(())
    }

    /// Pending edit for the selected entry, pushed back by one quiet period
    fn staged(&mut self, store: &Store, now: Instant) -> Result<&mut PendingEdit, SessionError> {
        let id = self.selected.as_deref().ok_or(SessionError::NoSelection)?;
        let due_at = now + self.quiet_period;

        let reuse = self.pending.as_ref().is_some_and(|p| p.entry_id == id);
        if !reuse {
            let entry = store
                .entry(id)
                .ok_or_else(|| SessionError::EntryMissing(id.to_string()))?;
            self.pending = Some(PendingEdit {
                entry_id: entry.id.clone(),
                title: entry.title.clone(),
                content: entry.content.clone(),
                keys: entry.keys.clone(),
                due_at,
            });
        }

        let pending = self.pending.as_mut().ok_or(SessionError::NoSelection)?;
        pending.due_at = due_at;
        Ok(pending)
    }

    /// Commit the pending edit if its quiet period has elapsed
    ///
    /// Returns whether the stored entry changed.
    pub fn poll(&mut self, store: &mut Store, now: Instant) -> Result<bool> {
        if self.pending.as_ref().is_some_and(|p| p.due_at <= now) {
            self.flush(store)
        } else {
            Ok(false)
        }
    }

    /// Commit the pending edit now
    ///
    /// Returns whether the stored entry changed.
    pub fn flush(&mut self, store: &mut Store) -> Result<bool> {
        let Some(edit) = self.pending.take() else {
            return Ok(false);
        };

        let Some(entry) = store.entry(&edit.entry_id) else {
            debug!(id = %edit.entry_id, "Dropping edit for deleted entry");
            return Ok(false);
        };
        if !edit.differs_from(entry) {
            return Ok(false);
        }

        let mut entry = entry.clone();
        entry.title = edit.title;
        entry.content = edit.content;
        entry.keys = edit.keys;
        entry.touch();
        store.update_entry(&entry)?;

        debug!(id = %entry.id, "Committed pending edit");
        Ok(true)
    }

    // ==================== Generation ====================

    /// Start a generation request for the selected entry
    pub fn begin_generation(&mut self, store: &mut Store, prompt: &str) -> Result<GenerationTicket> {
        let id = self.selected.clone().ok_or(SessionError::NoSelection)?;
        if self.in_flight.contains(&id) {
            return Err(SessionError::Busy(id).into());
        }

        self.flush(store)?;
        let entry = store
            .entry(&id)
            .ok_or_else(|| SessionError::EntryMissing(id.clone()))?;
        let ticket = GenerationTicket {
            entry_id: id.clone(),
            prompt: prompt.to_string(),
            context: entry.content.clone(),
        };

        self.in_flight.insert(id);
        Ok(ticket)
    }

    /// Apply a finished generation to the ticket's entry
    ///
    /// Returns the entry's new content, or `None` when the entry no longer
    /// exists. Generation failures are returned unchanged.
    pub fn finish_generation(
        &mut self,
        store: &mut Store,
        ticket: GenerationTicket,
        result: Result<String, GenerationError>,
    ) -> Result<Option<String>> {
        self.in_flight.remove(&ticket.entry_id);
        let text = result?;

        let Some(entry) = store.entry(&ticket.entry_id) else {
            warn!(id = %ticket.entry_id, "Entry deleted during generation, dropping result");
            return Ok(None);
        };

        let content = if ticket.context.is_empty() {
            text
        } else {
            format!("{}\n\n{}", ticket.context, text)
        };

        let mut entry = entry.clone();
        entry.set_content(content.clone());
        store.update_entry(&entry)?;

        if let Some(pending) = self
            .pending
            .as_mut()
            .filter(|p| p.entry_id == ticket.entry_id)
        {
            pending.content = content.clone();
        }

        debug!(id = %ticket.entry_id, chars = content.chars().count(), "Applied generation");
        Ok(Some(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(temp_dir: &TempDir) -> Store {
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        Store::open_with_config(config).unwrap()
    }

    #[test]
    fn test_select_unknown_entry() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();

        let err = session.select(&mut store, "nope").unwrap_err();
        assert_eq!(
            err.downcast_ref::<SessionError>(),
            Some(&SessionError::EntryMissing("nope".to_string()))
        );
        assert!(session.selected().is_none());
    }

    #[test]
    fn test_stage_requires_selection() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);
        let mut session = Session::default();

        let err = session
            .stage_title(&store, Instant::now(), "Nope")
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<SessionError>(),
            Some(&SessionError::NoSelection)
        );
    }

    #[test]
    fn test_poll_waits_for_quiet_period() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::new(Duration::from_millis(500));
        session.select(&mut store, "entry-1").unwrap();

        let start = Instant::now();
        session.stage_title(&store, start, "The Shattered Spire").unwrap();
        session
            .stage_keys(&store, start + Duration::from_millis(200), " spire, , shard ")
            .unwrap();

        assert!(!session
            .poll(&mut store, start + Duration::from_millis(600))
            .unwrap());
        assert_eq!(store.entry("entry-1").unwrap().title, "The Crystal Spire");

        assert!(session
            .poll(&mut store, start + Duration::from_millis(700))
            .unwrap());
        let entry = store.entry("entry-1").unwrap();
        assert_eq!(entry.title, "The Shattered Spire");
        assert_eq!(entry.keys, vec!["spire", "shard"]);
        assert!(session.pending().is_none());
    }

    #[test]
    fn test_unchanged_edit_is_not_committed() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();
        session.select(&mut store, "entry-1").unwrap();
        let before = store.entry("entry-1").unwrap().last_updated;

        session
            .stage_title(&store, Instant::now(), "The Crystal Spire")
            .unwrap();
        assert!(!session.flush(&mut store).unwrap());
        assert_eq!(store.entry("entry-1").unwrap().last_updated, before);
    }

    #[test]
    fn test_switching_entries_flushes_pending_edit() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();
        session.select(&mut store, "entry-1").unwrap();
        session
            .stage_content(&store, Instant::now(), "Rewritten history.")
            .unwrap();

        let other = session.add_entry(&mut store).unwrap();

        assert_eq!(session.selected(), Some(other.as_str()));
        assert_eq!(
            session.selected_entry(&store).map(|e| e.title.as_str()),
            Some("New Entry")
        );
        assert_eq!(
            store.entry("entry-1").unwrap().content,
            "Rewritten history."
        );
        assert!(session.pending().is_none());
    }

    #[test]
    fn test_select_other_entry_commits_pending_edit() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let other = store.add_entry().unwrap();
        let mut session = Session::default();
        session.select(&mut store, "entry-1").unwrap();
        session
            .stage_title(&store, Instant::now(), "The Shattered Spire")
            .unwrap();
        session
            .stage_keys(&store, Instant::now(), "spire, ruin")
            .unwrap();

        session.select(&mut store, &other).unwrap();

        assert_eq!(session.selected(), Some(other.as_str()));
        assert!(session.pending().is_none());
        let spire = store.entry("entry-1").unwrap();
        assert_eq!(spire.title, "The Shattered Spire");
        assert_eq!(spire.keys, vec!["spire", "ruin"]);

        // Committed to disk, not just memory
        let reopened = open_store(&temp_dir);
        assert_eq!(reopened.entry("entry-1").unwrap().title, "The Shattered Spire");
    }

    #[test]
    fn test_delete_clears_selection() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();
        session.select(&mut store, "entry-1").unwrap();
        session
            .stage_title(&store, Instant::now(), "Doomed")
            .unwrap();

        assert!(session.delete_entry(&mut store, "entry-1").unwrap());
        assert!(session.selected().is_none());
        assert!(session.pending().is_none());
        assert!(store.entry("entry-1").is_none());
    }

    #[test]
    fn test_import_selects_first_entry() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();

        let path = temp_dir.path().join("import.json");
        std::fs::write(
            &path,
            br#"{"name":"Imported","categories":[],"entries":[
                {"id":"a","title":"First","keys":[],"content":"","category":"Uncategorized","type":"JOURNAL","lastUpdated":0},
                {"id":"b","title":"Second","keys":[],"content":"","category":"Uncategorized","type":"ITEM","lastUpdated":0}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            session.import(&mut store, &path).unwrap().as_deref(),
            Some("a")
        );
        assert_eq!(session.selected(), Some("a"));
        assert_eq!(store.book().name, "Imported");
    }

    #[test]
    fn test_second_generation_is_busy() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();
        session.select(&mut store, "entry-1").unwrap();

        let ticket = session.begin_generation(&mut store, "more").unwrap();
        assert!(session.is_busy("entry-1"));

        let err = session.begin_generation(&mut store, "again").unwrap_err();
        assert_eq!(
            err.downcast_ref::<SessionError>(),
            Some(&SessionError::Busy("entry-1".to_string()))
        );

        session
            .finish_generation(&mut store, ticket, Ok("Extra.".to_string()))
            .unwrap();
        assert!(!session.is_busy("entry-1"));
    }

    #[test]
    fn test_generation_appends_to_ticket_entry() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();
        session.select(&mut store, "entry-1").unwrap();
        let original = store.entry("entry-1").unwrap().content.clone();

        let ticket = session.begin_generation(&mut store, "add a legend").unwrap();
        assert_eq!(ticket.context, original);

        // Selection moves on while the request is running
        let other = session.add_entry(&mut store).unwrap();

        let content = session
            .finish_generation(&mut store, ticket, Ok("Legends say...".to_string()))
            .unwrap()
            .unwrap();

        assert_eq!(content, format!("{}\n\nLegends say...", original));
        assert_eq!(store.entry("entry-1").unwrap().content, content);
        assert_eq!(store.entry(&other).unwrap().content, "");
    }

    #[test]
    fn test_generation_into_empty_entry_replaces_body() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();
        let id = session.add_entry(&mut store).unwrap();

        let ticket = session.begin_generation(&mut store, "a bell").unwrap();
        session
            .finish_generation(&mut store, ticket, Ok("A bronze bell.".to_string()))
            .unwrap();
        assert_eq!(store.entry(&id).unwrap().content, "A bronze bell.");
    }

    #[test]
    fn test_fresh_ticket_ignores_context() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();
        session.select(&mut store, "entry-1").unwrap();

        let ticket = session
            .begin_generation(&mut store, "rewrite")
            .unwrap()
            .without_context();
        session
            .finish_generation(&mut store, ticket, Ok("Brand new.".to_string()))
            .unwrap();
        assert_eq!(store.entry("entry-1").unwrap().content, "Brand new.");
    }

    #[test]
    fn test_generation_for_deleted_entry_is_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();
        session.select(&mut store, "entry-1").unwrap();

        let ticket = session.begin_generation(&mut store, "x").unwrap();
        session.delete_entry(&mut store, "entry-1").unwrap();

        let applied = session
            .finish_generation(&mut store, ticket, Ok("Too late.".to_string()))
            .unwrap();
        assert!(applied.is_none());
        assert!(!session.is_busy("entry-1"));
    }

    #[test]
    fn test_generation_failure_keeps_content() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();
        session.select(&mut store, "entry-1").unwrap();
        let before = store.entry("entry-1").unwrap().clone();

        let ticket = session.begin_generation(&mut store, "x").unwrap();
        let err = session
            .finish_generation(
                &mut store,
                ticket,
                Err(GenerationError::Unauthorized { backend: "NovelAI" }),
            )
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid NovelAI API Key.");
        assert_eq!(store.entry("entry-1").unwrap(), &before);
        assert!(!session.is_busy("entry-1"));
    }

    #[test]
    fn test_begin_generation_flushes_pending_edit() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let mut session = Session::default();
        session.select(&mut store, "entry-1").unwrap();
        session
            .stage_content(&store, Instant::now(), "Typed just now.")
            .unwrap();

        let ticket = session.begin_generation(&mut store, "x").unwrap();
        assert_eq!(ticket.context, "Typed just now.");
        assert!(session.pending().is_none());
    }
}
