//! Application state
//!
//! The `Store` owns the current lorebook and settings and keeps both records
//! on disk in step with memory. Every mutation applies a pure operation from
//! [`crate::document`] and then writes the affected record.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open()?;
//!
//! let id = store.add_entry()?;
//! let mut entry = store.entry(&id).cloned().unwrap();
//! entry.set_title("The Drowned Bell");
//! store.update_entry(&entry)?;
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::{self, CategoryAction};
use crate::models::{AppSettings, LoreBook, LoreEntry};
use crate::storage::persistence::atomic_write;
use crate::storage::{
    RecordPersistence, StorageError, StorageStats, BOOK_RECORD, SETTINGS_RECORD,
};

/// Lorebook and settings, persisted after each change
pub struct Store {
    book: LoreBook,
    settings: AppSettings,
    persistence: RecordPersistence,
    config: Config,
    recovered: Vec<StorageError>,
}

impl Store {
    /// Open the store using the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the store with a specific configuration
    ///
    /// Missing records yield defaults. A record that cannot be parsed is
    /// copied to `<key>.json.corrupt` and replaced by defaults.
    pub fn open_with_config(config: Config) -> Result<Self> {
        let persistence = RecordPersistence::new(&config);
        let mut recovered = Vec::new();

        let book = load_record(&persistence, BOOK_RECORD, &mut recovered, |bytes| {
            document::deserialize(bytes).map_err(|e| e.to_string())
        });
        let settings = load_record(&persistence, SETTINGS_RECORD, &mut recovered, |bytes| {
            serde_json::from_slice::<AppSettings>(bytes).map_err(|e| e.to_string())
        });

        debug!(
            entries = book.entries.len(),
            data_dir = %config.data_dir.display(),
            "Opened store"
        );

        Ok(Self {
            book,
            settings,
            persistence,
            config,
            recovered,
        })
    }

    /// Records that could not be loaded when the store was opened
    pub fn recovered_records(&self) -> &[StorageError] {
        &self.recovered
    }

    pub fn book(&self) -> &LoreBook {
        &self.book
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Look up an entry by exact id
    pub fn entry(&self, id: &str) -> Option<&LoreEntry> {
        self.book.entry(id)
    }

    // ==================== Book Operations ====================

    /// Append a fresh entry and return its id
    pub fn add_entry(&mut self) -> Result<String> {
        let (book, id) = document::add_entry(&self.book);
        self.book = book;
        self.save_book()?;
        debug!(id = %id, "Added entry");
        Ok(id)
    }

    /// Replace the stored entry with the same id
    pub fn update_entry(&mut self, entry: &LoreEntry) -> Result<()> {
        self.book = document::update_entry(&self.book, entry)
            .context("Failed to update entry")?;
        self.save_book()
    }

    /// Remove an entry; returns whether it existed
    pub fn delete_entry(&mut self, id: &str) -> Result<bool> {
        if self.book.entry(id).is_none() {
            return Ok(false);
        }
        self.book = document::delete_entry(&self.book, id);
        self.save_book()?;
        debug!(id, "Deleted entry");
        Ok(true)
    }

    pub fn rename_book(&mut self, name: &str) -> Result<()> {
        self.book = document::rename_book(&self.book, name);
        self.save_book()
    }

    /// Add, delete or rename a category
    pub fn manage_category(&mut self, action: &CategoryAction) -> Result<()> {
        self.book = document::manage_category(&self.book, action);
        self.save_book()?;
        debug!(?action, "Updated categories");
        Ok(())
    }

    /// Swap in a whole new book
    pub fn replace_book(&mut self, book: LoreBook) -> Result<()> {
        self.book = book;
        self.save_book()
    }

    // ==================== Settings ====================

    pub fn update_settings(&mut self, settings: AppSettings) -> Result<()> {
        self.settings = settings;
        let bytes =
            serde_json::to_vec_pretty(&self.settings).context("Failed to encode settings")?;
        self.persistence
            .write(SETTINGS_RECORD, &bytes)
            .context("Failed to save settings")
    }

    // ==================== Import / Export ====================

    /// Write the book into `dir` under its export file name
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(document::export_file_name(&self.book));
        let bytes = document::serialize(&self.book).context("Failed to encode lorebook")?;
        atomic_write(&path, &bytes)
            .with_context(|| format!("Failed to write export to {}", path.display()))?;

        info!(path = %path.display(), entries = self.book.entries.len(), "Exported lorebook");
        Ok(path)
    }

    /// Replace the book with the contents of a file
    ///
    /// The file must pass validation; on any failure the current book is
    /// left untouched. Returns the id of the first imported entry.
    pub fn import_from(&mut self, path: &Path) -> Result<Option<String>> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let book = document::deserialize(&bytes)
            .with_context(|| format!("Invalid lorebook file {}", path.display()))?;

        let first = book.entries.first().map(|e| e.id.clone());
        let count = book.entries.len();
        self.replace_book(book)?;

        info!(path = %path.display(), entries = count, "Imported lorebook");
        Ok(first)
    }

    // ==================== Stats ====================

    pub fn storage_stats(&self) -> StorageStats {
        self.persistence.stats()
    }

    fn save_book(&self) -> Result<()> {
        let bytes = document::serialize(&self.book).context("Failed to encode lorebook")?;
        self.persistence
            .write(BOOK_RECORD, &bytes)
            .context("Failed to save lorebook")
    }
}

/// Load one record, falling back to defaults when it is absent or unreadable
fn load_record<T, F>(
    persistence: &RecordPersistence,
    key: &str,
    recovered: &mut Vec<StorageError>,
    parse: F,
) -> T
where
    T: Default,
    F: FnOnce(&[u8]) -> std::result::Result<T, String>,
{
    let bytes = match persistence.read(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return T::default(),
        Err(e) => {
            warn!(record = key, error = %e, "Failed to read record, using defaults");
            recovered.push(e);
            return T::default();
        }
    };

    match parse(&bytes) {
        Ok(value) => value,
        Err(details) => {
            match persistence.quarantine(key, details) {
                Ok(corrupt) => {
                    warn!(record = key, "{}; using defaults", corrupt);
                    recovered.push(corrupt);
                }
                Err(e) => {
                    warn!(
                        record = key,
                        error = %e,
                        "Record is corrupt and could not be backed up; using defaults"
                    );
                    recovered.push(e);
                }
            }
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ValidationError;
    use crate::models::{AiProvider, EntryType, Theme};
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_open_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        assert_eq!(store.book(), &LoreBook::default());
        assert_eq!(store.settings(), &AppSettings::default());
        assert_eq!(store.book().name, "New World");
        assert!(store.recovered_records().is_empty());
    }

    #[test]
    fn test_add_entry_persists() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();
        let before = store.book().entries.len();

        let id = store.add_entry().unwrap();

        assert_eq!(store.book().entries.len(), before + 1);
        assert_eq!(store.entry(&id).unwrap().title, "New Entry");
        assert!(store.storage_stats().book_exists);
    }

    #[test]
    fn test_data_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let id;
        {
            let mut store = Store::open_with_config(config.clone()).unwrap();
            id = store.add_entry().unwrap();

            let mut entry = store.entry(&id).cloned().unwrap();
            entry.set_title("Ironhold");
            entry.set_type(EntryType::Location);
            entry.set_content("A fortress carved into the mountain.");
            store.update_entry(&entry).unwrap();
            store.rename_book("Shattered Isles").unwrap();

            let mut settings = store.settings().clone();
            settings.theme = Theme::Nebula;
            settings.ai.provider = AiProvider::Local;
            store.update_settings(settings).unwrap();
        }

        let store = Store::open_with_config(config).unwrap();
        assert_eq!(store.book().name, "Shattered Isles");
        let entry = store.entry(&id).unwrap();
        assert_eq!(entry.title, "Ironhold");
        assert_eq!(entry.entry_type, EntryType::Location);
        assert_eq!(store.settings().theme, Theme::Nebula);
        assert_eq!(store.settings().ai.provider, AiProvider::Local);
    }

    #[test]
    fn test_update_unknown_entry_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let stray = LoreEntry::with_id("missing", "Ghost");
        assert!(store.update_entry(&stray).is_err());
        assert!(store.entry("missing").is_none());
    }

    #[test]
    fn test_delete_entry() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        assert!(store.delete_entry("entry-1").unwrap());
        assert!(store.book().entries.is_empty());
        assert!(!store.delete_entry("entry-1").unwrap());
    }

    #[test]
    fn test_manage_category() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        store
            .manage_category(&CategoryAction::Rename {
                old_name: "Locations".to_string(),
                new_name: "Places".to_string(),
            })
            .unwrap();

        assert_eq!(store.book().categories[1], "Places");
        assert_eq!(store.entry("entry-1").unwrap().category, "Places");
    }

    #[test]
    fn test_corrupt_book_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let persistence = RecordPersistence::new(&config);
        persistence.write(BOOK_RECORD, b"{not json").unwrap();
        persistence
            .write(SETTINGS_RECORD, br#"{"theme":"parchment"}"#)
            .unwrap();

        let store = Store::open_with_config(config).unwrap();

        assert_eq!(store.book(), &LoreBook::default());
        assert_eq!(store.settings().theme, Theme::Parchment);
        let backup = temp_dir.path().join("aetherlore_book_v2.json.corrupt");
        assert_eq!(fs::read(&backup).unwrap(), b"{not json");

        match store.recovered_records() {
            [StorageError::CorruptRecord { backup_path, .. }] => assert_eq!(backup_path, &backup),
            other => panic!("unexpected recovered records: {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_settings_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        RecordPersistence::new(&config)
            .write(SETTINGS_RECORD, br#"{"theme": 42}"#)
            .unwrap();

        let store = Store::open_with_config(config).unwrap();
        assert_eq!(store.settings(), &AppSettings::default());
        assert!(temp_dir
            .path()
            .join("aetherlore_settings_v2.json.corrupt")
            .exists());
    }

    #[test]
    fn test_export_and_import() {
        let temp_dir = TempDir::new().unwrap();
        let export_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();
        store.rename_book("My Realm").unwrap();

        let path = store.export_to(export_dir.path()).unwrap();
        assert!(path.ends_with("my_realm_lorebook.json"));

        let exported = store.book().clone();
        store.delete_entry("entry-1").unwrap();
        store.rename_book("Other").unwrap();

        let first = store.import_from(&path).unwrap();
        assert_eq!(first.as_deref(), Some("entry-1"));
        assert_eq!(store.book(), &exported);
    }

    #[test]
    fn test_export_stays_in_target_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let export_dir = root.path().join("exports");
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();
        store.rename_book("../escaped").unwrap();

        let path = store.export_to(&export_dir).unwrap();
        assert_eq!(path.parent(), Some(export_dir.as_path()));
        assert!(path.exists());
        assert!(!root.path().join("escaped_lorebook.json").exists());
    }

    #[test]
    fn test_failed_import_leaves_book_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();
        let before = store.book().clone();

        let bad = temp_dir.path().join("bad.json");
        fs::write(&bad, br#"{"foo": 1}"#).unwrap();

        let err = store.import_from(&bad).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::MissingEntries)
        ));
        assert_eq!(store.book(), &before);

        assert!(store.import_from(&temp_dir.path().join("nope.json")).is_err());
        assert_eq!(store.book(), &before);
    }

    #[test]
    fn test_import_empty_book_selects_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let path = temp_dir.path().join("empty.json");
        fs::write(&path, br#"{"name": "Void", "categories": [], "entries": []}"#).unwrap();

        assert_eq!(store.import_from(&path).unwrap(), None);
        assert_eq!(store.book().name, "Void");
    }
}
