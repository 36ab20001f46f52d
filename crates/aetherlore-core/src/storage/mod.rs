//! Storage layer
//!
//! Durable keyed records for the lorebook and the application settings.
//!
//! ## Layout
//!
//! Both records live in the configured data directory as pretty-printed
//! JSON. They are independent: a corrupt settings file never affects the
//! lorebook and vice versa.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::{RecordPersistence, StorageStats, BOOK_RECORD, SETTINGS_RECORD};
