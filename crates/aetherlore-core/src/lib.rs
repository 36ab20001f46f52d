//! AetherLore Core Library
//!
//! This crate provides the core functionality for AetherLore, a local
//! world-building notebook: a lorebook of categorized entries, durable
//! storage, and AI-assisted text generation.
//!
//! # Architecture
//!
//! - **Document**: pure operations over an immutable `LoreBook` value
//! - **Store**: owns the current book and settings, persists after each change
//! - **Session**: selection, debounced edits and in-flight generations
//! - **Generation**: Gemini, NovelAI and OpenAI-compatible local backends
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open()?;
//! let mut session = Session::from_config(store.config());
//!
//! session.select(&mut store, "entry-1")?;
//! let ticket = session.begin_generation(&mut store, "Add a legend")?;
//!
//! let transport = Arc::new(ReqwestTransport::new());
//! let provider = provider_for(&store.settings().ai, store.config(), transport);
//! let result = generate(provider.as_ref(), &store.settings().ai, &ticket.prompt, &ticket.context).await;
//! session.finish_generation(&mut store, ticket, result)?;
//! ```
//!
//! # Modules
//!
//! - `store`: Application state (main entry point)
//! - `session`: Editing session over a store
//! - `models`: Entries, books and settings
//! - `document`: Pure lorebook operations and validation
//! - `generation`: Text generation backends
//! - `storage`: Keyed JSON record persistence
//! - `config`: Application configuration

pub mod config;
pub mod document;
pub mod generation;
pub mod models;
pub mod session;
pub mod storage;
pub mod store;

pub use config::Config;
pub use document::{CategoryAction, DocumentError, EntryStats, ValidationError};
pub use generation::{
    generate, provider_for, GenerationError, GenerationProvider, HttpTransport, ReqwestTransport,
};
pub use models::{
    AiProvider, AiSettings, AppSettings, EntryLayout, EntryType, ImageSlot, LoreBook, LoreEntry,
    Theme,
};
pub use session::{GenerationTicket, PendingEdit, Session, SessionError};
pub use storage::{RecordPersistence, StorageError, StorageStats};
pub use store::Store;
