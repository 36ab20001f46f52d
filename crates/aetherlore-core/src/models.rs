//! Data models for AetherLore
//!
//! Defines the lorebook document (`LoreBook`, `LoreEntry`) and the
//! application settings (`AppSettings`, `AiSettings`).
//!
//! Field names serialize in camelCase so the stored records and exported
//! files share a single JSON shape.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category shown for entries whose category is not in the book's list
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Title given to freshly added entries
pub const NEW_ENTRY_TITLE: &str = "New Entry";

const DEFAULT_BOOK_NAME: &str = "New World";

/// Current time at millisecond precision (the resolution stored on disk)
pub fn now_millis() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Kind of lore an entry describes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    Character,
    Location,
    Item,
    #[default]
    Journal,
}

/// Where an entry's image is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    /// Tall portrait beside the text (characters)
    Portrait,
    /// Wide banner above the text (locations)
    Banner,
    /// Small square icon (items)
    Icon,
}

impl ImageSlot {
    pub fn label(self) -> &'static str {
        match self {
            ImageSlot::Portrait => "Portrait",
            ImageSlot::Banner => "Banner",
            ImageSlot::Icon => "Icon",
        }
    }
}

/// Presentation of an entry, keyed on its type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLayout {
    pub label: &'static str,
    pub image_slot: Option<ImageSlot>,
}

impl EntryType {
    pub const ALL: [EntryType; 4] = [
        EntryType::Character,
        EntryType::Location,
        EntryType::Item,
        EntryType::Journal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Character => "CHARACTER",
            EntryType::Location => "LOCATION",
            EntryType::Item => "ITEM",
            EntryType::Journal => "JOURNAL",
        }
    }

    /// Layout used by front-ends to render an entry of this type
    pub fn layout(self) -> EntryLayout {
        match self {
            EntryType::Character => EntryLayout {
                label: "Character",
                image_slot: Some(ImageSlot::Portrait),
            },
            EntryType::Location => EntryLayout {
                label: "Location",
                image_slot: Some(ImageSlot::Banner),
            },
            EntryType::Item => EntryLayout {
                label: "Item",
                image_slot: Some(ImageSlot::Icon),
            },
            EntryType::Journal => EntryLayout {
                label: "Journal",
                image_slot: None,
            },
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown entry type '{}'. Valid types: character, location, item, journal",
                    s
                )
            })
    }
}

/// A single lore entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoreEntry {
    /// Unique, stable identifier
    pub id: String,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Activation keywords
    #[serde(default)]
    pub keys: Vec<String>,
    /// Free text body
    #[serde(default)]
    pub content: String,
    /// Category name (may not exist in the book's category list)
    #[serde(default = "default_category")]
    pub category: String,
    /// Kind of lore
    #[serde(rename = "type", default)]
    pub entry_type: EntryType,
    /// Base64 image data, usually a `data:` URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// When this entry was last changed
    #[serde(default, with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

impl LoreEntry {
    /// Create a blank entry with a random ID
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string(), NEW_ENTRY_TITLE)
    }

    /// Create a blank entry with a specific ID
    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            keys: Vec::new(),
            content: String::new(),
            category: default_category(),
            entry_type: EntryType::default(),
            image: None,
            last_updated: now_millis(),
        }
    }

    /// Bump the last-updated timestamp
    pub fn touch(&mut self) {
        self.last_updated = now_millis();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    /// Move the entry to another category
    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
        self.touch();
    }

    pub fn set_type(&mut self, entry_type: EntryType) {
        self.entry_type = entry_type;
        self.touch();
    }

    /// Attach an image, stored as a base64 `data:` URL
    pub fn set_image_bytes(&mut self, mime: &str, bytes: &[u8]) {
        self.image = Some(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)));
        self.touch();
    }

    pub fn clear_image(&mut self) {
        if self.image.take().is_some() {
            self.touch();
        }
    }

    /// Approximate decoded size of the attached image in bytes
    pub fn image_size(&self) -> Option<usize> {
        let image = self.image.as_deref()?;
        let payload = image
            .split_once(";base64,")
            .map(|(_, data)| data)
            .unwrap_or(image);
        Some(payload.len() / 4 * 3)
    }

    /// Keys joined the way they are edited: "a, b, c"
    pub fn keys_text(&self) -> String {
        self.keys.join(", ")
    }
}

impl Default for LoreEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse comma separated activation keys, dropping blanks
pub fn parse_keys(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// The whole lorebook document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoreBook {
    /// Book title
    #[serde(default = "default_book_name")]
    pub name: String,
    /// Category names in display order
    #[serde(default)]
    pub categories: Vec<String>,
    /// Entries in insertion order
    pub entries: Vec<LoreEntry>,
}

fn default_book_name() -> String {
    DEFAULT_BOOK_NAME.to_string()
}

impl LoreBook {
    /// Create an empty book
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Get an entry by ID
    pub fn entry(&self, id: &str) -> Option<&LoreEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c == name)
    }

    /// Category an entry is shown under
    ///
    /// Entries pointing at a category that is not in the list display as
    /// "Uncategorized". Storage is left untouched.
    pub fn display_category<'a>(&self, entry: &'a LoreEntry) -> &'a str {
        if self.has_category(&entry.category) {
            &entry.category
        } else {
            UNCATEGORIZED
        }
    }
}

impl Default for LoreBook {
    /// The starter book shown on first launch
    fn default() -> Self {
        let mut spire = LoreEntry::with_id("entry-1", "The Crystal Spire");
        spire.keys = vec!["spire".into(), "crystal".into(), "tower".into()];
        spire.content = "The Crystal Spire stands in the center of the Eternal City. \
                         It is said to focus the ley lines of the world, providing endless \
                         magical energy to the citizens below."
            .to_string();
        spire.category = "Locations".to_string();
        spire.entry_type = EntryType::Location;

        Self {
            name: default_book_name(),
            categories: ["Characters", "Locations", "History", "Items", "Factions"]
                .into_iter()
                .map(String::from)
                .collect(),
            entries: vec![spire],
        }
    }
}

/// Color theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Midnight,
    Nebula,
    Parchment,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Midnight => "midnight",
            Theme::Nebula => "nebula",
            Theme::Parchment => "parchment",
        })
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "midnight" => Ok(Theme::Midnight),
            "nebula" => Ok(Theme::Nebula),
            "parchment" => Ok(Theme::Parchment),
            _ => Err(format!(
                "Unknown theme '{}'. Valid themes: midnight, nebula, parchment",
                s
            )),
        }
    }
}

/// Text generation backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AiProvider {
    /// Google Gemini managed API
    #[default]
    Gemini,
    /// NovelAI completion API
    NovelAi,
    /// OpenAI-compatible local server (KoboldCPP, LM Studio, ...)
    Local,
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AiProvider::Gemini => "GEMINI",
            AiProvider::NovelAi => "NOVELAI",
            AiProvider::Local => "LOCAL",
        })
    }
}

impl FromStr for AiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(AiProvider::Gemini),
            "novelai" | "novel_ai" | "novel-ai" => Ok(AiProvider::NovelAi),
            "local" => Ok(AiProvider::Local),
            _ => Err(format!(
                "Unknown provider '{}'. Valid providers: gemini, novelai, local",
                s
            )),
        }
    }
}

/// Settings for text generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub provider: AiProvider,
    /// Base URL of the OpenAI-compatible server, e.g. http://localhost:5001/v1
    pub local_base_url: String,
    pub local_model_name: String,
    pub gemini_model_name: String,
    /// Empty until the user enters a key
    pub novel_ai_api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: AiProvider::Gemini,
            local_base_url: "http://localhost:5001/v1".to_string(),
            // Usually ignored by local backends, but the API requires it
            local_model_name: "model".to_string(),
            gemini_model_name: "gemini-3-flash-preview".to_string(),
            novel_ai_api_key: Some(String::new()),
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

/// Application settings record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub theme: Theme,
    pub ai: AiSettings,
}
