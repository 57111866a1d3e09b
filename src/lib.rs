//! Lexio Core - vocabulary study engine with provider fallback chains
//!
//! A cloud-first language-learning engine with provider abstraction for
//! image search, phrase/explanation generation, and speech synthesis,
//! plus search history, settings, and Anki flashcard export.

pub mod anki;
pub mod app;
pub mod audio_cache;
pub mod error;
pub mod export;
pub mod migrations;
pub mod prompts;
pub mod providers;
pub mod search;
pub mod settings;
pub mod speech;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Re-export the main engine components for convenience
pub use anki::AnkiConnect;
pub use app::Lexio;
pub use audio_cache::AudioCache;
pub use export::{ExportOptions, build_cards, build_fields, export_card, export_cards};
pub use prompts::PromptLibrary;
pub use providers::{ImageProvider, SpeechProvider, SpeechRequest, TextGenProvider};
pub use search::SearchService;
pub use settings::{AnkiSettings, FieldMapping, Settings, SettingsPatch, SourceField};
pub use speech::SpeechService;
pub use storage::Storage;
