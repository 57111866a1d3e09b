//! Error types for Lexio

use thiserror::Error;

/// Result type alias using Lexio's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in Lexio
#[derive(Error, Debug)]
pub enum Error {
    #[error("Image search failed: {0}")]
    ImageSearch(String),

    #[error("Text generation failed: {0}")]
    TextGen(String),

    #[error("Speech synthesis failed: {0}")]
    Speech(String),

    #[error("AnkiConnect error: {0}")]
    AnkiConnect(String),

    #[error("Prompt template error: {0}")]
    Template(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
