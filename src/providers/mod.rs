//! Provider abstraction layer for image search, text generation, and speech
//!
//! Each capability has a trait with cloud implementations plus a synthetic
//! fallback implementation. Orchestration builds an ordered chain of
//! attempts per capability and takes the first success; the fallback, which
//! cannot fail, sits at the end of the chain.
mod fallback;
mod google_images;
mod google_tts;
mod openai;
mod openai_tts;
mod pixabay;

pub use fallback::{
    PlaceholderImageProvider, TemplatePhraseProvider, placeholder_images, template_phrases,
};
pub use google_images::GoogleImageProvider;
pub use google_tts::GoogleTtsProvider;
pub use openai::OpenAiTextProvider;
pub use openai_tts::OpenAiTtsProvider;
pub use pixabay::PixabayImageProvider;

use async_trait::async_trait;
use futures::future::BoxFuture;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{ExamplePhrase, ImageResult, PageRequest};

/// Timeout applied to every outbound HTTP call
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client shared by all providers
pub fn http_client() -> Client {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Trait for image search providers
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Search for images matching a query
    async fn search(&self, query: &str, page: &PageRequest) -> Result<Vec<ImageResult>>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}

/// Trait for LLM-backed text generation providers
#[async_trait]
pub trait TextGenProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Generate example phrases for a word in the target language
    async fn generate_phrases(
        &self,
        word: &str,
        target_language: &str,
    ) -> Result<Vec<ExamplePhrase>>;

    /// Generate an explanation of a word, or `None` when the model has
    /// nothing to say
    async fn generate_explanation(
        &self,
        word: &str,
        target_language: &str,
        output_language: &str,
    ) -> Result<Option<String>>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}

/// Request for speech synthesis
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    /// BCP 47 tag, e.g. "en-US"
    pub language: String,
    /// Explicit voice name; providers pick one from the language otherwise
    pub voice: Option<String>,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            voice: None,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}

/// Trait for speech synthesis providers
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Synthesize speech, returning the cached artifact path
    async fn synthesize(&self, request: &SpeechRequest) -> Result<PathBuf>;

    /// Voices available for a language
    async fn voices(&self, language: &str) -> Result<Vec<String>>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}

/// One element of a fallback chain: the provider name and its pending attempt
pub type Attempt<'a, T> = (&'static str, BoxFuture<'a, Result<T>>);

/// Run chain elements in order and return the first success.
///
/// A failure is logged and the loop moves on, so a chain whose terminal
/// element cannot fail always yields a value. An empty chain yields `None`.
pub async fn first_success<T>(what: &str, attempts: Vec<Attempt<'_, T>>) -> Option<T> {
    for (name, attempt) in attempts {
        match attempt.await {
            Ok(value) => {
                debug!("{} resolved by {}", what, name);
                return Some(value);
            }
            Err(err) => {
                warn!("{} via {} failed: {}", what, name, err);
            }
        }
    }
    None
}
