//! OpenAI text-to-speech provider

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

use super::{SpeechProvider, SpeechRequest};
use crate::audio_cache::AudioCache;
use crate::error::{Error, Result};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "tts-1";

/// The fixed voice roster of the OpenAI speech API
const VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

pub struct OpenAiTtsProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    cache: Arc<AudioCache>,
}

impl OpenAiTtsProvider {
    pub fn new(client: Client, api_key: Option<String>, cache: Arc<AudioCache>) -> Self {
        Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: OPENAI_API_BASE.to_string(),
            cache,
        }
    }

    /// Set the model to use (e.g. "tts-1-hd")
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the provider at a different endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("OpenAI API key not set".to_string()))
    }

    fn resolve_voice<'a>(&self, request: &'a SpeechRequest) -> &'a str {
        request
            .voice
            .as_deref()
            .unwrap_or_else(|| voice_for_language(&request.language))
    }
}

/// Pick a voice for a language tag.
///
/// OpenAI voices are multilingual, so the mapping just spreads languages
/// across the roster for a bit of variety.
fn voice_for_language(language: &str) -> &'static str {
    match language {
        "en-US" => "alloy",
        "en-GB" => "echo",
        "es-ES" => "fable",
        "es-MX" => "onyx",
        "fr-FR" => "nova",
        "de-DE" => "shimmer",
        "it-IT" => "alloy",
        "pt-BR" => "echo",
        "ja-JP" => "fable",
        "ko-KR" => "onyx",
        "zh-CN" => "nova",
        _ => "alloy",
    }
}

#[derive(Debug, Serialize)]
struct SpeechApiRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

#[async_trait]
impl SpeechProvider for OpenAiTtsProvider {
    fn name(&self) -> &'static str {
        "OpenAI TTS"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<PathBuf> {
        let voice = self.resolve_voice(request);
        let key = AudioCache::key("openai_", &[&request.text, voice, &self.model]);
        if let Some(path) = self.cache.lookup(&key) {
            return Ok(path);
        }

        let api_key = self.api_key()?;

        debug!("Synthesizing '{}' with OpenAI voice {}", request.text, voice);

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&SpeechApiRequest {
                model: &self.model,
                input: &request.text,
                voice,
                response_format: "mp3",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI TTS API error: {} - {}", status, error_text);
            return Err(Error::Speech(format!(
                "OpenAI TTS API error: {} - {}",
                status, error_text
            )));
        }

        let bytes = response.bytes().await?;
        self.cache.store(&key, &bytes)
    }

    async fn voices(&self, _language: &str) -> Result<Vec<String>> {
        Ok(VOICES.iter().map(|v| v.to_string()).collect())
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
