//! Google Cloud Text-to-Speech provider

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{SpeechProvider, SpeechRequest};
use crate::audio_cache::AudioCache;
use crate::error::{Error, Result};

const GOOGLE_TTS_API_BASE: &str = "https://texttospeech.googleapis.com/v1";

pub struct GoogleTtsProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    cache: Arc<AudioCache>,
}

impl GoogleTtsProvider {
    pub fn new(client: Client, api_key: Option<String>, cache: Arc<AudioCache>) -> Self {
        Self {
            client,
            api_key,
            base_url: GOOGLE_TTS_API_BASE.to_string(),
            cache,
        }
    }

    /// Point the provider at a different endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("Google API key not set".to_string()))
    }

    fn cache_key(request: &SpeechRequest) -> String {
        AudioCache::key(
            "",
            &[
                &request.text,
                &request.language,
                request.voice.as_deref().unwrap_or("default"),
            ],
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    ssml_gender: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f32,
    pitch: f32,
    volume_gain_db: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceInfo>,
}

#[derive(Debug, Deserialize)]
struct VoiceInfo {
    #[serde(default)]
    name: Option<String>,
}

#[async_trait]
impl SpeechProvider for GoogleTtsProvider {
    fn name(&self) -> &'static str {
        "Google TTS"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<PathBuf> {
        let key = Self::cache_key(request);
        if let Some(path) = self.cache.lookup(&key) {
            return Ok(path);
        }

        let api_key = self.api_key()?;

        let body = SynthesizeRequest {
            input: SynthesisInput {
                text: &request.text,
            },
            voice: VoiceSelection {
                language_code: &request.language,
                name: request.voice.as_deref(),
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: 1.0,
                pitch: 0.0,
                volume_gain_db: 0.0,
            },
        };

        debug!("Synthesizing '{}' with Google TTS", request.text);

        let response = self
            .client
            .post(format!("{}/text:synthesize", self.base_url))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Google TTS API error: {} - {}", status, error_text);
            return Err(Error::Speech(format!(
                "Google TTS API error: {} - {}",
                status, error_text
            )));
        }

        let body: SynthesizeResponse = response.json().await?;
        let encoded = body
            .audio_content
            .ok_or_else(|| Error::Speech("Google TTS returned no audio content".to_string()))?;
        let bytes = STANDARD
            .decode(&encoded)
            .map_err(|e| Error::Speech(format!("Invalid audio payload: {e}")))?;

        self.cache.store(&key, &bytes)
    }

    async fn voices(&self, language: &str) -> Result<Vec<String>> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/voices", self.base_url))
            .query(&[("languageCode", language), ("key", api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Google TTS voices error: {} - {}", status, error_text);
            return Err(Error::Speech(format!(
                "Google TTS voices error: {} - {}",
                status, error_text
            )));
        }

        let body: VoicesResponse = response.json().await?;
        Ok(body.voices.into_iter().filter_map(|v| v.name).collect())
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
