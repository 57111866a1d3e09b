//! Audio orchestration: backend selection with cloud-to-cloud fallback
//! and the web-speech sentinel.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::warn;

use crate::audio_cache::AudioCache;
use crate::error::Result;
use crate::providers::{
    Attempt, GoogleTtsProvider, OpenAiTtsProvider, SpeechProvider, SpeechRequest, first_success,
    http_client,
};
use crate::settings::{Settings, SpeechBackend};
use crate::storage::Storage;
use crate::types::AudioHandle;

pub struct SpeechService {
    storage: Arc<Storage>,
    cache: Arc<AudioCache>,
    client: Client,
}

impl SpeechService {
    pub fn new(storage: Arc<Storage>, cache: Arc<AudioCache>) -> Self {
        Self {
            storage,
            cache,
            client: http_client(),
        }
    }

    fn openai_provider(&self, settings: &Settings) -> OpenAiTtsProvider {
        OpenAiTtsProvider::new(
            self.client.clone(),
            settings.openai_key().map(str::to_string),
            self.cache.clone(),
        )
    }

    fn google_provider(&self, settings: &Settings) -> GoogleTtsProvider {
        GoogleTtsProvider::new(
            self.client.clone(),
            settings.google_key().map(str::to_string),
            self.cache.clone(),
        )
    }

    /// Synthesize audio for a text, falling back across backends.
    ///
    /// The preferred backend leads; the other cloud backend follows when
    /// configured. When nothing cloud-side succeeds (including when the
    /// preferred backend is `web`), the caller gets the web-speech sentinel
    /// and speaks locally.
    pub async fn generate_audio(
        &self,
        text: &str,
        language_override: Option<&str>,
    ) -> Result<AudioHandle> {
        let settings = self.storage.effective_settings()?;
        let voice_settings = &settings.voice_settings;
        let language = language_override.unwrap_or(&voice_settings.language);

        let openai = self.openai_provider(&settings);
        let google = self.google_provider(&settings);

        // the configured voice name is backend-specific, so only the
        // preferred backend gets it; the fallback picks by language
        let mut preferred_request = SpeechRequest::new(text, language);
        if let Some(voice) = &voice_settings.voice {
            preferred_request = preferred_request.with_voice(voice);
        }
        let fallback_request = SpeechRequest::new(text, language);

        let mut attempts: Vec<Attempt<'_, std::path::PathBuf>> = Vec::new();
        if voice_settings.provider != SpeechBackend::Web {
            let order: [(&dyn SpeechProvider, &SpeechRequest); 2] =
                match voice_settings.provider {
                    SpeechBackend::Google => {
                        [(&google, &preferred_request), (&openai, &fallback_request)]
                    }
                    _ => [(&openai, &preferred_request), (&google, &fallback_request)],
                };
            for (provider, request) in order {
                if provider.is_configured() {
                    attempts.push((provider.name(), provider.synthesize(request)));
                }
            }
        }

        match first_success("speech synthesis", attempts).await {
            Some(path) => Ok(AudioHandle::Cached {
                path: path.to_string_lossy().into_owned(),
            }),
            None => Ok(AudioHandle::WebSpeech),
        }
    }

    /// Voices offered by the preferred backend for a language.
    ///
    /// Yields `["default"]` when the backend is web, unconfigured, or
    /// cannot be listed.
    pub async fn available_voices(&self, language_override: Option<&str>) -> Result<Vec<String>> {
        let settings = self.storage.effective_settings()?;
        let voice_settings = &settings.voice_settings;
        let language = language_override.unwrap_or(&voice_settings.language);

        let openai = self.openai_provider(&settings);
        let google = self.google_provider(&settings);

        let provider: Option<&dyn SpeechProvider> = match voice_settings.provider {
            SpeechBackend::Openai => Some(&openai),
            SpeechBackend::Google => Some(&google),
            SpeechBackend::Web => None,
        };

        let voices = match provider {
            Some(provider) if provider.is_configured() => {
                match provider.voices(language).await {
                    Ok(voices) => voices,
                    Err(error) => {
                        warn!("Voice listing failed: {}", error);
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        };

        if voices.is_empty() {
            Ok(vec!["default".to_string()])
        } else {
            Ok(voices)
        }
    }

    /// Remove cached audio older than `max_age`, returning the number of
    /// files removed
    pub fn cleanup(&self, max_age: Duration) -> Result<usize> {
        self.cache.cleanup_older_than(max_age)
    }
}
