//! Application facade wiring storage, orchestration, speech, and the Anki
//! bridge behind one handle for the desktop shell.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::anki::AnkiConnect;
use crate::audio_cache::{self, AudioCache};
use crate::error::Result;
use crate::export::{self, ExportOptions};
use crate::prompts::PromptLibrary;
use crate::search::SearchService;
use crate::settings::{Settings, SettingsPatch};
use crate::speech::SpeechService;
use crate::storage::Storage;
use crate::types::{
    AudioHandle, ExamplePhrase, ExportCard, ExportSummary, ImagePage, ImageResult, ModelInfo,
    PageRequest, SearchRecord, StudyResult,
};

pub struct Lexio {
    storage: Arc<Storage>,
    search: SearchService,
    speech: SpeechService,
    anki: AnkiConnect,
}

impl Lexio {
    /// Open (or create) the database at `path` and wire up the services
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let storage = Arc::new(Storage::open(path)?);
        Ok(Self::with_storage(storage))
    }

    /// Fully in-memory instance, mainly for tests
    pub fn in_memory() -> Result<Self> {
        let storage = Arc::new(Storage::in_memory()?);
        Ok(Self::with_storage(storage))
    }

    fn with_storage(storage: Arc<Storage>) -> Self {
        let prompts = Arc::new(PromptLibrary::new());
        let cache = Arc::new(AudioCache::in_temp_dir());
        let search = SearchService::new(storage.clone(), prompts);
        let speech = SpeechService::new(storage.clone(), cache);

        Self {
            storage,
            search,
            speech,
            anki: AnkiConnect::default(),
        }
    }

    /// Point the Anki bridge at a different endpoint (used by tests)
    pub fn with_anki_url(mut self, url: impl Into<String>) -> Self {
        self.anki = AnkiConnect::new(url);
        self
    }

    /// Default database location under the platform data directory
    pub fn default_db_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("lexio")
            .join("lexio.db")
    }

    // ========== History ==========

    pub fn search_history(&self, favorites_only: bool) -> Result<Vec<SearchRecord>> {
        self.storage.search_history(favorites_only)
    }

    pub fn record_search(&self, word: &str) -> Result<()> {
        self.storage.record_search(word)
    }

    pub fn set_favorite(&self, word: &str, favorite: bool) -> Result<()> {
        self.storage.set_favorite(word, favorite)
    }

    pub fn is_favorite(&self, word: &str) -> Result<bool> {
        self.storage.is_favorite(word)
    }

    // ========== Content ==========

    pub async fn search_images(&self, word: &str, page: &PageRequest) -> Result<ImagePage> {
        self.search.search_images(word, page).await
    }

    pub async fn generate_phrases(&self, word: &str) -> Result<Vec<ExamplePhrase>> {
        self.search.generate_phrases(word).await
    }

    pub async fn generate_explanation(&self, word: &str) -> Result<Option<String>> {
        self.search.generate_explanation(word).await
    }

    /// Record the search and fetch all study content for a word
    pub async fn lookup(&self, word: &str, page: &PageRequest) -> Result<StudyResult> {
        self.search.lookup(word, page).await
    }

    // ========== Audio ==========

    pub async fn generate_audio(
        &self,
        text: &str,
        language: Option<&str>,
    ) -> Result<AudioHandle> {
        self.speech.generate_audio(text, language).await
    }

    pub async fn available_voices(&self, language: Option<&str>) -> Result<Vec<String>> {
        self.speech.available_voices(language).await
    }

    /// Remove cached audio older than `max_age` (default seven days)
    pub fn cleanup_audio_cache(&self, max_age: Option<Duration>) -> Result<usize> {
        self.speech
            .cleanup(max_age.unwrap_or(audio_cache::DEFAULT_MAX_AGE))
    }

    // ========== Settings ==========

    pub fn get_settings(&self) -> Result<Settings> {
        self.storage.effective_settings()
    }

    pub fn save_settings(&self, patch: &SettingsPatch) -> Result<()> {
        self.storage.save_settings(patch)
    }

    /// Probe each stored provider credential with a live request
    pub async fn validate_api_keys(&self) -> Result<BTreeMap<String, bool>> {
        self.search.validate_api_keys().await
    }

    // ========== Anki ==========

    pub async fn anki_available(&self) -> bool {
        self.anki.ping().await
    }

    pub async fn anki_decks(&self) -> Result<Vec<String>> {
        self.anki.deck_names().await
    }

    pub async fn anki_models(&self) -> Result<Vec<ModelInfo>> {
        self.anki.models_with_fields().await
    }

    pub async fn anki_model_fields(&self, model: &str) -> Result<Vec<String>> {
        self.anki.model_field_names(model).await
    }

    pub async fn export_card(&self, card: &ExportCard, options: &ExportOptions) -> Result<bool> {
        let settings = self.storage.effective_settings()?;
        Ok(export::export_card(&self.anki, card, &settings.anki, options).await)
    }

    pub async fn export_cards(
        &self,
        cards: &[ExportCard],
        options: &ExportOptions,
    ) -> Result<ExportSummary> {
        let settings = self.storage.effective_settings()?;
        Ok(export::export_cards(&self.anki, cards, &settings.anki, options).await)
    }

    /// Build cards from a study result and export the chosen phrases.
    ///
    /// Indices select into `result.phrases` / `result.images`; out-of-range
    /// entries are ignored. When audio is enabled, each card gets its own
    /// synthesis of the phrase text; a failed synthesis leaves that card
    /// silent rather than failing the export.
    pub async fn export_study_result(
        &self,
        result: &StudyResult,
        selected_phrases: &[usize],
        selected_images: &[usize],
        options: &ExportOptions,
    ) -> Result<ExportSummary> {
        let settings = self.storage.effective_settings()?;
        let anki_settings = &settings.anki;

        let phrases: Vec<ExamplePhrase> = selected_phrases
            .iter()
            .filter_map(|&index| result.phrases.get(index).cloned())
            .collect();
        let images: Vec<ImageResult> = selected_images
            .iter()
            .filter_map(|&index| result.images.get(index).cloned())
            .collect();

        let mut cards = export::build_cards(
            &result.word,
            result.explanation.as_deref(),
            &phrases,
            &images,
            None,
            anki_settings,
        );

        // each card speaks its own example sentence, not the headword
        if anki_settings.include_audio {
            for card in &mut cards {
                match self.speech.generate_audio(&card.phrase.text, None).await {
                    Ok(handle) => card.audio = handle.cached_path().map(str::to_string),
                    Err(error) => {
                        warn!("Audio for '{}' failed: {}", card.phrase.text, error);
                    }
                }
            }
        }

        Ok(export::export_cards(&self.anki, &cards, anki_settings, options).await)
    }
}
