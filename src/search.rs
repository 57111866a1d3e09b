//! Content orchestration: provider selection, fallback chains, and the
//! combined word lookup.
//!
//! Every public operation degrades instead of failing: when a cloud
//! provider is unconfigured or errors, the chain moves to the next
//! candidate and finally to synthetic content, so a lookup always returns
//! something displayable. Only storage errors propagate.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::Client;
use tracing::warn;

use crate::error::Result;
use crate::prompts::PromptLibrary;
use crate::providers::{
    Attempt, GoogleImageProvider, ImageProvider, OpenAiTextProvider, PixabayImageProvider,
    PlaceholderImageProvider, TemplatePhraseProvider, TextGenProvider, first_success, http_client,
};
use crate::settings::{ImageSearchProvider, Settings};
use crate::storage::Storage;
use crate::types::{ExamplePhrase, ImagePage, ImageResult, PageRequest, StudyResult};

/// Explanations are always produced in this language
const EXPLANATION_OUTPUT_LANGUAGE: &str = "English";

pub struct SearchService {
    storage: Arc<Storage>,
    prompts: Arc<PromptLibrary>,
    client: Client,
}

impl SearchService {
    pub fn new(storage: Arc<Storage>, prompts: Arc<PromptLibrary>) -> Self {
        Self {
            storage,
            prompts,
            client: http_client(),
        }
    }

    fn google_provider(&self, settings: &Settings) -> GoogleImageProvider {
        GoogleImageProvider::new(
            self.client.clone(),
            settings.google_key().map(str::to_string),
            settings.google_engine_id().map(str::to_string),
        )
    }

    fn pixabay_provider(&self, settings: &Settings) -> PixabayImageProvider {
        PixabayImageProvider::new(
            self.client.clone(),
            settings.pixabay_key().map(str::to_string),
        )
    }

    fn openai_provider(&self, settings: &Settings) -> OpenAiTextProvider {
        OpenAiTextProvider::new(
            self.client.clone(),
            settings.openai_key().map(str::to_string),
            self.prompts.clone(),
        )
    }

    /// Search images for a word, falling back through providers.
    ///
    /// An explicitly selected provider leads the chain; Auto tries Google
    /// then Pixabay. Placeholders terminate the chain, so this never comes
    /// back empty.
    pub async fn search_images(&self, word: &str, page: &PageRequest) -> Result<ImagePage> {
        let settings = self.storage.effective_settings()?;

        let google = self.google_provider(&settings);
        let pixabay = self.pixabay_provider(&settings);
        let placeholder = PlaceholderImageProvider;

        let cloud: [&dyn ImageProvider; 2] = match settings.image_search_provider {
            ImageSearchProvider::Pixabay => [&pixabay, &google],
            ImageSearchProvider::Google | ImageSearchProvider::Auto => [&google, &pixabay],
        };

        let mut attempts: Vec<Attempt<'_, Vec<ImageResult>>> = Vec::new();
        for provider in cloud {
            if provider.is_configured() {
                attempts.push((provider.name(), provider.search(word, page)));
            }
        }
        attempts.push((placeholder.name(), placeholder.search(word, page)));

        let images = first_success("image search", attempts)
            .await
            .unwrap_or_default();

        Ok(ImagePage::paginate(images, page))
    }

    /// Generate example phrases, falling back to the fixed templates
    pub async fn generate_phrases(&self, word: &str) -> Result<Vec<ExamplePhrase>> {
        let settings = self.storage.effective_settings()?;
        let target_language = settings.target_language();

        let openai = self.openai_provider(&settings);
        let templates = TemplatePhraseProvider;

        let mut attempts: Vec<Attempt<'_, Vec<ExamplePhrase>>> = Vec::new();
        if openai.is_configured() {
            attempts.push((openai.name(), openai.generate_phrases(word, target_language)));
        }
        attempts.push((
            templates.name(),
            templates.generate_phrases(word, target_language),
        ));

        Ok(first_success("phrase generation", attempts)
            .await
            .unwrap_or_default())
    }

    /// Generate an explanation of the word.
    ///
    /// There is no synthetic explanation, so an unconfigured or failing
    /// provider resolves to `None` rather than an error.
    pub async fn generate_explanation(&self, word: &str) -> Result<Option<String>> {
        let settings = self.storage.effective_settings()?;

        let openai = self.openai_provider(&settings);

        let mut attempts: Vec<Attempt<'_, Option<String>>> = Vec::new();
        if openai.is_configured() {
            attempts.push((
                openai.name(),
                openai.generate_explanation(
                    word,
                    settings.target_language(),
                    EXPLANATION_OUTPUT_LANGUAGE,
                ),
            ));
        }

        Ok(first_success("explanation", attempts).await.flatten())
    }

    /// Record the search and fetch images, phrases, and explanation
    /// concurrently.
    ///
    /// The three fetches settle independently; an arm that fails
    /// contributes its empty default without disturbing the others.
    pub async fn lookup(&self, word: &str, page: &PageRequest) -> Result<StudyResult> {
        self.storage.record_search(word)?;

        let (images, phrases, explanation) = tokio::join!(
            self.search_images(word, page),
            self.generate_phrases(word),
            self.generate_explanation(word),
        );

        let images = match images {
            Ok(page) => page.images,
            Err(error) => {
                warn!("Image fetch for '{}' failed: {}", word, error);
                Vec::new()
            }
        };
        let phrases = match phrases {
            Ok(phrases) => phrases,
            Err(error) => {
                warn!("Phrase fetch for '{}' failed: {}", word, error);
                Vec::new()
            }
        };
        let explanation = match explanation {
            Ok(explanation) => explanation,
            Err(error) => {
                warn!("Explanation fetch for '{}' failed: {}", word, error);
                None
            }
        };

        Ok(StudyResult {
            word: word.to_string(),
            explanation,
            images,
            phrases,
        })
    }

    /// Probe each provider credential with a live request.
    ///
    /// Keys: `openai`, `google`, `pixabay`. A key is true only when the
    /// credential is present and the probe succeeded; probes run
    /// concurrently.
    pub async fn validate_api_keys(&self) -> Result<BTreeMap<String, bool>> {
        let settings = self.storage.effective_settings()?;

        let openai = self.openai_provider(&settings);
        let google = self.google_provider(&settings);
        let pixabay = self.pixabay_provider(&settings);

        let (openai_ok, google_ok, pixabay_ok) =
            tokio::join!(openai.validate(), google.validate(), pixabay.validate());

        let mut results = BTreeMap::new();
        results.insert("openai".to_string(), openai_ok);
        results.insert("google".to_string(), google_ok);
        results.insert("pixabay".to_string(), pixabay_ok);
        Ok(results)
    }
}
