//! Core types used throughout Lexio

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalize an optional string: trim whitespace, map empty to `None`.
///
/// Every boundary that can produce an absent value goes through this, so
/// "missing", "empty" and "whitespace only" collapse into one state.
pub fn presence(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// A persisted search history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    pub id: i64,
    pub word: String,
    pub search_count: u32,
    pub last_searched: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_favorite: bool,
    pub favorited_at: Option<DateTime<Utc>>,
}

/// A single image search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub url: String,
    pub thumbnail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Requested slice of image results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, per_page: 6 }
    }
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Zero-based index of the first result on this page.
    ///
    /// The fields are public and deserializable, so a page of 0 can reach
    /// here without going through `new`; treat it like page 1.
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1) * self.per_page
    }
}

/// A page of image results with navigation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePage {
    pub images: Vec<ImageResult>,
    pub current_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl ImagePage {
    /// Wrap raw results in pagination metadata.
    ///
    /// Upstream APIs don't report a total, so the page count assumes a pool
    /// of 30 results, capped at 5 pages and floored at 1.
    pub fn paginate(images: Vec<ImageResult>, request: &PageRequest) -> Self {
        let total_pages = (30u32.div_ceil(request.per_page)).clamp(1, 5);
        Self {
            images,
            current_page: request.page,
            total_pages,
            has_next: request.page < total_pages,
            has_previous: request.page > 1,
        }
    }
}

/// Fixed category set for generated example phrases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhraseCategory {
    #[serde(rename = "Descriptive/Aesthetic")]
    Descriptive,
    #[serde(rename = "Practical/Work")]
    Practical,
    #[serde(rename = "Question/Amazement")]
    Question,
    #[serde(rename = "Memory/Emotion")]
    Memory,
    #[serde(rename = "Learning/Question")]
    Learning,
}

impl PhraseCategory {
    /// Get the display label for this category
    pub fn label(&self) -> &'static str {
        match self {
            Self::Descriptive => "Descriptive/Aesthetic",
            Self::Practical => "Practical/Work",
            Self::Question => "Question/Amazement",
            Self::Memory => "Memory/Emotion",
            Self::Learning => "Learning/Question",
        }
    }

    /// Get all categories in canonical order
    pub fn all() -> &'static [PhraseCategory] {
        &[
            PhraseCategory::Descriptive,
            PhraseCategory::Practical,
            PhraseCategory::Question,
            PhraseCategory::Memory,
            PhraseCategory::Learning,
        ]
    }

    /// Parse a category from model output.
    ///
    /// Accepts the full label or just its head segment ("Descriptive"),
    /// case-insensitively. Anything else is rejected.
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        for category in Self::all() {
            if category.label().eq_ignore_ascii_case(trimmed) {
                return Some(*category);
            }
        }

        let head = trimmed.split('/').next().unwrap_or_default().trim();
        for category in Self::all() {
            let label_head = category.label().split('/').next().unwrap_or_default();
            if !head.is_empty() && label_head.eq_ignore_ascii_case(head) {
                return Some(*category);
            }
        }
        None
    }
}

impl std::fmt::Display for PhraseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A generated example phrase with its translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamplePhrase {
    pub text: String,
    pub translation: String,
    pub category: PhraseCategory,
}

impl ExamplePhrase {
    pub fn new(
        text: impl Into<String>,
        translation: impl Into<String>,
        category: PhraseCategory,
    ) -> Self {
        Self {
            text: text.into(),
            translation: translation.into(),
            category,
        }
    }
}

/// Reference to synthesized audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioHandle {
    /// Synthesized artifact cached on disk
    Cached { path: String },
    /// No cloud synthesis available; the shell should use its local speech engine
    WebSpeech,
}

impl AudioHandle {
    /// Path of the cached artifact, if there is one
    pub fn cached_path(&self) -> Option<&str> {
        match self {
            Self::Cached { path } => Some(path),
            Self::WebSpeech => None,
        }
    }
}

/// Combined study material for one word
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyResult {
    pub word: String,
    pub explanation: Option<String>,
    pub images: Vec<ImageResult>,
    pub phrases: Vec<ExamplePhrase>,
}

/// One flashcard ready for export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCard {
    pub word: String,
    pub explanation: String,
    pub phrase: ExamplePhrase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

/// Outcome counts for a batch export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// A note model and its field names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub fields: Vec<String>,
}
