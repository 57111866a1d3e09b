//! Synthetic content providers used as chain terminals
//!
//! These implement the same traits as the cloud providers so the fallback is
//! just the last element of an ordered chain. They need no credentials and
//! never fail, which is what guarantees that searches always produce study
//! material.

use async_trait::async_trait;

use super::{ImageProvider, TextGenProvider};
use crate::error::Result;
use crate::types::{ExamplePhrase, ImageResult, PageRequest, PhraseCategory};

struct PhraseSeed {
    text: &'static str,
    spanish: &'static str,
    french: &'static str,
    category: PhraseCategory,
}

const PHRASE_SEEDS: &[PhraseSeed] = &[
    PhraseSeed {
        text: "The {word} was beautiful in the morning light.",
        spanish: "El/La {word} era hermoso/a en la luz de la mañana.",
        french: "Le/La {word} était beau/belle dans la lumière du matin.",
        category: PhraseCategory::Descriptive,
    },
    PhraseSeed {
        text: "I need to find a good {word} for this project.",
        spanish: "Necesito encontrar un/a buen/a {word} para este proyecto.",
        french: "J'ai besoin de trouver un/une bon/bonne {word} pour ce projet.",
        category: PhraseCategory::Practical,
    },
    PhraseSeed {
        text: "Have you ever seen such an amazing {word}?",
        spanish: "¿Alguna vez has visto un/a {word} tan increíble?",
        french: "Avez-vous déjà vu un/une {word} si incroyable?",
        category: PhraseCategory::Question,
    },
    PhraseSeed {
        text: "The {word} reminded me of my childhood.",
        spanish: "El/La {word} me recordó mi infancia.",
        french: "Le/La {word} m'a rappelé mon enfance.",
        category: PhraseCategory::Memory,
    },
    PhraseSeed {
        text: "Can you help me understand this {word} better?",
        spanish: "¿Puedes ayudarme a entender mejor este/a {word}?",
        french: "Pouvez-vous m'aider à mieux comprendre ce/cette {word}?",
        category: PhraseCategory::Learning,
    },
];

/// Deterministic placeholder images so the gallery always has content.
///
/// Exactly `per_page` entries; the random tag carries the overall index so
/// different pages show different pictures.
pub fn placeholder_images(word: &str, page: &PageRequest) -> Vec<ImageResult> {
    let offset = page.offset();
    (0..page.per_page)
        .map(|i| {
            let index = offset + i;
            ImageResult {
                url: format!("https://picsum.photos/400/300?random={word}-{index}"),
                thumbnail_url: format!("https://picsum.photos/200/150?random={word}-{index}"),
                title: Some(format!("{word} image {}", index + 1)),
                source: Some("picsum.photos (mock)".to_string()),
            }
        })
        .collect()
}

/// Fixed example phrases, one per category.
///
/// Translations exist for Spanish and French; anything else gets Spanish.
pub fn template_phrases(word: &str, target_language: &str) -> Vec<ExamplePhrase> {
    let french = matches!(target_language, "French" | "fr");
    PHRASE_SEEDS
        .iter()
        .map(|seed| {
            let translation = if french { seed.french } else { seed.spanish };
            ExamplePhrase::new(
                seed.text.replace("{word}", word),
                translation.replace("{word}", word),
                seed.category,
            )
        })
        .collect()
}

/// Placeholder image generator as a chain element
pub struct PlaceholderImageProvider;

#[async_trait]
impl ImageProvider for PlaceholderImageProvider {
    fn name(&self) -> &'static str {
        "Placeholder Images"
    }

    async fn search(&self, query: &str, page: &PageRequest) -> Result<Vec<ImageResult>> {
        Ok(placeholder_images(query, page))
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Template phrase generator as a chain element.
///
/// Explanations have no synthetic form, so that method resolves to absent.
pub struct TemplatePhraseProvider;

#[async_trait]
impl TextGenProvider for TemplatePhraseProvider {
    fn name(&self) -> &'static str {
        "Template Phrases"
    }

    async fn generate_phrases(
        &self,
        word: &str,
        target_language: &str,
    ) -> Result<Vec<ExamplePhrase>> {
        Ok(template_phrases(word, target_language))
    }

    async fn generate_explanation(
        &self,
        _word: &str,
        _target_language: &str,
        _output_language: &str,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    fn is_configured(&self) -> bool {
        true
    }
}
