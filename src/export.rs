//! Flashcard assembly and export through the AnkiConnect bridge.
//!
//! Card assembly and field mapping are pure functions; the export flow
//! drives the bridge one card at a time so a single failure never aborts
//! a batch.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{info, warn};

use crate::anki::AnkiConnect;
use crate::error::Result;
use crate::settings::{AnkiSettings, FieldMapping, SourceField};
use crate::types::{
    AudioHandle, ExamplePhrase, ExportCard, ExportSummary, ImageResult, presence,
};

/// Per-export overrides; unset fields fall back to the Anki settings
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub deck: Option<String>,
    pub model: Option<String>,
    pub mappings: Option<Vec<FieldMapping>>,
}

/// Assemble one export card per phrase.
///
/// Images are assigned round-robin so a short image list still covers a
/// long phrase list. A missing explanation falls back to a study prompt,
/// and audio is carried only for cached artifacts (the web-speech sentinel
/// has nothing to attach).
pub fn build_cards(
    word: &str,
    explanation: Option<&str>,
    phrases: &[ExamplePhrase],
    images: &[ImageResult],
    audio: Option<&AudioHandle>,
    settings: &AnkiSettings,
) -> Vec<ExportCard> {
    let explanation = explanation
        .map(str::to_string)
        .unwrap_or_else(|| format!("Study word: {word}"));

    let audio_path = if settings.include_audio {
        audio.and_then(AudioHandle::cached_path)
    } else {
        None
    };

    phrases
        .iter()
        .enumerate()
        .map(|(index, phrase)| {
            let image = if settings.include_images && !images.is_empty() {
                Some(images[index % images.len()].clone())
            } else {
                None
            };
            ExportCard {
                word: word.to_string(),
                explanation: explanation.clone(),
                phrase: phrase.clone(),
                image,
                audio: audio_path.map(str::to_string),
            }
        })
        .collect()
}

/// Resolve card data into note fields according to the mapping list.
///
/// Mappings are applied in list order; several mappings targeting the same
/// output field merge with `" | "`. A mapping whose source is absent
/// contributes nothing, and an output field with zero contributions is
/// omitted rather than emitted empty.
pub fn build_fields(card: &ExportCard, mappings: &[FieldMapping]) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();

    for mapping in mappings {
        let Some(content) = field_content(card, mapping) else {
            continue;
        };
        match fields.entry(mapping.output_field.clone()) {
            Entry::Occupied(mut entry) => {
                let value: &mut String = entry.get_mut();
                value.push_str(" | ");
                value.push_str(&content);
            }
            Entry::Vacant(entry) => {
                entry.insert(content);
            }
        }
    }

    fields
}

fn field_content(card: &ExportCard, mapping: &FieldMapping) -> Option<String> {
    let raw = match mapping.source_field {
        SourceField::Word => presence(Some(card.word.clone())),
        SourceField::Explanation => presence(Some(card.explanation.clone())),
        SourceField::PhraseText => presence(Some(card.phrase.text.clone())),
        SourceField::PhraseTranslation => presence(Some(card.phrase.translation.clone())),
        SourceField::PhraseCategory => Some(card.phrase.category.label().to_string()),
        SourceField::Image => card.image.as_ref().map(|image| image.thumbnail_url.clone()),
        SourceField::Audio => card.audio.clone(),
    }?;

    Some(if mapping.include_markup {
        render_markup(mapping.source_field, &raw)
    } else {
        raw
    })
}

/// Wrap a field value in the card styling for its slot
fn render_markup(source: SourceField, value: &str) -> String {
    match source {
        SourceField::Word => format!(
            r#"<h2 style="color: #2563eb; margin: 16px 0; font-size: 2rem; font-weight: bold;">{value}</h2>"#
        ),
        SourceField::Explanation => format!(
            r#"<div style="background: #f8fafc; border-left: 4px solid #3b82f6; padding: 16px; margin: 16px 0; border-radius: 4px;"><h3 style="margin: 0 0 8px 0; color: #1e40af;">Explanation</h3><p style="margin: 0; color: #374151;">{value}</p></div>"#
        ),
        SourceField::PhraseText => format!(
            r#"<p style="margin: 0 0 8px 0; font-weight: 500; color: #1e293b;">{value}</p>"#
        ),
        SourceField::PhraseTranslation => {
            format!(r#"<p style="margin: 0; font-style: italic; color: #64748b;">{value}</p>"#)
        }
        SourceField::PhraseCategory => format!(
            r#"<span style="display: inline-block; background: #dbeafe; color: #1e40af; padding: 4px 8px; border-radius: 12px; font-size: 0.75rem; margin-top: 8px;">{value}</span>"#
        ),
        SourceField::Image => format!(
            r#"<img src="{value}" alt="Word illustration" style="max-width: 300px; height: auto; border-radius: 8px; margin-bottom: 16px;">"#
        ),
        SourceField::Audio => format!(
            r#"<audio controls style="width: 100%; margin-top: 16px;"><source src="{value}" type="audio/mpeg">Your browser does not support the audio element.</audio>"#
        ),
    }
}

/// Export one card, returning whether the note was created.
///
/// Failures are logged; the boolean is all a batch needs.
pub async fn export_card(
    bridge: &AnkiConnect,
    card: &ExportCard,
    settings: &AnkiSettings,
    options: &ExportOptions,
) -> bool {
    let deck = options.deck.as_deref().unwrap_or(&settings.deck_name);
    let model = options.model.as_deref().unwrap_or(&settings.model_name);
    let mappings = options
        .mappings
        .as_deref()
        .unwrap_or(&settings.field_mappings);

    match try_export(bridge, card, deck, model, mappings).await {
        Ok(true) => true,
        Ok(false) => {
            warn!("AnkiConnect returned no note id for '{}'", card.word);
            false
        }
        Err(error) => {
            warn!("Export of '{}' failed: {}", card.word, error);
            false
        }
    }
}

async fn try_export(
    bridge: &AnkiConnect,
    card: &ExportCard,
    deck: &str,
    model: &str,
    mappings: &[FieldMapping],
) -> Result<bool> {
    bridge.ensure_deck(deck).await?;

    let fields = build_fields(card, mappings);
    let tags = [
        "lexio".to_string(),
        "vocabulary".to_string(),
        card.word.to_lowercase(),
    ];

    let Some(note_id) = bridge.add_note(deck, model, &fields, &tags).await? else {
        return Ok(false);
    };

    // the note exists at this point; losing the audio is not worth
    // failing the card over
    if let Some(audio) = &card.audio {
        if let Err(error) = attach_audio(bridge, &card.word, audio).await {
            warn!("Audio attach for note {} failed: {}", note_id, error);
        }
    }

    Ok(true)
}

/// Export a batch sequentially; one card's failure never aborts the rest
pub async fn export_cards(
    bridge: &AnkiConnect,
    cards: &[ExportCard],
    settings: &AnkiSettings,
    options: &ExportOptions,
) -> ExportSummary {
    let mut summary = ExportSummary::default();
    for card in cards {
        if export_card(bridge, card, settings, options).await {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }

    info!(
        "Exported {} card(s), {} failed",
        summary.succeeded, summary.failed
    );
    summary
}

/// Ship a card's audio into Anki's media collection as `{word}_audio.mp3`
async fn attach_audio(bridge: &AnkiConnect, word: &str, audio: &str) -> Result<()> {
    let data = encode_audio(audio)?;
    bridge
        .store_media_file(&format!("{word}_audio.mp3"), &data)
        .await
}

/// Base64 payload for a media upload.
///
/// Data URLs are decoded in place; anything else is treated as a local
/// file path (with an optional file:// scheme), read, and encoded.
fn encode_audio(audio: &str) -> Result<String> {
    if let Some((_, data)) = audio.split_once("base64,") {
        return Ok(data.to_string());
    }

    let path = audio.strip_prefix("file://").unwrap_or(audio);
    let bytes = std::fs::read(Path::new(path))?;
    Ok(STANDARD.encode(bytes))
}
