//! User settings: typed model, compiled defaults, and the stored-row overlay.
//!
//! Settings persist as one row per top-level key, each holding the JSON
//! serialization of that subtree. Effective settings are always the compiled
//! defaults overlaid with whatever rows exist, so a partial save never
//! disturbs unrelated keys and a fresh database behaves sensibly.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Image search provider selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSearchProvider {
    /// Try each configured provider in order
    #[default]
    Auto,
    Google,
    Pixabay,
}

/// Speech synthesis backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    Openai,
    Google,
    /// No cloud synthesis; the shell speaks locally
    #[default]
    Web,
}

/// Flashcard template family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardTemplate {
    #[default]
    Basic,
    Cloze,
}

/// Study-data slot a field mapping can read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceField {
    Word,
    Explanation,
    PhraseText,
    PhraseTranslation,
    PhraseCategory,
    Image,
    Audio,
}

/// Maps one study-data slot onto a note field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub source_field: SourceField,
    pub output_field: String,
    #[serde(default)]
    pub include_markup: bool,
}

impl FieldMapping {
    pub fn new(source_field: SourceField, output_field: impl Into<String>) -> Self {
        Self {
            source_field,
            output_field: output_field.into(),
            include_markup: false,
        }
    }

    pub fn with_markup(mut self) -> Self {
        self.include_markup = true;
        self
    }
}

/// Speech synthesis preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceSettings {
    pub provider: SpeechBackend,
    pub language: String,
    pub voice: Option<String>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            provider: SpeechBackend::Web,
            language: "en-US".to_string(),
            voice: None,
        }
    }
}

/// Flashcard export preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnkiSettings {
    pub enabled: bool,
    pub deck_name: String,
    pub card_template: CardTemplate,
    pub include_audio: bool,
    pub include_images: bool,
    pub model_name: String,
    pub field_mappings: Vec<FieldMapping>,
}

impl Default for AnkiSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            deck_name: "Lexio::Vocabulary".to_string(),
            card_template: CardTemplate::Basic,
            include_audio: true,
            include_images: true,
            model_name: "Basic".to_string(),
            field_mappings: AnkiSettings::default_mappings(),
        }
    }
}

impl AnkiSettings {
    /// The out-of-the-box mapping set for the Basic model
    pub fn default_mappings() -> Vec<FieldMapping> {
        vec![
            FieldMapping::new(SourceField::Word, "Front").with_markup(),
            FieldMapping::new(SourceField::Explanation, "Back").with_markup(),
            FieldMapping::new(SourceField::PhraseText, "Back").with_markup(),
            FieldMapping::new(SourceField::PhraseTranslation, "Back").with_markup(),
            FieldMapping::new(SourceField::Image, "Back").with_markup(),
        ]
    }
}

/// All user settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub google_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    pub openai_api_key: Option<String>,
    pub pixabay_api_key: Option<String>,
    pub preferred_language: String,
    pub image_search_provider: ImageSearchProvider,
    pub voice_settings: VoiceSettings,
    pub anki: AnkiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_search_engine_id: None,
            openai_api_key: None,
            pixabay_api_key: None,
            preferred_language: "en".to_string(),
            image_search_provider: ImageSearchProvider::Auto,
            voice_settings: VoiceSettings::default(),
            anki: AnkiSettings::default(),
        }
    }
}

impl Settings {
    /// Overlay stored rows onto the defaults.
    ///
    /// Each row is parsed as JSON and tentatively merged; a row that is not
    /// JSON, or that breaks the typed model, is skipped with a warning so one
    /// bad key can never poison the rest.
    pub fn resolve(rows: &[(String, String)]) -> Settings {
        let Ok(Value::Object(mut merged)) = serde_json::to_value(Settings::default()) else {
            return Settings::default();
        };

        for (key, raw) in rows {
            let parsed: Value = match serde_json::from_str(raw) {
                Ok(value) => value,
                Err(err) => {
                    warn!("Ignoring malformed settings row '{}': {}", key, err);
                    continue;
                }
            };

            let previous = merged.insert(key.clone(), parsed);
            if let Err(err) = serde_json::from_value::<Settings>(Value::Object(merged.clone())) {
                warn!("Stored settings row '{}' does not fit the model: {}", key, err);
                match previous {
                    Some(value) => {
                        merged.insert(key.clone(), value);
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        }

        serde_json::from_value(Value::Object(merged)).unwrap_or_default()
    }

    /// OpenAI API key, if a non-empty one is set
    pub fn openai_key(&self) -> Option<&str> {
        normalized(self.openai_api_key.as_deref())
    }

    /// Google API key, if a non-empty one is set
    pub fn google_key(&self) -> Option<&str> {
        normalized(self.google_api_key.as_deref())
    }

    /// Google Custom Search engine id, if a non-empty one is set
    pub fn google_engine_id(&self) -> Option<&str> {
        normalized(self.google_search_engine_id.as_deref())
    }

    /// Pixabay API key, if a non-empty one is set
    pub fn pixabay_key(&self) -> Option<&str> {
        normalized(self.pixabay_api_key.as_deref())
    }

    /// Prompt-facing name of the language being studied
    pub fn target_language(&self) -> &'static str {
        language_name(&self.preferred_language)
    }
}

fn normalized(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Map a preferred-language code to the language name used in prompts
pub fn language_name(code: &str) -> &'static str {
    match code {
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        _ => "Spanish",
    }
}

/// Partial settings update: `None` fields leave the stored value untouched.
///
/// Credentials are plain strings here; saving an empty string clears one
/// (effective settings normalize empty to absent).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search_engine_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixabay_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_search_provider: Option<ImageSearchProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_settings: Option<VoiceSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anki: Option<AnkiSettings>,
}

impl From<Settings> for SettingsPatch {
    fn from(settings: Settings) -> Self {
        Self {
            google_api_key: Some(settings.google_api_key.unwrap_or_default()),
            google_search_engine_id: Some(settings.google_search_engine_id.unwrap_or_default()),
            openai_api_key: Some(settings.openai_api_key.unwrap_or_default()),
            pixabay_api_key: Some(settings.pixabay_api_key.unwrap_or_default()),
            preferred_language: Some(settings.preferred_language),
            image_search_provider: Some(settings.image_search_provider),
            voice_settings: Some(settings.voice_settings),
            anki: Some(settings.anki),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.preferred_language, "en");
        assert_eq!(settings.image_search_provider, ImageSearchProvider::Auto);
        assert_eq!(settings.voice_settings.provider, SpeechBackend::Web);
        assert_eq!(settings.voice_settings.language, "en-US");
        assert!(!settings.anki.enabled);
        assert_eq!(settings.anki.deck_name, "Lexio::Vocabulary");
        assert_eq!(settings.anki.model_name, "Basic");
        assert!(settings.anki.include_audio);
        assert!(settings.anki.include_images);
        assert_eq!(settings.anki.field_mappings.len(), 5);
    }

    #[test]
    fn test_resolve_overlays_stored_rows() {
        let rows = vec![
            ("preferredLanguage".to_string(), "\"fr\"".to_string()),
            ("openaiApiKey".to_string(), "\"sk-test\"".to_string()),
            (
                "voiceSettings".to_string(),
                r#"{"provider":"google","language":"fr-FR"}"#.to_string(),
            ),
        ];

        let settings = Settings::resolve(&rows);
        assert_eq!(settings.preferred_language, "fr");
        assert_eq!(settings.openai_key(), Some("sk-test"));
        assert_eq!(settings.voice_settings.provider, SpeechBackend::Google);
        assert_eq!(settings.voice_settings.language, "fr-FR");
        // untouched keys keep their defaults
        assert_eq!(settings.anki.deck_name, "Lexio::Vocabulary");
    }

    #[test]
    fn test_resolve_skips_malformed_rows() {
        let rows = vec![
            ("preferredLanguage".to_string(), "not json at all".to_string()),
            ("imageSearchProvider".to_string(), "42".to_string()),
            ("pixabayApiKey".to_string(), "\"px-key\"".to_string()),
        ];

        let settings = Settings::resolve(&rows);
        // both bad rows fall back to defaults, the good one lands
        assert_eq!(settings.preferred_language, "en");
        assert_eq!(settings.image_search_provider, ImageSearchProvider::Auto);
        assert_eq!(settings.pixabay_key(), Some("px-key"));
    }

    #[test]
    fn test_resolve_partial_subtree_keeps_defaults() {
        let rows = vec![("anki".to_string(), r#"{"enabled":true}"#.to_string())];
        let settings = Settings::resolve(&rows);
        assert!(settings.anki.enabled);
        assert_eq!(settings.anki.deck_name, "Lexio::Vocabulary");
        assert_eq!(settings.anki.field_mappings.len(), 5);
    }

    #[test]
    fn test_empty_credentials_read_as_absent() {
        let settings = Settings {
            openai_api_key: Some("   ".to_string()),
            google_api_key: Some(String::new()),
            ..Settings::default()
        };
        assert_eq!(settings.openai_key(), None);
        assert_eq!(settings.google_key(), None);
    }

    #[test]
    fn test_full_patch_covers_every_key() {
        let patch = SettingsPatch::from(Settings::default());
        let value = serde_json::to_value(&patch).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "googleApiKey",
            "googleSearchEngineId",
            "openaiApiKey",
            "pixabayApiKey",
            "preferredLanguage",
            "imageSearchProvider",
            "voiceSettings",
            "anki",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn test_partial_patch_serializes_only_set_keys() {
        let patch = SettingsPatch {
            preferred_language: Some("ja".to_string()),
            ..SettingsPatch::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object["preferredLanguage"], "ja");
    }

    #[test]
    fn test_language_names() {
        assert_eq!(language_name("fr"), "French");
        assert_eq!(language_name("ja"), "Japanese");
        // unknown codes (including "en") fall back to Spanish
        assert_eq!(language_name("en"), "Spanish");
        assert_eq!(language_name("xx"), "Spanish");
    }
}
