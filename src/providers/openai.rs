//! OpenAI chat-completion text generation provider

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::TextGenProvider;
use crate::error::{Error, Result};
use crate::prompts::{self, PromptLibrary, RenderedPrompt};
use crate::types::{ExamplePhrase, PhraseCategory, presence};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const PHRASE_COUNT: usize = 5;

pub struct OpenAiTextProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    prompts: Arc<PromptLibrary>,
}

impl OpenAiTextProvider {
    pub fn new(client: Client, api_key: Option<String>, prompts: Arc<PromptLibrary>) -> Self {
        Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: OPENAI_API_BASE.to_string(),
            prompts,
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a different API endpoint (e.g. an OpenAI-compatible service)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("OpenAI API key not set".to_string()))
    }

    async fn chat(
        &self,
        prompt: &RenderedPrompt,
        temperature: f32,
        max_tokens: u32,
        json_output: bool,
    ) -> Result<String> {
        let api_key = self.api_key()?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature,
            max_tokens,
            response_format: json_output.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error: {} - {}", status, error_text);
            return Err(Error::TextGen(format!(
                "OpenAI API error: {} - {}",
                status, error_text
            )));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(content)
    }

    /// Probe the API with a minimal completion to confirm the key works
    pub async fn validate(&self) -> bool {
        let Ok(api_key) = self.api_key() else {
            return false;
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: "Hi",
            }],
            temperature: 0.0,
            max_tokens: 5,
            response_format: None,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await;

        match response {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                warn!("OpenAI key validation request failed: {}", error);
                false
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextGenProvider for OpenAiTextProvider {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    async fn generate_phrases(
        &self,
        word: &str,
        target_language: &str,
    ) -> Result<Vec<ExamplePhrase>> {
        debug!("Generating phrases for '{}' in {}", word, target_language);

        let prompt = self.prompts.rendered(
            prompts::PHRASE_GENERATION,
            &[("targetLanguage", target_language), ("word", word)],
        )?;
        let content = self.chat(&prompt, 0.7, 800, true).await?;

        parse_phrases(&content)
    }

    async fn generate_explanation(
        &self,
        word: &str,
        target_language: &str,
        output_language: &str,
    ) -> Result<Option<String>> {
        let template = if target_language.eq_ignore_ascii_case(output_language) {
            prompts::EXPLANATION_MONOLINGUAL
        } else {
            prompts::EXPLANATION_BILINGUAL
        };

        debug!("Generating explanation for '{}' with {}", word, template);

        let prompt = self.prompts.rendered(
            template,
            &[
                ("word", word),
                ("targetLanguage", target_language),
                ("outputLanguage", output_language),
            ],
        )?;
        let content = self.chat(&prompt, 0.3, 400, false).await?;

        Ok(presence(Some(content)))
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

// ========== Response parsing ==========

/// Extract phrases from model output, tolerating common JSON wrapping.
///
/// Models occasionally ignore the json_object format hint and wrap the
/// payload in a code fence or prose, so progressively looser readings of
/// the text are tried before giving up.
fn parse_phrases(raw: &str) -> Result<Vec<ExamplePhrase>> {
    for candidate in candidates(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            let phrases = collect_phrases(&value);
            if !phrases.is_empty() {
                return Ok(phrases);
            }
        }
    }

    Err(Error::TextGen(
        "model output contained no usable phrases".to_string(),
    ))
}

/// Candidate JSON readings of the raw output, strictest first
fn candidates(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let mut candidates = vec![trimmed.to_string()];

    if let Some(fenced) = extract_fenced(trimmed) {
        candidates.push(fenced);
    }

    if let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if open < close {
            candidates.push(trimmed[open..=close].to_string());
        }
    }

    candidates
}

/// Contents of the first ``` code fence, optional language tag stripped
fn extract_fenced(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim().to_string())
}

fn collect_phrases(value: &Value) -> Vec<ExamplePhrase> {
    let Some(items) = ["phrases", "sentences", "items"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_array))
    else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let text = item.get("text").and_then(Value::as_str)?.trim();
            let translation = item.get("translation").and_then(Value::as_str)?.trim();
            if text.is_empty() || translation.is_empty() {
                return None;
            }
            let category = item
                .get("category")
                .and_then(Value::as_str)
                .and_then(PhraseCategory::from_label)?;
            Some(ExamplePhrase::new(text, translation, category))
        })
        .take(PHRASE_COUNT)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"{"phrases": [
        {"text": "La casa es bonita", "translation": "The house is pretty", "category": "Descriptive/Aesthetic"},
        {"text": "Trabajo desde casa", "translation": "I work from home", "category": "Practical/Work"}
    ]}"#;

    #[test]
    fn test_parse_clean_json() {
        let phrases = parse_phrases(CLEAN).unwrap();
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0].text, "La casa es bonita");
        assert_eq!(phrases[0].category, PhraseCategory::Descriptive);
        assert_eq!(phrases[1].category, PhraseCategory::Practical);
    }

    #[test]
    fn test_parse_code_fenced_json() {
        let raw = format!("Here you go:\n```json\n{}\n```\nEnjoy!", CLEAN);
        let phrases = parse_phrases(&raw).unwrap();
        assert_eq!(phrases.len(), 2);
    }

    #[test]
    fn test_parse_json_embedded_in_prose() {
        let raw = format!("Sure! {} Hope that helps.", CLEAN);
        let phrases = parse_phrases(&raw).unwrap();
        assert_eq!(phrases.len(), 2);
    }

    #[test]
    fn test_parse_alternate_array_keys() {
        for key in ["sentences", "items"] {
            let raw = format!(
                r#"{{"{}": [{{"text": "Hola", "translation": "Hello", "category": "Learning"}}]}}"#,
                key
            );
            let phrases = parse_phrases(&raw).unwrap();
            assert_eq!(phrases.len(), 1, "key {}", key);
            assert_eq!(phrases[0].category, PhraseCategory::Learning);
        }
    }

    #[test]
    fn test_parse_skips_invalid_entries() {
        let raw = r#"{"phrases": [
            {"text": "", "translation": "empty text", "category": "Descriptive"},
            {"text": "sin traducción", "translation": "", "category": "Descriptive"},
            {"text": "mala categoría", "translation": "bad category", "category": "Poetry"},
            {"text": "válida", "translation": "valid", "category": "Memory/Emotion"}
        ]}"#;
        let phrases = parse_phrases(raw).unwrap();
        assert_eq!(phrases.len(), 1);
        assert_eq!(phrases[0].text, "válida");
        assert_eq!(phrases[0].category, PhraseCategory::Memory);
    }

    #[test]
    fn test_parse_caps_at_five() {
        let entries: Vec<String> = (0..8)
            .map(|i| {
                format!(
                    r#"{{"text": "frase {}", "translation": "phrase {}", "category": "Learning"}}"#,
                    i, i
                )
            })
            .collect();
        let raw = format!(r#"{{"phrases": [{}]}}"#, entries.join(","));
        let phrases = parse_phrases(&raw).unwrap();
        assert_eq!(phrases.len(), PHRASE_COUNT);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_phrases("I cannot produce JSON today.").is_err());
        assert!(parse_phrases(r#"{"phrases": []}"#).is_err());
        assert!(parse_phrases(r#"{"unrelated": true}"#).is_err());
    }

    #[test]
    fn test_not_configured_without_key() {
        let provider = OpenAiTextProvider::new(Client::new(), None, Arc::new(PromptLibrary::new()));
        assert!(!provider.is_configured());
    }
}
