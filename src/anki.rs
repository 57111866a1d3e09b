//! AnkiConnect bridge client.
//!
//! Talks to the AnkiConnect add-on's local HTTP endpoint using its
//! `{action, version, params}` envelope (API version 6). Responses carry
//! `result` and `error`; a non-null error becomes [`Error::AnkiConnect`].

use std::collections::BTreeMap;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::providers::http_client;
use crate::types::ModelInfo;

const DEFAULT_ANKI_URL: &str = "http://127.0.0.1:8765";
const API_VERSION: u32 = 6;

pub struct AnkiConnect {
    client: Client,
    url: String,
}

impl Default for AnkiConnect {
    fn default() -> Self {
        Self::new(DEFAULT_ANKI_URL)
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    action: &'static str,
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

impl AnkiConnect {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            url: url.into(),
        }
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        action: &'static str,
        params: Option<Value>,
    ) -> Result<Option<T>> {
        let request = ApiRequest {
            action,
            version: API_VERSION,
            params,
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("AnkiConnect HTTP error: {} - {}", status, error_text);
            return Err(Error::AnkiConnect(format!(
                "AnkiConnect HTTP error: {} - {}",
                status, error_text
            )));
        }

        let body: ApiResponse<T> = response.json().await?;
        if let Some(error) = body.error {
            return Err(Error::AnkiConnect(error));
        }
        Ok(body.result)
    }

    /// Invoke an action whose result must be present
    async fn expect_result<T: DeserializeOwned>(
        &self,
        action: &'static str,
        params: Option<Value>,
    ) -> Result<T> {
        self.invoke(action, params)
            .await?
            .ok_or_else(|| Error::AnkiConnect(format!("{action} returned no result")))
    }

    /// Whether AnkiConnect is reachable
    pub async fn ping(&self) -> bool {
        match self.invoke::<u32>("version", None).await {
            Ok(Some(version)) => {
                debug!("AnkiConnect version {}", version);
                true
            }
            Ok(None) => false,
            Err(error) => {
                debug!("AnkiConnect unreachable: {}", error);
                false
            }
        }
    }

    pub async fn deck_names(&self) -> Result<Vec<String>> {
        self.expect_result("deckNames", None).await
    }

    pub async fn create_deck(&self, name: &str) -> Result<()> {
        self.invoke::<i64>("createDeck", Some(json!({ "deck": name })))
            .await?;
        Ok(())
    }

    /// Create the deck only when it does not exist yet
    pub async fn ensure_deck(&self, name: &str) -> Result<()> {
        let decks = self.deck_names().await?;
        if !decks.iter().any(|deck| deck == name) {
            self.create_deck(name).await?;
            info!("Created Anki deck '{}'", name);
        }
        Ok(())
    }

    pub async fn model_names(&self) -> Result<Vec<String>> {
        self.expect_result("modelNames", None).await
    }

    pub async fn model_field_names(&self, model: &str) -> Result<Vec<String>> {
        self.expect_result("modelFieldNames", Some(json!({ "modelName": model })))
            .await
    }

    /// All note models with their field names.
    ///
    /// A model whose fields cannot be fetched is skipped with a warning.
    pub async fn models_with_fields(&self) -> Result<Vec<ModelInfo>> {
        let names = self.model_names().await?;
        let mut models = Vec::with_capacity(names.len());
        for name in names {
            match self.model_field_names(&name).await {
                Ok(fields) => models.push(ModelInfo { name, fields }),
                Err(error) => warn!("Skipping model '{}': {}", name, error),
            }
        }
        Ok(models)
    }

    /// Add a note; `None` means AnkiConnect answered without a note id
    pub async fn add_note(
        &self,
        deck: &str,
        model: &str,
        fields: &BTreeMap<String, String>,
        tags: &[String],
    ) -> Result<Option<i64>> {
        let params = json!({
            "note": {
                "deckName": deck,
                "modelName": model,
                "fields": fields,
                "options": { "allowDuplicate": false },
                "tags": tags,
            }
        });
        self.invoke("addNote", Some(params)).await
    }

    /// Store base64-encoded media under a filename in Anki's collection
    pub async fn store_media_file(&self, filename: &str, data_base64: &str) -> Result<()> {
        self.invoke::<String>(
            "storeMediaFile",
            Some(json!({ "filename": filename, "data": data_base64 })),
        )
        .await?;
        debug!("Stored media file '{}'", filename);
        Ok(())
    }
}
