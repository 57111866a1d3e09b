//! Pixabay image provider

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use super::ImageProvider;
use crate::error::{Error, Result};
use crate::types::{ImageResult, PageRequest, presence};

const PIXABAY_API_BASE: &str = "https://pixabay.com/api/";

pub struct PixabayImageProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl PixabayImageProvider {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: PIXABAY_API_BASE.to_string(),
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
            .ok_or_else(|| Error::ProviderNotConfigured("Pixabay API key not set".to_string()))
    }

    async fn request(&self, query: &str, per_page: u32, page: u32) -> Result<reqwest::Response> {
        let api_key = self.api_key()?;
        let per_page = per_page.to_string();
        let page = page.to_string();

        let params = [
            ("key", api_key),
            ("q", query),
            ("image_type", "photo"),
            ("safesearch", "true"),
            ("per_page", per_page.as_str()),
            ("page", page.as_str()),
        ];

        let response = self.client.get(&self.base_url).query(&params).send().await?;
        Ok(response)
    }

    /// Probe the API with a small query to confirm the key works
    pub async fn validate(&self) -> bool {
        if self.api_key().is_err() {
            return false;
        }
        match self.request("test", 3, 1).await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PixabayResponse {
    #[serde(default)]
    hits: Vec<PixabayHit>,
}

#[derive(Debug, Deserialize)]
struct PixabayHit {
    #[serde(default, rename = "webformatURL")]
    webformat_url: Option<String>,
    #[serde(default, rename = "largeImageURL")]
    large_image_url: Option<String>,
    #[serde(default, rename = "previewURL")]
    preview_url: Option<String>,
    #[serde(default)]
    tags: Option<String>,
}

// hits without a usable full-size URL are dropped
fn map_hits(hits: Vec<PixabayHit>) -> Vec<ImageResult> {
    hits.into_iter()
        .filter_map(|hit| {
            let url = hit.webformat_url.or(hit.large_image_url)?;
            let thumbnail = hit.preview_url.unwrap_or_else(|| url.clone());
            Some(ImageResult {
                thumbnail_url: thumbnail,
                title: presence(hit.tags),
                source: Some("pixabay.com".to_string()),
                url,
            })
        })
        .collect()
}

#[async_trait]
impl ImageProvider for PixabayImageProvider {
    fn name(&self) -> &'static str {
        "Pixabay"
    }

    async fn search(&self, query: &str, page: &PageRequest) -> Result<Vec<ImageResult>> {
        debug!("Searching Pixabay for '{}' (page {})", query, page.page);

        let response = self.request(query, page.per_page, page.page).await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Pixabay API error: {} - {}", status, error_text);
            return Err(Error::ImageSearch(format!(
                "Pixabay API error: {} - {}",
                status, error_text
            )));
        }

        let body: PixabayResponse = response.json().await?;

        // an empty hits array is a valid answer, not a provider failure
        Ok(map_hits(body.hits))
    }

    fn is_configured(&self) -> bool {
        self.api_key().is_ok()
    }
}
