//! Google Custom Search image provider

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::ImageProvider;
use crate::error::{Error, Result};
use crate::types::{ImageResult, PageRequest, presence};

const GOOGLE_CSE_API_BASE: &str = "https://www.googleapis.com/customsearch/v1";

/// Google Custom Search configured for image results
pub struct GoogleImageProvider {
    client: Client,
    api_key: Option<String>,
    engine_id: Option<String>,
    base_url: String,
}

impl GoogleImageProvider {
    pub fn new(client: Client, api_key: Option<String>, engine_id: Option<String>) -> Self {
        Self {
            client,
            api_key,
            engine_id,
            base_url: GOOGLE_CSE_API_BASE.to_string(),
        }
    }

    /// Point the provider at a different endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.api_key.as_deref(), self.engine_id.as_deref()) {
            (Some(key), Some(engine_id)) => Ok((key, engine_id)),
            _ => Err(Error::ProviderNotConfigured(
                "Google API key and search engine id not set".to_string(),
            )),
        }
    }

    async fn request(
        &self,
        query: &str,
        per_page: u32,
        start: u32,
        safe_search: bool,
    ) -> Result<reqwest::Response> {
        let (api_key, engine_id) = self.credentials()?;
        let num = per_page.to_string();
        let start = start.to_string();

        let mut params = vec![
            ("key", api_key),
            ("cx", engine_id),
            ("q", query),
            ("searchType", "image"),
            ("num", num.as_str()),
            ("start", start.as_str()),
        ];
        if safe_search {
            params.push(("safe", "active"));
        }

        let response = self.client.get(&self.base_url).query(&params).send().await?;
        Ok(response)
    }

    /// Probe the API with a one-item query to confirm the credentials work
    pub async fn validate(&self) -> bool {
        if self.credentials().is_err() {
            return false;
        }
        match self.request("test", 1, 1, true).await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "displayLink")]
    display_link: Option<String>,
    #[serde(default)]
    image: Option<ItemImage>,
}

#[derive(Debug, Deserialize)]
struct ItemImage {
    #[serde(default, rename = "thumbnailLink")]
    thumbnail_link: Option<String>,
}

#[async_trait]
impl ImageProvider for GoogleImageProvider {
    fn name(&self) -> &'static str {
        "Google Images"
    }

    async fn search(&self, query: &str, page: &PageRequest) -> Result<Vec<ImageResult>> {
        let start = page.offset() + 1;

        debug!("Searching Google Images for '{}' (page {})", query, page.page);

        let mut response = self.request(query, page.per_page, start, true).await?;
        if response.status() == StatusCode::BAD_REQUEST {
            // some search engine configurations reject the safe parameter
            warn!("Google Images rejected safe search for '{}', retrying without", query);
            response = self.request(query, page.per_page, start, false).await?;
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Google Images API error: {} - {}", status, error_text);
            return Err(Error::ImageSearch(format!(
                "Google Images API error: {} - {}",
                status, error_text
            )));
        }

        let body: SearchResponse = response.json().await?;
        // a success body without items means the engine produced nothing
        // usable; treat it as a failure so the chain can move on
        let items = body
            .items
            .ok_or_else(|| Error::ImageSearch("Google Images returned no items".to_string()))?;

        let images = items
            .into_iter()
            .map(|item| {
                let thumbnail = item
                    .image
                    .and_then(|image| image.thumbnail_link)
                    .unwrap_or_else(|| item.link.clone());
                ImageResult {
                    thumbnail_url: thumbnail,
                    title: presence(item.title),
                    source: presence(item.display_link).map(|link| extract_domain(&link)),
                    url: item.link,
                }
            })
            .collect();

        Ok(images)
    }

    fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}

/// Hostname of a URL, or the value itself when it is already a bare domain
fn extract_domain(value: &str) -> String {
    reqwest::Url::parse(value)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| value.to_string())
}
