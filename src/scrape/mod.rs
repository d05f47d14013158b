use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::utils::{excerpt, validate_and_normalize_url};
use crate::RelayError;

/// Scraped page content in the shape returned to the frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeResult {
    pub success: bool,
    pub content: String,
    pub metadata: PageMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub language: String,

    #[serde(rename = "sourceURL", default)]
    pub source_url: String,
}

#[derive(Debug, Deserialize)]
struct FirecrawlResponse {
    #[serde(default)]
    success: bool,
    data: Option<FirecrawlData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlData {
    #[serde(default)]
    markdown: String,
    #[serde(default)]
    metadata: PageMetadata,
}

/// Single-provider website scraper backed by Firecrawl
pub struct WebsiteScraper {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl WebsiteScraper {
    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// Scrape `website_url` as markdown, main content only
    pub async fn scrape(&self, website_url: &str) -> Result<ScrapeResult, RelayError> {
        let website_url = website_url.trim();
        if website_url.is_empty() {
            return Err(RelayError::Validation("Website URL is required".to_string()));
        }
        validate_and_normalize_url(website_url)
            .map_err(|e| RelayError::Validation(e.to_string()))?;

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            RelayError::Configuration(
                "Firecrawl API key not configured. Please set FIRECRAWL_API_KEY environment variable."
                    .to_string(),
            )
        })?;

        tracing::info!(url = website_url, "Scraping website");

        let response = self
            .client
            .post(format!("{}/v1/scrape", self.base_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&json!({
                "url": website_url,
                "formats": ["markdown"],
                "onlyMainContent": true,
            }))
            .send()
            .await
            .map_err(|e| RelayError::Upstream(format!("Firecrawl request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream(format!(
                "Firecrawl request failed (HTTP {}): {}",
                status.as_u16(),
                excerpt(&body, 200)
            )));
        }

        let data: FirecrawlResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Upstream(format!("Malformed Firecrawl response: {}", e)))?;

        match data {
            FirecrawlResponse {
                success: true,
                data: Some(page),
                ..
            } => {
                let mut metadata = page.metadata;
                if metadata.source_url.is_empty() {
                    metadata.source_url = website_url.to_string();
                }
                Ok(ScrapeResult {
                    success: true,
                    content: page.markdown,
                    metadata,
                })
            }
            FirecrawlResponse { error, .. } => Err(RelayError::Upstream(
                error.unwrap_or_else(|| "Firecrawl returned no content".to_string()),
            )),
        }
    }
}
