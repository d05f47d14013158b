use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{classify_reported_error, http, Failure, ProviderKind, TranscriptProvider};
use crate::normalize::{normalize_fragments, FragmentPayload, TranscriptResult};

/// Error codes Supadata uses for content that does not exist
const NOT_AVAILABLE_CODES: &[&str] = &["transcript-unavailable", "not-found", "video-not-found"];

/// Supadata YouTube transcript client
pub struct SupadataProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SupadataResponse {
    content: Option<FragmentPayload>,
    lang: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

impl SupadataProvider {
    pub fn new(client: Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn classify(code: &str, message: Option<&str>) -> Failure {
        let text = match message {
            Some(msg) => format!("{}: {}", code, msg),
            None => code.to_string(),
        };

        if NOT_AVAILABLE_CODES.contains(&code) {
            Failure::Permanent(text)
        } else {
            classify_reported_error(&text)
        }
    }
}

#[async_trait]
impl TranscriptProvider for SupadataProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Supadata
    }

    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<TranscriptResult, Failure> {
        let url = format!("{}/v1/youtube/transcript", self.base_url.trim_end_matches('/'));
        tracing::debug!(provider = "supadata", video_id, "Requesting transcript");

        let mut query = vec![("videoId", video_id.to_string()), ("text", "false".to_string())];
        if let Some(lang) = languages.first().filter(|l| l.as_str() != "en") {
            query.push(("lang", lang.clone()));
        }

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .query(&query)
            .send()
            .await?;

        let response = http::error_for_status(response, "Supadata").await?;
        let data: SupadataResponse = response.json().await?;

        if let Some(payload) = data.content {
            let hint = data.lang.as_deref().or(languages.first().map(String::as_str));
            return Ok(normalize_fragments(video_id, payload, hint, false, ProviderKind::Supadata));
        }

        match data.error {
            Some(code) => Err(Self::classify(&code, data.message.as_deref())),
            None => Err(Failure::Transient(
                "Supadata response did not contain a transcript".to_string(),
            )),
        }
    }
}
