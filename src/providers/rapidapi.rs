use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{classify_reported_error, http, Failure, ProviderKind, TranscriptProvider};
use crate::normalize::{normalize_fragments, FragmentPayload, TranscriptResult};

/// RapidAPI "YouTube Transcript3" client
pub struct RapidApiProvider {
    client: Client,
    base_url: String,
    host: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct RapidApiResponse {
    #[serde(default)]
    success: bool,
    transcript: Option<FragmentPayload>,
    error: Option<String>,
}

impl RapidApiProvider {
    pub fn new(client: Client, base_url: String, host: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            host,
            api_key,
        }
    }

    fn query(video_id: &str, languages: &[String]) -> Vec<(&'static str, String)> {
        let mut query = vec![("videoId", video_id.to_string())];
        if let Some(lang) = languages.first().filter(|l| l.as_str() != "en") {
            query.push(("lang", lang.clone()));
        }
        query
    }
}

#[async_trait]
impl TranscriptProvider for RapidApiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::RapidApi
    }

    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<TranscriptResult, Failure> {
        let url = format!("{}/api/transcript", self.base_url.trim_end_matches('/'));
        tracing::debug!(provider = "rapidapi", video_id, "Requesting transcript");

        let response = self
            .client
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .query(&Self::query(video_id, languages))
            .send()
            .await?;

        let response = http::error_for_status(response, "RapidAPI").await?;
        let data: RapidApiResponse = response.json().await?;

        match data {
            RapidApiResponse {
                success: true,
                transcript: Some(payload),
                ..
            } => Ok(normalize_fragments(
                video_id,
                payload,
                languages.first().map(String::as_str),
                false,
                ProviderKind::RapidApi,
            )),
            RapidApiResponse { error: Some(message), .. } => Err(classify_reported_error(&message)),
            _ => Err(Failure::Transient(
                "Failed to fetch transcript from RapidAPI".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use mockito::Matcher;

    fn provider(server: &mockito::ServerGuard) -> RapidApiProvider {
        RapidApiProvider::new(
            http::build_client(&HttpConfig::default(), None).unwrap(),
            server.url(),
            "youtube-transcript3.p.rapidapi.com".to_string(),
            "test-key".to_string(),
        )
    }

    fn en() -> Vec<String> {
        vec!["en".to_string()]
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/transcript")
            .match_query(Matcher::UrlEncoded("videoId".into(), "abc123".into()))
            .match_header("x-rapidapi-key", "test-key")
            .match_header("x-rapidapi-host", "youtube-transcript3.p.rapidapi.com")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"transcript":[{"text":"Hello","lang":"en"},{"text":"world","lang":"en"}]}"#)
            .create_async()
            .await;

        let result = provider(&server).fetch("abc123", &en()).await.unwrap();

        assert_eq!(result.transcript, "Hello world");
        assert_eq!(result.snippet_count, 2);
        assert_eq!(result.language_code, "en");
        assert_eq!(result.method, ProviderKind::RapidApi);
    }

    #[tokio::test]
    async fn test_non_english_sends_lang() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/transcript")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("videoId".into(), "abc123".into()),
                Matcher::UrlEncoded("lang".into(), "fr".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"success":true,"transcript":"Bonjour tout le monde"}"#)
            .create_async()
            .await;

        let langs = vec!["fr".to_string(), "en".to_string()];
        let result = provider(&server).fetch("abc123", &langs).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.transcript, "Bonjour tout le monde");
        assert_eq!(result.language_code, "fr");
        assert_eq!(result.snippet_count, 0);
    }

    #[tokio::test]
    async fn test_http_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/transcript")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body("Too many requests")
            .create_async()
            .await;

        let failure = provider(&server).fetch("abc123", &en()).await.unwrap_err();
        assert!(failure.is_transient());
        assert!(failure.message().contains("429"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/transcript")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let failure = provider(&server).fetch("abc123", &en()).await.unwrap_err();
        assert!(failure.is_transient());
    }

    #[tokio::test]
    async fn test_reported_unavailable_is_permanent() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/transcript")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"success":false,"error":"Transcript not available for this video"}"#)
            .create_async()
            .await;

        let failure = provider(&server).fetch("abc123", &en()).await.unwrap_err();
        assert_eq!(
            failure,
            Failure::Permanent("Transcript not available for this video".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_transcript_without_reason_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/transcript")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"success":false}"#)
            .create_async()
            .await;

        let failure = provider(&server).fetch("abc123", &en()).await.unwrap_err();
        assert!(failure.is_transient());
    }
}
