use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Json};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use super::AppState;
use crate::config::RequestOverrides;
use crate::normalize::TranscriptResult;
use crate::orchestrator::{FallbackOrchestrator, ProviderChain, TranscriptRequest};
use crate::providers::{Failure, ProviderKind, TranscriptListing};
use crate::scrape::{ScrapeResult, WebsiteScraper};
use crate::utils::extract_video_id;
use crate::RelayError;

#[derive(Debug, Default, Deserialize)]
pub struct TranscriptBody {
    pub video_url: Option<String>,
    pub languages: Option<Vec<String>>,
    #[serde(flatten)]
    pub overrides: RequestOverrides,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBody {
    pub video_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScrapeBody {
    pub website_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub video_id: String,
    pub transcripts: Vec<TranscriptListing>,
}

/// A request without a JSON body reads as an empty one, so the handler
/// reports the missing field. A body that does not fit the shape is rejected
/// with the deserializer's message.
fn json_body<T: Default>(body: Result<Json<T>, JsonRejection>) -> Result<T, RelayError> {
    match body {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(RelayError::Validation(rejection.body_text())),
    }
}

/// POST /api/transcript
pub async fn transcript(
    Extension(state): Extension<AppState>,
    body: Result<Json<TranscriptBody>, JsonRejection>,
) -> Result<Json<TranscriptResult>, RelayError> {
    let body = json_body(body)?;
    let request = TranscriptRequest::new(
        body.video_url.as_deref().unwrap_or_default(),
        body.languages,
        body.overrides,
    )?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("transcript", %request_id, video_id = %request.video_id);

    async move {
        let orchestrator =
            FallbackOrchestrator::from_config(&state.config, &state.clients, &request.overrides);
        tracing::info!(
            languages = ?request.languages,
            providers = ?orchestrator.provider_order(),
            "Fetching transcript"
        );
        orchestrator.run(&request).await.map(Json)
    }
    .instrument(span)
    .await
}

/// POST /api/list-transcripts
pub async fn list_transcripts(
    Extension(state): Extension<AppState>,
    body: Result<Json<ListBody>, JsonRejection>,
) -> Result<Json<ListResponse>, RelayError> {
    let body = json_body(body)?;
    let video_url = body.video_url.unwrap_or_default();
    if video_url.trim().is_empty() {
        return Err(RelayError::Validation("Video URL is required".to_string()));
    }

    let video_id = extract_video_id(&video_url);
    tracing::info!(%video_id, "Listing transcripts");

    let transcripts = state
        .clients
        .direct()
        .list(&video_id)
        .await
        .map_err(|failure| match failure {
            Failure::Permanent(message) => RelayError::NotFound {
                method: ProviderKind::Direct,
                message,
            },
            Failure::Transient(message) => RelayError::Unavailable {
                method: ProviderKind::Direct,
                message: format!("Failed to list transcripts: {}", message),
            },
        })?;

    Ok(Json(ListResponse {
        success: true,
        video_id,
        transcripts,
    }))
}

/// POST /api/scrape-website
pub async fn scrape_website(
    Extension(state): Extension<AppState>,
    body: Result<Json<ScrapeBody>, JsonRejection>,
) -> Result<Json<ScrapeResult>, RelayError> {
    let body = json_body(body)?;
    let scraper = WebsiteScraper::new(
        state.clients.api_client().clone(),
        state.config.providers.firecrawl_base_url.clone(),
        state.config.credentials.firecrawl_api_key.clone(),
    );

    scraper
        .scrape(body.website_url.as_deref().unwrap_or_default())
        .await
        .map(Json)
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// GET /api/config
pub async fn get_config(
    Extension(state): Extension<AppState>,
) -> Result<impl IntoResponse, RelayError> {
    let credentials = &state.config.credentials;
    if credentials.openrouter_api_key.is_none() {
        return Err(RelayError::Configuration(
            "OpenRouter API key not configured. Please set OPENROUTER_API_KEY environment variable."
                .to_string(),
        ));
    }

    let chain = ProviderChain::from_config(&state.config, credentials);
    Ok(Json(json!({
        "success": true,
        "model_name": credentials.openrouter_model,
        "openrouter_configured": true,
        "providers": chain.kinds(),
    })))
}
