use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod direct;
pub mod http;
pub mod rapidapi;
pub mod supadata;

use crate::config::{Config, Credentials};
use crate::normalize::TranscriptResult;

pub use direct::{DirectFetcher, TranscriptListing};
pub use rapidapi::RapidApiProvider;
pub use supadata::SupadataProvider;

/// Identifies a transcript source; doubles as the `method` tag in responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    RapidApi,
    Supadata,
    Direct,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::RapidApi => "rapidapi",
            ProviderKind::Supadata => "supadata",
            ProviderKind::Direct => "direct",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rapidapi" => Ok(ProviderKind::RapidApi),
            "supadata" => Ok(ProviderKind::Supadata),
            "direct" => Ok(ProviderKind::Direct),
            other => anyhow::bail!("Unknown provider: {}", other),
        }
    }
}

/// Why a provider could not produce a transcript
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The content does not exist for this provider; retrying will not help
    #[error("{0}")]
    Permanent(String),

    /// Network, timeout, rate limit or unexpected response shape
    #[error("{0}")]
    Transient(String),
}

impl Failure {
    pub fn is_transient(&self) -> bool {
        matches!(self, Failure::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Failure::Permanent(msg) | Failure::Transient(msg) => msg,
        }
    }
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Failure::Transient(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            Failure::Transient(format!("Connection error: {}", err))
        } else if err.is_decode() {
            Failure::Transient(format!("Malformed response: {}", err))
        } else {
            Failure::Transient(format!("Request failed: {}", err))
        }
    }
}

/// Trait for fetching a transcript from one source
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Which provider this is
    fn kind(&self) -> ProviderKind;

    /// Whether a permanent failure from this provider conclusively means no transcript exists
    fn is_authoritative(&self) -> bool {
        false
    }

    /// Fetch a transcript for `video_id`, trying `languages` in order
    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<TranscriptResult, Failure>;
}

/// Classify a provider-reported error message. Messages naming a
/// not-available reason are permanent, everything else is transient.
pub fn classify_reported_error(message: &str) -> Failure {
    let lower = message.to_lowercase();
    let permanent = [
        "not available",
        "unavailable",
        "no transcript",
        "not found",
        "disabled",
        "does not exist",
    ]
    .iter()
    .any(|needle| lower.contains(needle));

    if permanent {
        Failure::Permanent(message.to_string())
    } else {
        Failure::Transient(message.to_string())
    }
}

/// Pooled HTTP clients shared by every request, one per network path
#[derive(Clone)]
pub struct ProviderClients {
    config: Config,
    direct_client: reqwest::Client,
    api_client: reqwest::Client,
}

impl ProviderClients {
    /// Build the pooled clients from configuration
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let proxy = config.proxy.resolved_url();
        if proxy.is_none() {
            tracing::warn!("No anonymizing proxy configured; direct fetches will connect without one");
        }

        Ok(Self {
            config: config.clone(),
            direct_client: http::build_client(&config.http, proxy.as_deref())?,
            api_client: http::build_client(&config.http, None)?,
        })
    }

    /// Client for plain outbound HTTPS calls to third-party APIs
    pub fn api_client(&self) -> &reqwest::Client {
        &self.api_client
    }

    /// The direct fetcher, bound to the proxied client
    pub fn direct(&self) -> DirectFetcher {
        DirectFetcher::new(
            self.direct_client.clone(),
            self.config.providers.youtube_base_url.clone(),
        )
    }

    /// Instantiate the provider for `kind`, or `None` when its credential is missing
    pub fn provider(
        &self,
        kind: ProviderKind,
        credentials: &Credentials,
    ) -> Option<Box<dyn TranscriptProvider>> {
        let providers = &self.config.providers;
        match kind {
            ProviderKind::RapidApi => credentials.rapidapi_key.clone().map(|key| {
                Box::new(RapidApiProvider::new(
                    self.api_client.clone(),
                    providers.rapidapi_base_url.clone(),
                    providers.rapidapi_host.clone(),
                    key,
                )) as Box<dyn TranscriptProvider>
            }),
            ProviderKind::Supadata => credentials.supadata_api_key.clone().map(|key| {
                Box::new(SupadataProvider::new(
                    self.api_client.clone(),
                    providers.supadata_base_url.clone(),
                    key,
                )) as Box<dyn TranscriptProvider>
            }),
            ProviderKind::Direct => Some(Box::new(self.direct())),
        }
    }
}
