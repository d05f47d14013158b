use crate::config::{Config, Credentials, RequestOverrides};
use crate::normalize::TranscriptResult;
use crate::providers::{Failure, ProviderClients, ProviderKind, TranscriptProvider};
use crate::utils::extract_video_id;
use crate::RelayError;

pub mod retry;

pub use retry::{retry_with_backoff, RetryPolicy};

/// A transcript request after validation; immutable once built
#[derive(Debug, Clone)]
pub struct TranscriptRequest {
    pub video_id: String,

    /// Requested language codes, most preferred first
    pub languages: Vec<String>,

    pub overrides: RequestOverrides,
}

impl TranscriptRequest {
    /// Build a request from a video URL or bare id. Languages default to `["en"]`.
    pub fn new(
        video_ref: &str,
        languages: Option<Vec<String>>,
        overrides: RequestOverrides,
    ) -> Result<Self, RelayError> {
        let video_ref = video_ref.trim();
        if video_ref.is_empty() {
            return Err(RelayError::Validation("Video URL is required".to_string()));
        }

        let languages: Vec<String> = languages
            .unwrap_or_default()
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        Ok(Self {
            video_id: extract_video_id(video_ref),
            languages: if languages.is_empty() {
                vec!["en".to_string()]
            } else {
                languages
            },
            overrides,
        })
    }
}

/// Ordered providers eligible for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderChain {
    kinds: Vec<ProviderKind>,
}

impl ProviderChain {
    /// Apply the availability predicates to the configured order: paid APIs
    /// need a credential, the direct fetcher needs to be enabled.
    pub fn from_config(config: &Config, credentials: &Credentials) -> Self {
        let mut kinds: Vec<ProviderKind> = Vec::new();

        for kind in &config.providers.order {
            if kinds.contains(kind) {
                continue;
            }

            let available = match kind {
                ProviderKind::RapidApi => credentials.rapidapi_key.is_some(),
                ProviderKind::Supadata => credentials.supadata_api_key.is_some(),
                ProviderKind::Direct => config.providers.direct_enabled,
            };

            if available {
                kinds.push(*kind);
            } else {
                tracing::debug!(provider = %kind, "Provider not available for this request");
            }
        }

        Self { kinds }
    }

    pub fn kinds(&self) -> &[ProviderKind] {
        &self.kinds
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Where the fallback walk currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorState {
    NotStarted,
    TryingProvider(usize),
    Succeeded(TranscriptResult),
    FailedPermanently {
        provider: ProviderKind,
        reason: String,
    },
    ExhaustedAllProviders {
        provider: ProviderKind,
        reason: String,
    },
}

/// Walks the provider chain sequentially with per-provider retries
pub struct FallbackOrchestrator {
    providers: Vec<Box<dyn TranscriptProvider>>,
    policy: RetryPolicy,
}

impl FallbackOrchestrator {
    pub fn new(providers: Vec<Box<dyn TranscriptProvider>>, policy: RetryPolicy) -> Self {
        Self { providers, policy }
    }

    /// Build the chain for one request from configuration plus request credentials
    pub fn from_config(
        config: &Config,
        clients: &ProviderClients,
        overrides: &RequestOverrides,
    ) -> Self {
        let credentials = config.merged_credentials(overrides);
        let chain = ProviderChain::from_config(config, &credentials);

        let providers = chain
            .kinds()
            .iter()
            .filter_map(|kind| clients.provider(*kind, &credentials))
            .collect();

        Self::new(providers, RetryPolicy::from(&config.retry))
    }

    /// Provider order this orchestrator will walk
    pub fn provider_order(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    /// Fetch a transcript, first success wins
    pub async fn run(&self, request: &TranscriptRequest) -> Result<TranscriptResult, RelayError> {
        let mut state = OrchestratorState::NotStarted;
        let mut last_transient: Option<(ProviderKind, String)> = None;

        loop {
            state = match state {
                OrchestratorState::NotStarted => {
                    if self.providers.is_empty() {
                        tracing::error!(video_id = %request.video_id, "No transcript providers configured");
                        return Err(RelayError::Configuration(
                            "No transcript providers configured. Set RAPIDAPI_KEY or SUPADATA_API_KEY, or enable direct fetching.".to_string(),
                        ));
                    }
                    OrchestratorState::TryingProvider(0)
                }

                OrchestratorState::TryingProvider(index) => {
                    let provider = self.providers[index].as_ref();
                    let kind = provider.kind();
                    let is_last = index + 1 == self.providers.len();

                    match self.attempt(provider, request).await {
                        Ok(result) => {
                            tracing::info!(
                                provider = %kind,
                                video_id = %request.video_id,
                                snippets = result.snippet_count,
                                "Transcript fetched"
                            );
                            OrchestratorState::Succeeded(result)
                        }
                        Err(Failure::Permanent(reason)) if provider.is_authoritative() => {
                            tracing::warn!(provider = %kind, %reason, "Authoritative provider reports no transcript");
                            OrchestratorState::FailedPermanently { provider: kind, reason }
                        }
                        Err(failure) => {
                            let transient = failure.is_transient();
                            let reason = failure.message().to_string();
                            if transient {
                                last_transient = Some((kind, reason.clone()));
                            }

                            if is_last {
                                let (provider, reason) = last_transient
                                    .take()
                                    .unwrap_or((kind, reason));
                                OrchestratorState::ExhaustedAllProviders { provider, reason }
                            } else {
                                tracing::warn!(
                                    provider = %kind,
                                    next = %self.providers[index + 1].kind(),
                                    transient,
                                    %reason,
                                    "Falling back to next provider"
                                );
                                OrchestratorState::TryingProvider(index + 1)
                            }
                        }
                    }
                }

                OrchestratorState::Succeeded(result) => return Ok(result),

                OrchestratorState::FailedPermanently { provider, reason } => {
                    return Err(RelayError::NotFound {
                        method: provider,
                        message: format!("No transcript available: {}", reason),
                    });
                }

                OrchestratorState::ExhaustedAllProviders { provider, reason } => {
                    tracing::error!(provider = %provider, %reason, "All transcript providers failed");
                    return Err(RelayError::Unavailable {
                        method: provider,
                        message: format!("Failed to retrieve transcript via {}: {}", provider, reason),
                    });
                }
            };
        }
    }

    /// One provider with the retry policy applied; permanent failures are not retried
    async fn attempt(
        &self,
        provider: &dyn TranscriptProvider,
        request: &TranscriptRequest,
    ) -> Result<TranscriptResult, Failure> {
        let kind = provider.kind();
        let video_id = request.video_id.as_str();
        let languages = request.languages.as_slice();

        retry_with_backoff(
            &self.policy,
            move |attempt| {
                tracing::info!(provider = %kind, attempt, video_id, "Attempting provider");
                provider.fetch(video_id, languages)
            },
            Failure::is_transient,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::from_texts;
    use crate::providers::MockTranscriptProvider;
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        }
    }

    fn request() -> TranscriptRequest {
        TranscriptRequest::new(
            "https://www.youtube.com/watch?v=abc123",
            Some(vec!["en".to_string()]),
            RequestOverrides::default(),
        )
        .unwrap()
    }

    fn hello_world(kind: ProviderKind) -> TranscriptResult {
        from_texts(
            "abc123",
            &["Hello".to_string(), "world".to_string()],
            "en",
            "en",
            false,
            kind,
        )
    }

    fn mock(kind: ProviderKind) -> MockTranscriptProvider {
        let mut mock = MockTranscriptProvider::new();
        mock.expect_kind().return_const(kind);
        mock.expect_is_authoritative()
            .return_const(kind == ProviderKind::Direct);
        mock
    }

    #[test]
    fn test_request_defaults_and_validation() {
        let req = TranscriptRequest::new("abc123", None, RequestOverrides::default()).unwrap();
        assert_eq!(req.video_id, "abc123");
        assert_eq!(req.languages, vec!["en"]);

        let req = TranscriptRequest::new("https://youtu.be/xyz", Some(vec![]), RequestOverrides::default()).unwrap();
        assert_eq!(req.video_id, "xyz");
        assert_eq!(req.languages, vec!["en"]);

        let err = TranscriptRequest::new("  ", None, RequestOverrides::default()).unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)));
    }

    #[test]
    fn test_chain_applies_availability() {
        let config = Config::default();

        let none = Credentials::default();
        let chain = ProviderChain::from_config(&config, &none);
        assert_eq!(chain.kinds(), &[ProviderKind::Direct]);

        let both = Credentials {
            rapidapi_key: Some("r".to_string()),
            supadata_api_key: Some("s".to_string()),
            ..Credentials::default()
        };
        let chain = ProviderChain::from_config(&config, &both);
        assert_eq!(
            chain.kinds(),
            &[ProviderKind::RapidApi, ProviderKind::Supadata, ProviderKind::Direct]
        );

        let mut no_direct = Config::default();
        no_direct.providers.direct_enabled = false;
        assert!(ProviderChain::from_config(&no_direct, &none).is_empty());
    }

    #[test]
    fn test_from_config_uses_request_credentials() {
        let config = Config::default();
        let clients = ProviderClients::from_config(&config).unwrap();
        let overrides = RequestOverrides {
            rapidapi_key: Some("per-request".to_string()),
            supadata_api_key: None,
        };

        let orchestrator = FallbackOrchestrator::from_config(&config, &clients, &overrides);
        assert_eq!(
            orchestrator.provider_order(),
            vec![ProviderKind::RapidApi, ProviderKind::Direct]
        );
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let mut rapid = mock(ProviderKind::RapidApi);
        rapid
            .expect_fetch()
            .times(1)
            .returning(|_, _| Ok(hello_world(ProviderKind::RapidApi)));

        let mut direct = mock(ProviderKind::Direct);
        direct.expect_fetch().times(0);

        let orchestrator = FallbackOrchestrator::new(vec![Box::new(rapid), Box::new(direct)], fast_policy());
        let result = orchestrator.run(&request()).await.unwrap();

        assert_eq!(result.transcript, "Hello world");
        assert_eq!(result.snippet_count, 2);
        assert_eq!(result.method, ProviderKind::RapidApi);
    }

    #[tokio::test]
    async fn test_paid_permanent_falls_through_without_retry() {
        let mut rapid = mock(ProviderKind::RapidApi);
        rapid
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(Failure::Permanent("Transcript not available".to_string())));

        let mut direct = mock(ProviderKind::Direct);
        direct
            .expect_fetch()
            .times(1)
            .returning(|_, _| Ok(hello_world(ProviderKind::Direct)));

        let orchestrator = FallbackOrchestrator::new(vec![Box::new(rapid), Box::new(direct)], fast_policy());
        let result = orchestrator.run(&request()).await.unwrap();

        assert_eq!(result.method, ProviderKind::Direct);
    }

    #[tokio::test]
    async fn test_direct_permanent_is_not_found() {
        let mut supadata = mock(ProviderKind::Supadata);
        supadata
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(Failure::Permanent("transcript-unavailable".to_string())));

        let mut direct = mock(ProviderKind::Direct);
        direct
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(Failure::Permanent("Transcripts are disabled for video abc123".to_string())));

        let orchestrator = FallbackOrchestrator::new(vec![Box::new(supadata), Box::new(direct)], fast_policy());
        let err = orchestrator.run(&request()).await.unwrap_err();

        match err {
            RelayError::NotFound { method, message } => {
                assert_eq!(method, ProviderKind::Direct);
                assert!(message.contains("disabled"));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_direct_permanent_stops_chain() {
        let mut direct = mock(ProviderKind::Direct);
        direct
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(Failure::Permanent("Video unavailable".to_string())));

        let mut rapid = mock(ProviderKind::RapidApi);
        rapid.expect_fetch().times(0);

        let orchestrator = FallbackOrchestrator::new(vec![Box::new(direct), Box::new(rapid)], fast_policy());
        let err = orchestrator.run(&request()).await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_all_transient_retries_each_provider_then_unavailable() {
        let mut rapid = mock(ProviderKind::RapidApi);
        rapid
            .expect_fetch()
            .times(3)
            .returning(|_, _| Err(Failure::Transient("RapidAPI request failed (HTTP 503)".to_string())));

        let mut direct = mock(ProviderKind::Direct);
        direct
            .expect_fetch()
            .times(3)
            .returning(|_, _| Err(Failure::Transient("Connection error: proxy refused".to_string())));

        let orchestrator = FallbackOrchestrator::new(vec![Box::new(rapid), Box::new(direct)], fast_policy());
        let err = orchestrator.run(&request()).await.unwrap_err();

        match err {
            RelayError::Unavailable { method, message } => {
                assert_eq!(method, ProviderKind::Direct);
                assert!(message.contains("proxy refused"));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_last_transient_reported_when_final_paid_is_permanent() {
        let mut rapid = mock(ProviderKind::RapidApi);
        rapid
            .expect_fetch()
            .times(3)
            .returning(|_, _| Err(Failure::Transient("timeout".to_string())));

        let mut supadata = mock(ProviderKind::Supadata);
        supadata
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(Failure::Permanent("not-found".to_string())));

        let orchestrator = FallbackOrchestrator::new(vec![Box::new(rapid), Box::new(supadata)], fast_policy());
        let err = orchestrator.run(&request()).await.unwrap_err();

        assert_eq!(
            err,
            RelayError::Unavailable {
                method: ProviderKind::RapidApi,
                message: "Failed to retrieve transcript via rapidapi: timeout".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_transient_then_success_on_same_provider() {
        let mut rapid = mock(ProviderKind::RapidApi);
        let mut calls = 0;
        rapid.expect_fetch().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(Failure::Transient("timeout".to_string()))
            } else {
                Ok(hello_world(ProviderKind::RapidApi))
            }
        });

        let orchestrator = FallbackOrchestrator::new(vec![Box::new(rapid)], fast_policy());
        let result = orchestrator.run(&request()).await.unwrap();
        assert_eq!(result.method, ProviderKind::RapidApi);
    }

    #[tokio::test]
    async fn test_empty_chain_is_configuration_error() {
        let orchestrator = FallbackOrchestrator::new(Vec::new(), fast_policy());
        let err = orchestrator.run(&request()).await.unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_timing_per_provider() {
        let mut rapid = mock(ProviderKind::RapidApi);
        rapid
            .expect_fetch()
            .times(3)
            .returning(|_, _| Err(Failure::Transient("timeout".to_string())));

        let mut direct = mock(ProviderKind::Direct);
        direct
            .expect_fetch()
            .times(1)
            .returning(|_, _| Ok(hello_world(ProviderKind::Direct)));

        let start = tokio::time::Instant::now();
        let orchestrator =
            FallbackOrchestrator::new(vec![Box::new(rapid), Box::new(direct)], RetryPolicy::default());
        orchestrator.run(&request()).await.unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_repeated_requests_are_identical() {
        let mut rapid = mock(ProviderKind::RapidApi);
        rapid
            .expect_fetch()
            .times(2)
            .returning(|_, _| Ok(hello_world(ProviderKind::RapidApi)));

        let orchestrator = FallbackOrchestrator::new(vec![Box::new(rapid)], fast_policy());
        let first = orchestrator.run(&request()).await.unwrap();
        let second = orchestrator.run(&request()).await.unwrap();

        assert_eq!(first.transcript, second.transcript);
        assert_eq!(first.language_code, second.language_code);
        assert_eq!(first.snippet_count, second.snippet_count);
    }
}
