//! Transcript Relay - a backend relay for YouTube transcripts and website content
//!
//! This library accepts a video reference, walks an ordered chain of transcript
//! providers (paid APIs first, a proxied direct fetch last) with bounded retries,
//! and normalizes whatever the winning provider returns into one JSON shape.

pub mod cli;
pub mod config;
pub mod normalize;
pub mod orchestrator;
pub mod output;
pub mod providers;
pub mod scrape;
pub mod server;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::{Config, RequestOverrides};
pub use normalize::TranscriptResult;
pub use orchestrator::{FallbackOrchestrator, TranscriptRequest};
pub use providers::{Failure, ProviderKind, TranscriptProvider};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types surfaced to callers of the relay
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{message}")]
    NotFound { method: ProviderKind, message: String },

    #[error("{message}")]
    Unavailable { method: ProviderKind, message: String },

    #[error("{0}")]
    Upstream(String),
}

impl RelayError {
    /// Provider that produced the failure, if one did
    pub fn method(&self) -> Option<ProviderKind> {
        match self {
            RelayError::NotFound { method, .. } | RelayError::Unavailable { method, .. } => {
                Some(*method)
            }
            _ => None,
        }
    }
}
