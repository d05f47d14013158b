use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::providers::ProviderKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Provider credentials and the OpenRouter model exposed to the frontend
    pub credentials: Credentials,

    /// Anonymizing proxy used only by the direct fetcher
    pub proxy: ProxyConfig,

    /// Provider order and endpoints
    pub providers: ProvidersConfig,

    /// Outbound HTTP settings
    pub http: HttpConfig,

    /// Per-provider retry policy
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub rapidapi_key: Option<String>,
    pub supadata_api_key: Option<String>,
    pub firecrawl_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Full proxy URL, takes precedence over the Webshare credentials
    pub url: Option<String>,

    /// Webshare rotating proxy username
    pub username: Option<String>,

    /// Webshare rotating proxy password
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Preference order, highest value first
    pub order: Vec<ProviderKind>,

    /// Whether the proxied direct fetcher takes part in the chain
    pub direct_enabled: bool,

    pub rapidapi_base_url: String,
    pub rapidapi_host: String,
    pub supadata_base_url: String,
    pub youtube_base_url: String,
    pub firecrawl_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            rapidapi_key: None,
            supadata_api_key: None,
            firecrawl_api_key: None,
            openrouter_api_key: None,
            openrouter_model: "google/gemini-2.0-flash-exp:free".to_string(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: vec![ProviderKind::RapidApi, ProviderKind::Supadata, ProviderKind::Direct],
            direct_enabled: true,
            rapidapi_base_url: "https://youtube-transcript3.p.rapidapi.com".to_string(),
            rapidapi_host: "youtube-transcript3.p.rapidapi.com".to_string(),
            supadata_base_url: "https://api.supadata.ai".to_string(),
            youtube_base_url: "https://www.youtube.com".to_string(),
            firecrawl_base_url: "https://api.firecrawl.dev".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            pool_max_idle_per_host: 20,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ProxyConfig {
    /// Resolve the proxy URL, building a Webshare rotating endpoint from credentials
    pub fn resolved_url(&self) -> Option<String> {
        if let Some(url) = non_empty(self.url.clone()) {
            return Some(url);
        }

        match (non_empty(self.username.clone()), non_empty(self.password.clone())) {
            (Some(user), Some(pass)) => {
                Some(format!("http://{}-rotate:{}@p.webshare.io:80", user, pass))
            }
            _ => None,
        }
    }
}

/// Credentials a client may supply with an individual request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestOverrides {
    pub rapidapi_key: Option<String>,
    pub supadata_api_key: Option<String>,
}

impl Config {
    /// Load configuration from an optional YAML file, then overlay the process environment
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => {
                let content = fs_err::read_to_string(&path)
                    .context("Failed to read config file")?;

                serde_yaml::from_str::<Config>(&content)
                    .context("Failed to parse config file")?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Get configuration file path, if one exists
    fn config_path() -> Option<PathBuf> {
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("transcript-relay").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Overlay environment values read through `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(key) = get("RAPIDAPI_KEY") {
            self.credentials.rapidapi_key = Some(key);
        }
        if let Some(key) = get("SUPADATA_API_KEY") {
            self.credentials.supadata_api_key = Some(key);
        }
        if let Some(key) = get("FIRECRAWL_API_KEY") {
            self.credentials.firecrawl_api_key = Some(key);
        }
        if let Some(key) = get("OPENROUTER_API_KEY") {
            self.credentials.openrouter_api_key = Some(key);
        }
        if let Some(model) = get("OPENROUTER_MODEL_NAME") {
            self.credentials.openrouter_model = model;
        }
        if let Some(url) = get("PROXY_URL") {
            self.proxy.url = Some(url);
        }
        if let Some(user) = get("WEBSHARE_PROXY_USERNAME") {
            self.proxy.username = Some(user);
        }
        if let Some(pass) = get("WEBSHARE_PROXY_PASSWORD") {
            self.proxy.password = Some(pass);
        }
        if let Some(port) = get("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", port))?;
        }
        if let Some(origins) = get("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }

    /// Credentials after merging per-request overrides; request values win when non-empty
    pub fn merged_credentials(&self, overrides: &RequestOverrides) -> Credentials {
        let mut merged = self.credentials.clone();
        if let Some(key) = non_empty(overrides.rapidapi_key.clone()) {
            merged.rapidapi_key = Some(key);
        }
        if let Some(key) = non_empty(overrides.supadata_api_key.clone()) {
            merged.supadata_api_key = Some(key);
        }
        merged.rapidapi_key = non_empty(merged.rapidapi_key);
        merged.supadata_api_key = non_empty(merged.supadata_api_key);
        merged
    }

    /// Display current configuration with secrets masked
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen: {}:{}", self.server.host, self.server.port);
        println!("  Provider Order: {}", self.providers.order.iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", "));
        println!("  Direct Fetch: {}", if self.providers.direct_enabled { "enabled" } else { "disabled" });
        println!("  RapidAPI Key: {}", mask(&self.credentials.rapidapi_key));
        println!("  Supadata Key: {}", mask(&self.credentials.supadata_api_key));
        println!("  Firecrawl Key: {}", mask(&self.credentials.firecrawl_api_key));
        println!("  OpenRouter Key: {}", mask(&self.credentials.openrouter_api_key));
        println!("  OpenRouter Model: {}", self.credentials.openrouter_model);
        println!("  Proxy: {}", if self.proxy.resolved_url().is_some() { "configured" } else { "none" });
        println!(
            "  Retry: {} attempts, {}ms base delay",
            self.retry.max_attempts, self.retry.base_delay_ms
        );
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn mask(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "set",
        None => "not set",
    }
}
