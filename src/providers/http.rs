use anyhow::Context;
use reqwest::{Client, Proxy, Response};

use super::Failure;
use crate::config::HttpConfig;
use crate::utils::excerpt;

const USER_AGENT: &str = concat!("transcript-relay/", env!("CARGO_PKG_VERSION"));

/// Longest response body kept in a failure message
const BODY_EXCERPT_CHARS: usize = 200;

/// Build a pooled client that ignores `HTTP_PROXY`/`HTTPS_PROXY` and only
/// routes through `proxy` when one is given.
pub fn build_client(http: &HttpConfig, proxy: Option<&str>) -> crate::Result<Client> {
    let mut builder = Client::builder()
        .no_proxy()
        .user_agent(USER_AGENT)
        .connect_timeout(http.connect_timeout())
        .timeout(http.request_timeout())
        .pool_max_idle_per_host(http.pool_max_idle_per_host);

    if let Some(url) = proxy {
        let proxy = Proxy::all(url).context("Invalid proxy URL")?;
        builder = builder.proxy(proxy);
    }

    builder.build().context("Failed to build HTTP client")
}

/// Turn a non-2xx response into a transient failure carrying status and body excerpt
pub async fn error_for_status(response: Response, provider: &str) -> Result<Response, Failure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Failure::Transient(format!(
        "{} request failed (HTTP {}): {}",
        provider,
        status.as_u16(),
        excerpt(&body, BODY_EXCERPT_CHARS)
    )))
}
