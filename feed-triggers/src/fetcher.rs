use crate::types::{FetchConfig, Result, TriggerError};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Shared HTTP client for feeds and article pages.
///
/// Every call goes to the network; there is no conditional-request cache and
/// no retry, a failed fetch simply fails this round.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// GET `url` and return the body as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)?;
        let start_time = Instant::now();
        debug!("Fetching {}", parsed);

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TriggerError::Parse(format!(
                "HTTP {}: {} for {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                url
            )));
        }

        let limit = self.config.max_feed_size_mb * 1024 * 1024;
        if let Some(content_length) = response.content_length() {
            if content_length as usize > limit {
                return Err(TriggerError::Parse(format!(
                    "Response too large: {}MB (limit {}MB) for {}",
                    content_length as usize / (1024 * 1024),
                    self.config.max_feed_size_mb,
                    url
                )));
            }
        }

        let content = response.text().await?;
        if content.len() > limit {
            return Err(TriggerError::Parse(format!(
                "Response too large: {} bytes (limit {}MB) for {}",
                content.len(),
                self.config.max_feed_size_mb,
                url
            )));
        }

        info!(
            "Fetched {} ({} bytes in {}ms)",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }
}
