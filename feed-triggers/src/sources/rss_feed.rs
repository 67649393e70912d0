use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::traits::FeedSource;
use crate::types::{FeedSnapshot, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Feed source backed by HTTP and feed-rs.
pub struct HttpFeedSource {
    fetcher: Arc<Fetcher>,
}

impl HttpFeedSource {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_feed(&self, url: &str) -> Result<FeedSnapshot> {
        let content = self.fetcher.fetch_text(url).await?;
        let snapshot = FeedParser::parse_feed(url, &content)?;
        info!(
            "Pulled {} items from {}",
            snapshot.items.len(),
            snapshot.title.as_deref().unwrap_or(url)
        );
        Ok(snapshot)
    }
}
