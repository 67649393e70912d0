use crate::fetcher::Fetcher;
use crate::rss_utils::text::normalize_whitespace;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use interfaces::{ArticleContent, ContentFetcher};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, info};

const CONTAINERS: [&str; 4] = ["article", "main", "[role=main]", "body"];
const BLOCKS: &str = "p, h2, h3, li, blockquote";

/// Content fetcher that downloads a page and keeps the readable blocks of
/// its main container.
pub struct HttpContentFetcher {
    fetcher: Arc<Fetcher>,
}

impl HttpContentFetcher {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch_content(&self, url: &str) -> Result<Option<ArticleContent>> {
        let html = self.fetcher.fetch_text(url).await?;
        extract_article(url, &html)
    }

    async fn close(&self) -> Result<()> {
        info!("Releasing shared content fetcher");
        Ok(())
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{}': {}", css, e))
}

fn meta_content(document: &Html, css: &str) -> Result<Option<String>> {
    let found = document
        .select(&selector(css)?)
        .filter_map(|meta| meta.value().attr("content"))
        .map(normalize_whitespace)
        .find(|content| !content.is_empty());
    Ok(found)
}

fn first_text(document: &Html, css: &str) -> Result<Option<String>> {
    let found = document
        .select(&selector(css)?)
        .map(|element| normalize_whitespace(&element.text().collect::<String>()))
        .find(|text| !text.is_empty());
    Ok(found)
}

fn container_text(container: ElementRef<'_>, blocks: &Selector) -> String {
    let paragraphs: Vec<String> = container
        .select(blocks)
        .map(|block| normalize_whitespace(&block.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect();
    if paragraphs.is_empty() {
        normalize_whitespace(&container.text().collect::<String>())
    } else {
        paragraphs.join("\n\n")
    }
}

/// Extract title, byline, site name and readable text from an HTML page.
/// Returns `Ok(None)` when the page has no text at all.
pub fn extract_article(url: &str, html: &str) -> Result<Option<ArticleContent>> {
    let document = Html::parse_document(html);
    let blocks = selector(BLOCKS)?;

    let mut text = String::new();
    for css in CONTAINERS {
        if let Some(container) = document.select(&selector(css)?).next() {
            text = container_text(container, &blocks);
            if !text.is_empty() {
                debug!("Extracted {} chars from <{}> of {}", text.len(), css, url);
                break;
            }
        }
    }
    if text.is_empty() {
        return Ok(None);
    }

    let title = match meta_content(&document, r#"meta[property="og:title"]"#)? {
        Some(title) => Some(title),
        None => match first_text(&document, "title")? {
            Some(title) => Some(title),
            None => first_text(&document, "h1")?,
        },
    };

    Ok(Some(ArticleContent {
        url: url.to_string(),
        title,
        text,
        byline: meta_content(&document, r#"meta[name="author"]"#)?,
        site_name: meta_content(&document, r#"meta[property="og:site_name"]"#)?,
    }))
}
