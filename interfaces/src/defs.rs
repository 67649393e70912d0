use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Readable content extracted from a web page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
    pub byline: Option<String>,
    pub site_name: Option<String>,
}

impl ArticleContent {
    /// Number of characters of readable text.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Named set of summarization instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryProfile {
    pub name: String,
    pub instructions: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Vault sub-folder for notes produced with this profile.
    #[serde(default)]
    pub folder: Option<String>,
}

impl SummaryProfile {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model: None,
            tags: Vec::new(),
            folder: None,
        }
    }
}

/// Output of a summarizer, ready to be persisted as a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub title: String,
    pub source_url: String,
    pub body: String,
    pub tags: Vec<String>,
    pub profile: String,
    pub created_at: DateTime<Utc>,
    pub metadata: BTreeMap<String, Value>,
}

/// Fetches a page and extracts its readable content.
///
/// The implementation is shared by every dispatched event, so calls may be
/// assumed to happen one after another per trigger but never in parallel
/// fan-out from a single cycle.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Returns `Ok(None)` when the page yielded no readable content.
    async fn fetch_content(&self, url: &str) -> Result<Option<ArticleContent>>;

    /// Release any long-lived resource held by the fetcher.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> String;

    async fn summarize(&self, article: &ArticleContent, profile: &SummaryProfile) -> Result<Summary>;
}

/// Persists a finished summary and returns where it ended up.
#[async_trait]
pub trait NoteWriter: Send + Sync {
    async fn write_note(&self, summary: &Summary, profile: &SummaryProfile) -> Result<String>;
}
