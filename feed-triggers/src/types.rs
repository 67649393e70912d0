use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

pub use interfaces::{ArticleContent, Summary, SummaryProfile};

/// Per-cycle cap used by scheduled checks when none is configured.
pub const DEFAULT_MAX_ITEMS_PER_CHECK: usize = 3;

/// Per-cycle cap used by ad hoc test runs when none is configured.
pub const DEFAULT_TEST_MAX_ITEMS: usize = 2;

/// Declarative trigger definition, as stored in the application config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub profile: String,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub feed_url: Option<String>,
    #[serde(default)]
    pub max_items_per_check: Option<usize>,
    /// Deprecated spelling of `max_items_per_check`.
    #[serde(default)]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub test_mode: bool,
}

fn default_enabled() -> bool {
    true
}

impl TriggerConfig {
    /// Minimal rss trigger definition; mostly useful for tests and tooling.
    pub fn rss(id: &str, feed_url: &str, schedule: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            kind: "rss".to_string(),
            enabled: true,
            profile: "default".to_string(),
            schedule: Some(schedule.to_string()),
            feed_url: Some(feed_url.to_string()),
            max_items_per_check: None,
            max_items: None,
            test_mode: false,
        }
    }

    /// Effective per-cycle cap: the modern field wins over the deprecated one,
    /// which wins over `default`. Zero counts as unset.
    pub fn effective_max_items(&self, default: usize) -> usize {
        self.max_items_per_check
            .filter(|n| *n > 0)
            .or(self.max_items.filter(|n| *n > 0))
            .unwrap_or(default)
    }
}

/// A newly discovered item, handed to the event handler exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: BTreeMap<String, Value>,
}

impl TriggerEvent {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            title: None,
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Point-in-time view of a trigger.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerStatus {
    pub running: bool,
    pub last_check: Option<DateTime<Utc>>,
    pub next_check: Option<DateTime<Utc>>,
}

/// One entry of a fetched feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub guid: Option<String>,
    pub link: Option<String>,
    /// Feed-local identifier (Atom `id`, JSON Feed `id`).
    pub id: Option<String>,
    pub title: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
    pub author: Option<String>,
}

impl FeedItem {
    /// Stable dedup key: guid, then link, then feed-local id.
    pub fn identifier(&self) -> Option<&str> {
        [&self.guid, &self.link, &self.id]
            .into_iter()
            .filter_map(|candidate| candidate.as_deref())
            .map(str::trim)
            .find(|candidate| !candidate.is_empty())
    }

    pub fn usable_link(&self) -> Option<&str> {
        self.link.as_deref().map(str::trim).filter(|link| !link.is_empty())
    }
}

/// A fresh snapshot of a feed, items in feed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub title: Option<String>,
    pub url: String,
    pub items: Vec<FeedItem>,
}

/// What happened during one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub items_in_feed: usize,
    pub unidentifiable: usize,
    pub new_items: usize,
    pub cap: usize,
    pub deferred: usize,
    pub skipped_without_link: usize,
    pub delivered: usize,
    pub failed: usize,
    pub dropped_disabled: usize,
}

impl CycleReport {
    /// New items taken into this cycle's batch, i.e. not deferred by the cap.
    pub fn processed(&self) -> usize {
        self.new_items - self.deferred
    }

    pub fn dispatched(&self) -> usize {
        self.delivered + self.failed + self.dropped_disabled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Feed-Triggers/1.0".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Trigger not found: {id}")]
    NotFound { id: String },

    #[error("Unknown trigger type: {0}")]
    UnknownType(String),

    #[error("Invalid configuration for trigger {id}: {reason}")]
    InvalidConfig { id: String, reason: String },

    #[error("Invalid schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },

    #[error("Summary profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Trigger manager has not been initialized")]
    NotInitialized,

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] anyhow::Error),
}

impl TriggerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TriggerError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, TriggerError>;
