#![allow(dead_code)]

use async_trait::async_trait;
use feed_triggers::{
    EventEmitter, EventHandler, FeedItem, FeedSnapshot, FeedSource, Result, Trigger, TriggerConfig, TriggerError,
    TriggerEvent, TriggerFactory, TriggerStatus,
};
use interfaces::{ArticleContent, ContentFetcher, NoteWriter, Summary, SummaryProfile};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();
    });
}

/// Identifiable, linkable feed item keyed by `key`.
pub fn item(key: &str) -> FeedItem {
    FeedItem {
        guid: Some(format!("guid-{}", key)),
        link: Some(format!("https://example.com/{}", key)),
        title: Some(format!("Item {}", key)),
        categories: vec!["news".to_string()],
        author: Some("Reporter".to_string()),
        ..FeedItem::default()
    }
}

pub fn items(keys: &[&str]) -> Vec<FeedItem> {
    keys.iter().map(|key| item(key)).collect()
}

pub fn url(key: &str) -> String {
    format!("https://example.com/{}", key)
}

/// Feed source returning whatever items it currently holds.
pub struct StaticFeedSource {
    title: String,
    items: Mutex<Vec<FeedItem>>,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl StaticFeedSource {
    pub fn new(items: Vec<FeedItem>) -> Arc<Self> {
        Arc::new(Self {
            title: "Example Feed".to_string(),
            items: Mutex::new(items),
            failing: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn set_items(&self, items: Vec<FeedItem>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    async fn fetch_feed(&self, url: &str) -> Result<FeedSnapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(TriggerError::Parse(format!("{} is unreachable", url)));
        }
        Ok(FeedSnapshot {
            title: Some(self.title.clone()),
            url: url.to_string(),
            items: self.items.lock().unwrap().clone(),
        })
    }
}

/// Handler that records every event it sees and can be told to fail or
/// panic on chosen urls.
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<TriggerEvent>>,
    fail_urls: Mutex<HashSet<String>>,
    panic_urls: Mutex<HashSet<String>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_on(&self, url: &str) {
        self.fail_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn panic_on(&self, url: &str) {
        self.panic_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn events(&self) -> Vec<TriggerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.url).collect()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: TriggerEvent) -> anyhow::Result<()> {
        let url = event.url.clone();
        self.events.lock().unwrap().push(event);
        let panics = self.panic_urls.lock().unwrap().contains(&url);
        let fails = self.fail_urls.lock().unwrap().contains(&url);
        if panics {
            panic!("handler exploded on {}", url);
        }
        if fails {
            anyhow::bail!("downstream failure for {}", url);
        }
        Ok(())
    }
}

pub fn emitter_for(config: &TriggerConfig, handler: Arc<RecordingHandler>) -> EventEmitter {
    EventEmitter::new(config.id.clone(), config.enabled, handler)
}

pub const LONG_TEXT: &str = "Rust makes systems programming approachable. Ownership rules prevent data races at compile time. \
Async runtimes schedule many tasks on few threads. Feed pollers benefit from all of this.";

/// Content fetcher serving a long article for every url except the ones
/// marked short or missing.
#[derive(Default)]
pub struct FakeContentFetcher {
    short: Mutex<HashSet<String>>,
    missing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl FakeContentFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn short_for(&self, url: &str) {
        self.short.lock().unwrap().insert(url.to_string());
    }

    pub fn missing_for(&self, url: &str) {
        self.missing.lock().unwrap().insert(url.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for FakeContentFetcher {
    async fn fetch_content(&self, url: &str) -> anyhow::Result<Option<ArticleContent>> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.missing.lock().unwrap().contains(url) {
            return Ok(None);
        }
        let text = if self.short.lock().unwrap().contains(url) {
            "Too short.".to_string()
        } else {
            LONG_TEXT.to_string()
        };
        Ok(Some(ArticleContent {
            url: url.to_string(),
            title: Some(format!("Article at {}", url)),
            text,
            byline: None,
            site_name: None,
        }))
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Note writer that keeps notes in memory.
#[derive(Default)]
pub struct RecordingWriter {
    notes: Mutex<Vec<(Summary, String)>>,
}

impl RecordingWriter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notes(&self) -> Vec<(Summary, String)> {
        self.notes.lock().unwrap().clone()
    }
}

#[async_trait]
impl NoteWriter for RecordingWriter {
    async fn write_note(&self, summary: &Summary, profile: &SummaryProfile) -> anyhow::Result<String> {
        let mut notes = self.notes.lock().unwrap();
        notes.push((summary.clone(), profile.name.clone()));
        Ok(format!("memory://{}", notes.len()))
    }
}

/// Factory for triggers that only record their lifecycle calls.
pub struct SpyFactory {
    log: Arc<Mutex<Vec<String>>>,
    fail_start: HashSet<String>,
}

impl SpyFactory {
    pub fn new(log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            log,
            fail_start: HashSet::new(),
        }
    }

    pub fn failing_start(mut self, id: &str) -> Self {
        self.fail_start.insert(id.to_string());
        self
    }
}

impl TriggerFactory for SpyFactory {
    fn build(&self, config: TriggerConfig, _emitter: EventEmitter) -> Result<Box<dyn Trigger>> {
        self.log.lock().unwrap().push(format!("build:{}", config.id));
        Ok(Box::new(SpyTrigger {
            fail_start: self.fail_start.contains(&config.id),
            config,
            log: self.log.clone(),
            running: AtomicBool::new(false),
        }))
    }
}

struct SpyTrigger {
    config: TriggerConfig,
    log: Arc<Mutex<Vec<String>>>,
    running: AtomicBool,
    fail_start: bool,
}

#[async_trait]
impl Trigger for SpyTrigger {
    fn config(&self) -> &TriggerConfig {
        &self.config
    }

    async fn start(&self) -> Result<()> {
        self.log.lock().unwrap().push(format!("start:{}", self.config.id));
        if self.fail_start {
            return Err(TriggerError::InvalidConfig {
                id: self.config.id.clone(),
                reason: "refusing to start".to_string(),
            });
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.log.lock().unwrap().push(format!("stop:{}", self.config.id));
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn status(&self) -> TriggerStatus {
        TriggerStatus {
            running: self.running.load(Ordering::SeqCst),
            ..TriggerStatus::default()
        }
    }
}

pub fn spy_config(id: &str) -> TriggerConfig {
    TriggerConfig {
        kind: "spy".to_string(),
        ..TriggerConfig::rss(id, "https://example.com/feed.xml", "0 0 1 1 *")
    }
}
