use crate::emitter::{Delivery, EventEmitter};
use crate::rss_utils;
use crate::scheduler::{Cadence, CronCadence, ScheduleHandle};
use crate::seen::SeenSet;
use crate::traits::{FeedSource, Trigger};
use crate::types::{
    CycleReport, FeedItem, FeedSnapshot, Result, TriggerConfig, TriggerError, TriggerEvent, TriggerStatus,
    DEFAULT_MAX_ITEMS_PER_CHECK,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Delay before the extra check a test-mode trigger runs after starting.
pub const TEST_MODE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerPhase {
    Idle,
    Initializing,
    Scheduled,
    Checking,
    Stopped,
}

/// Knobs that do not come from the trigger config.
#[derive(Clone)]
pub struct PollerOptions {
    /// Overrides the cadence parsed from `config.schedule`.
    pub cadence: Option<Arc<dyn Cadence>>,
    pub test_delay: Duration,
    pub default_cap: usize,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            cadence: None,
            test_delay: TEST_MODE_DELAY,
            default_cap: DEFAULT_MAX_ITEMS_PER_CHECK,
        }
    }
}

enum Lifecycle {
    Idle,
    Initializing,
    Scheduled(ScheduleHandle),
    Stopped,
}

/// RSS/Atom trigger: polls one feed on a schedule and emits an event for
/// every item it has not seen before, oldest first, at most `cap` per cycle.
pub struct FeedPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    config: TriggerConfig,
    feed_url: String,
    source: Arc<dyn FeedSource>,
    emitter: EventEmitter,
    cadence: Arc<dyn Cadence>,
    test_delay: Duration,
    default_cap: usize,
    seen: Mutex<SeenSet>,
    last_check: Mutex<Option<DateTime<Utc>>>,
    lifecycle: Mutex<Lifecycle>,
    checking: AtomicBool,
    cycle: tokio::sync::Mutex<()>,
}

impl FeedPoller {
    pub fn new(config: TriggerConfig, source: Arc<dyn FeedSource>, emitter: EventEmitter) -> Result<Self> {
        Self::with_options(config, source, emitter, PollerOptions::default())
    }

    pub fn with_options(
        config: TriggerConfig,
        source: Arc<dyn FeedSource>,
        emitter: EventEmitter,
        options: PollerOptions,
    ) -> Result<Self> {
        let feed_url = match config.feed_url.as_deref().map(str::trim) {
            Some(url) if rss_utils::url::is_valid_feed_url(url) => url.to_string(),
            Some(url) => {
                return Err(TriggerError::InvalidConfig {
                    id: config.id.clone(),
                    reason: format!("feedUrl '{}' is not an http(s) URL", url),
                })
            }
            None => {
                return Err(TriggerError::InvalidConfig {
                    id: config.id.clone(),
                    reason: "feedUrl is required".to_string(),
                })
            }
        };

        let cadence: Arc<dyn Cadence> = match (options.cadence, config.schedule.as_deref()) {
            (Some(cadence), _) => cadence,
            (None, Some(expression)) => Arc::new(CronCadence::parse(expression)?),
            (None, None) => {
                return Err(TriggerError::InvalidConfig {
                    id: config.id.clone(),
                    reason: "schedule is required".to_string(),
                })
            }
        };

        Ok(Self {
            inner: Arc::new(PollerInner {
                config,
                feed_url,
                source,
                emitter,
                cadence,
                test_delay: options.test_delay,
                default_cap: options.default_cap,
                seen: Mutex::new(SeenSet::new()),
                last_check: Mutex::new(None),
                lifecycle: Mutex::new(Lifecycle::Idle),
                checking: AtomicBool::new(false),
                cycle: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn feed_url(&self) -> &str {
        &self.inner.feed_url
    }

    pub fn phase(&self) -> PollerPhase {
        match &*self.inner.lifecycle() {
            Lifecycle::Idle => PollerPhase::Idle,
            Lifecycle::Initializing => PollerPhase::Initializing,
            Lifecycle::Scheduled(_) if self.inner.checking.load(Ordering::SeqCst) => PollerPhase::Checking,
            Lifecycle::Scheduled(_) => PollerPhase::Scheduled,
            Lifecycle::Stopped => PollerPhase::Stopped,
        }
    }

    pub fn seen_count(&self) -> usize {
        self.inner.seen().len()
    }

    /// Run one poll cycle right now, outside the schedule.
    pub async fn check(&self) -> Result<CycleReport> {
        self.inner.check().await
    }
}

#[async_trait]
impl Trigger for FeedPoller {
    fn config(&self) -> &TriggerConfig {
        &self.inner.config
    }

    async fn start(&self) -> Result<()> {
        let id = &self.inner.config.id;
        {
            let mut lifecycle = self.inner.lifecycle();
            if matches!(*lifecycle, Lifecycle::Initializing | Lifecycle::Scheduled(_)) {
                warn!("Trigger {} is already running", id);
                return Ok(());
            }
            *lifecycle = Lifecycle::Initializing;
        }

        if self.inner.config.test_mode {
            info!("Trigger {} starting in test mode, existing items will be treated as new", id);
        } else {
            self.inner.seed().await;
        }

        let mut lifecycle = self.inner.lifecycle();
        if !matches!(*lifecycle, Lifecycle::Initializing) {
            info!("Trigger {} was stopped while initializing", id);
            self.inner.seen().clear();
            return Ok(());
        }

        let tick_inner = self.inner.clone();
        let handle = ScheduleHandle::spawn(self.inner.cadence.clone(), id.clone(), move || {
            let inner = tick_inner.clone();
            async move { inner.scheduled_check().await }
        });

        if self.inner.config.test_mode {
            let token = handle.child_token();
            let inner = self.inner.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(inner.test_delay) => inner.scheduled_check().await,
                }
            });
        }

        info!(
            "Trigger {} scheduled ({}) for {}",
            id,
            self.inner.cadence.describe(),
            self.inner.feed_url
        );
        *lifecycle = Lifecycle::Scheduled(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let previous = {
            let mut lifecycle = self.inner.lifecycle();
            if matches!(*lifecycle, Lifecycle::Idle) {
                return Ok(());
            }
            std::mem::replace(&mut *lifecycle, Lifecycle::Stopped)
        };
        if let Lifecycle::Scheduled(handle) = previous {
            handle.cancel();
            info!("Trigger {} stopped", self.inner.config.id);
        }
        self.inner.seen().clear();
        Ok(())
    }

    fn status(&self) -> TriggerStatus {
        let next_check = match &*self.inner.lifecycle() {
            Lifecycle::Scheduled(handle) => Some(handle.next_fire()),
            _ => None,
        };
        TriggerStatus {
            running: next_check.is_some(),
            last_check: *self.inner.last_check.lock().unwrap_or_else(PoisonError::into_inner),
            next_check: next_check.flatten(),
        }
    }
}

impl Drop for FeedPoller {
    fn drop(&mut self) {
        if let Lifecycle::Scheduled(handle) = &*self.inner.lifecycle() {
            handle.cancel();
        }
    }
}

struct CheckingGuard<'a>(&'a AtomicBool);

impl Drop for CheckingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl PollerInner {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn seen(&self) -> MutexGuard<'_, SeenSet> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn seed(&self) {
        match self.source.fetch_feed(&self.feed_url).await {
            Ok(snapshot) => {
                let mut seen = self.seen();
                for id in snapshot.items.iter().filter_map(FeedItem::identifier) {
                    seen.insert(id);
                }
                info!(
                    "Trigger {} initialized with {} existing items from {}",
                    self.config.id,
                    seen.len(),
                    self.feed_url
                );
            }
            Err(e) => {
                warn!(
                    "Trigger {} could not fetch {} during initialization: {}",
                    self.config.id, self.feed_url, e
                );
            }
        }
    }

    async fn scheduled_check(&self) {
        if let Err(e) = self.check().await {
            error!("Trigger {} check of {} failed: {}", self.config.id, self.feed_url, e);
        }
    }

    async fn check(&self) -> Result<CycleReport> {
        let _cycle = self.cycle.lock().await;
        self.checking.store(true, Ordering::SeqCst);
        let _guard = CheckingGuard(&self.checking);

        debug!("Trigger {} checking {}", self.config.id, self.feed_url);
        let snapshot = self.source.fetch_feed(&self.feed_url).await?;
        let cap = self.config.effective_max_items(self.default_cap);

        let (batch, mut report) = {
            let mut seen = self.seen();
            select_new_items(&snapshot, &mut seen, cap)
        };

        if report.deferred > 0 {
            warn!(
                "Trigger {} found {} new items, processing {} and skipping {} (they will not be retried)",
                self.config.id,
                report.new_items,
                report.processed(),
                report.deferred
            );
        } else if report.new_items > 0 {
            info!("Trigger {} found {} new items", self.config.id, report.new_items);
        }

        for item in batch {
            let Some(event) = build_event(&snapshot, &item) else {
                debug!(
                    "Trigger {} skipping item without link ({})",
                    self.config.id,
                    item.identifier().unwrap_or_default()
                );
                report.skipped_without_link += 1;
                continue;
            };
            match self.emitter.emit(event).await {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Failed => report.failed += 1,
                Delivery::Disabled => report.dropped_disabled += 1,
            }
        }

        {
            let mut seen = self.seen();
            let before = seen.len();
            let evicted = seen.compact();
            if evicted > 0 {
                info!(
                    "Trigger {} compacted seen items from {} to {}",
                    self.config.id,
                    before,
                    seen.len()
                );
            }
        }

        *self.last_check.lock().unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        Ok(report)
    }
}

/// Diff a snapshot against the seen-set. Every new identifier is marked seen,
/// including the ones beyond the cap. Returns the items to dispatch, oldest
/// first.
fn select_new_items(snapshot: &FeedSnapshot, seen: &mut SeenSet, cap: usize) -> (Vec<FeedItem>, CycleReport) {
    let mut report = CycleReport {
        items_in_feed: snapshot.items.len(),
        cap,
        ..CycleReport::default()
    };

    let mut fresh = Vec::new();
    for item in &snapshot.items {
        match item.identifier() {
            Some(id) => {
                if seen.insert(id) {
                    fresh.push(item.clone());
                }
            }
            None => report.unidentifiable += 1,
        }
    }

    report.new_items = fresh.len();
    report.deferred = fresh.len().saturating_sub(cap);
    fresh.truncate(cap);
    fresh.reverse();
    (fresh, report)
}

fn build_event(snapshot: &FeedSnapshot, item: &FeedItem) -> Option<TriggerEvent> {
    let link = item.usable_link()?;

    let mut metadata = BTreeMap::new();
    if let Some(title) = &snapshot.title {
        metadata.insert("feed_title".to_string(), Value::from(title.as_str()));
    }
    metadata.insert("feed_url".to_string(), Value::from(snapshot.url.as_str()));
    if let Some(id) = item.identifier() {
        metadata.insert("item_id".to_string(), Value::from(id));
    }
    metadata.insert("categories".to_string(), Value::from(item.categories.clone()));
    if let Some(author) = &item.author {
        metadata.insert("author".to_string(), Value::from(author.as_str()));
    }

    let mut event = TriggerEvent::new(link);
    event.title = item.title.clone();
    event.timestamp = item.published.unwrap_or_else(Utc::now);
    event.metadata = metadata;
    Some(event)
}
