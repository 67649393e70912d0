use crate::config::{AppConfig, LlmProvider};
use crate::content::HttpContentFetcher;
use crate::emitter::EventEmitter;
use crate::fetcher::Fetcher;
use crate::llm_adapter::ChatCompletionSummarizer;
use crate::pipeline::{ArticlePipeline, ProfileBook, RoutedHandler};
use crate::sources::HttpFeedSource;
use crate::traits::{FeedSource, Trigger};
use crate::triggers::{FeedPoller, PollerOptions, TriggerRegistry, RSS_KIND};
use crate::types::{
    CycleReport, Result, TriggerConfig, TriggerError, TriggerStatus, DEFAULT_TEST_MAX_ITEMS,
};
use crate::vault::VaultWriter;
use interfaces::{BaselineSummarizer, ContentFetcher, EmptyNoteWriter, Summarizer};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared collaborators every trigger dispatches into.
#[derive(Clone)]
pub struct ManagerComponents {
    pub pipeline: Arc<ArticlePipeline>,
    pub content: Arc<dyn ContentFetcher>,
    pub feed_source: Arc<dyn FeedSource>,
    pub registry: TriggerRegistry,
}

impl ManagerComponents {
    /// Components with the built-in trigger variants registered.
    pub fn new(pipeline: Arc<ArticlePipeline>, content: Arc<dyn ContentFetcher>, feed_source: Arc<dyn FeedSource>) -> Self {
        let registry = TriggerRegistry::with_defaults(feed_source.clone());
        Self {
            pipeline,
            content,
            feed_source,
            registry,
        }
    }

    /// Network-backed components described by the application config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new(config.fetch.clone())?);
        let content: Arc<dyn ContentFetcher> = Arc::new(HttpContentFetcher::new(fetcher.clone()));
        let feed_source: Arc<dyn FeedSource> = Arc::new(HttpFeedSource::new(fetcher));
        let summarizer: Arc<dyn Summarizer> = match config.llm.provider {
            LlmProvider::Chat => Arc::new(ChatCompletionSummarizer::new(&config.llm)?),
            LlmProvider::Baseline => Arc::new(BaselineSummarizer::new()),
        };
        let writer = Arc::new(VaultWriter::new(config.vault.path.clone(), config.vault.folder.clone()));
        let profiles = ProfileBook::new(config.profiles.clone(), config.default_profile.clone());
        let pipeline = Arc::new(ArticlePipeline::new(content.clone(), summarizer, writer, profiles));
        Ok(Self::new(pipeline, content, feed_source))
    }
}

/// Options for an ad hoc test-mode run of one trigger.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestRunOptions {
    /// Per-cycle cap; wins over both configured cap fields.
    pub max_items: Option<usize>,
    /// Summarize but do not persist.
    pub dry_run: bool,
}

struct ManagedTrigger {
    config: TriggerConfig,
    trigger: Box<dyn Trigger>,
}

/// Owns the live triggers: builds them from config, wires them to the
/// pipeline and drives their lifecycle.
pub struct TriggerManager {
    settings: Option<AppConfig>,
    components: Option<ManagerComponents>,
    triggers: Vec<ManagedTrigger>,
}

impl TriggerManager {
    /// Manager that builds its collaborators from `settings` on `initialize`.
    pub fn new(settings: AppConfig) -> Self {
        Self {
            settings: Some(settings),
            components: None,
            triggers: Vec::new(),
        }
    }

    /// Manager with ready-made collaborators; `initialize` is a no-op.
    pub fn with_components(components: ManagerComponents) -> Self {
        Self {
            settings: None,
            components: Some(components),
            triggers: Vec::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.components.is_some()
    }

    pub fn initialize(&mut self) -> Result<()> {
        if self.components.is_some() {
            return Ok(());
        }
        let settings = self.settings.as_ref().ok_or(TriggerError::NotInitialized)?;
        let components = ManagerComponents::from_config(settings)?;
        info!(
            "Trigger manager initialized (variants: {})",
            components.registry.kinds().join(", ")
        );
        self.components = Some(components);
        Ok(())
    }

    fn components(&self) -> Result<&ManagerComponents> {
        self.components.as_ref().ok_or(TriggerError::NotInitialized)
    }

    /// Replace every held trigger with the ones described by `configs`.
    /// Entries that cannot be built are logged and skipped. Returns the number
    /// of triggers loaded.
    pub async fn load_triggers(&mut self, configs: Vec<TriggerConfig>) -> Result<usize> {
        let components = self.components()?.clone();

        let previous = std::mem::take(&mut self.triggers);
        for managed in previous {
            if let Err(e) = managed.trigger.stop().await {
                error!("Failed to stop trigger {} before reload: {}", managed.config.id, e);
            }
        }

        let mut ids = HashSet::new();
        for config in configs {
            if !ids.insert(config.id.clone()) {
                error!("Duplicate trigger id {}, skipping later definition", config.id);
                continue;
            }

            let handler = Arc::new(RoutedHandler::new(
                components.pipeline.clone(),
                config.id.clone(),
                config.profile.clone(),
            ));
            let emitter = EventEmitter::new(config.id.clone(), config.enabled, handler);
            match components.registry.build(config.clone(), emitter) {
                Ok(trigger) => {
                    info!("Loaded trigger {} ({}, {})", config.id, config.name, config.kind);
                    self.triggers.push(ManagedTrigger { config, trigger });
                }
                Err(TriggerError::UnknownType(kind)) => {
                    error!("Unknown trigger type: {}", kind);
                }
                Err(e) => {
                    error!("Failed to create trigger {}: {}", config.id, e);
                }
            }
        }

        info!("Loaded {} triggers", self.triggers.len());
        Ok(self.triggers.len())
    }

    fn find(&self, id: &str) -> Result<&ManagedTrigger> {
        self.triggers
            .iter()
            .find(|managed| managed.config.id == id)
            .ok_or_else(|| TriggerError::NotFound { id: id.to_string() })
    }

    pub async fn start_trigger(&self, id: &str) -> Result<()> {
        self.find(id)?.trigger.start().await
    }

    pub async fn stop_trigger(&self, id: &str) -> Result<()> {
        self.find(id)?.trigger.stop().await
    }

    /// Start every trigger; failures are logged per trigger. Returns how many
    /// started.
    pub async fn start_all_triggers(&self) -> usize {
        let mut started = 0;
        for managed in &self.triggers {
            match managed.trigger.start().await {
                Ok(()) => started += 1,
                Err(e) => error!("Failed to start trigger {}: {}", managed.config.id, e),
            }
        }
        info!("Started {}/{} triggers", started, self.triggers.len());
        started
    }

    /// Stop every trigger; failures are logged per trigger. Returns how many
    /// stopped.
    pub async fn stop_all_triggers(&self) -> usize {
        let mut stopped = 0;
        for managed in &self.triggers {
            match managed.trigger.stop().await {
                Ok(()) => stopped += 1,
                Err(e) => error!("Failed to stop trigger {}: {}", managed.config.id, e),
            }
        }
        info!("Stopped {}/{} triggers", stopped, self.triggers.len());
        stopped
    }

    pub fn get_trigger_status(&self) -> BTreeMap<String, TriggerStatus> {
        self.triggers
            .iter()
            .map(|managed| (managed.config.id.clone(), managed.trigger.status()))
            .collect()
    }

    /// Held trigger ids, in load order.
    pub fn list_triggers(&self) -> Vec<String> {
        self.triggers.iter().map(|managed| managed.config.id.clone()).collect()
    }

    pub fn trigger_configs(&self) -> Vec<&TriggerConfig> {
        self.triggers.iter().map(|managed| &managed.config).collect()
    }

    /// One immediate test-mode cycle for a held rss trigger: nothing is
    /// pre-seeded, the default cap is 2, and the run is not scheduled.
    pub async fn test_trigger(&self, id: &str, options: TestRunOptions) -> Result<CycleReport> {
        let components = self.components()?;
        let managed = self.find(id)?;
        if managed.config.kind != RSS_KIND {
            return Err(TriggerError::Unsupported(format!(
                "test runs are only available for {} triggers, {} is {}",
                RSS_KIND, id, managed.config.kind
            )));
        }

        let mut config = managed.config.clone();
        if !config.enabled {
            warn!("Trigger {} is disabled, enabling it for this test run", id);
        }
        config.enabled = true;
        config.test_mode = true;
        if let Some(max_items) = options.max_items {
            config.max_items_per_check = Some(max_items);
        }

        let pipeline = if options.dry_run {
            Arc::new(components.pipeline.with_writer(Arc::new(EmptyNoteWriter)))
        } else {
            components.pipeline.clone()
        };
        let handler = Arc::new(RoutedHandler::new(pipeline, config.id.clone(), config.profile.clone()));
        let emitter = EventEmitter::new(config.id.clone(), true, handler);
        let poller = FeedPoller::with_options(
            config,
            components.feed_source.clone(),
            emitter,
            PollerOptions {
                default_cap: DEFAULT_TEST_MAX_ITEMS,
                ..PollerOptions::default()
            },
        )?;

        info!("Test run of trigger {} against {}", id, poller.feed_url());
        let report = poller.check().await?;
        info!(
            "Test run of trigger {} done: {} new, {} delivered, {} failed",
            id, report.new_items, report.delivered, report.failed
        );
        Ok(report)
    }

    /// Stop everything and release shared resources.
    pub async fn cleanup(&self) {
        self.stop_all_triggers().await;
        if let Some(components) = &self.components {
            if let Err(e) = components.content.close().await {
                error!("Failed to release content fetcher: {:#}", e);
            }
        }
        info!("Trigger manager cleaned up");
    }
}
