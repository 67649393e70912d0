pub mod rss;

pub use rss::{FeedPoller, PollerOptions, PollerPhase, TEST_MODE_DELAY};

use crate::emitter::EventEmitter;
use crate::traits::{FeedSource, Trigger};
use crate::types::{Result, TriggerConfig, TriggerError};
use std::collections::HashMap;
use std::sync::Arc;

pub const RSS_KIND: &str = "rss";

/// Builds one trigger variant from its declarative config.
pub trait TriggerFactory: Send + Sync {
    fn build(&self, config: TriggerConfig, emitter: EventEmitter) -> Result<Box<dyn Trigger>>;
}

pub struct RssTriggerFactory {
    source: Arc<dyn FeedSource>,
}

impl RssTriggerFactory {
    pub fn new(source: Arc<dyn FeedSource>) -> Self {
        Self { source }
    }
}

impl TriggerFactory for RssTriggerFactory {
    fn build(&self, config: TriggerConfig, emitter: EventEmitter) -> Result<Box<dyn Trigger>> {
        Ok(Box::new(FeedPoller::new(config, self.source.clone(), emitter)?))
    }
}

/// Maps a config `type` tag to the factory for that variant.
#[derive(Clone, Default)]
pub struct TriggerRegistry {
    factories: HashMap<String, Arc<dyn TriggerFactory>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in variant.
    pub fn with_defaults(source: Arc<dyn FeedSource>) -> Self {
        let mut registry = Self::new();
        registry.register(RSS_KIND, Arc::new(RssTriggerFactory::new(source)));
        registry
    }

    pub fn register(&mut self, kind: &str, factory: Arc<dyn TriggerFactory>) {
        self.factories.insert(kind.to_string(), factory);
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn build(&self, config: TriggerConfig, emitter: EventEmitter) -> Result<Box<dyn Trigger>> {
        let factory = self
            .factories
            .get(&config.kind)
            .ok_or_else(|| TriggerError::UnknownType(config.kind.clone()))?;
        factory.build(config, emitter)
    }
}
