use crate::traits::EventHandler;
use crate::types::{Result, SummaryProfile, TriggerError, TriggerEvent};
use async_trait::async_trait;
use interfaces::{ContentFetcher, NoteWriter, Summarizer};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extracted text shorter than this is treated as a failed extraction.
pub const MIN_CONTENT_CHARS: usize = 100;

/// Summary profiles by name, with the name of the fallback profile.
#[derive(Debug, Clone)]
pub struct ProfileBook {
    profiles: HashMap<String, SummaryProfile>,
    default_profile: String,
}

impl ProfileBook {
    pub fn new(profiles: Vec<SummaryProfile>, default_profile: impl Into<String>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.name.clone(), p)).collect(),
            default_profile: default_profile.into(),
        }
    }

    /// The named profile, else the default one. Fails only when neither exists.
    pub fn resolve(&self, name: &str) -> Result<&SummaryProfile> {
        if let Some(profile) = self.profiles.get(name) {
            return Ok(profile);
        }
        warn!("Profile '{}' not found, using '{}'", name, self.default_profile);
        self.profiles
            .get(&self.default_profile)
            .ok_or_else(|| TriggerError::ProfileNotFound(self.default_profile.clone()))
    }
}

/// What happened to one event inside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Saved(String),
    /// No usable content; the event was dropped.
    Skipped,
}

/// fetch → summarize → persist, shared by every trigger.
pub struct ArticlePipeline {
    fetcher: Arc<dyn ContentFetcher>,
    summarizer: Arc<dyn Summarizer>,
    writer: Arc<dyn NoteWriter>,
    profiles: ProfileBook,
}

impl ArticlePipeline {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        summarizer: Arc<dyn Summarizer>,
        writer: Arc<dyn NoteWriter>,
        profiles: ProfileBook,
    ) -> Self {
        info!("Article pipeline using summarizer: {}", summarizer.name());
        Self {
            fetcher,
            summarizer,
            writer,
            profiles,
        }
    }

    /// Same collaborators, different note writer.
    pub fn with_writer(&self, writer: Arc<dyn NoteWriter>) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            summarizer: self.summarizer.clone(),
            writer,
            profiles: self.profiles.clone(),
        }
    }

    pub fn profiles(&self) -> &ProfileBook {
        &self.profiles
    }

    pub async fn process(&self, event: TriggerEvent, trigger_id: &str, profile_name: &str) -> Result<PipelineOutcome> {
        debug!("Trigger {} processing {}", trigger_id, event.url);

        let article = match self.fetcher.fetch_content(&event.url).await? {
            Some(article) if article.text_len() >= MIN_CONTENT_CHARS => article,
            Some(article) => {
                warn!(
                    "Trigger {}: content of {} too short ({} chars), skipping",
                    trigger_id,
                    event.url,
                    article.text_len()
                );
                return Ok(PipelineOutcome::Skipped);
            }
            None => {
                warn!("Trigger {}: no content extracted from {}, skipping", trigger_id, event.url);
                return Ok(PipelineOutcome::Skipped);
            }
        };

        let profile = self.profiles.resolve(profile_name)?;
        let mut summary = self.summarizer.summarize(&article, profile).await?;
        if summary.title.trim().is_empty() {
            if let Some(title) = &event.title {
                summary.title = title.clone();
            }
        }

        summary.metadata.extend(event.metadata);
        summary
            .metadata
            .insert("event_id".to_string(), Value::from(event.id.to_string()));
        summary
            .metadata
            .insert("trigger_id".to_string(), Value::from(trigger_id));

        let location = self.writer.write_note(&summary, profile).await?;
        info!("Trigger {} saved {} to {}", trigger_id, event.url, location);
        Ok(PipelineOutcome::Saved(location))
    }
}

/// Per-trigger handler: routes events into the shared pipeline with the
/// trigger's own id and profile.
pub struct RoutedHandler {
    pipeline: Arc<ArticlePipeline>,
    trigger_id: String,
    profile: String,
}

impl RoutedHandler {
    pub fn new(pipeline: Arc<ArticlePipeline>, trigger_id: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            pipeline,
            trigger_id: trigger_id.into(),
            profile: profile.into(),
        }
    }
}

#[async_trait]
impl EventHandler for RoutedHandler {
    async fn handle(&self, event: TriggerEvent) -> anyhow::Result<()> {
        self.pipeline.process(event, &self.trigger_id, &self.profile).await?;
        Ok(())
    }
}
