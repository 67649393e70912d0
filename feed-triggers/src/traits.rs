use crate::types::{FeedSnapshot, Result, TriggerConfig, TriggerEvent, TriggerStatus};
use async_trait::async_trait;

/// An independently schedulable unit that watches one source and emits an
/// event for every newly discovered piece of work.
#[async_trait]
pub trait Trigger: Send + Sync {
    fn config(&self) -> &TriggerConfig;

    fn id(&self) -> &str {
        &self.config().id
    }

    /// Arm the trigger. Calling this on a running trigger is a no-op.
    async fn start(&self) -> Result<()>;

    /// Cancel future checks. Safe to call on a trigger that never started.
    async fn stop(&self) -> Result<()>;

    /// Snapshot of the trigger; never blocks on I/O.
    fn status(&self) -> TriggerStatus;
}

/// Consumer of discovered items.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: TriggerEvent) -> anyhow::Result<()>;
}

/// Anything that can produce a fresh snapshot of a syndication feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, url: &str) -> Result<FeedSnapshot>;
}
