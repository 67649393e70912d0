use crate::traits::EventHandler;
use crate::types::TriggerEvent;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

/// Result of handing one event to the handler.
///
/// Emission never fails from the caller's point of view: handler errors and
/// panics end up as `Failed` after being logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The trigger is disabled; the handler was not called.
    Disabled,
    Failed,
}

/// Dispatch step shared by all trigger variants.
#[derive(Clone)]
pub struct EventEmitter {
    trigger_id: String,
    enabled: bool,
    handler: Arc<dyn EventHandler>,
}

impl EventEmitter {
    pub fn new(trigger_id: impl Into<String>, enabled: bool, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            trigger_id: trigger_id.into(),
            enabled,
            handler,
        }
    }

    pub async fn emit(&self, event: TriggerEvent) -> Delivery {
        if !self.enabled {
            debug!("Trigger {} is disabled, dropping {}", self.trigger_id, event.url);
            return Delivery::Disabled;
        }

        let url = event.url.clone();
        match AssertUnwindSafe(self.handler.handle(event)).catch_unwind().await {
            Ok(Ok(())) => Delivery::Delivered,
            Ok(Err(e)) => {
                error!("Trigger {} failed to handle {}: {:#}", self.trigger_id, url, e);
                Delivery::Failed
            }
            Err(_) => {
                error!("Trigger {} handler panicked while handling {}", self.trigger_id, url);
                Delivery::Failed
            }
        }
    }
}
