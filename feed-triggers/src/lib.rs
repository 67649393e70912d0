pub mod config;
pub mod console;
pub mod content;
pub mod emitter;
pub mod fetcher;
pub mod llm_adapter;
pub mod parser;
pub mod pipeline;
pub mod rss_utils;
pub mod scheduler;
pub mod seen;
pub mod sources;
pub mod traits;
pub mod trigger_manager;
pub mod triggers;
pub mod types;
pub mod vault;

pub use config::AppConfig;
pub use emitter::{Delivery, EventEmitter};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use pipeline::{ArticlePipeline, PipelineOutcome, ProfileBook, RoutedHandler};
pub use scheduler::{Cadence, CronCadence, FixedInterval, ScheduleHandle};
pub use seen::SeenSet;
pub use sources::HttpFeedSource;
pub use traits::{EventHandler, FeedSource, Trigger};
pub use trigger_manager::{ManagerComponents, TestRunOptions, TriggerManager};
pub use triggers::{FeedPoller, PollerOptions, PollerPhase, TriggerFactory, TriggerRegistry};
pub use types::*;
pub use vault::VaultWriter;
