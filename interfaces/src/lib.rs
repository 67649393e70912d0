//! Collaborator boundary for the feed trigger service.
//!
//! The trigger core only ever talks to content extraction, summarization and
//! note persistence through the traits in [`defs`]. Concrete network-backed
//! implementations live with the service; the small implementations here need
//! nothing but the standard library.

pub mod baseline;
pub mod defs;
pub mod empty;

pub use baseline::BaselineSummarizer;
pub use defs::{ArticleContent, ContentFetcher, NoteWriter, Summarizer, Summary, SummaryProfile};
pub use empty::EmptyNoteWriter;
