use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::defs::NoteWriter;
use crate::defs::Summary;
use crate::defs::SummaryProfile;

/// Note sink that persists nothing.
pub struct EmptyNoteWriter;

#[async_trait]
impl NoteWriter for EmptyNoteWriter {
    async fn write_note(&self, summary: &Summary, _profile: &SummaryProfile) -> Result<String> {
        // Nothing is written, the caller only wants to see the summary.
        info!("Discarding note '{}' ({})", summary.title, summary.source_url);
        Ok(String::new())
    }
}
