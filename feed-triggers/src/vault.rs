use crate::rss_utils::text::slugify;
use anyhow::{Context, Result};
use async_trait::async_trait;
use interfaces::{NoteWriter, Summary, SummaryProfile};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

const MAX_SLUG_CHARS: usize = 80;
const RESERVED_KEYS: [&str; 5] = ["title", "source", "profile", "created", "tags"];

/// Writes summaries as markdown notes into a vault directory.
pub struct VaultWriter {
    root: PathBuf,
    default_folder: Option<String>,
}

impl VaultWriter {
    pub fn new(root: impl Into<PathBuf>, default_folder: Option<String>) -> Self {
        Self {
            root: root.into(),
            default_folder,
        }
    }

    fn note_dir(&self, profile: &SummaryProfile) -> PathBuf {
        let mut dir = self.root.clone();
        if let Some(folder) = profile.folder.as_deref().or(self.default_folder.as_deref()) {
            // Only plain path segments, the note must stay inside the vault.
            for component in Path::new(folder).components() {
                if let Component::Normal(segment) = component {
                    dir.push(segment);
                }
            }
        }
        dir
    }
}

/// Markdown for one note: a frontmatter block followed by the summary.
/// Frontmatter values are JSON-encoded, which keeps them valid YAML.
pub fn render_note(summary: &Summary) -> String {
    let mut out = String::from("---\n");
    let mut field = |key: &str, value: &Value| {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&value.to_string());
        out.push('\n');
    };
    field("title", &Value::from(summary.title.as_str()));
    field("source", &Value::from(summary.source_url.as_str()));
    field("profile", &Value::from(summary.profile.as_str()));
    field("created", &Value::from(summary.created_at.to_rfc3339()));
    field("tags", &Value::from(summary.tags.clone()));
    for (key, value) in &summary.metadata {
        if !RESERVED_KEYS.contains(&key.as_str()) {
            field(key, value);
        }
    }
    out.push_str("---\n\n");
    out.push_str(&format!("# {}\n\n", summary.title));
    out.push_str(summary.body.trim());
    out.push_str(&format!("\n\n[Source]({})\n", summary.source_url));
    out
}

#[async_trait]
impl NoteWriter for VaultWriter {
    async fn write_note(&self, summary: &Summary, profile: &SummaryProfile) -> Result<String> {
        let dir = self.note_dir(profile);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let slug = match slugify(&summary.title, MAX_SLUG_CHARS) {
            slug if slug.is_empty() => "untitled".to_string(),
            slug => slug,
        };
        let stem = format!("{} {}", summary.created_at.format("%Y-%m-%d"), slug);
        let content = render_note(summary);

        let mut attempt = 1;
        loop {
            let name = if attempt == 1 {
                format!("{}.md", stem)
            } else {
                format!("{} {}.md", stem, attempt)
            };
            let path = dir.join(name);
            match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    file.write_all(content.as_bytes())
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    file.flush().await?;
                    info!("Wrote note {}", path.display());
                    return Ok(path.display().to_string());
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e).with_context(|| format!("failed to create {}", path.display())),
            }
        }
    }
}
