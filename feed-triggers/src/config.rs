use crate::types::{FetchConfig, Result, SummaryProfile, TriggerConfig, TriggerError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_ENV: &str = "FEED_TRIGGERS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "feed-triggers.json";
pub const DEFAULT_PROFILE_NAME: &str = "default";

const DEFAULT_INSTRUCTIONS: &str = "Summarize the article in a few short paragraphs, then list its key points as bullets.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
    #[serde(default)]
    pub profiles: Vec<SummaryProfile>,
    #[serde(default = "default_profile_name")]
    pub default_profile: String,
    pub vault: VaultConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE_NAME.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    pub path: PathBuf,
    /// Sub-folder used when the profile does not name one.
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Chat,
    Baseline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_seconds: u64,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Chat,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_seconds: 60,
            max_tokens: 1024,
        }
    }
}

impl AppConfig {
    /// Resolve the config path: explicit flag, then `FEED_TRIGGERS_CONFIG`,
    /// then `feed-triggers.json` in the working directory.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json(&raw)?;
        info!(
            "Loaded {} triggers and {} profiles from {}",
            config.triggers.len(),
            config.profiles.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: AppConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        let mut ids = HashSet::new();
        for trigger in &self.triggers {
            if trigger.id.trim().is_empty() {
                return Err(TriggerError::InvalidConfig {
                    id: trigger.name.clone(),
                    reason: "trigger id must not be empty".to_string(),
                });
            }
            if !ids.insert(trigger.id.as_str()) {
                return Err(TriggerError::InvalidConfig {
                    id: trigger.id.clone(),
                    reason: "duplicate trigger id".to_string(),
                });
            }
        }

        if self.profiles.is_empty() {
            self.profiles.push(SummaryProfile::new(self.default_profile.clone(), DEFAULT_INSTRUCTIONS));
        } else if !self.profiles.iter().any(|p| p.name == self.default_profile) {
            return Err(TriggerError::ProfileNotFound(self.default_profile.clone()));
        }
        Ok(())
    }

    pub fn trigger(&self, id: &str) -> Option<&TriggerConfig> {
        self.triggers.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "triggers": [
            { "id": "hn", "name": "Hacker News", "type": "rss", "enabled": true, "profile": "tech",
              "schedule": "*/30 * * * *", "feedUrl": "https://news.ycombinator.com/rss",
              "maxItemsPerCheck": 5, "maxItems": 9 },
            { "id": "blog", "name": "Blog", "type": "rss", "profile": "default",
              "schedule": "0 * * * *", "feedUrl": "https://example.com/feed.xml", "testMode": true }
        ],
        "profiles": [
            { "name": "default", "instructions": "Summarize." },
            { "name": "tech", "instructions": "Summarize for engineers.", "tags": ["tech"], "folder": "Tech" }
        ],
        "vault": { "path": "/tmp/vault", "folder": "Inbox" },
        "llm": { "provider": "baseline" }
    }"#;

    #[test]
    fn parses_camel_case_documents() {
        let config = AppConfig::from_json(SAMPLE).unwrap();
        let hn = config.trigger("hn").unwrap();
        assert_eq!(hn.kind, "rss");
        assert_eq!(hn.feed_url.as_deref(), Some("https://news.ycombinator.com/rss"));
        assert_eq!(hn.max_items_per_check, Some(5));
        assert_eq!(hn.max_items, Some(9));
        assert!(!hn.test_mode);

        let blog = config.trigger("blog").unwrap();
        assert!(blog.enabled);
        assert!(blog.test_mode);

        assert_eq!(config.default_profile, "default");
        assert_eq!(config.llm.provider, LlmProvider::Baseline);
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.fetch.timeout_seconds, 30);
        assert_eq!(config.vault.folder.as_deref(), Some("Inbox"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let raw = r#"{ "triggers": [
            { "id": "a", "name": "A", "type": "rss", "profile": "default" },
            { "id": "a", "name": "B", "type": "rss", "profile": "default" }
        ], "vault": { "path": "/tmp/v" } }"#;
        assert!(matches!(
            AppConfig::from_json(raw),
            Err(TriggerError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn synthesizes_default_profile() {
        let config = AppConfig::from_json(r#"{ "vault": { "path": "/tmp/v" } }"#).unwrap();
        assert_eq!(config.profiles.len(), 1);
        assert_eq!(config.profiles[0].name, DEFAULT_PROFILE_NAME);
    }

    #[test]
    fn rejects_missing_default_profile() {
        let raw = r#"{ "profiles": [{ "name": "tech", "instructions": "x" }],
            "defaultProfile": "general", "vault": { "path": "/tmp/v" } }"#;
        assert!(matches!(AppConfig::from_json(raw), Err(TriggerError::ProfileNotFound(_))));
    }
}
