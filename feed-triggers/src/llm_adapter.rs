use crate::config::LlmConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use interfaces::{ArticleContent, Summarizer, Summary, SummaryProfile};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Article text beyond this many characters is not sent to the model.
const MAX_ARTICLE_CHARS: usize = 24_000;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Summarizer talking to an OpenAI-compatible chat completions endpoint.
pub struct ChatCompletionSummarizer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
}

impl ChatCompletionSummarizer {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("failed to build LLM HTTP client")?;
        let api_key = std::env::var(&config.api_key_env).ok().filter(|key| !key.is_empty());
        if api_key.is_none() {
            info!("{} is not set, calling {} without credentials", config.api_key_env, config.base_url);
        }
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
        })
    }

    fn user_prompt(article: &ArticleContent) -> String {
        let text: String = article.text.chars().take(MAX_ARTICLE_CHARS).collect();
        format!(
            "Title: {}\nURL: {}\n\n{}",
            article.title.as_deref().unwrap_or("(untitled)"),
            article.url,
            text
        )
    }
}

#[async_trait]
impl Summarizer for ChatCompletionSummarizer {
    fn name(&self) -> String {
        format!("chat completions ({})", self.model)
    }

    async fn summarize(&self, article: &ArticleContent, profile: &SummaryProfile) -> Result<Summary> {
        let model = profile.model.as_deref().unwrap_or(&self.model);
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: profile.instructions.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Self::user_prompt(article),
                },
            ],
            max_tokens: self.max_tokens,
        };

        debug!("Summarizing {} with {} (profile {})", article.url, model, profile.name);
        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.context("LLM request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("LLM returned HTTP {}: {}", status.as_u16(), body));
        }
        let parsed: ChatResponse = response.json().await.context("LLM response was not valid JSON")?;
        let body = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow!("LLM returned no summary for {}", article.url))?;

        Ok(Summary {
            title: article.title.clone().unwrap_or_else(|| article.url.clone()),
            source_url: article.url.clone(),
            body,
            tags: profile.tags.clone(),
            profile: profile.name.clone(),
            created_at: Utc::now(),
            metadata: BTreeMap::new(),
        })
    }
}
