use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::defs::ArticleContent;
use crate::defs::Summarizer;
use crate::defs::Summary;
use crate::defs::SummaryProfile;

const DEFAULT_SENTENCES: usize = 3;

/// Offline summarizer: keeps the leading sentences of the article.
pub struct BaselineSummarizer {
    sentences: usize,
}

impl BaselineSummarizer {
    pub fn new() -> Self {
        Self { sentences: DEFAULT_SENTENCES }
    }

    pub fn with_sentences(mut self, sentences: usize) -> Self {
        self.sentences = sentences.max(1);
        self
    }

    fn leading_sentences(&self, text: &str) -> String {
        let mut out = String::new();
        let mut taken = 0;
        let mut start = 0;
        for (index, c) in text.char_indices() {
            if matches!(c, '.' | '!' | '?') {
                let end = index + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(sentence);
                    taken += 1;
                }
                start = end;
                if taken == self.sentences {
                    return out;
                }
            }
        }
        let rest = text[start..].trim();
        if !rest.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(rest);
        }
        out
    }
}

impl Default for BaselineSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for BaselineSummarizer {
    fn name(&self) -> String {
        format!("baseline ({} sentences)", self.sentences)
    }

    async fn summarize(&self, article: &ArticleContent, profile: &SummaryProfile) -> Result<Summary> {
        let title = article
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| article.url.clone());
        Ok(Summary {
            title,
            source_url: article.url.clone(),
            body: self.leading_sentences(&article.text),
            tags: profile.tags.clone(),
            profile: profile.name.clone(),
            created_at: Utc::now(),
            metadata: BTreeMap::new(),
        })
    }
}
