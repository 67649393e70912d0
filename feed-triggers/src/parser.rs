use crate::types::{FeedItem, FeedSnapshot, Result, TriggerError};
use feed_rs::model::{Entry, FeedType};
use feed_rs::parser;
use tracing::debug;

/// Turns raw feed documents (RSS 0.9x/1.0/2.0, Atom, JSON Feed) into
/// [`FeedSnapshot`]s.
pub struct FeedParser;

impl FeedParser {
    pub fn parse_feed(url: &str, content: &str) -> Result<FeedSnapshot> {
        debug!("Parsing feed content ({} bytes) from {}", content.len(), url);

        // No synthesized ids: an entry without guid/id must fall back to its
        // link, or stay unidentifiable.
        let feed = parser::Builder::new()
            .id_generator(|_, _, _| String::new())
            .build()
            .parse(content.as_bytes())
            .map_err(|e| TriggerError::Parse(format!("Failed to parse feed {}: {}", url, e)))?;

        // RSS calls its entry identifier a guid; Atom and JSON Feed ids are
        // feed-local.
        let is_rss = matches!(feed.feed_type, FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2);
        let items = feed
            .entries
            .into_iter()
            .map(|entry| Self::parse_entry(entry, is_rss))
            .collect::<Vec<_>>();

        debug!("Parsed {} entries from {}", items.len(), url);

        Ok(FeedSnapshot {
            title: feed.title.map(|t| t.content).filter(|t| !t.trim().is_empty()),
            url: url.to_string(),
            items,
        })
    }

    fn parse_entry(entry: Entry, is_rss: bool) -> FeedItem {
        let id = Some(entry.id).filter(|id| !id.trim().is_empty());
        let (guid, id) = if is_rss { (id, None) } else { (None, id) };

        FeedItem {
            guid,
            link: entry.links.first().map(|link| link.href.clone()),
            id,
            title: entry.title.map(|t| t.content),
            published: entry.published.or(entry.updated),
            categories: entry.categories.into_iter().map(|c| c.term).collect(),
            author: entry.authors.into_iter().next().map(|a| a.name),
        }
    }
}
