use feed_triggers::{FeedParser, TriggerError};

const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example News</title>
    <link>https://news.example.com/</link>
    <description>Latest</description>
    <item>
      <title>Second story</title>
      <link>https://news.example.com/2</link>
      <guid isPermaLink="false">urn:story:2</guid>
      <category>tech</category>
      <pubDate>Tue, 02 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>First story</title>
      <link>https://news.example.com/1</link>
      <guid isPermaLink="false">urn:story:1</guid>
      <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Blog</title>
  <id>urn:blog</id>
  <updated>2024-01-03T00:00:00Z</updated>
  <entry>
    <title>Hello Atom</title>
    <id>tag:blog.example.com,2024:1</id>
    <link href="https://blog.example.com/hello"/>
    <updated>2024-01-03T00:00:00Z</updated>
    <author><name>Jane</name></author>
  </entry>
</feed>"#;

#[test]
fn test_parses_rss_items_in_feed_order() {
    let snapshot = FeedParser::parse_feed("https://news.example.com/rss", RSS).unwrap();
    assert_eq!(snapshot.title.as_deref(), Some("Example News"));
    assert_eq!(snapshot.url, "https://news.example.com/rss");
    assert_eq!(snapshot.items.len(), 2);

    let first = &snapshot.items[0];
    assert_eq!(first.guid.as_deref(), Some("urn:story:2"));
    assert!(first.id.is_none());
    assert_eq!(first.identifier(), Some("urn:story:2"));
    assert_eq!(first.link.as_deref(), Some("https://news.example.com/2"));
    assert_eq!(first.title.as_deref(), Some("Second story"));
    assert_eq!(first.categories, vec!["tech".to_string()]);
    assert!(first.published.is_some());
}

#[test]
fn test_atom_ids_are_feed_local() {
    let snapshot = FeedParser::parse_feed("https://blog.example.com/atom", ATOM).unwrap();
    let entry = &snapshot.items[0];
    assert!(entry.guid.is_none());
    assert_eq!(entry.id.as_deref(), Some("tag:blog.example.com,2024:1"));
    // A link outranks a feed-local id as the dedup key.
    assert_eq!(entry.identifier(), Some("https://blog.example.com/hello"));
    assert_eq!(entry.author.as_deref(), Some("Jane"));
    assert!(entry.published.is_some());
}

#[test]
fn test_rejects_non_feed_documents() {
    let result = FeedParser::parse_feed("https://example.com/", "<html><body>nope</body></html>");
    assert!(matches!(result, Err(TriggerError::Parse(_))));
}

const RSS_WITHOUT_GUIDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Sparse News</title>
    <link>https://news.example.com/</link>
    <description>Items without guids</description>
    <item>
      <title>Anonymous</title>
    </item>
    <item>
      <title>Linked only</title>
      <link>https://news.example.com/linked</link>
    </item>
  </channel>
</rss>"#;

#[test]
fn test_link_only_items_are_keyed_by_link() {
    let snapshot = FeedParser::parse_feed("https://news.example.com/rss", RSS_WITHOUT_GUIDS).unwrap();
    let linked = &snapshot.items[1];
    assert!(linked.guid.is_none());
    assert!(linked.id.is_none());
    assert_eq!(linked.identifier(), Some("https://news.example.com/linked"));

    // Retitling must not change the key.
    let retitled = RSS_WITHOUT_GUIDS.replace("Linked only", "Linked only (updated)");
    let snapshot = FeedParser::parse_feed("https://news.example.com/rss", &retitled).unwrap();
    assert_eq!(snapshot.items[1].identifier(), Some("https://news.example.com/linked"));
}

#[test]
fn test_items_without_guid_link_or_id_stay_unidentifiable() {
    for _ in 0..2 {
        let snapshot = FeedParser::parse_feed("https://news.example.com/rss", RSS_WITHOUT_GUIDS).unwrap();
        let anonymous = &snapshot.items[0];
        assert_eq!(anonymous.title.as_deref(), Some("Anonymous"));
        assert!(anonymous.guid.is_none());
        assert!(anonymous.link.is_none());
        assert!(anonymous.id.is_none());
        assert_eq!(anonymous.identifier(), None);
    }
}
