/// Helpers shared by the feed side and the note side of the service

/// URL utilities
pub mod url {
    use url::Url;

    /// Absolute http(s) URL with a host
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => (url.scheme() == "http" || url.scheme() == "https") && url.host_str().is_some(),
            Err(_) => false,
        }
    }
}

/// Text utilities for note naming
pub mod text {
    /// Lowercase, dash-separated, filesystem-safe version of `input`, at most
    /// `max_chars` characters long.
    pub fn slugify(input: &str, max_chars: usize) -> String {
        let mut slug = String::new();
        let mut pending_dash = false;
        for c in input.chars() {
            if c.is_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.extend(c.to_lowercase());
            } else {
                pending_dash = true;
            }
            if slug.chars().count() >= max_chars {
                break;
            }
        }
        let slug: String = slug.chars().take(max_chars).collect();
        slug.trim_end_matches('-').to_string()
    }

    /// Collapse runs of whitespace into single spaces.
    pub fn normalize_whitespace(input: &str) -> String {
        input.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::text;
    use super::url as links;

    #[test]
    fn feed_urls_must_be_http() {
        assert!(links::is_valid_feed_url("https://example.com/feed.xml"));
        assert!(links::is_valid_feed_url("http://example.com/rss"));
        assert!(!links::is_valid_feed_url("ftp://example.com/feed.xml"));
        assert!(!links::is_valid_feed_url("example.com/feed.xml"));
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(text::slugify("Hello,   World! Rust 2024", 80), "hello-world-rust-2024");
        assert_eq!(text::slugify("  --Leading and trailing--  ", 80), "leading-and-trailing");
        assert_eq!(text::slugify("abcdef ghij", 7), "abcdef");
        assert_eq!(text::slugify("!!!", 10), "");
    }

    #[test]
    fn whitespace_is_normalized() {
        assert_eq!(text::normalize_whitespace(" a \n\n b\tc "), "a b c");
    }
}
