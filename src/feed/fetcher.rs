//! RSS feed fetcher.
//!
//! Retrieves a remote document with a single bounded GET and decodes it as
//! an RSS channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rss::Channel;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::types::{ParsedChannel, ParsedItem};
use crate::config::FetcherConfig;
use crate::{GatorError, Result};

/// Retrieval and decoding of one feed document.
#[async_trait]
pub trait FetchFeed: Send + Sync {
    /// Fetch and decode the document at `url`.
    ///
    /// Cancelling `cancel` aborts the request with a fetch error.
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<ParsedChannel>;
}

/// HTTP fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: Client,
    max_feed_size: u64,
}

impl HttpFetcher {
    /// Create a fetcher from configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatorError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatorError::Fetch(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GatorError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(GatorError::Fetch(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatorError::Fetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(GatorError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FetchFeed for HttpFetcher {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<ParsedChannel> {
        validate_url(url)?;
        debug!("Fetching feed {}", url);

        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(GatorError::Fetch(format!("fetch of {} cancelled", url)));
            }
            result = self.fetch_bytes(url) => result?,
        };

        parse_channel(&bytes)
    }
}

/// Check that a URL can be requested (absolute http or https).
pub fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).map_err(|e| GatorError::Fetch(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(GatorError::Fetch(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(GatorError::Fetch("URL has no host".to_string()));
    }

    Ok(())
}

/// Decode an RSS document.
///
/// Missing elements decode to empty values; only a document that is not an
/// RSS channel at all is an error.
pub fn parse_channel(bytes: &[u8]) -> Result<ParsedChannel> {
    let channel = Channel::read_from(bytes)
        .map_err(|e| GatorError::Fetch(format!("failed to parse feed: {}", e)))?;

    let items = channel
        .items()
        .iter()
        .map(|item| ParsedItem {
            title: item.title().unwrap_or_default().to_string(),
            link: item.link().map(str::to_string),
            description: item.description().map(str::to_string),
            pub_date: item.pub_date().map(str::to_string),
        })
        .collect();

    Ok(ParsedChannel {
        title: channel.title().to_string(),
        link: channel.link().to_string(),
        description: channel.description().to_string(),
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com</link>
    <description>A test feed</description>
    <item>
      <title>First Article</title>
      <link>https://example.com/1</link>
      <description>First description</description>
      <pubDate>Tue, 05 Mar 2024 14:30:00 +0000</pubDate>
    </item>
    <item>
      <title>Second Article</title>
      <link>https://example.com/2</link>
      <pubDate>whenever</pubDate>
    </item>
  </channel>
</rss>"#;

    fn test_config() -> FetcherConfig {
        FetcherConfig {
            user_agent: "gator-test".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/feed.xml").is_ok());
        assert!(validate_url("http://example.com/feed.xml").is_ok());

        let result = validate_url("ftp://example.com/feed.xml");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("unsupported URL scheme"));

        let result = validate_url("not a url");
        assert!(result.unwrap_err().to_string().contains("invalid URL"));
    }

    #[test]
    fn test_parse_channel() {
        let channel = parse_channel(SAMPLE_RSS.as_bytes()).unwrap();
        assert_eq!(channel.title, "Test Feed");
        assert_eq!(channel.link, "https://example.com");
        assert_eq!(channel.description, "A test feed");
        assert_eq!(channel.items.len(), 2);

        let first = &channel.items[0];
        assert_eq!(first.title, "First Article");
        assert_eq!(first.link, Some("https://example.com/1".to_string()));
        assert_eq!(first.description, Some("First description".to_string()));
        assert_eq!(
            first.pub_date,
            Some("Tue, 05 Mar 2024 14:30:00 +0000".to_string())
        );

        let second = &channel.items[1];
        assert!(second.description.is_none());
        assert_eq!(second.pub_date, Some("whenever".to_string()));
    }

    #[test]
    fn test_parse_channel_minimal() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <item>
      <link>https://example.com/only-link</link>
    </item>
  </channel>
</rss>"#;

        let channel = parse_channel(rss.as_bytes()).unwrap();
        assert_eq!(channel.title, "");
        assert_eq!(channel.items.len(), 1);
        assert_eq!(channel.items[0].title, "");
        assert!(channel.items[0].pub_date.is_none());
    }

    #[test]
    fn test_parse_channel_invalid() {
        assert!(parse_channel(b"This is not XML").is_err());
        assert!(parse_channel(b"<html><body>nope</body></html>").is_err());
    }

    #[test]
    fn test_parse_channel_truncated_keeps_no_items() {
        let truncated = br#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Blog</title><link>https://blog.example.com</link>
<item><title>First</title><link>https://blog.example.com/1</link></item>
<item><title>Second</title><li"#;
        assert!(parse_channel(truncated).is_err());
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent_and_parses() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed.xml")
            .match_header("user-agent", "gator-test")
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(SAMPLE_RSS)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let url = format!("{}/feed.xml", server.url());
        let channel = fetcher.fetch(&url, &CancellationToken::new()).await.unwrap();

        assert_eq!(channel.title, "Test Feed");
        assert_eq!(channel.items.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/feed.xml")
            .with_status(500)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let url = format!("{}/feed.xml", server.url());
        let err = fetcher
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::Fetch(_)));
        assert!(err.to_string().contains("HTTP error"));
    }

    #[tokio::test]
    async fn test_fetch_unparseable_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/feed.xml")
            .with_status(200)
            .with_body("definitely not a feed")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let url = format!("{}/feed.xml", server.url());
        let err = fetcher
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("failed to parse feed"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/feed.xml")
            .with_status(200)
            .with_body(SAMPLE_RSS)
            .create_async()
            .await;

        let config = FetcherConfig {
            max_feed_size_bytes: 16,
            ..test_config()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let url = format!("{}/feed.xml", server.url());
        let err = fetcher
            .fetch(&url, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("feed too large"));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:1/feed.xml", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_cancelled() {
        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher
            .fetch("http://example.com/feed.xml", &cancel)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("cancelled"));
    }
}
