//! Text and date normalization for decoded feed documents.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::types::{NormalizedChannel, NormalizedItem, ParsedChannel, ParsedItem};

/// Accepted `pubDate` format: `Mon, 02 Jan 2006 15:04:05 -0700`.
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Decode HTML character entities to their literal text.
///
/// Text without entities is returned unchanged.
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Parse a `pubDate` value. Returns `None` if it doesn't match
/// [`PUB_DATE_FORMAT`].
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw.trim(), PUB_DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Normalize a single item.
///
/// An unparseable or missing publish date is logged and left empty; it
/// never prevents the item from being stored.
pub fn normalize_item(item: ParsedItem) -> NormalizedItem {
    let title = decode_entities(&item.title);
    let raw_date = item.pub_date.as_deref().unwrap_or("");
    let published_at = parse_pub_date(raw_date);
    if published_at.is_none() {
        warn!(
            title = %title,
            pub_date = %raw_date,
            "Unparseable publish date, storing post without one"
        );
    }

    NormalizedItem {
        title,
        link: item
            .link
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        description: item
            .description
            .map(|d| decode_entities(&d))
            .filter(|d| !d.is_empty()),
        published_at,
    }
}

/// Normalize a decoded channel and all its items, keeping document order.
pub fn normalize_channel(channel: ParsedChannel) -> NormalizedChannel {
    NormalizedChannel {
        title: decode_entities(&channel.title),
        link: channel.link,
        description: decode_entities(&channel.description),
        items: channel.items.into_iter().map(normalize_item).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Ben &amp; Jerry&#39;s"), "Ben & Jerry's");
        assert_eq!(decode_entities("&lt;b&gt;bold&lt;/b&gt;"), "<b>bold</b>");
        assert_eq!(decode_entities("&quot;q&quot; &#x41;"), "\"q\" A");
    }

    #[test]
    fn test_decode_entities_plain_text_unchanged() {
        let plain = "Ben & Jerry's <3";
        assert_eq!(decode_entities(plain), plain);
        assert_eq!(decode_entities(&decode_entities(plain)), plain);
    }

    #[test]
    fn test_parse_pub_date() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(
            parse_pub_date("Tue, 05 Mar 2024 14:30:00 +0000"),
            Some(expected)
        );
        assert_eq!(
            parse_pub_date("Tue, 05 Mar 2024 16:30:00 +0200"),
            Some(expected)
        );
        assert_eq!(
            parse_pub_date("  Tue, 05 Mar 2024 09:30:00 -0500\n"),
            Some(expected)
        );
    }

    #[test]
    fn test_parse_pub_date_rejects_other_formats() {
        assert_eq!(parse_pub_date("not-a-date"), None);
        assert_eq!(parse_pub_date(""), None);
        assert_eq!(parse_pub_date("2024-03-05T14:30:00Z"), None);
        // Named zones are not part of the accepted format
        assert_eq!(parse_pub_date("Tue, 05 Mar 2024 14:30:00 GMT"), None);
    }

    #[test]
    fn test_normalize_item() {
        let item = ParsedItem {
            title: "Ben &amp; Jerry&#39;s".to_string(),
            link: Some(" https://example.com/ice-cream ".to_string()),
            description: Some("Cookies &amp; cream".to_string()),
            pub_date: Some("Tue, 05 Mar 2024 14:30:00 +0000".to_string()),
        };

        let normalized = normalize_item(item);
        assert_eq!(normalized.title, "Ben & Jerry's");
        assert_eq!(
            normalized.link,
            Some("https://example.com/ice-cream".to_string())
        );
        assert_eq!(
            normalized.description,
            Some("Cookies & cream".to_string())
        );
        assert!(normalized.published_at.is_some());
    }

    #[test]
    fn test_normalize_item_bad_date_and_empty_fields() {
        let item = ParsedItem {
            title: "Dated badly".to_string(),
            link: Some("   ".to_string()),
            description: Some(String::new()),
            pub_date: Some("not-a-date".to_string()),
        };

        let normalized = normalize_item(item);
        assert_eq!(normalized.title, "Dated badly");
        assert!(normalized.link.is_none());
        assert!(normalized.description.is_none());
        assert!(normalized.published_at.is_none());
    }

    #[test]
    fn test_normalize_channel_keeps_order() {
        let channel = ParsedChannel {
            title: "Tom &amp; Jerry".to_string(),
            link: "https://example.com".to_string(),
            description: "Cat &lt;&gt; mouse".to_string(),
            items: (0..3)
                .map(|i| ParsedItem {
                    title: format!("Item {i}"),
                    link: Some(format!("https://example.com/{i}")),
                    ..Default::default()
                })
                .collect(),
        };

        let normalized = normalize_channel(channel);
        assert_eq!(normalized.title, "Tom & Jerry");
        assert_eq!(normalized.description, "Cat <> mouse");
        let titles: Vec<&str> = normalized.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Item 0", "Item 1", "Item 2"]);
    }
}
