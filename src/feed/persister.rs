//! Post persistence for normalized feed items.

use tracing::{debug, error, warn};

use super::store::PostStore;
use super::types::{InsertOutcome, NewPost, NormalizedItem};

/// Counts for one batch of persisted items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    /// Newly stored posts.
    pub created: usize,
    /// Items whose URL was already stored.
    pub duplicates: usize,
    /// Items whose insertion failed for any other reason.
    pub failed: usize,
    /// Items without a link.
    pub skipped: usize,
}

impl PersistSummary {
    /// Total number of items seen.
    pub fn total(&self) -> usize {
        self.created + self.duplicates + self.failed + self.skipped
    }
}

/// Store each item as a post of `feed_id`.
///
/// Each item is inserted independently: a duplicate or a failed insert
/// never prevents the remaining items from being stored.
pub async fn persist_items(
    posts: &dyn PostStore,
    feed_id: i64,
    items: Vec<NormalizedItem>,
) -> PersistSummary {
    let mut summary = PersistSummary::default();

    for item in items {
        let Some(url) = item.link else {
            warn!(feed_id, title = %item.title, "Skipping item without link");
            summary.skipped += 1;
            continue;
        };

        let mut post = NewPost::new(feed_id, item.title, url);
        post.description = item.description;
        post.published_at = item.published_at;

        match posts.insert_post(&post).await {
            Ok(InsertOutcome::Created(id)) => {
                debug!(feed_id, post_id = id, url = %post.url, "Stored post");
                summary.created += 1;
            }
            Ok(InsertOutcome::Duplicate) => {
                debug!(feed_id, url = %post.url, "Post already stored");
                summary.duplicates += 1;
            }
            Err(e) => {
                error!(feed_id, url = %post.url, "Failed to store post: {}", e);
                summary.failed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::repository::PostRepository;
    use crate::feed::types::NewFeed;
    use crate::feed::FeedRepository;
    use crate::db::UserRepository;
    use crate::{Database, GatorError, Result};
    use async_trait::async_trait;

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool()).create("kahya").await.unwrap();
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new("Example", "https://example.com/rss", user.id))
            .await
            .unwrap();
        (db, feed.id)
    }

    fn item(n: usize) -> NormalizedItem {
        NormalizedItem {
            title: format!("Item {n}"),
            link: Some(format!("https://example.com/{n}")),
            ..Default::default()
        }
    }

    /// Fails insertion of posts whose URL is in `fail_urls`.
    struct FailingStore {
        inner: Database,
        fail_urls: Vec<String>,
    }

    #[async_trait]
    impl PostStore for FailingStore {
        async fn insert_post(&self, post: &NewPost) -> Result<InsertOutcome> {
            if self.fail_urls.contains(&post.url) {
                return Err(GatorError::Database("simulated failure".to_string()));
            }
            self.inner.insert_post(post).await
        }
    }

    #[tokio::test]
    async fn test_persist_items_creates_posts() {
        let (db, feed_id) = setup().await;
        let items = (1..=3).map(item).collect();

        let summary = persist_items(&db, feed_id, items).await;
        assert_eq!(
            summary,
            PersistSummary {
                created: 3,
                ..Default::default()
            }
        );

        let count = PostRepository::new(db.pool())
            .count_by_feed(feed_id)
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_persist_items_twice_is_idempotent() {
        let (db, feed_id) = setup().await;

        let first = persist_items(&db, feed_id, (1..=3).map(item).collect()).await;
        assert_eq!(first.created, 3);

        let second = persist_items(&db, feed_id, (1..=3).map(item).collect()).await;
        assert_eq!(second.created, 0);
        assert_eq!(second.duplicates, 3);
        assert_eq!(second.failed, 0);

        let count = PostRepository::new(db.pool())
            .count_by_feed(feed_id)
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_persist_items_partial_failure() {
        let (db, feed_id) = setup().await;
        let store = FailingStore {
            inner: db.clone(),
            fail_urls: vec!["https://example.com/3".to_string()],
        };

        let summary = persist_items(&store, feed_id, (1..=5).map(item).collect()).await;
        assert_eq!(summary.created, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 5);

        let posts = PostRepository::new(db.pool());
        assert!(posts
            .get_by_url("https://example.com/5")
            .await
            .unwrap()
            .is_some());
        assert!(posts
            .get_by_url("https://example.com/3")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_persist_items_skips_missing_link() {
        let (db, feed_id) = setup().await;
        let items = vec![
            item(1),
            NormalizedItem {
                title: "No link".to_string(),
                link: None,
                ..Default::default()
            },
            item(2),
        ];

        let summary = persist_items(&db, feed_id, items).await;
        assert_eq!(summary.created, 2);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_persist_items_keeps_fields() {
        let (db, feed_id) = setup().await;
        let published = chrono::Utc::now();
        let items = vec![NormalizedItem {
            title: "Ben & Jerry's".to_string(),
            link: Some("https://example.com/ice-cream".to_string()),
            description: Some("Cookies & cream".to_string()),
            published_at: Some(published),
        }];

        persist_items(&db, feed_id, items).await;

        let post = PostRepository::new(db.pool())
            .get_by_url("https://example.com/ice-cream")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(post.title, "Ben & Jerry's");
        assert_eq!(post.description, Some("Cookies & cream".to_string()));
        assert_eq!(
            post.published_at.map(|p| p.timestamp_micros()),
            Some(published.timestamp_micros())
        );
    }
}
