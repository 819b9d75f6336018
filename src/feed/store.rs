//! Storage and clock interfaces used by the aggregation pipeline.
//!
//! The scheduler only talks to these traits, so the pipeline does not depend
//! on any storage engine. `Database` implements both stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::repository::{FeedRepository, PostRepository};
use super::types::{Feed, FeedScope, InsertOutcome, NewPost};
use crate::{Database, Result};

/// Feed selection and bookkeeping.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Select the feed most overdue for polling within `scope` and mark it
    /// as fetched at `now`. `Ok(None)` when there is no feed to poll.
    async fn select_next_feed(&self, scope: FeedScope, now: DateTime<Utc>)
        -> Result<Option<Feed>>;

    /// Record that the feed was fetched and decoded successfully at `at`.
    async fn mark_fetch_succeeded(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()>;
}

/// Post insertion.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a post. A post with an already stored URL must yield
    /// `InsertOutcome::Duplicate`, never an error.
    async fn insert_post(&self, post: &NewPost) -> Result<InsertOutcome>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[async_trait]
impl FeedStore for Database {
    async fn select_next_feed(
        &self,
        scope: FeedScope,
        now: DateTime<Utc>,
    ) -> Result<Option<Feed>> {
        FeedRepository::new(self.pool()).select_next(scope, now).await
    }

    async fn mark_fetch_succeeded(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()> {
        FeedRepository::new(self.pool())
            .mark_succeeded(feed_id, at)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PostStore for Database {
    async fn insert_post(&self, post: &NewPost) -> Result<InsertOutcome> {
        PostRepository::new(self.pool()).insert(post).await
    }
}
