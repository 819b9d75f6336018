//! Feed, post and follow repositories for gator.

use chrono::{DateTime, Utc};

use super::types::{
    Feed, FeedFollow, FeedScope, FeedWithOwner, InsertOutcome, NewFeed, NewPost, Post,
    PostWithFeed,
};
use crate::datetime::{from_storage, to_storage};
use crate::db::DbPool;
use crate::error::is_unique_violation;
use crate::{GatorError, Result};

const FEED_COLUMNS: &str =
    "id, name, url, user_id, last_fetched_at, last_succeeded_at, created_at, updated_at";

/// Row type for feeds from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    name: String,
    url: String,
    user_id: i64,
    last_fetched_at: Option<String>,
    last_succeeded_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            name: row.name,
            url: row.url,
            user_id: row.user_id,
            last_fetched_at: row.last_fetched_at.and_then(|s| from_storage(&s)),
            last_succeeded_at: row.last_succeeded_at.and_then(|s| from_storage(&s)),
            created_at: from_storage(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: from_storage(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for feed listings with the owner name.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedWithOwnerRow {
    #[sqlx(flatten)]
    feed: FeedRow,
    owner_name: String,
}

/// Row type for posts from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: i64,
    feed_id: i64,
    title: String,
    url: String,
    description: Option<String>,
    published_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            feed_id: row.feed_id,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: row.published_at.and_then(|s| from_storage(&s)),
            created_at: from_storage(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: from_storage(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for posts joined with their feed name.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostWithFeedRow {
    #[sqlx(flatten)]
    post: PostRow,
    feed_name: String,
}

/// Row type for follows joined with user and feed names.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedFollowRow {
    id: i64,
    user_id: i64,
    feed_id: i64,
    user_name: String,
    feed_name: String,
    created_at: String,
}

impl From<FeedFollowRow> for FeedFollow {
    fn from(row: FeedFollowRow) -> Self {
        FeedFollow {
            id: row.id,
            user_id: row.user_id,
            feed_id: row.feed_id,
            user_name: row.user_name,
            feed_name: row.feed_name,
            created_at: from_storage(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for feed operations.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new feed.
    ///
    /// Returns a validation error if the URL is already registered.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let now = to_storage(&Utc::now());
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(feed.user_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::Validation(format!("feed {} already exists", feed.url))
            } else {
                GatorError::Database(e.to_string())
            }
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed".into()))
    }

    /// Create a feed and make its owner follow it.
    ///
    /// Both rows are written in one transaction: if either insert fails,
    /// neither is stored.
    pub async fn create_followed(&self, feed: &NewFeed) -> Result<(Feed, FeedFollow)> {
        let now = to_storage(&Utc::now());
        let mut tx = self.pool.begin().await?;

        let feed_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(feed.user_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::Validation(format!("feed {} already exists", feed.url))
            } else {
                GatorError::Database(e.to_string())
            }
        })?;

        let follow_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(feed.user_id)
        .bind(feed_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let created = self
            .get_by_id(feed_id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed".into()))?;
        let follow = FeedFollowRepository::new(self.pool)
            .get_by_id(follow_id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed follow".into()))?;

        Ok((created, follow))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// Get a feed by URL, failing with `NotFound` if it isn't registered.
    pub async fn require_by_url(&self, url: &str) -> Result<Feed> {
        self.get_by_url(url)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("feed {url}")))
    }

    /// List all feeds with their owner names (ordered by registration order).
    pub async fn list_with_owner(&self) -> Result<Vec<FeedWithOwner>> {
        let rows = sqlx::query_as::<_, FeedWithOwnerRow>(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.last_fetched_at, f.last_succeeded_at,
                   f.created_at, f.updated_at, u.name AS owner_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| FeedWithOwner {
                feed: Feed::from(row.feed),
                owner_name: row.owner_name,
            })
            .collect())
    }

    /// Select the feed most overdue for polling and mark it fetched at `now`.
    ///
    /// Never-polled feeds come first, then the least recently polled; ties
    /// go to the oldest registration. Selection and marking happen in one
    /// statement.
    pub async fn select_next(&self, scope: FeedScope, now: DateTime<Utc>) -> Result<Option<Feed>> {
        let now = to_storage(&now);
        let row = match scope {
            FeedScope::All => {
                let query = format!(
                    r#"
                    UPDATE feeds
                    SET last_fetched_at = $1, updated_at = $2
                    WHERE id = (
                        SELECT id FROM feeds
                        ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
                        LIMIT 1
                    )
                    RETURNING {FEED_COLUMNS}
                    "#
                );
                sqlx::query_as::<_, FeedRow>(&query)
                    .bind(&now)
                    .bind(&now)
                    .fetch_optional(self.pool)
                    .await?
            }
            FeedScope::FollowedBy(user_id) => {
                let query = format!(
                    r#"
                    UPDATE feeds
                    SET last_fetched_at = $1, updated_at = $2
                    WHERE id = (
                        SELECT f.id FROM feeds f
                        JOIN feed_follows ff ON ff.feed_id = f.id
                        WHERE ff.user_id = $3
                        ORDER BY f.last_fetched_at ASC NULLS FIRST, f.id ASC
                        LIMIT 1
                    )
                    RETURNING {FEED_COLUMNS}
                    "#
                );
                sqlx::query_as::<_, FeedRow>(&query)
                    .bind(&now)
                    .bind(&now)
                    .bind(user_id)
                    .fetch_optional(self.pool)
                    .await?
            }
        };

        Ok(row.map(Feed::from))
    }

    /// Record a successful fetch.
    pub async fn mark_succeeded(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let at = to_storage(&at);
        let result = sqlx::query(
            "UPDATE feeds SET last_succeeded_at = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(&at)
        .bind(&at)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all feeds.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds")
            .fetch_one(self.pool)
            .await?;

        Ok(count.0)
    }
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a post.
    ///
    /// A post whose URL is already stored yields `InsertOutcome::Duplicate`;
    /// every other failure is an error.
    pub async fn insert(&self, post: &NewPost) -> Result<InsertOutcome> {
        let now = to_storage(&Utc::now());
        let published_at = post.published_at.as_ref().map(to_storage);

        let result = sqlx::query(
            r#"
            INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(post.feed_id)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(&published_at)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await;

        match result {
            Ok(done) => Ok(InsertOutcome::Created(done.last_insert_rowid())),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(GatorError::Database(e.to_string())),
        }
    }

    /// Get a post by origin URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            WHERE url = $1
            "#,
        )
        .bind(url)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    /// List the newest posts from the feeds a user follows.
    pub async fn list_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<PostWithFeed>> {
        let rows = sqlx::query_as::<_, PostWithFeedRow>(
            r#"
            SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at,
                   p.created_at, p.updated_at, f.name AS feed_name
            FROM posts p
            JOIN feeds f ON f.id = p.feed_id
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = $1
            ORDER BY COALESCE(p.published_at, p.created_at) DESC, p.id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PostWithFeed {
                post: Post::from(row.post),
                feed_name: row.feed_name,
            })
            .collect())
    }

    /// Count posts of a feed.
    pub async fn count_by_feed(&self, feed_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE feed_id = $1")
            .bind(feed_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count.0)
    }
}

/// Repository for follow relationships.
pub struct FeedFollowRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedFollowRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Make a user follow a feed.
    pub async fn create(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let now = to_storage(&Utc::now());
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::Validation("feed is already followed".to_string())
            } else {
                GatorError::Database(e.to_string())
            }
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed follow".into()))
    }

    /// Get a follow by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FeedFollow>> {
        let row = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, u.name AS user_name, f.name AS feed_name,
                   ff.created_at
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(FeedFollow::from))
    }

    /// List the follows of a user.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>> {
        let rows = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, u.name AS user_name, f.name AS feed_name,
                   ff.created_at
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = $1
            ORDER BY ff.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FeedFollow::from).collect())
    }

    /// Remove a follow. Returns false if the user didn't follow the feed.
    pub async fn delete(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = $1 AND feed_id = $2")
            .bind(user_id)
            .bind(feed_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
