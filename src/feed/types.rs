//! Feed and post types for gator.

use chrono::{DateTime, Utc};

/// A registered feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Feed URL (unique across all feeds).
    pub url: String,
    /// User who registered the feed.
    pub user_id: i64,
    /// Last poll attempt. `None` means never polled.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Last poll whose fetch and decode succeeded.
    pub last_succeeded_at: Option<DateTime<Utc>>,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Owning user ID.
    pub user_id: i64,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: i64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// Feed together with its owner's name, for listings.
#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    /// The feed.
    pub feed: Feed,
    /// Name of the user who registered it.
    pub owner_name: String,
}

/// Which feeds the selector may choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedScope {
    /// Every registered feed.
    #[default]
    All,
    /// Only feeds followed by the given user.
    FollowedBy(i64),
}

/// A stored post.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Post ID.
    pub id: i64,
    /// Feed this post was ingested from.
    pub feed_id: i64,
    /// Post title.
    pub title: String,
    /// Origin URL (unique across all posts).
    pub url: String,
    /// Post description.
    pub description: Option<String>,
    /// When the post was published, if the source date could be parsed.
    pub published_at: Option<DateTime<Utc>>,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// When the post was last updated.
    pub updated_at: DateTime<Utc>,
}

/// New post for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    /// Parent feed ID.
    pub feed_id: i64,
    /// Post title.
    pub title: String,
    /// Origin URL; the deduplication key.
    pub url: String,
    /// Post description.
    pub description: Option<String>,
    /// Publish instant.
    pub published_at: Option<DateTime<Utc>>,
}

impl NewPost {
    /// Create a new post.
    pub fn new(feed_id: i64, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            feed_id,
            title: title.into(),
            url: url.into(),
            description: None,
            published_at: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the published date.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// Result of a post insertion that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new post was stored with this ID.
    Created(i64),
    /// A post with the same origin URL already exists.
    Duplicate,
}

/// Post joined with its feed name, for browsing.
#[derive(Debug, Clone)]
pub struct PostWithFeed {
    /// The post.
    pub post: Post,
    /// Name of the feed the post came from.
    pub feed_name: String,
}

/// A follow relationship between a user and a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: i64,
    /// Following user.
    pub user_id: i64,
    /// Followed feed.
    pub feed_id: i64,
    /// Name of the following user.
    pub user_name: String,
    /// Name of the followed feed.
    pub feed_name: String,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
}

/// Channel decoded from a remote RSS document, before normalization.
#[derive(Debug, Clone, Default)]
pub struct ParsedChannel {
    /// Channel title.
    pub title: String,
    /// Channel link.
    pub link: String,
    /// Channel description.
    pub description: String,
    /// Items in document order.
    pub items: Vec<ParsedItem>,
}

/// Item decoded from a remote RSS document, before normalization.
#[derive(Debug, Clone, Default)]
pub struct ParsedItem {
    /// Item title.
    pub title: String,
    /// Item link (origin URL).
    pub link: Option<String>,
    /// Item description.
    pub description: Option<String>,
    /// Raw `pubDate` text.
    pub pub_date: Option<String>,
}

/// Channel with decoded text fields.
#[derive(Debug, Clone, Default)]
pub struct NormalizedChannel {
    /// Channel title.
    pub title: String,
    /// Channel link.
    pub link: String,
    /// Channel description.
    pub description: String,
    /// Items in document order.
    pub items: Vec<NormalizedItem>,
}

/// Item ready to be persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedItem {
    /// Item title.
    pub title: String,
    /// Item link (origin URL).
    pub link: Option<String>,
    /// Item description.
    pub description: Option<String>,
    /// Parsed publish instant.
    pub published_at: Option<DateTime<Utc>>,
}
