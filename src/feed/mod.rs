//! Feed aggregation for gator.
//!
//! This module provides:
//! - Feed, post and follow storage
//! - Fetching and decoding remote RSS documents
//! - Text and date normalization of decoded items
//! - The periodic scheduler that ties these together
//!
//! # Pipeline
//!
//! Every scheduler tick selects the feed that has gone longest without a
//! poll, marks it as fetched, downloads and decodes it, then stores each
//! item as a post. Posts are deduplicated by their origin URL, so
//! re-fetching a feed never creates duplicates.

pub mod fetcher;
pub mod normalize;
pub mod persister;
pub mod repository;
pub mod scheduler;
pub mod store;
pub mod types;

pub use fetcher::{parse_channel, FetchFeed, HttpFetcher};
pub use normalize::{decode_entities, normalize_channel, normalize_item, parse_pub_date};
pub use persister::{persist_items, PersistSummary};
pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use scheduler::{CycleOutcome, Scheduler, SchedulerDeps};
pub use store::{Clock, FeedStore, PostStore, SystemClock};
pub use types::{
    Feed, FeedFollow, FeedScope, FeedWithOwner, InsertOutcome, NewFeed, NewPost,
    NormalizedChannel, NormalizedItem, ParsedChannel, ParsedItem, Post, PostWithFeed,
};
