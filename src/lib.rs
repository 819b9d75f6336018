//! gator - RSS feed aggregator
//!
//! Periodically polls registered RSS feeds, one feed per tick, and stores
//! their items as deduplicated posts in SQLite.

pub mod cli;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;

pub use config::Config;
pub use db::{Database, User, UserRepository};
pub use error::{GatorError, Result};
pub use feed::{
    CycleOutcome, FeedScope, FetchFeed, HttpFetcher, InsertOutcome, PersistSummary, Scheduler,
    SchedulerDeps,
};
