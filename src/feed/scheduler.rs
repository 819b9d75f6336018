//! Feed aggregation scheduler.
//!
//! Each tick polls exactly one feed: the one most overdue within the
//! configured scope. Cycles run one after another and never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::fetcher::FetchFeed;
use super::normalize::normalize_channel;
use super::persister::{persist_items, PersistSummary};
use super::store::{Clock, FeedStore, PostStore, SystemClock};
use super::types::FeedScope;
use crate::db::Database;
use crate::{GatorError, Result};

/// Collaborators used by the scheduler.
#[derive(Clone)]
pub struct SchedulerDeps {
    /// Feed selection and bookkeeping.
    pub feeds: Arc<dyn FeedStore>,
    /// Post insertion.
    pub posts: Arc<dyn PostStore>,
    /// Remote document retrieval.
    pub fetcher: Arc<dyn FetchFeed>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl SchedulerDeps {
    /// Dependencies backed by `db` for storage and the system clock.
    pub fn from_database(db: Database, fetcher: Arc<dyn FetchFeed>) -> Self {
        let db = Arc::new(db);
        Self {
            feeds: db.clone(),
            posts: db,
            fetcher,
            clock: Arc::new(SystemClock),
        }
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No feed was eligible.
    NoFeed,
    /// Selecting the next feed failed.
    SelectFailed,
    /// The selected feed could not be fetched or decoded.
    FetchFailed {
        /// The feed that was attempted.
        feed_id: i64,
    },
    /// The feed was fetched and its items persisted.
    Ingested {
        /// The feed that was ingested.
        feed_id: i64,
        /// Per-item results.
        summary: PersistSummary,
    },
}

/// Periodic feed aggregator.
pub struct Scheduler {
    deps: SchedulerDeps,
    interval: Duration,
    scope: FeedScope,
}

impl Scheduler {
    /// Create a scheduler polling one feed every `interval`.
    ///
    /// A zero interval is rejected.
    pub fn new(deps: SchedulerDeps, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(GatorError::Config(
                "aggregation interval must be positive".to_string(),
            ));
        }

        Ok(Self {
            deps,
            interval,
            scope: FeedScope::All,
        })
    }

    /// Restrict polling to `scope`.
    pub fn with_scope(mut self, scope: FeedScope) -> Self {
        self.scope = scope;
        self
    }

    /// Time between cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Feeds this scheduler may poll.
    pub fn scope(&self) -> FeedScope {
        self.scope
    }

    /// Run cycles until `cancel` is triggered.
    ///
    /// The first cycle starts immediately. A failing cycle is logged and
    /// the loop continues with the next tick.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "Aggregator started (interval: {:?}, scope: {:?})",
            self.interval, self.scope
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Aggregator stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle(&cancel).await;
                }
            }
        }
    }

    /// Select, fetch and persist one feed.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleOutcome {
        let now = self.deps.clock.now();

        let feed = match self.deps.feeds.select_next_feed(self.scope, now).await {
            Ok(Some(feed)) => feed,
            Ok(None) => {
                debug!("No feeds to fetch");
                return CycleOutcome::NoFeed;
            }
            Err(e) => {
                error!("Failed to select next feed: {}", e);
                return CycleOutcome::SelectFailed;
            }
        };

        info!("Fetching feed {} ({}) from {}", feed.id, feed.name, feed.url);

        let channel = match self.deps.fetcher.fetch(&feed.url, cancel).await {
            Ok(channel) => channel,
            Err(e) => {
                warn!("Failed to fetch feed {}: {}", feed.id, e);
                return CycleOutcome::FetchFailed { feed_id: feed.id };
            }
        };

        let channel = normalize_channel(channel);
        debug!(
            "Feed {} returned {} item(s): {}",
            feed.id,
            channel.items.len(),
            channel.title
        );

        let summary = persist_items(self.deps.posts.as_ref(), feed.id, channel.items).await;

        if let Err(e) = self
            .deps
            .feeds
            .mark_fetch_succeeded(feed.id, self.deps.clock.now())
            .await
        {
            error!("Failed to record successful fetch for feed {}: {}", feed.id, e);
        }

        if summary.created > 0 {
            info!(
                "Feed {} updated: {} new post(s), {} already stored",
                feed.id, summary.created, summary.duplicates
            );
        } else {
            debug!("Feed {} updated: no new posts", feed.id);
        }
        if summary.failed > 0 {
            warn!("Feed {}: {} post(s) failed to store", feed.id, summary.failed);
        }

        CycleOutcome::Ingested {
            feed_id: feed.id,
            summary,
        }
    }
}
