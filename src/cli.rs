//! Command-line interface for gator.
//!
//! Every command writes its human-readable output to the given writer so
//! handlers can be exercised without a terminal.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::db::{Database, UserRepository};
use crate::feed::{
    FeedFollowRepository, FeedRepository, FeedScope, HttpFetcher, NewFeed, PostRepository,
    Scheduler, SchedulerDeps,
};
use crate::{Config, GatorError, Result};

/// Default number of posts shown by `browse`.
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

/// gator: RSS feed aggregator
#[derive(Parser, Debug)]
#[command(name = "gator", version)]
#[command(about = "Collect RSS feeds into a local database and browse their posts", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, short, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Register a new user and log in as them
    Register {
        /// User name
        name: String,
    },

    /// Set the current user used when `--user` is omitted
    Login {
        /// User name
        name: String,
    },

    /// List all users
    Users,

    /// Delete all users together with their feeds, follows and posts
    Reset,

    /// Add a feed and follow it
    Addfeed {
        /// Display name of the feed
        name: String,
        /// Feed URL
        url: String,
        /// User who registers the feed (defaults to the current user)
        #[arg(long, short)]
        user: Option<String>,
    },

    /// List all feeds
    Feeds,

    /// Follow an existing feed
    Follow {
        /// Feed URL
        url: String,
        /// Following user (defaults to the current user)
        #[arg(long, short)]
        user: Option<String>,
    },

    /// List the feeds a user follows
    Following {
        /// User name (defaults to the current user)
        #[arg(long, short)]
        user: Option<String>,
    },

    /// Stop following a feed
    Unfollow {
        /// Feed URL
        url: String,
        /// User name (defaults to the current user)
        #[arg(long, short)]
        user: Option<String>,
    },

    /// Show the newest posts from the feeds a user follows
    Browse {
        /// User name (defaults to the current user)
        #[arg(long, short)]
        user: Option<String>,
        /// Maximum number of posts to show
        #[arg(long, short, default_value_t = DEFAULT_BROWSE_LIMIT)]
        limit: i64,
    },

    /// Poll feeds until interrupted, one feed per interval
    Agg {
        /// Time between polls (e.g. 30s, 5m, 1h30m); overrides the config
        #[arg(long, value_parser = parse_duration)]
        interval: Option<Duration>,
        /// Only poll the feeds this user follows; overrides the config
        #[arg(long)]
        user: Option<String>,
    },
}

/// Parse a duration such as `250ms`, `30s`, `5m`, `1h` or `1h30m`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let invalid = || format!("invalid duration: {s}");
    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let part = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.checked_mul(60).ok_or_else(invalid)?),
            "h" => Duration::from_secs(value.checked_mul(3600).ok_or_else(invalid)?),
            "" => return Err(format!("missing unit in duration: {s}")),
            other => return Err(format!("unknown unit '{other}' in duration: {s}")),
        };
        total = total.checked_add(part).ok_or_else(invalid)?;
    }

    Ok(total)
}

/// Run a command against an open database.
///
/// `config_path` is where `login` persists the current user. `cancel` only
/// matters for `agg`, which runs until it is triggered.
pub async fn execute(
    command: Commands,
    config: &Config,
    config_path: &Path,
    db: &Database,
    cancel: CancellationToken,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Commands::Register { name } => {
            register(db, &name, out).await?;
            login(db, config_path, &name, out).await
        }
        Commands::Login { name } => login(db, config_path, &name, out).await,
        Commands::Users => users(db, config.session.current_user.as_deref(), out).await,
        Commands::Reset => reset(db, out).await,
        Commands::Addfeed { name, url, user } => {
            add_feed(db, &resolve_user(user, config)?, &name, &url, out).await
        }
        Commands::Feeds => feeds(db, out).await,
        Commands::Follow { url, user } => follow(db, &resolve_user(user, config)?, &url, out).await,
        Commands::Following { user } => following(db, &resolve_user(user, config)?, out).await,
        Commands::Unfollow { url, user } => {
            unfollow(db, &resolve_user(user, config)?, &url, out).await
        }
        Commands::Browse { user, limit } => {
            browse(db, &resolve_user(user, config)?, limit, out).await
        }
        Commands::Agg { interval, user } => aggregate(config, db, interval, user, cancel, out).await,
    }
}

/// The user a command acts as: the explicit one, else the logged-in one.
pub fn resolve_user(explicit: Option<String>, config: &Config) -> Result<String> {
    explicit
        .or_else(|| config.session.current_user.clone())
        .ok_or_else(|| {
            GatorError::Validation(
                "no user given and nobody is logged in (run `gator login <name>`)".to_string(),
            )
        })
}

/// Register a new user.
pub async fn register(db: &Database, name: &str, out: &mut dyn Write) -> Result<()> {
    let user = UserRepository::new(db.pool()).create(name).await?;
    info!("Registered user {} (id {})", user.name, user.id);
    writeln!(out, "User {} created", user.name)?;
    Ok(())
}

/// Make `name` the current user, persisting it in the config file.
pub async fn login(
    db: &Database,
    config_path: &Path,
    name: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let user = UserRepository::new(db.pool()).require_by_name(name).await?;
    Config::save_current_user(config_path, &user.name)?;
    info!("Current user set to {}", user.name);
    writeln!(out, "Logged in as {}", user.name)?;
    Ok(())
}

/// List all users, marking the current one.
pub async fn users(db: &Database, current: Option<&str>, out: &mut dyn Write) -> Result<()> {
    for user in UserRepository::new(db.pool()).list().await? {
        if current == Some(user.name.as_str()) {
            writeln!(out, "* {} (current)", user.name)?;
        } else {
            writeln!(out, "* {}", user.name)?;
        }
    }
    Ok(())
}

/// Delete all users.
pub async fn reset(db: &Database, out: &mut dyn Write) -> Result<()> {
    let deleted = UserRepository::new(db.pool()).delete_all().await?;
    info!("Deleted {} user(s)", deleted);
    writeln!(out, "Deleted {} user(s)", deleted)?;
    Ok(())
}

/// Register a feed for `user_name` and make them follow it.
pub async fn add_feed(
    db: &Database,
    user_name: &str,
    name: &str,
    url: &str,
    out: &mut dyn Write,
) -> Result<()> {
    crate::feed::fetcher::validate_url(url)
        .map_err(|e| GatorError::Validation(format!("cannot add feed: {e}")))?;
    if name.trim().is_empty() {
        return Err(GatorError::Validation("feed name is empty".to_string()));
    }

    let user = UserRepository::new(db.pool())
        .require_by_name(user_name)
        .await?;
    let (feed, follow) = FeedRepository::new(db.pool())
        .create_followed(&NewFeed::new(name, url, user.id))
        .await?;

    info!("Added feed {} ({}) for {}", feed.id, feed.url, user.name);
    writeln!(out, "Feed {} added: {}", feed.name, feed.url)?;
    writeln!(
        out,
        "User {} is now following feed {}",
        follow.user_name, follow.feed_name
    )?;
    Ok(())
}

/// List all feeds with their owners.
pub async fn feeds(db: &Database, out: &mut dyn Write) -> Result<()> {
    for entry in FeedRepository::new(db.pool()).list_with_owner().await? {
        writeln!(
            out,
            " - {} | {} | User: {}",
            entry.feed.name, entry.feed.url, entry.owner_name
        )?;
    }
    Ok(())
}

/// Follow an already registered feed.
pub async fn follow(db: &Database, user_name: &str, url: &str, out: &mut dyn Write) -> Result<()> {
    let user = UserRepository::new(db.pool())
        .require_by_name(user_name)
        .await?;
    let feed = FeedRepository::new(db.pool()).require_by_url(url).await?;
    let follow = FeedFollowRepository::new(db.pool())
        .create(user.id, feed.id)
        .await?;

    writeln!(
        out,
        "User {} is now following feed {}",
        follow.user_name, follow.feed_name
    )?;
    Ok(())
}

/// List the feeds a user follows.
pub async fn following(db: &Database, user_name: &str, out: &mut dyn Write) -> Result<()> {
    let user = UserRepository::new(db.pool())
        .require_by_name(user_name)
        .await?;
    for follow in FeedFollowRepository::new(db.pool())
        .list_for_user(user.id)
        .await?
    {
        writeln!(out, "* {}", follow.feed_name)?;
    }
    Ok(())
}

/// Stop following a feed.
pub async fn unfollow(
    db: &Database,
    user_name: &str,
    url: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let user = UserRepository::new(db.pool())
        .require_by_name(user_name)
        .await?;
    let feed = FeedRepository::new(db.pool()).require_by_url(url).await?;

    let removed = FeedFollowRepository::new(db.pool())
        .delete(user.id, feed.id)
        .await?;
    if !removed {
        return Err(GatorError::NotFound(format!(
            "follow of {} by {}",
            feed.url, user.name
        )));
    }

    writeln!(out, "User {} unfollowed feed {}", user.name, feed.name)?;
    Ok(())
}

/// Show the newest posts from the feeds a user follows.
pub async fn browse(db: &Database, user_name: &str, limit: i64, out: &mut dyn Write) -> Result<()> {
    if limit <= 0 {
        return Err(GatorError::Validation(format!(
            "limit must be positive, got {limit}"
        )));
    }

    let user = UserRepository::new(db.pool())
        .require_by_name(user_name)
        .await?;
    let posts = PostRepository::new(db.pool())
        .list_for_user(user.id, limit)
        .await?;

    for (i, entry) in posts.iter().enumerate() {
        let post = &entry.post;
        writeln!(out, "{}. {} ({})", i + 1, post.title, entry.feed_name)?;
        if let Some(description) = &post.description {
            writeln!(out, "   {}", description)?;
        }
        writeln!(out, "   {}", post.url)?;
        if let Some(published_at) = post.published_at {
            writeln!(
                out,
                "   Published: {}",
                published_at.format("%Y-%m-%d %H:%M UTC")
            )?;
        }
    }
    Ok(())
}

/// Run the aggregator until `cancel` is triggered.
pub async fn aggregate(
    config: &Config,
    db: &Database,
    interval: Option<Duration>,
    user: Option<String>,
    cancel: CancellationToken,
    out: &mut dyn Write,
) -> Result<()> {
    let interval = match interval {
        Some(interval) => interval,
        None => config.aggregator.interval()?,
    };

    let scope = match user.or_else(|| config.aggregator.scope_user.clone()) {
        Some(name) => {
            let user = UserRepository::new(db.pool()).require_by_name(&name).await?;
            FeedScope::FollowedBy(user.id)
        }
        None => FeedScope::All,
    };

    let fetcher = HttpFetcher::new(&config.fetcher)?;
    let deps = SchedulerDeps::from_database(db.clone(), Arc::new(fetcher));
    let scheduler = Scheduler::new(deps, interval)?.with_scope(scope);

    writeln!(out, "Collecting feeds every {:?}", scheduler.interval())?;
    out.flush()?;

    scheduler.run(cancel).await;
    Ok(())
}
