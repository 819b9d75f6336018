//! User model for gator.

use chrono::{DateTime, Utc};

/// A registered user.
///
/// Users own the feeds they add and follow any number of feeds.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// User ID.
    pub id: i64,
    /// Unique user name.
    pub name: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
