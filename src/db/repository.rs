//! User repository for gator.
//!
//! This module provides CRUD operations for users in the database.

use chrono::Utc;

use super::user::User;
use super::DbPool;
use crate::datetime::{from_storage, to_storage};
use crate::error::is_unique_violation;
use crate::{GatorError, Result};

/// Row type for users from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    created_at: String,
    updated_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            created_at: from_storage(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: from_storage(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    ///
    /// Returns a validation error if the name is empty or already taken.
    pub async fn create(&self, name: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GatorError::Validation("user name is empty".to_string()));
        }

        let now = to_storage(&Utc::now());
        let result = sqlx::query("INSERT INTO users (name, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(&now)
            .bind(&now)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    GatorError::Validation(format!("user {name} already exists"))
                } else {
                    GatorError::Database(e.to_string())
                }
            })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| GatorError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Get a user by name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Get a user by name, failing with `NotFound` if it doesn't exist.
    pub async fn require_by_name(&self, name: &str) -> Result<User> {
        self.get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {name}")))
    }

    /// List all users ordered by name.
    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY name ASC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Delete every user. Feeds, follows and posts cascade.
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users").execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let user = repo.create("kahya").await.unwrap();
        assert!(user.id > 0);
        assert_eq!(user.name, "kahya");

        let by_id = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id, user);

        let by_name = repo.get_by_name("kahya").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(repo.get_by_name("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_user() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        repo.create("kahya").await.unwrap();
        let err = repo.create("kahya").await.unwrap_err();
        assert!(matches!(err, GatorError::Validation(_)));
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_create_empty_name() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        assert!(matches!(
            repo.create("   ").await,
            Err(GatorError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_require_by_name() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        assert!(matches!(
            repo.require_by_name("ghost").await,
            Err(GatorError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_and_delete_all() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        repo.create("zed").await.unwrap();
        repo.create("amy").await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["amy".to_string(), "zed".to_string()]);

        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert!(repo.list().await.unwrap().is_empty());
    }
}
