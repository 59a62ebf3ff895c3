//! Postgres user repository implementation.

use crate::{DatabasePool, NewUser, UserChanges, UserRepository};
use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult, User};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::sync::Arc;
use tracing::debug;

/// Postgres user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Arc<DatabasePool>,
}

impl PgUserRepository {
    /// Creates a new Postgres user repository.
    #[must_use]
    pub fn new(pool: Arc<DatabasePool>) -> Self {
        Self { pool }
    }
}

/// Database row representation of a user.
#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    password_hash: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i32) -> ParleyResult<Option<User>> {
        debug!("Finding user by id: {}", id);

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> ParleyResult<Option<User>> {
        debug!("Finding user by email: {}", email);

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> ParleyResult<Option<User>> {
        debug!("Finding user by username: {}", username);

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_email_or_username(&self, identifier: &str) -> ParleyResult<Option<User>> {
        debug!("Finding user by email or username: {}", identifier);

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash
            FROM users
            WHERE email = $1 OR username = $1
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_collision(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        exclude_id: Option<i32>,
    ) -> ParleyResult<Option<User>> {
        if email.is_none() && username.is_none() {
            return Ok(None);
        }

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT id, username, email, password_hash FROM users WHERE (",
        );

        let mut separated = false;
        if let Some(email) = email {
            query.push("email = ").push_bind(email);
            separated = true;
        }
        if let Some(username) = username {
            if separated {
                query.push(" OR ");
            }
            query.push("username = ").push_bind(username);
        }
        query.push(")");

        if let Some(id) = exclude_id {
            query.push(" AND id <> ").push_bind(id);
        }

        query.push(" LIMIT 1");

        let row = query
            .build_query_as::<UserRow>()
            .fetch_optional(self.pool.inner())
            .await?;

        Ok(row.map(User::from))
    }

    async fn find_all(&self) -> ParleyResult<Vec<User>> {
        debug!("Finding all users");

        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash FROM users",
        )
        .fetch_all(self.pool.inner())
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn insert(&self, user: &NewUser) -> ParleyResult<User> {
        debug!("Inserting new user: {}", user.username);

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(self.pool.inner())
        .await?;

        Ok(User::from(row))
    }

    async fn update(&self, id: i32, changes: &UserChanges) -> ParleyResult<User> {
        debug!("Updating user: {}", id);

        // COALESCE keeps columns whose change is absent untouched.
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET username = COALESCE($1, username),
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash)
            WHERE id = $4
            RETURNING id, username, email, password_hash
            "#,
        )
        .bind(changes.username.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.password_hash.as_deref())
        .bind(id)
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(User::from)
            .ok_or_else(|| ParleyError::not_found("User", id))
    }

    async fn delete(&self, id: i32) -> ParleyResult<bool> {
        debug!("Deleting user: {}", id);

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> ParleyResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool.inner())
            .await?;

        Ok(count as u64)
    }
}

impl std::fmt::Debug for PgUserRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgUserRepository").finish_non_exhaustive()
    }
}
