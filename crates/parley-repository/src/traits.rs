//! Repository traits and write-model types.

use async_trait::async_trait;
use parley_core::{ParleyResult, User};

/// Fields required to insert a new user. The password is already hashed
/// by the time it reaches the repository.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Partial update: only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    /// Whether any identifying field (email or username) is being changed.
    #[must_use]
    pub fn touches_identity(&self) -> bool {
        self.email.is_some() || self.username.is_some()
    }
}

/// Persistence operations for user records.
///
/// The repository owns storage access and nothing else; uniqueness
/// messaging and password hashing live in the service layer.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by primary key.
    async fn find_by_id(&self, id: i32) -> ParleyResult<Option<User>>;

    /// Finds a user by email.
    async fn find_by_email(&self, email: &str) -> ParleyResult<Option<User>>;

    /// Finds a user by username.
    async fn find_by_username(&self, username: &str) -> ParleyResult<Option<User>>;

    /// Finds a user whose email or username equals `identifier`.
    async fn find_by_email_or_username(&self, identifier: &str) -> ParleyResult<Option<User>>;

    /// Uniqueness probe: finds a record matching any of the provided
    /// fields, optionally excluding a record's own id. Returns at most
    /// one record.
    async fn find_collision(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        exclude_id: Option<i32>,
    ) -> ParleyResult<Option<User>>;

    /// Returns every user record in natural storage order.
    async fn find_all(&self) -> ParleyResult<Vec<User>>;

    /// Inserts a new user and returns the stored record with its
    /// generated id.
    async fn insert(&self, user: &NewUser) -> ParleyResult<User>;

    /// Applies a partial update and returns the updated record.
    async fn update(&self, id: i32, changes: &UserChanges) -> ParleyResult<User>;

    /// Hard-deletes a user. Returns `true` if a row was removed.
    async fn delete(&self, id: i32) -> ParleyResult<bool>;

    /// Total number of user records.
    async fn count(&self) -> ParleyResult<u64>;
}
