//! User record store: CRUD with uniqueness enforcement and password
//! hashing.

use crate::dto::{CreateUserRequest, UpdateUserRequest, UserResponse};
use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult, ValidateExt};
use parley_repository::{NewUser, UserChanges, UserRepository};
use parley_security::PasswordHasher;
use std::sync::Arc;
use tracing::{debug, info};

const EMAIL_CONFLICT: &str = "User with this email already exists";
const USERNAME_CONFLICT: &str = "User with this username already exists";

/// User lifecycle operations.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Validates, checks uniqueness, hashes the password, and persists a
    /// new user.
    async fn create(&self, request: CreateUserRequest) -> ParleyResult<UserResponse>;

    /// Returns every user, unfiltered.
    async fn find_all(&self) -> ParleyResult<Vec<UserResponse>>;

    /// Finds a user by id, or fails with `NotFound`.
    async fn find_by_id(&self, id: i32) -> ParleyResult<UserResponse>;

    /// Finds a user by email, or fails with `NotFound`.
    async fn find_by_email(&self, email: &str) -> ParleyResult<UserResponse>;

    /// Finds a user by username, or fails with `NotFound`.
    async fn find_by_username(&self, username: &str) -> ParleyResult<UserResponse>;

    /// Finds a user by email or username; absence is not an error.
    async fn find_by_email_or_username(
        &self,
        identifier: &str,
    ) -> ParleyResult<Option<UserResponse>>;

    /// Applies a partial update. Changed identity fields are re-probed
    /// for collisions; a changed password is re-hashed.
    async fn update(&self, id: i32, request: UpdateUserRequest) -> ParleyResult<UserResponse>;

    /// Hard-deletes a user, or fails with `NotFound`.
    async fn delete(&self, id: i32) -> ParleyResult<()>;

    /// Compares a plaintext password against a stored hash. Never
    /// errors; a malformed hash compares unequal.
    fn verify_password(&self, plain: &str, hash: &str) -> bool;

    /// Total number of users.
    async fn count(&self) -> ParleyResult<u64>;

    /// Whether a user with this id exists. `NotFound` maps to `false`;
    /// any other failure propagates.
    async fn exists(&self, id: i32) -> ParleyResult<bool>;
}

/// Default [`UserService`] implementation over a [`UserRepository`].
pub struct UserServiceImpl<R: UserRepository> {
    repository: Arc<R>,
    hasher: Arc<PasswordHasher>,
}

impl<R: UserRepository> UserServiceImpl<R> {
    /// Creates a new user service.
    pub fn new(repository: Arc<R>, hasher: Arc<PasswordHasher>) -> Self {
        Self { repository, hasher }
    }
}

#[async_trait]
impl<R: UserRepository + 'static> UserService for UserServiceImpl<R> {
    async fn create(&self, request: CreateUserRequest) -> ParleyResult<UserResponse> {
        debug!("Creating user: {}", request.username);

        request.validate_request()?;

        // Explicit pre-check so the error can name the colliding field;
        // email takes precedence when both collide in the same probe.
        if let Some(existing) = self
            .repository
            .find_collision(Some(&request.email), Some(&request.username), None)
            .await?
        {
            if existing.email == request.email {
                return Err(ParleyError::conflict(EMAIL_CONFLICT));
            }
            return Err(ParleyError::conflict(USERNAME_CONFLICT));
        }

        let password_hash = self.hasher.hash(&request.password)?;

        let user = self
            .repository
            .insert(&NewUser {
                username: request.username,
                email: request.email,
                password_hash,
            })
            .await?;

        info!("User created: {}", user.id);
        Ok(UserResponse::from(user))
    }

    async fn find_all(&self) -> ParleyResult<Vec<UserResponse>> {
        debug!("Listing users");

        let users = self.repository.find_all().await?;
        Ok(users.iter().map(UserResponse::from).collect())
    }

    async fn find_by_id(&self, id: i32) -> ParleyResult<UserResponse> {
        debug!("Getting user: {}", id);

        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ParleyError::not_found("User", id))?;

        Ok(UserResponse::from(user))
    }

    async fn find_by_email(&self, email: &str) -> ParleyResult<UserResponse> {
        debug!("Getting user by email: {}", email);

        let user = self
            .repository
            .find_by_email(email)
            .await?
            .ok_or_else(|| ParleyError::not_found("User", email))?;

        Ok(UserResponse::from(user))
    }

    async fn find_by_username(&self, username: &str) -> ParleyResult<UserResponse> {
        debug!("Getting user by username: {}", username);

        let user = self
            .repository
            .find_by_username(username)
            .await?
            .ok_or_else(|| ParleyError::not_found("User", username))?;

        Ok(UserResponse::from(user))
    }

    async fn find_by_email_or_username(
        &self,
        identifier: &str,
    ) -> ParleyResult<Option<UserResponse>> {
        debug!("Getting user by email or username: {}", identifier);

        let user = self.repository.find_by_email_or_username(identifier).await?;
        Ok(user.map(UserResponse::from))
    }

    async fn update(&self, id: i32, request: UpdateUserRequest) -> ParleyResult<UserResponse> {
        debug!("Updating user: {}", id);

        request.validate_request()?;

        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ParleyError::not_found("User", id))?;

        // Re-probe only the identity fields being changed, excluding the
        // record's own row.
        if request.email.is_some() || request.username.is_some() {
            if let Some(conflicting) = self
                .repository
                .find_collision(request.email.as_deref(), request.username.as_deref(), Some(id))
                .await?
            {
                if request.email.as_deref() == Some(conflicting.email.as_str()) {
                    return Err(ParleyError::conflict(EMAIL_CONFLICT));
                }
                return Err(ParleyError::conflict(USERNAME_CONFLICT));
            }
        }

        let password_hash = match &request.password {
            Some(password) => Some(self.hasher.hash(password)?),
            None => None,
        };

        let updated = self
            .repository
            .update(
                id,
                &UserChanges {
                    username: request.username,
                    email: request.email,
                    password_hash,
                },
            )
            .await?;

        info!("User updated: {}", id);
        Ok(UserResponse::from(updated))
    }

    async fn delete(&self, id: i32) -> ParleyResult<()> {
        debug!("Deleting user: {}", id);

        let deleted = self.repository.delete(id).await?;
        if !deleted {
            return Err(ParleyError::not_found("User", id));
        }

        info!("User deleted: {}", id);
        Ok(())
    }

    fn verify_password(&self, plain: &str, hash: &str) -> bool {
        self.hasher.verify(plain, hash).unwrap_or(false)
    }

    async fn count(&self) -> ParleyResult<u64> {
        self.repository.count().await
    }

    async fn exists(&self, id: i32) -> ParleyResult<bool> {
        match self.find_by_id(id).await {
            Ok(_) => Ok(true),
            Err(ParleyError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<R: UserRepository> std::fmt::Debug for UserServiceImpl<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserServiceImpl").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::User;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory user repository for testing.
    struct MockUserRepository {
        users: Mutex<BTreeMap<i32, User>>,
        next_id: Mutex<i32>,
        fail_reads: Mutex<bool>,
    }

    impl MockUserRepository {
        fn new() -> Self {
            Self {
                users: Mutex::new(BTreeMap::new()),
                next_id: Mutex::new(1),
                fail_reads: Mutex::new(false),
            }
        }

        fn set_fail_reads(&self, fail: bool) {
            *self.fail_reads.lock().unwrap() = fail;
        }

        fn stored(&self, id: i32) -> Option<User> {
            self.users.lock().unwrap().get(&id).cloned()
        }

        fn check_reads(&self) -> ParleyResult<()> {
            if *self.fail_reads.lock().unwrap() {
                return Err(ParleyError::Database("connection lost".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn find_by_id(&self, id: i32) -> ParleyResult<Option<User>> {
            self.check_reads()?;
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> ParleyResult<Option<User>> {
            self.check_reads()?;
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn find_by_username(&self, username: &str) -> ParleyResult<Option<User>> {
            self.check_reads()?;
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.username == username)
                .cloned())
        }

        async fn find_by_email_or_username(&self, identifier: &str) -> ParleyResult<Option<User>> {
            self.check_reads()?;
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email == identifier || u.username == identifier)
                .cloned())
        }

        async fn find_collision(
            &self,
            email: Option<&str>,
            username: Option<&str>,
            exclude_id: Option<i32>,
        ) -> ParleyResult<Option<User>> {
            self.check_reads()?;
            let users = self.users.lock().unwrap();
            let candidates = users
                .values()
                .filter(|u| Some(u.id) != exclude_id)
                .collect::<Vec<_>>();

            if let Some(email) = email {
                if let Some(user) = candidates.iter().find(|u| u.email == email) {
                    return Ok(Some((*user).clone()));
                }
            }
            if let Some(username) = username {
                if let Some(user) = candidates.iter().find(|u| u.username == username) {
                    return Ok(Some((*user).clone()));
                }
            }
            Ok(None)
        }

        async fn find_all(&self) -> ParleyResult<Vec<User>> {
            self.check_reads()?;
            Ok(self.users.lock().unwrap().values().cloned().collect())
        }

        async fn insert(&self, user: &NewUser) -> ParleyResult<User> {
            let mut next_id = self.next_id.lock().unwrap();
            let id = *next_id;
            *next_id += 1;

            let user = User {
                id,
                username: user.username.clone(),
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
            };
            self.users.lock().unwrap().insert(id, user.clone());
            Ok(user)
        }

        async fn update(&self, id: i32, changes: &UserChanges) -> ParleyResult<User> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .get_mut(&id)
                .ok_or_else(|| ParleyError::not_found("User", id))?;

            if let Some(username) = &changes.username {
                user.username = username.clone();
            }
            if let Some(email) = &changes.email {
                user.email = email.clone();
            }
            if let Some(password_hash) = &changes.password_hash {
                user.password_hash = password_hash.clone();
            }
            Ok(user.clone())
        }

        async fn delete(&self, id: i32) -> ParleyResult<bool> {
            Ok(self.users.lock().unwrap().remove(&id).is_some())
        }

        async fn count(&self) -> ParleyResult<u64> {
            Ok(self.users.lock().unwrap().len() as u64)
        }
    }

    fn create_service(
        repo: Arc<MockUserRepository>,
    ) -> UserServiceImpl<MockUserRepository> {
        UserServiceImpl::new(repo, Arc::new(PasswordHasher::with_cost(1)))
    }

    fn create_request(username: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: "Password123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_find_by_id_roundtrip() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo.clone());

        let created = service
            .create(create_request("alice", "alice@example.com"))
            .await
            .unwrap();

        let fetched = service.find_by_id(created.id).await.unwrap();
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.email, "alice@example.com");

        // The stored hash must never equal the submitted plaintext.
        let stored = repo.stored(created.id).unwrap();
        assert_ne!(stored.password_hash, "Password123");
    }

    #[tokio::test]
    async fn test_create_duplicate_email_cites_email() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        service
            .create(create_request("alice", "shared@example.com"))
            .await
            .unwrap();

        let result = service
            .create(create_request("bob", "shared@example.com"))
            .await;

        match result.unwrap_err() {
            ParleyError::Conflict(msg) => assert!(msg.contains("email")),
            other => panic!("Expected Conflict error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_duplicate_username_cites_username() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        service
            .create(create_request("shared", "alice@example.com"))
            .await
            .unwrap();

        let result = service
            .create(create_request("shared", "bob@example.com"))
            .await;

        match result.unwrap_err() {
            ParleyError::Conflict(msg) => assert!(msg.contains("username")),
            other => panic!("Expected Conflict error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_both_collide_email_takes_precedence() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        service
            .create(create_request("shared", "shared@example.com"))
            .await
            .unwrap();

        let result = service
            .create(create_request("shared", "shared@example.com"))
            .await;

        match result.unwrap_err() {
            ParleyError::Conflict(msg) => assert!(msg.contains("email")),
            other => panic!("Expected Conflict error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        let short_username = service
            .create(create_request("ab", "ok@example.com"))
            .await;
        assert!(matches!(
            short_username.unwrap_err(),
            ParleyError::Validation(_)
        ));

        let bad_email = service.create(create_request("alice", "not-an-email")).await;
        assert!(matches!(bad_email.unwrap_err(), ParleyError::Validation(_)));

        let empty_password = service
            .create(CreateUserRequest {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: String::new(),
            })
            .await;
        assert!(matches!(
            empty_password.unwrap_err(),
            ParleyError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        let result = service.find_by_id(42).await;
        assert!(matches!(
            result.unwrap_err(),
            ParleyError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_find_by_email_and_username() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        service
            .create(create_request("alice", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(
            service
                .find_by_email("alice@example.com")
                .await
                .unwrap()
                .username,
            "alice"
        );
        assert_eq!(
            service.find_by_username("alice").await.unwrap().email,
            "alice@example.com"
        );
        assert!(service.find_by_email("missing@example.com").await.is_err());
        assert!(service.find_by_username("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_find_by_email_or_username_does_not_raise() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        service
            .create(create_request("alice", "alice@example.com"))
            .await
            .unwrap();

        assert!(service
            .find_by_email_or_username("alice")
            .await
            .unwrap()
            .is_some());
        assert!(service
            .find_by_email_or_username("alice@example.com")
            .await
            .unwrap()
            .is_some());
        assert!(service
            .find_by_email_or_username("nobody")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_find_all() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        assert!(service.find_all().await.unwrap().is_empty());

        service
            .create(create_request("alice", "alice@example.com"))
            .await
            .unwrap();
        service
            .create(create_request("bob", "bob@example.com"))
            .await
            .unwrap();

        assert_eq!(service.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_empty_partial_leaves_fields_unchanged() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo.clone());

        let created = service
            .create(create_request("alice", "alice@example.com"))
            .await
            .unwrap();
        let hash_before = repo.stored(created.id).unwrap().password_hash;

        let updated = service
            .update(created.id, UpdateUserRequest::default())
            .await
            .unwrap();

        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email, "alice@example.com");
        assert_eq!(repo.stored(created.id).unwrap().password_hash, hash_before);
    }

    #[tokio::test]
    async fn test_update_not_found() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        let result = service.update(42, UpdateUserRequest::default()).await;
        assert!(matches!(
            result.unwrap_err(),
            ParleyError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_update_email_conflict_with_other_user() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        service
            .create(create_request("alice", "alice@example.com"))
            .await
            .unwrap();
        let bob = service
            .create(create_request("bob", "bob@example.com"))
            .await
            .unwrap();

        let result = service
            .update(
                bob.id,
                UpdateUserRequest {
                    email: Some("alice@example.com".to_string()),
                    ..UpdateUserRequest::default()
                },
            )
            .await;

        match result.unwrap_err() {
            ParleyError::Conflict(msg) => assert!(msg.contains("email")),
            other => panic!("Expected Conflict error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_own_identity_is_not_a_conflict() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        let alice = service
            .create(create_request("alice", "alice@example.com"))
            .await
            .unwrap();

        // Re-submitting the current values excludes the record's own id
        // from the probe.
        let updated = service
            .update(
                alice.id,
                UpdateUserRequest {
                    username: Some("alice".to_string()),
                    email: Some("alice@example.com".to_string()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.username, "alice");
    }

    #[tokio::test]
    async fn test_update_rehashes_password() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo.clone());

        let created = service
            .create(create_request("alice", "alice@example.com"))
            .await
            .unwrap();
        let hash_before = repo.stored(created.id).unwrap().password_hash;

        service
            .update(
                created.id,
                UpdateUserRequest {
                    password: Some("NewPassword456".to_string()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap();

        let hash_after = repo.stored(created.id).unwrap().password_hash;
        assert_ne!(hash_after, hash_before);
        assert_ne!(hash_after, "NewPassword456");
        assert!(service.verify_password("NewPassword456", &hash_after));
    }

    #[tokio::test]
    async fn test_delete_then_find_and_exists() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        let created = service
            .create(create_request("alice", "alice@example.com"))
            .await
            .unwrap();

        service.delete(created.id).await.unwrap();

        assert!(matches!(
            service.find_by_id(created.id).await.unwrap_err(),
            ParleyError::NotFound { .. }
        ));
        assert!(!service.exists(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_not_found() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        let result = service.delete(42).await;
        assert!(matches!(
            result.unwrap_err(),
            ParleyError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_verify_password() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);
        let hasher = PasswordHasher::with_cost(1);

        let hash = hasher.hash("CorrectHorse").unwrap();
        assert!(service.verify_password("CorrectHorse", &hash));
        assert!(!service.verify_password("correcthorse", &hash));
        assert!(!service.verify_password("CorrectHors", &hash));
        assert!(!service.verify_password("", &hash));
    }

    #[tokio::test]
    async fn test_verify_password_malformed_hash_is_false() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        assert!(!service.verify_password("anything", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_count() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo);

        assert_eq!(service.count().await.unwrap(), 0);
        service
            .create(create_request("alice", "alice@example.com"))
            .await
            .unwrap();
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exists_propagates_non_not_found_failures() {
        let repo = Arc::new(MockUserRepository::new());
        let service = create_service(repo.clone());

        repo.set_fail_reads(true);
        let result = service.exists(1).await;
        assert!(matches!(result.unwrap_err(), ParleyError::Database(_)));
    }
}
