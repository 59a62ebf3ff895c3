//! The user domain entity.

/// A persisted user account.
///
/// `password_hash` holds a salted one-way hash, never the plaintext
/// password, and is excluded from the `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    /// Generated primary key, assigned once at creation.
    pub id: i32,
    /// Unique display name, 3-50 characters.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Salted password hash (PHC string).
    pub password_hash: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}
