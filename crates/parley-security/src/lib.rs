//! # Parley Security
//!
//! Password hashing for the Parley chat backend.

pub mod password;

pub use password::PasswordHasher;
