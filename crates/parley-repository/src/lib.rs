//! # Parley Repository
//!
//! SQLx-backed persistence for the Parley chat backend.

pub mod pool;
pub mod postgres;
pub mod traits;

pub use pool::{create_pool, DatabasePool};
pub use postgres::PgUserRepository;
pub use traits::{NewUser, UserChanges, UserRepository};
