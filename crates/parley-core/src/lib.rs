//! # Parley Core
//!
//! Core types, errors, and validation helpers shared by every layer of
//! the Parley chat backend.

pub mod error;
pub mod result;
pub mod user;
pub mod validation;

pub use error::*;
pub use result::*;
pub use user::*;
pub use validation::*;
