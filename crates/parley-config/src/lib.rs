//! # Parley Config
//!
//! Layered configuration loading for the Parley chat backend.

pub mod app_config;
pub mod loader;

pub use app_config::*;
pub use loader::*;
