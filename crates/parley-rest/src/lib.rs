//! # Parley REST
//!
//! Axum HTTP surface for the Parley chat backend.

pub mod controllers;
pub mod middleware;
pub mod responses;
pub mod router;
pub mod state;

pub use middleware::{logging_middleware, RequestId, REQUEST_ID_HEADER};
pub use responses::{ApiResponse, ApiResult, AppError};
pub use router::create_router;
pub use state::AppState;
