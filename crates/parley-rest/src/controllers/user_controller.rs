//! User management controller.

use crate::{
    responses::{created, no_content, ok, ApiResponse, ApiResult, AppError},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use parley_service::{CreateUserRequest, UpdateUserRequest, UserResponse};
use serde::Serialize;
use tracing::debug;

/// Total user count payload.
#[derive(Debug, Serialize)]
struct CountResponse {
    count: u64,
}

/// User existence payload.
#[derive(Debug, Serialize)]
struct ExistsResponse {
    exists: bool,
}

/// Creates the user router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/count", get(count_users))
        .route(
            "/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/:id/exists", get(user_exists))
        .route("/email/:email", get(get_user_by_email))
        .route("/username/:username", get(get_user_by_username))
}

/// Create a new user.
async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), AppError> {
    debug!("Create user request: {}", request.username);

    let response = state.user_service.create(request).await?;
    Ok(created(response))
}

/// List all users.
async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<UserResponse>> {
    debug!("List users request");

    let response = state.user_service.find_all().await?;
    ok(response)
}

/// Get the total number of users.
async fn count_users(State(state): State<AppState>) -> ApiResult<CountResponse> {
    let count = state.user_service.count().await?;
    ok(CountResponse { count })
}

/// Get a user by ID.
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<UserResponse> {
    debug!("Get user request: {}", id);

    let response = state.user_service.find_by_id(id).await?;
    ok(response)
}

/// Get a user by email.
async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<UserResponse> {
    debug!("Get user by email request: {}", email);

    let response = state.user_service.find_by_email(&email).await?;
    ok(response)
}

/// Get a user by username.
async fn get_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<UserResponse> {
    debug!("Get user by username request: {}", username);

    let response = state.user_service.find_by_username(&username).await?;
    ok(response)
}

/// Partially update a user.
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    debug!("Update user request: {}", id);

    let response = state.user_service.update(id, request).await?;
    ok(response)
}

/// Delete a user.
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    debug!("Delete user request: {}", id);

    state.user_service.delete(id).await?;
    Ok(no_content())
}

/// Check whether a user exists.
async fn user_exists(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<ExistsResponse> {
    let exists = state.user_service.exists(id).await?;
    ok(ExistsResponse { exists })
}
