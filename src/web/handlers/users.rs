use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::ApiResponse;
use crate::storage::users::User;
use crate::web::Pagination;
use crate::AppContext;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    index: Option<u64>,
    size: Option<u64>,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub list: Vec<User>,
    pub total: u64,
}

pub async fn list_users(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ListUsersQuery>,
) -> impl IntoResponse {
    let pagination = Pagination {
        index: query.index.unwrap_or(1),
        size: query.size.unwrap_or(10),
    }
    .check();
    let filter = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let total = match ctx.users.count(filter).await {
        Ok(total) => total,
        Err(e) => {
            error!("Failed to count users: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            );
        }
    };

    match ctx
        .users
        .list(filter, pagination.offset(), pagination.limit())
        .await
    {
        Ok(list) => (
            StatusCode::OK,
            Json(ApiResponse::success(UserListResponse { list, total })),
        ),
        Err(e) => {
            error!("Failed to list users: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
}

pub async fn create_user(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let name = req.name.trim();
    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("name must not be empty".to_string())),
        );
    }

    match ctx.users.create(name).await {
        Ok(user) => (StatusCode::CREATED, Json(ApiResponse::success(user))),
        Err(e) => {
            error!("Failed to create user: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}

pub async fn get_user(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match ctx.users.get(id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(ApiResponse::success(user))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("user not found".to_string())),
        ),
        Err(e) => {
            error!("Failed to get user {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}

pub async fn delete_user(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match ctx.users.delete(id).await {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::<()>::success(()))),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("user not found".to_string())),
        ),
        Err(e) => {
            error!("Failed to delete user {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}
