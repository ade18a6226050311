use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;

use crate::AppContext;

pub mod export;
pub mod import;
pub mod info_view;
pub mod tasks;
pub mod users;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/export", post(export::create_export_task))
        .route("/users/import", post(import::create_import_task))
        .route("/users/import/template", get(import::download_template))
        .route(
            "/users/:id",
            get(users::get_user).delete(users::delete_user),
        )
        .route("/info-views", get(info_view::list_info_views))
        .route("/tasks/:task_id", get(tasks::get_task))
        .route("/tasks/:task_id/download", get(tasks::download_task_file))
        .with_state(ctx)
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}
