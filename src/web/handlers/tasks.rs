use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::{error, warn};

use super::ApiResponse;
use crate::tasks::types::TaskStatus;
use crate::AppContext;

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    match ctx.tasks.get_task(&task_id).await {
        Ok(Some(task)) => (StatusCode::OK, Json(ApiResponse::success(task))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("task not found".to_string())),
        ),
        Err(e) => {
            error!("Failed to get task {}: {}", task_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}

/// Streams a finished task's result file as an attachment. Anything
/// short of Completed echoes the current status and progress instead.
pub async fn download_task_file(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<String>,
) -> Response {
    let task = match ctx.tasks.get_task(&task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error("task not found".to_string())),
            )
                .into_response();
        }
        Err(e) => {
            error!("Failed to get task {}: {}", task_id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(e.to_string())),
            )
                .into_response();
        }
    };

    if task.status != TaskStatus::Completed {
        return (
            StatusCode::CONFLICT,
            Json(ApiResponse::<()>::error(format!(
                "task is {} at {}%, no result to download",
                task.status, task.progress
            ))),
        )
            .into_response();
    }

    let (file_name, file_path) = match (task.file_name, task.file_path) {
        (Some(name), Some(path)) => (name, path),
        _ => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error(
                    "task has no result file".to_string(),
                )),
            )
                .into_response();
        }
    };

    match tokio::fs::read(&file_path).await {
        Ok(bytes) => {
            let headers = [
                (header::CONTENT_TYPE, task.format.mime().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ),
            ];
            (StatusCode::OK, headers, bytes).into_response()
        }
        Err(e) => {
            warn!("Result file for task {} is unreadable: {}", task_id, e);
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error(
                    "result file is no longer available".to_string(),
                )),
            )
                .into_response()
        }
    }
}
