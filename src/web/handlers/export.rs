use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::ApiResponse;
use crate::tasks::types::{TaskFormat, TaskKind, TaskStatus};
use crate::tasks::ExportProducer;
use crate::AppContext;

#[derive(Debug, Deserialize)]
pub struct CreateExportRequest {
    pub format: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskCreatedResponse {
    pub task_id: String,
    pub status: TaskStatus,
}

/// Creates the task, dispatches the producer and returns immediately;
/// the caller polls `/tasks/:task_id` for progress.
pub async fn create_export_task(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<CreateExportRequest>,
) -> impl IntoResponse {
    let format = match TaskFormat::parse(&req.format) {
        Some(format) => format,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!(
                    "unsupported format '{}', expected one of: json, csv, xlsx, xls, excel",
                    req.format
                ))),
            );
        }
    };

    let search_name = req
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    match ctx
        .tasks
        .create_task(TaskKind::Export, format, search_name.clone())
        .await
    {
        Ok(task) => {
            ExportProducer::new(ctx.tasks.clone(), ctx.users.clone(), ctx.export_dir.clone())
                .spawn(task.id.clone(), format, search_name);
            (
                StatusCode::CREATED,
                Json(ApiResponse::success(TaskCreatedResponse {
                    task_id: task.id,
                    status: task.status,
                })),
            )
        }
        Err(e) => {
            error!("Failed to create export task: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}
