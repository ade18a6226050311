use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use super::ApiResponse;
use crate::codec;
use crate::tasks::types::{TaskFormat, TaskKind, TaskStatus};
use crate::tasks::ImportProducer;
use crate::AppContext;

#[derive(Debug, Serialize)]
pub struct ImportCreatedResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub format: TaskFormat,
    pub record_count: usize,
}

/// Takes the upload, sniffs the format from the file extension, runs the
/// synchronous pre-validation parse, and only then creates a task and
/// dispatches the producer. Unparseable files never become Failed tasks.
pub async fn create_import_task(
    State(ctx): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> Response {
    let mut upload_name: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            upload_name = field.file_name().map(|name| name.to_string());
            match field.bytes().await {
                Ok(bytes) => content = Some(bytes.to_vec()),
                Err(e) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(ApiResponse::<()>::error(format!(
                            "failed to read uploaded file: {}",
                            e
                        ))),
                    )
                        .into_response();
                }
            }
        }
    }

    let content = match content {
        Some(content) => content,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error(
                    "no file provided in 'file' field".to_string(),
                )),
            )
                .into_response();
        }
    };

    let upload_name = upload_name.unwrap_or_default();
    let format = match TaskFormat::from_file_name(&upload_name) {
        Some(format) => format,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error(format!(
                    "unsupported file type '{}', expected .json, .csv, .xlsx or .xls",
                    upload_name
                ))),
            )
                .into_response();
        }
    };

    // keep the original extension so .xls uploads stay recognizable to
    // the spreadsheet reader
    let ext = upload_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_else(|| format.extension().to_string());
    let upload_path = ctx
        .upload_dir
        .join(format!("upload_{}.{}", Uuid::new_v4().simple(), ext));
    if let Err(e) = tokio::fs::create_dir_all(&ctx.upload_dir).await {
        error!("Failed to create upload directory: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error(e.to_string())),
        )
            .into_response();
    }
    if let Err(e) = tokio::fs::write(&upload_path, &content).await {
        error!("Failed to persist upload: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error(e.to_string())),
        )
            .into_response();
    }

    // fail fast on unparseable files, before any task exists
    let record_count = match codec::count_records(&upload_path, format) {
        Ok(count) => count,
        Err(e) => {
            if let Err(e) = tokio::fs::remove_file(&upload_path).await {
                warn!("Failed to remove rejected upload: {}", e);
            }
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::<()>::error(format!(
                    "could not parse uploaded file: {}",
                    e
                ))),
            )
                .into_response();
        }
    };

    match ctx.tasks.create_task(TaskKind::Import, format, None).await {
        Ok(task) => {
            ImportProducer::new(ctx.tasks.clone(), ctx.users.clone()).spawn(
                task.id.clone(),
                upload_path,
                format,
            );
            (
                StatusCode::CREATED,
                Json(ApiResponse::success(ImportCreatedResponse {
                    task_id: task.id,
                    status: task.status,
                    format,
                    record_count,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to create import task: {}", e);
            if let Err(e) = tokio::fs::remove_file(&upload_path).await {
                warn!("Failed to remove orphaned upload: {}", e);
            }
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(e.to_string())),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub format: String,
}

pub async fn download_template(Query(query): Query<TemplateQuery>) -> Response {
    let format = match TaskFormat::parse(&query.format) {
        Some(format) => format,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error(format!(
                    "unsupported format '{}', expected one of: json, csv, xlsx, xls, excel",
                    query.format
                ))),
            )
                .into_response();
        }
    };

    match codec::encode_template(format) {
        Ok(bytes) => {
            let headers = [
                (header::CONTENT_TYPE, format.mime().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!(
                        "attachment; filename=\"user_import_template.{}\"",
                        format.extension()
                    ),
                ),
            ];
            (StatusCode::OK, headers, bytes).into_response()
        }
        Err(e) => {
            error!("Failed to generate import template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(e.to_string())),
            )
                .into_response()
        }
    }
}
