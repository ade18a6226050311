use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use super::ApiResponse;
use crate::storage::users::InfoView;
use crate::web::Pagination;
use crate::AppContext;

#[derive(Debug, Serialize)]
pub struct InfoViewListResponse {
    pub list: Vec<InfoView>,
    pub total: u64,
}

pub async fn list_info_views(
    State(ctx): State<Arc<AppContext>>,
    Query(pagination): Query<Pagination>,
) -> impl IntoResponse {
    let pagination = pagination.check();

    let total = match ctx.info_views.count().await {
        Ok(total) => total,
        Err(e) => {
            error!("Failed to count info views: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            );
        }
    };

    match ctx
        .info_views
        .list(pagination.offset(), pagination.limit())
        .await
    {
        Ok(list) => (
            StatusCode::OK,
            Json(ApiResponse::success(InfoViewListResponse { list, total })),
        ),
        Err(e) => {
            error!("Failed to list info views: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}
