use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{delete, get},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::api::AppState;
use crate::middleware::logging::{to_response, ApiError};
use crate::services::repository::{CommentFilter, CommentWithAuthor};

//ROUTERS
pub fn admin_comment_router(state: AppState) -> Router {
    Router::new()
        .route("/comment", get(admin_get_comments))
        .route("/comment/:id", delete(delete_comment))
        .layer(Extension(state))
}

//ROUTES
async fn admin_get_comments(
    Query(params): Query<GetCommentsQuery>,
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    let filter = CommentFilter {
        rating: params.rating,
        search: params.search,
    };
    let comments: Vec<AdminCommentResponse> = state
        .repo
        .search_comments(&filter)
        .await?
        .into_iter()
        .map(AdminCommentResponse::new)
        .collect();

    Ok(to_response((StatusCode::OK, Json(comments)), Ok(())))
}

async fn delete_comment(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    if !state.repo.delete_comment(id).await? {
        return Err(ApiError::NotFound(format!(
            "No comment with {} id was found.",
            id
        )));
    }

    info!(comment_id = id, "Deleted comment");
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Comment deleted successfully"
            })),
        ),
        Ok(()),
    ))
}

#[derive(Deserialize)]
struct GetCommentsQuery {
    rating: Option<i32>,
    search: Option<String>,
}

#[derive(Serialize)]
struct AdminCommentResponse {
    id: i32,
    product_id: i32,
    user_id: Option<i32>,
    username: Option<String>,
    guest_name: String,
    guest_email: String,
    rating: i32,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AdminCommentResponse {
    fn new(value: CommentWithAuthor) -> AdminCommentResponse {
        let comment = value.comment;
        AdminCommentResponse {
            id: comment.id,
            product_id: comment.product_id,
            user_id: comment.user_id,
            username: value.username,
            guest_name: comment.guest_name,
            guest_email: comment.guest_email,
            rating: comment.rating,
            text: comment.text,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}
