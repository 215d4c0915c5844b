use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::api::AppState;
use crate::entities::user;
use crate::middleware::{
    auth::Claims,
    logging::{to_response, ApiError},
};

//ROUTERS
pub fn admin_user_router(state: AppState) -> Router {
    Router::new()
        .route("/user", get(get_users))
        .route("/user/:id", delete(admin_delete_user))
        .layer(Extension(state))
}

//ROUTES
async fn get_users(Extension(state): Extension<AppState>) -> Result<Response, ApiError> {
    let users: Vec<UserResponse> = state
        .repo
        .users()
        .await?
        .into_iter()
        .map(UserResponse::new)
        .collect();

    Ok(to_response((StatusCode::OK, Json(users)), Ok(())))
}

/// Removes a user account. Their comments are kept without an author.
async fn admin_delete_user(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    if claims.user_id == id {
        return Err(ApiError::Conflict("Admins cannot delete themselves".into()));
    }
    if !state.repo.delete_user(id).await? {
        return Err(ApiError::NotFound(format!("No user with {} id was found.", id)));
    }

    info!(user_id = id, "Deleted user");
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "User deleted successfully"
            })),
        ),
        Ok(()),
    ))
}

#[derive(Serialize)]
struct UserResponse {
    id: i32,
    username: String,
    role: String,
}

impl UserResponse {
    fn new(value: user::Model) -> UserResponse {
        UserResponse {
            id: value.id,
            username: value.username,
            role: value.role.to_string(),
        }
    }
}
