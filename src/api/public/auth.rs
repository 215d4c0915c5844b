use axum::{
    extract::Extension, http::StatusCode, response::Response, routing::post, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::api::AppState;
use crate::entities::user::{hash_password, Role};
use crate::middleware::{
    auth::generate_token,
    logging::{to_response, ApiError},
};
use crate::services::validation::FieldErrors;

pub fn auth_router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login))
        .layer(Extension(state))
}

async fn register_user(
    Extension(state): Extension<AppState>,
    Json(payload): Json<CreateUser>,
) -> Result<Response, ApiError> {
    payload
        .validate()
        .map_err(|errors| ApiError::ValidationFail(FieldErrors::from(errors)))?;

    let password = hash_password(&payload.password)
        .map_err(|err| ApiError::PasswordHashFailed(err.to_string()))?;

    let user = state
        .repo
        .create_user(payload.username, password, Role::User)
        .await
        .map_err(|err| match ApiError::from(err) {
            ApiError::Conflict(_) => ApiError::Conflict("Username already exists".into()),
            other => other,
        })?;

    info!(user_id = user.id, "Registered user");
    Ok(to_response(
        (
            StatusCode::CREATED,
            Json(json!({
                "message": "User registered successfully"
            })),
        ),
        Ok(()),
    ))
}

async fn login(
    Extension(state): Extension<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Response, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid username or password".into());

    let user = state
        .repo
        .find_user_by_name(&payload.username)
        .await?
        .ok_or_else(invalid)?;
    user.check_hash(&payload.password).map_err(|_| invalid())?;

    let token = generate_token(user.id, user.role, &state.secret)
        .map_err(|err| ApiError::TokenGenerationFailed(err.to_string()))?;

    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "token": token
            })),
        ),
        Ok(()),
    ))
}

#[derive(Deserialize, Validate)]
struct CreateUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3 to 150 characters."))]
    username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    password: String,
}

#[derive(Deserialize)]
struct UserLogin {
    username: String,
    password: String,
}
