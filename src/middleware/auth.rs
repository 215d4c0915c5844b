use crate::entities::user::{self, Entity as UserEntity, Role};
use crate::middleware::logging::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};
use thiserror::Error;
use tracing::debug;

/// Rejects the request unless it carries a valid token, for `state.role`
/// when one is set.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or_else(|| ApiError::Unauthorized("Missing token".into()))?;

    let claims = validate_token(&state.db, &state.secret, &token, state.role)
        .await
        .map_err(|err| {
            debug!(error = %err, "Rejected token");
            ApiError::Unauthorized(err.to_string())
        })?;

    req.extensions_mut().insert(Identity::User(claims.clone()));
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Resolves the current actor. Requests without an `Authorization` header
/// continue as [`Identity::Anonymous`]; a header with a bad token is rejected.
pub async fn identity_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = if req.headers().contains_key("Authorization") {
        let token =
            bearer_token(&req).ok_or_else(|| ApiError::Unauthorized("Malformed token".into()))?;
        let claims = validate_token(&state.db, &state.secret, &token, state.role)
            .await
            .map_err(|err| {
                debug!(error = %err, "Rejected token");
                ApiError::Unauthorized(err.to_string())
            })?;
        Identity::User(claims)
    } else {
        Identity::Anonymous
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub role: String,
    pub exp: usize,
}

/// The actor behind a request.
#[derive(Clone, Debug)]
pub enum Identity {
    Anonymous,
    User(Claims),
}

impl Identity {
    pub fn user_id(&self) -> Option<i32> {
        match self {
            Identity::Anonymous => None,
            Identity::User(claims) => Some(claims.user_id),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub secret: Arc<str>,
    pub role: Option<Role>,
}

pub fn generate_token(user_id: i32, role: Role, secret: &str) -> Result<String, AuthMiddlewareError> {
    let exp = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or(AuthMiddlewareError::GenerationFail)?
        .timestamp() as usize;

    let claims = Claims {
        user_id,
        role: role.to_string(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthMiddlewareError::GenerationFail)
}

/// Verifies the signature and expiry of `token`. Only an expired token
/// reports [`AuthMiddlewareError::TokenExpired`].
pub fn decode_claims(secret: &str, token: &str) -> Result<Claims, AuthMiddlewareError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => AuthMiddlewareError::TokenExpired,
        _ => AuthMiddlewareError::ValidationFail,
    })
}

/// Decodes `token` and checks that its user still exists with the claimed
/// role. With `req_role` set, the role must also match it.
pub async fn validate_token(
    db: &DatabaseConnection,
    secret: &str,
    token: &str,
    req_role: Option<Role>,
) -> Result<Claims, AuthMiddlewareError> {
    let claims = decode_claims(secret, token)?;
    let role = Role::from_str(&claims.role).map_err(|_| AuthMiddlewareError::ValidationFail)?;

    match UserEntity::find_by_id(claims.user_id)
        .filter(user::Column::Role.eq(role))
        .one(db)
        .await
    {
        Ok(Some(_)) if req_role.map_or(true, |req_role| req_role == role) => Ok(claims),
        Ok(_) => Err(AuthMiddlewareError::InvalidUserOrRole),
        Err(_) => Err(AuthMiddlewareError::InternalServerError),
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthMiddlewareError {
    #[error("Invalid user id or role")]
    InvalidUserOrRole,
    #[error("Token expired")]
    TokenExpired,
    #[error("Failed to validate token")]
    ValidationFail,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("Internal server error")]
    InternalServerError,
}
