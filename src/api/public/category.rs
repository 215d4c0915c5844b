use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::AppState;
use crate::entities::category;
use crate::middleware::logging::{to_response, ApiError};

pub fn category_router(state: AppState) -> Router {
    Router::new()
        .route("/category", get(get_categories))
        .route("/category/:slug", get(get_category))
        .layer(Extension(state))
}

async fn get_categories(Extension(state): Extension<AppState>) -> Result<Response, ApiError> {
    let categories: Vec<CategoryResponse> = state
        .repo
        .categories()
        .await?
        .into_iter()
        .map(CategoryResponse::new)
        .collect();

    Ok(to_response((StatusCode::OK, Json(categories)), Ok(())))
}

async fn get_category(
    Path(slug): Path<String>,
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    let category = state
        .repo
        .category_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No category with slug {} was found.", slug)))?;

    Ok(to_response(
        (StatusCode::OK, Json(CategoryResponse::new(category))),
        Ok(()),
    ))
}

#[derive(Serialize)]
pub struct CategoryResponse {
    id: i32,
    name: String,
    slug: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CategoryResponse {
    pub fn new(value: category::Model) -> CategoryResponse {
        CategoryResponse {
            id: value.id,
            name: value.name,
            slug: value.slug,
            description: value.description,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
