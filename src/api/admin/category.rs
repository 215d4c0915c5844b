use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use super::double_option;
use crate::api::{public::category::CategoryResponse, AppState};
use crate::middleware::logging::{to_response, ApiError};
use crate::services::{
    repository::{CategoryChanges, NewCategory},
    validation::FieldErrors,
};

static SLUG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

//ROUTERS
pub fn admin_category_router(state: AppState) -> Router {
    Router::new()
        .route("/category", post(create_category))
        .route(
            "/category/:id",
            get(admin_get_category)
                .patch(patch_category)
                .delete(delete_category),
        )
        .layer(Extension(state))
}

//ROUTES
async fn create_category(
    Extension(state): Extension<AppState>,
    Json(payload): Json<CreateCategory>,
) -> Result<Response, ApiError> {
    let mut errors = payload.validate().err().map(FieldErrors::from).unwrap_or_default();
    let slug = payload.slug.clone().unwrap_or_else(|| slugify(&payload.name));
    if slug.is_empty() && !errors.contains("slug") {
        errors.add("slug", "Enter a valid slug.");
    }
    if !errors.is_empty() {
        return Err(ApiError::ValidationFail(errors));
    }

    let category = state
        .repo
        .create_category(NewCategory {
            name: payload.name,
            slug,
            description: payload.description,
        })
        .await
        .map_err(|err| match ApiError::from(err) {
            ApiError::Conflict(_) => ApiError::Conflict("Category already exists".into()),
            other => other,
        })?;

    info!(category_id = category.id, slug = %category.slug, "Created category");
    Ok(to_response(
        (StatusCode::CREATED, Json(CategoryResponse::new(category))),
        Ok(()),
    ))
}

async fn admin_get_category(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    let category = state
        .repo
        .category_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No category with {} id was found.", id)))?;

    Ok(to_response(
        (StatusCode::OK, Json(CategoryResponse::new(category))),
        Ok(()),
    ))
}

async fn patch_category(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
    Json(payload): Json<PatchCategory>,
) -> Result<Response, ApiError> {
    payload
        .validate()
        .map_err(|errors| ApiError::ValidationFail(FieldErrors::from(errors)))?;

    let category = state
        .repo
        .update_category(
            id,
            CategoryChanges {
                name: payload.name,
                slug: payload.slug,
                description: payload.description,
            },
        )
        .await
        .map_err(|err| match ApiError::from(err) {
            ApiError::Conflict(_) => ApiError::Conflict("Category already exists".into()),
            other => other,
        })?
        .ok_or_else(|| ApiError::NotFound(format!("No category with {} id was found.", id)))?;

    Ok(to_response(
        (StatusCode::OK, Json(CategoryResponse::new(category))),
        Ok(()),
    ))
}

async fn delete_category(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    if !state.repo.delete_category(id).await? {
        return Err(ApiError::NotFound(format!(
            "No category with {} id was found.",
            id
        )));
    }

    info!(category_id = id, "Deleted category");
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Category deleted successfully"
            })),
        ),
        Ok(()),
    ))
}

/// Lowercases `name` and joins its alphanumeric runs with dashes.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Deserialize, Validate)]
struct CreateCategory {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters."))]
    name: String,
    #[validate(
        length(min = 1, max = 50, message = "Slug must be 1 to 50 characters."),
        regex(path = *SLUG_REGEX, message = "Enter a valid slug.")
    )]
    slug: Option<String>,
    #[validate(length(max = 200, message = "Description must be at most 200 characters."))]
    description: Option<String>,
}

#[derive(Deserialize, Validate)]
struct PatchCategory {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters."))]
    name: Option<String>,
    #[validate(
        length(min = 1, max = 50, message = "Slug must be 1 to 50 characters."),
        regex(path = *SLUG_REGEX, message = "Enter a valid slug.")
    )]
    slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 200, message = "Description must be at most 200 characters."))]
    description: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_joins_words_with_dashes() {
        assert_eq!(slugify("Test Category"), "test-category");
        assert_eq!(slugify("  Toys & Games!  "), "toys-games");
        assert_eq!(slugify("Baby_Toys 2"), "baby-toys-2");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slug_regex_matches_slug_fields() {
        assert!(SLUG_REGEX.is_match("test-category"));
        assert!(SLUG_REGEX.is_match("Toys_2"));
        assert!(!SLUG_REGEX.is_match("toys and games"));
        assert!(!SLUG_REGEX.is_match(""));
    }
}
