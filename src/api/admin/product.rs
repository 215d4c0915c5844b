use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use super::double_option;
use crate::api::{public::product::ProductResponse, AppState};
use crate::entities::product::price_to_cents;
use crate::middleware::logging::{to_response, ApiError};
use crate::services::{
    repository::{NewProduct, ProductChanges},
    validation::FieldErrors,
};

const INVALID_PRICE: &str =
    "Ensure the price is between 0.00 and 9999.99 with at most 2 decimal places.";
const INVALID_CATEGORY: &str = "Select a valid choice. That choice is not one of the available choices.";

//ROUTERS
pub fn admin_product_router(state: AppState) -> Router {
    Router::new()
        .route("/product", get(admin_get_products).post(create_product))
        .route(
            "/product/:id",
            get(admin_get_product)
                .patch(patch_product)
                .delete(delete_product),
        )
        .layer(Extension(state))
}

//ROUTES
async fn admin_get_products(Extension(state): Extension<AppState>) -> Result<Response, ApiError> {
    let products: Vec<ProductResponse> = state
        .repo
        .rated_products_newest()
        .await?
        .into_iter()
        .map(ProductResponse::new)
        .collect();

    Ok(to_response((StatusCode::OK, Json(products)), Ok(())))
}

async fn admin_get_product(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    let product = state
        .repo
        .rated_product(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No product with {} id was found.", id)))?;

    Ok(to_response(
        (StatusCode::OK, Json(ProductResponse::new(product))),
        Ok(()),
    ))
}

async fn create_product(
    Extension(state): Extension<AppState>,
    Json(payload): Json<CreateProduct>,
) -> Result<Response, ApiError> {
    let mut errors = payload.validate().err().map(FieldErrors::from).unwrap_or_default();
    let price_cents = price_to_cents(payload.price);
    if price_cents.is_none() {
        errors.add("price", INVALID_PRICE);
    }
    if let Some(category_id) = payload.category_id {
        if state.repo.category_by_id(category_id).await?.is_none() {
            errors.add("category_id", INVALID_CATEGORY);
        }
    }
    let Some(price_cents) = price_cents.filter(|_| errors.is_empty()) else {
        return Err(ApiError::ValidationFail(errors));
    };

    let product = state
        .repo
        .create_product(NewProduct {
            name: payload.name,
            description: payload.description,
            price_cents,
            category_id: payload.category_id,
        })
        .await?;

    info!(product_id = product.id, "Created product");
    let product = state
        .repo
        .rated_product(product.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No product with {} id was found.", product.id)))?;

    Ok(to_response(
        (StatusCode::CREATED, Json(ProductResponse::new(product))),
        Ok(()),
    ))
}

async fn patch_product(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
    Json(payload): Json<PatchProduct>,
) -> Result<Response, ApiError> {
    let mut errors = payload.validate().err().map(FieldErrors::from).unwrap_or_default();
    let price_cents = match payload.price {
        Some(price) => {
            let cents = price_to_cents(price);
            if cents.is_none() {
                errors.add("price", INVALID_PRICE);
            }
            cents
        }
        None => None,
    };
    if let Some(Some(category_id)) = payload.category_id {
        if state.repo.category_by_id(category_id).await?.is_none() {
            errors.add("category_id", INVALID_CATEGORY);
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::ValidationFail(errors));
    }

    let changes = ProductChanges {
        name: payload.name,
        description: payload.description,
        price_cents,
        category_id: payload.category_id,
    };
    if state.repo.update_product(id, changes).await?.is_none() {
        return Err(ApiError::NotFound(format!("No product with {} id was found.", id)));
    }

    let product = state
        .repo
        .rated_product(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No product with {} id was found.", id)))?;

    Ok(to_response(
        (StatusCode::OK, Json(ProductResponse::new(product))),
        Ok(()),
    ))
}

async fn delete_product(
    Path(id): Path<i32>,
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    if !state.repo.delete_product(id).await? {
        return Err(ApiError::NotFound(format!(
            "No product with {} id was found.",
            id
        )));
    }

    info!(product_id = id, "Deleted product and its comments");
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Product deleted successfully"
            })),
        ),
        Ok(()),
    ))
}

#[derive(Deserialize, Validate)]
struct CreateProduct {
    #[validate(length(min = 1, max = 80, message = "Name must be 1 to 80 characters."))]
    name: String,
    #[validate(length(max = 250, message = "Description must be at most 250 characters."))]
    description: Option<String>,
    price: Decimal,
    category_id: Option<i32>,
}

#[derive(Deserialize, Validate)]
struct PatchProduct {
    #[validate(length(min = 1, max = 80, message = "Name must be 1 to 80 characters."))]
    name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 250, message = "Description must be at most 250 characters."))]
    description: Option<Option<String>>,
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    category_id: Option<Option<i32>>,
}
