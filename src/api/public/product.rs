use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{Redirect, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::{public::category::CategoryResponse, AppState};
use crate::middleware::{
    auth::{identity_middleware, Identity},
    logging::{to_response, ApiError},
};
use crate::services::{
    repository::{CommentWithAuthor, ProductFilter, RatedProduct},
    validation::{CommentSubmission, FieldErrors},
    ServiceError,
};

pub const MESSAGE_HEADER: &str = "x-message";

pub fn product_router(state: AppState) -> Router {
    let detail_router = Router::new()
        .route(
            "/category/:slug/product/:id",
            get(get_product).post(submit_comment),
        )
        .route_layer(from_fn_with_state(state.auth_state(None), identity_middleware));

    Router::new()
        .route("/product", get(get_products))
        .route("/category/:slug/product", get(get_category_products))
        .merge(detail_router)
        .layer(Extension(state))
}

async fn get_products(
    Query(params): Query<GetProductsQuery>,
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    list_products(&state, params.category).await
}

async fn get_category_products(
    Path(slug): Path<String>,
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    list_products(&state, Some(slug)).await
}

async fn list_products(state: &AppState, category_slug: Option<String>) -> Result<Response, ApiError> {
    let categories = state
        .repo
        .categories()
        .await?
        .into_iter()
        .map(CategoryResponse::new)
        .collect();
    let products = state
        .repo
        .rated_products(&ProductFilter { category_slug })
        .await?
        .into_iter()
        .map(ProductResponse::new)
        .collect();

    Ok(to_response(
        (
            StatusCode::OK,
            Json(ProductListResponse {
                categories,
                products,
            }),
        ),
        Ok(()),
    ))
}

async fn get_product(
    Path((slug, id)): Path<(String, i32)>,
    Extension(state): Extension<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, ApiError> {
    let product = find_product(&state, &slug, id).await?;

    // Signed-in users see their previous rating in the form.
    let mut values = CommentSubmission::default();
    if let Some(user_id) = identity.user_id() {
        if let Some(existing) = state.repo.comment_for_user(id, user_id).await? {
            values.rating = Some(existing.rating.into());
            values.text = Some(existing.text);
        }
    }

    let document = product_document(&state, product, values, FieldErrors::default()).await?;
    Ok(to_response((StatusCode::OK, Json(document)), Ok(())))
}

async fn submit_comment(
    Path((slug, id)): Path<(String, i32)>,
    Extension(state): Extension<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CommentSubmission>,
) -> Result<Response, ApiError> {
    let product = find_product(&state, &slug, id).await?;

    match state
        .comments
        .submit(product.product.id, identity.user_id(), &payload)
        .await
    {
        Ok(submitted) => {
            let location = format!("/api/category/{}/product/{}", slug, id);
            Ok(to_response(
                (
                    [(MESSAGE_HEADER, submitted.message())],
                    Redirect::to(&location),
                ),
                Ok(()),
            ))
        }
        // The form is shown again with its errors; nothing was written.
        Err(ServiceError::Invalid(errors)) => {
            let document = product_document(&state, product, payload, errors.clone()).await?;
            Ok(to_response(
                (StatusCode::OK, Json(document)),
                Err(ApiError::ValidationFail(errors)),
            ))
        }
        Err(err) => Err(err.into()),
    }
}

async fn find_product(state: &AppState, slug: &str, id: i32) -> Result<RatedProduct, ApiError> {
    state
        .repo
        .rated_product_in_category(slug, id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "No product with {} id was found in category {}.",
                id, slug
            ))
        })
}

async fn product_document(
    state: &AppState,
    product: RatedProduct,
    values: CommentSubmission,
    errors: FieldErrors,
) -> Result<ProductDetailResponse, ApiError> {
    let comments = state
        .repo
        .comments_for(product.product.id)
        .await?
        .into_iter()
        .map(CommentResponse::new)
        .collect();
    let related_products = state
        .ranker
        .related_to(&product)
        .await?
        .into_iter()
        .map(ProductResponse::new)
        .collect();

    Ok(ProductDetailResponse {
        product: ProductResponse::new(product),
        comments,
        related_products,
        form: CommentForm { values, errors },
    })
}

#[derive(Deserialize)]
struct GetProductsQuery {
    category: Option<String>,
}

#[derive(Serialize)]
struct ProductListResponse {
    categories: Vec<CategoryResponse>,
    products: Vec<ProductResponse>,
}

#[derive(Serialize)]
struct ProductDetailResponse {
    product: ProductResponse,
    comments: Vec<CommentResponse>,
    related_products: Vec<ProductResponse>,
    form: CommentForm,
}

#[derive(Serialize)]
struct CommentForm {
    values: CommentSubmission,
    errors: FieldErrors,
}

#[derive(Serialize)]
pub struct ProductResponse {
    id: i32,
    name: String,
    description: Option<String>,
    price: Decimal,
    category_id: Option<i32>,
    avg_rating: f64,
    total_ratings: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductResponse {
    pub fn new(value: RatedProduct) -> ProductResponse {
        let price = value.product.price();
        ProductResponse {
            id: value.product.id,
            name: value.product.name,
            description: value.product.description,
            price,
            category_id: value.product.category_id,
            avg_rating: value.avg_rating,
            total_ratings: value.total_ratings,
            created_at: value.product.created_at,
            updated_at: value.product.updated_at,
        }
    }
}

#[derive(Serialize)]
struct CommentResponse {
    id: i32,
    author: String,
    user_id: Option<i32>,
    rating: i32,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CommentResponse {
    fn new(value: CommentWithAuthor) -> CommentResponse {
        let author = value.author();
        let comment = value.comment;
        CommentResponse {
            id: comment.id,
            author,
            user_id: comment.user_id,
            rating: comment.rating,
            text: comment.text,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}
