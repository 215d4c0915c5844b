pub mod auth;
pub mod category;
pub mod product;

use axum::Router;

use crate::api::AppState;
use category::category_router;
use product::product_router;

pub fn public_api_router(state: AppState) -> Router {
    let category_router = category_router(state.clone());
    let product_router = product_router(state);

    Router::new().merge(category_router).merge(product_router)
}
