pub mod category;
pub mod comment;
pub mod product;
pub mod user;

use axum::{middleware::from_fn_with_state, Router};
use serde::{Deserialize, Deserializer};

use category::admin_category_router;
use comment::admin_comment_router;
use product::admin_product_router;
use user::admin_user_router;

use crate::api::AppState;
use crate::entities::user::Role;
use crate::middleware::auth::auth_middleware;

pub fn admin_api_router(state: AppState) -> Router {
    let auth_state = state.auth_state(Some(Role::Admin));

    Router::new()
        .merge(admin_category_router(state.clone()))
        .merge(admin_product_router(state.clone()))
        .merge(admin_comment_router(state.clone()))
        .merge(admin_user_router(state))
        .layer(from_fn_with_state(auth_state, auth_middleware))
}

/// Tells an absent field (`None`) apart from an explicit `null` (`Some(None)`)
/// in patch payloads.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
