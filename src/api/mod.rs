pub mod admin;
pub mod public;

use axum::{middleware::from_fn, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::entities::user::Role;
use crate::middleware::auth::AuthState;
use crate::middleware::logging::logging_middleware;
use crate::services::{
    comments::CommentService, ranking::RelatedRanker, repository::CatalogRepository,
};

use admin::admin_api_router;
use public::{auth::auth_router, public_api_router};

/// Everything a handler needs, shared across requests.
#[derive(Clone, Debug)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub repo: Arc<CatalogRepository>,
    pub comments: CommentService,
    pub ranker: RelatedRanker,
    pub secret: Arc<str>,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, secret: &str) -> Self {
        let repo = Arc::new(CatalogRepository::new(db.clone()));
        AppState {
            db,
            comments: CommentService::new(repo.clone()),
            ranker: RelatedRanker::new(repo.clone()),
            repo,
            secret: Arc::from(secret),
        }
    }

    pub fn auth_state(&self, role: Option<Role>) -> AuthState {
        AuthState {
            db: self.db.clone(),
            secret: self.secret.clone(),
            role,
        }
    }
}

pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(auth_router(state.clone()))
        .nest("/api", public_api_router(state.clone()))
        .nest("/api/admin", admin_api_router(state))
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
