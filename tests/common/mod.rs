#![allow(dead_code)]

use reqwest::{header, redirect::Policy, Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

use baranki_catalog::api::{create_api_router, AppState};
use baranki_catalog::connect_database;
use baranki_catalog::entities::{category, product, seed_admin, setup_schema, user};
use baranki_catalog::services::repository::{CatalogRepository, NewCategory, NewProduct};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "Secret15";
pub const PASSWORD: &str = "pass1234";

pub struct TestApp {
    pub address: String,
    pub client: Client,
    /// Does not follow redirects, for checking the submission response itself.
    pub raw_client: Client,
    pub state: AppState,
}

/// Starts the full router on an ephemeral port against a fresh in-memory
/// database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_database("sqlite::memory:", 1).await
}

/// Starts the full router against `database_url` with a pool of up to
/// `max_connections`.
pub async fn spawn_app_with_database(database_url: &str, max_connections: u32) -> TestApp {
    let db = connect_database(database_url, max_connections)
        .await
        .expect("Failed to open database");
    setup_schema(&db).await.expect("Failed to create schema");
    seed_admin(&db, ADMIN_USERNAME, ADMIN_PASSWORD)
        .await
        .expect("Failed to seed admin");

    let state = AppState::new(Arc::new(db), "test-secret");
    let app = create_api_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        address,
        client: Client::new(),
        raw_client: Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("Failed to build client"),
        state,
    }
}

impl TestApp {
    pub fn repo(&self) -> &Arc<CatalogRepository> {
        &self.state.repo
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn detail_url(&self, slug: &str, id: i32) -> String {
        self.url(&format!("/api/category/{}/product/{}", slug, id))
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to send login request");
        assert_eq!(response.status(), StatusCode::OK);

        let body = response
            .json::<Value>()
            .await
            .expect("Failed to parse login response JSON");
        body["token"]
            .as_str()
            .expect("Token not found in login response")
            .to_owned()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Registers `username` and returns its id and a bearer token.
    pub async fn register(&self, username: &str) -> (i32, String) {
        let response = self
            .client
            .post(self.url("/register"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Failed to send register request");
        assert_eq!(response.status(), StatusCode::CREATED);

        let user: user::Model = self
            .repo()
            .find_user_by_name(username)
            .await
            .unwrap()
            .expect("Registered user not found");
        let token = self.login(username, PASSWORD).await;
        (user.id, token)
    }

    pub async fn create_category(&self, name: &str, slug: &str) -> category::Model {
        self.repo()
            .create_category(NewCategory {
                name: name.into(),
                slug: slug.into(),
                description: None,
            })
            .await
            .expect("Failed to create category")
    }

    pub async fn create_product(
        &self,
        name: &str,
        price_cents: i64,
        category_id: Option<i32>,
    ) -> product::Model {
        self.repo()
            .create_product(NewProduct {
                name: name.into(),
                description: None,
                price_cents,
                category_id,
            })
            .await
            .expect("Failed to create product")
    }

    /// Posts a rating to the detail endpoint, as a guest when `token` is `None`.
    pub async fn post_comment(
        &self,
        slug: &str,
        id: i32,
        token: Option<&str>,
        payload: Value,
    ) -> reqwest::Response {
        let mut request = self.raw_client.post(self.detail_url(slug, id)).json(&payload);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        request.send().await.expect("Failed to send comment")
    }

    pub async fn get_json(&self, url: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = request.send().await.expect("Failed to send request");
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }
}

/// Finds the product with `id` in a JSON array of products.
pub fn product_in<'a>(products: &'a Value, id: i32) -> &'a Value {
    products
        .as_array()
        .expect("Expected an array of products")
        .iter()
        .find(|product| product["id"] == json!(id))
        .expect("Product not found in response")
}
