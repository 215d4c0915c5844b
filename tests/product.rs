mod common;

use reqwest::StatusCode;
use serde_json::json;

use baranki_catalog::services::comments::GuestIdentity;
use common::{product_in, spawn_app, TestApp};

fn guest(name: &str) -> GuestIdentity {
    GuestIdentity {
        name: name.into(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}

async fn rate_as_guest(app: &TestApp, product_id: i32, name: &str, rating: i32) {
    app.repo()
        .insert_guest_comment(product_id, guest(name), rating, String::new())
        .await
        .expect("Failed to insert guest comment");
}

#[tokio::test]
async fn test_get_products() {
    let app = spawn_app().await;
    let category = app.create_category("Toys", "toys").await;
    let product = app.create_product("Blue Rattle", 999, Some(category.id)).await;

    let (status, body) = app.get_json(&app.url("/api/product"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["categories"].is_array());
    let listed = product_in(&body["products"], product.id);
    assert_eq!(listed["name"], "Blue Rattle");
    assert_eq!(listed["price"], "9.99");
}

#[tokio::test]
async fn test_product_list_without_comments_has_zero_aggregates() {
    let app = spawn_app().await;
    let category = app.create_category("Toys", "toys").await;
    let product = app.create_product("Blue Rattle", 999, Some(category.id)).await;

    let (_, body) = app.get_json(&app.url("/api/product"), None).await;

    let listed = product_in(&body["products"], product.id);
    assert_eq!(listed["total_ratings"], json!(0));
    assert_eq!(listed["avg_rating"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn test_product_list_average_rating() {
    let app = spawn_app().await;
    let category = app.create_category("Toys", "toys").await;
    let product = app.create_product("Blue Rattle", 999, Some(category.id)).await;
    let (user_id, _) = app.register("tester").await;

    app.repo()
        .upsert_user_comment(product.id, user_id, 5, String::new())
        .await
        .unwrap();
    rate_as_guest(&app, product.id, "G1", 1).await;
    rate_as_guest(&app, product.id, "G2", 3).await;

    let (_, body) = app.get_json(&app.url("/api/product"), None).await;

    let listed = product_in(&body["products"], product.id);
    let avg = listed["avg_rating"].as_f64().unwrap();
    assert!((avg - 3.0).abs() < 1e-9);
    assert_eq!(listed["total_ratings"], json!(3));
}

#[tokio::test]
async fn test_product_list_by_category() {
    let app = spawn_app().await;
    let toys = app.create_category("Toys", "toys").await;
    let books = app.create_category("Books", "books").await;
    let rattle = app.create_product("Blue Rattle", 999, Some(toys.id)).await;
    let novel = app.create_product("Novel", 1500, Some(books.id)).await;

    for url in [
        app.url("/api/category/toys/product"),
        app.url("/api/product?category=toys"),
    ] {
        let (status, body) = app.get_json(&url, None).await;
        assert_eq!(status, StatusCode::OK);

        let ids: Vec<i64> = body["products"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![rattle.id as i64]);
        assert!(!ids.contains(&(novel.id as i64)));
    }

    let (status, body) = app
        .get_json(&app.url("/api/category/unknown/product"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"], json!([]));
}

#[tokio::test]
async fn test_product_detail_includes_form_and_comments() {
    let app = spawn_app().await;
    let category = app.create_category("Toys", "toys").await;
    let product = app.create_product("Blue Rattle", 999, Some(category.id)).await;
    rate_as_guest(&app, product.id, "First", 4).await;
    rate_as_guest(&app, product.id, "Second", 2).await;

    let (status, body) = app.get_json(&app.detail_url("toys", product.id), None).await;

    assert_eq!(status, StatusCode::OK);
    for field in ["rating", "text", "guest_name", "guest_email"] {
        assert!(body["form"]["values"].get(field).is_some(), "missing {field}");
    }
    assert_eq!(body["form"]["errors"], json!({}));

    let authors: Vec<&str> = body["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["author"].as_str().unwrap())
        .collect();
    assert_eq!(authors, vec!["Second", "First"]);
    assert!(body["comments"][0].get("guest_email").is_none());

    let avg = body["product"]["avg_rating"].as_f64().unwrap();
    assert!((avg - 3.0).abs() < 1e-9);
    assert_eq!(body["product"]["total_ratings"], json!(2));
}

#[tokio::test]
async fn test_product_detail_without_comments() {
    let app = spawn_app().await;
    let category = app.create_category("Toys", "toys").await;
    let product = app.create_product("Blue Rattle", 999, Some(category.id)).await;

    let (_, body) = app.get_json(&app.detail_url("toys", product.id), None).await;

    assert_eq!(body["product"]["total_ratings"], json!(0));
    assert_eq!(body["product"]["avg_rating"].as_f64(), Some(0.0));
    assert_eq!(body["comments"], json!([]));
}

#[tokio::test]
async fn test_product_detail_404() {
    let app = spawn_app().await;
    let toys = app.create_category("Toys", "toys").await;
    app.create_category("Books", "books").await;
    let product = app.create_product("Blue Rattle", 999, Some(toys.id)).await;

    let (status, _) = app.get_json(&app.detail_url("toys", 999_999), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Right id, wrong category.
    let (status, _) = app.get_json(&app.detail_url("books", product.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_related_products_ordering_by_rating_and_count() {
    let app = spawn_app().await;
    let category = app.create_category("Toys", "toys").await;
    let base = app.create_product("Blue Rattle", 999, Some(category.id)).await;
    let (user_id, _) = app.register("tester").await;
    let (other_id, _) = app.register("other").await;

    app.repo()
        .upsert_user_comment(base.id, user_id, 5, "Top".into())
        .await
        .unwrap();
    rate_as_guest(&app, base.id, "G", 4).await;
    rate_as_guest(&app, base.id, "G2", 5).await;

    let amber = app.create_product("Amber Rattle", 700, Some(category.id)).await;
    let red = app.create_product("Red Rattle", 500, Some(category.id)).await;
    let unrated = app.create_product("Grey Rattle", 300, Some(category.id)).await;
    app.repo()
        .upsert_user_comment(amber.id, user_id, 5, String::new())
        .await
        .unwrap();
    rate_as_guest(&app, amber.id, "AC", 5).await;
    app.repo()
        .upsert_user_comment(red.id, other_id, 5, String::new())
        .await
        .unwrap();

    let (status, body) = app.get_json(&app.detail_url("toys", base.id), None).await;
    assert_eq!(status, StatusCode::OK);

    let related: Vec<i64> = body["related_products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(
        related,
        vec![amber.id as i64, red.id as i64, unrated.id as i64]
    );
}

#[tokio::test]
async fn test_related_products_limit_max_eight() {
    let app = spawn_app().await;
    let category = app.create_category("Toys", "toys").await;
    let base = app.create_product("Blue Rattle", 999, Some(category.id)).await;

    for i in 0..10 {
        let product = app
            .create_product(&format!("Extra {i}"), 100, Some(category.id))
            .await;
        rate_as_guest(&app, product.id, "X", 5).await;
    }

    let (_, body) = app.get_json(&app.detail_url("toys", base.id), None).await;

    let related = body["related_products"].as_array().unwrap();
    assert_eq!(related.len(), 8);
    assert!(related.iter().all(|p| p["id"] != json!(base.id)));
}

#[tokio::test]
async fn test_related_products_only_from_same_category() {
    let app = spawn_app().await;
    let toys = app.create_category("Toys", "toys").await;
    let books = app.create_category("Books", "books").await;
    let base = app.create_product("Blue Rattle", 999, Some(toys.id)).await;
    let sibling = app.create_product("Red Rattle", 500, Some(toys.id)).await;
    app.create_product("Novel", 1500, Some(books.id)).await;
    app.create_product("Loose Item", 100, None).await;

    let (_, body) = app.get_json(&app.detail_url("toys", base.id), None).await;

    let related = body["related_products"].as_array().unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0]["id"], json!(sibling.id));
}
