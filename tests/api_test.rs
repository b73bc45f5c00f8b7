//! End-to-end tests that drive the full router in-process.
//!
//! Tests cover:
//! - Registration, login and bearer-token auth
//! - Image upload (file and url), listing, filtering and ownership
//! - Likes, saves and collection membership
//! - Comments and profiles
//! - Error envelopes

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use pinboard::config::Config;
use pinboard::db;
use pinboard::routes;
use pinboard::state::AppState;

const BOUNDARY: &str = "pinboard-test-boundary";

struct TestApp {
    router: Router,
    tmp: TempDir,
}

fn test_app() -> TestApp {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.database.path = Some(tmp.path().join("test.db"));
    config.storage.path = Some(tmp.path().join("uploads"));
    config.auth.jwt_secret = Some("integration-secret".into());
    config.auth.bcrypt_cost = 4;

    let pool = db::create_pool(&config.db_path(), 4).unwrap();
    db::run_migrations(&pool).unwrap();

    TestApp {
        router: routes::app(AppState::new(pool, config)),
        tmp,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.json(Method::POST, uri, Some(token), json!({})).await
    }

    /// Registers `username` and returns `(token, user id)`.
    async fn register(&self, username: &str) -> (String, i64) {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "secret1",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_i64().unwrap(),
        )
    }

    async fn upload(
        &self,
        token: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/images")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(fields, file)))
            .unwrap();
        self.send(request).await
    }

    /// Creates an image from an external url and returns its id.
    async fn create_image(&self, token: &str, title: &str, category: &str) -> i64 {
        let (status, body) = self
            .upload(
                token,
                &[
                    ("title", title),
                    ("category", category),
                    ("url", "https://cdn.example.com/pic.jpg"),
                ],
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "upload failed: {}", body);
        body["data"]["id"].as_i64().unwrap()
    }

    async fn create_collection(&self, token: &str, name: &str) -> i64 {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/collections",
                Some(token),
                json!({ "name": name, "category": "design" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create collection failed: {}", body);
        body["data"]["id"].as_i64().unwrap()
    }
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

// ============================================================================
// HEALTH & AUTH
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = test_app();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = test_app();
    let (token, id) = app.register("alice").await;

    let (status, body) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], id);
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "ALICE@example.com", "password": "secret1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "alice");
}

#[tokio::test]
async fn test_register_conflicts_and_bad_login() {
    let app = test_app();
    app.register("alice").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "username": "alice2", "email": "alice@example.com", "password": "secret1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "alice@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation_lists_errors() {
    let app = test_app();
    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "username": "x", "email": "nope", "password": "1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_protected_routes_need_a_valid_token() {
    let app = test_app();
    let (status, body) = app.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = app.get("/api/auth/me", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_gets_error_envelope() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_bad_query_and_path_values_get_error_envelope() {
    let app = test_app();

    let (status, body) = app.get("/api/images?page=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (status, body) = app.get("/api/images/notanumber", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.get("/api/collections?userId=me", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.get("/api/users/alice", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

// ============================================================================
// IMAGES
// ============================================================================

#[tokio::test]
async fn test_upload_serve_and_delete_file() {
    let app = test_app();
    let (token, _) = app.register("alice").await;

    let (status, body) = app
        .upload(
            &token,
            &[("title", "Sunset"), ("category", "nature")],
            Some(("sunset.png", b"fake png bytes")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let image = &body["data"];
    assert_eq!(image["title"], "Sunset");
    assert_eq!(image["category"], "nature");
    assert_eq!(image["likes"], 0);
    assert_eq!(image["user"]["username"], "alice");

    let url = image["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/") && url.ends_with(".png"));
    let file_name = url.trim_start_matches("/uploads/");
    let stored = app.tmp.path().join("uploads").join(file_name);
    assert!(stored.exists());

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"fake png bytes");

    let id = image["id"].as_i64().unwrap();
    let (status, body) = app
        .json(Method::DELETE, &format!("/api/images/{}", id), Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Image deleted");
    assert!(!stored.exists());

    let (status, _) = app.get(&format!("/api/images/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejects_bad_input() {
    let app = test_app();
    let (token, _) = app.register("alice").await;

    let (status, body) = app
        .upload(&token, &[("title", "Script")], Some(("evil.sh", b"#!/bin/sh")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");

    let (status, body) = app
        .upload(&token, &[("title", ""), ("category", "cats")], None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);

    let (status, _) = app.upload("bogus", &[("title", "x")], None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_url_cannot_point_at_another_upload() {
    let app = test_app();
    let (alice, _) = app.register("alice").await;
    let (mallory, _) = app.register("mallory").await;

    let (status, body) = app
        .upload(&alice, &[("title", "Cat")], Some(("cat.png", b"cat bytes")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let url = body["data"]["url"].as_str().unwrap().to_string();
    let stored = app
        .tmp
        .path()
        .join("uploads")
        .join(url.trim_start_matches("/uploads/"));
    assert!(stored.exists());

    let (status, body) = app
        .upload(&mallory, &[("title", "alias"), ("url", url.as_str())], None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");

    let (_, body) = app.get("/api/images", None).await;
    assert_eq!(body["data"]["total"], 1);
    assert!(stored.exists());
}

#[tokio::test]
async fn test_list_filters_and_paginates() {
    let app = test_app();
    let (token, user_id) = app.register("alice").await;
    app.create_image(&token, "Paris at night", "travel").await;
    app.create_image(&token, "Paris painting", "art").await;
    app.create_image(&token, "Berlin wall", "travel").await;
    let newest = app.create_image(&token, "Louvre from Paris", "travel").await;

    let (status, body) = app
        .get("/api/images?category=travel&search=paris", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["total"], 2);
    assert_eq!(page["page"], 1);
    assert_eq!(page["pageSize"], 20);
    assert_eq!(page["hasMore"], false);
    assert_eq!(page["items"][0]["id"], newest);

    let (_, body) = app.get("/api/images?page=1&pageSize=3", None).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"]["hasMore"], true);

    let (_, body) = app
        .get(&format!("/api/images/user/{}?pageSize=500", user_id), None)
        .await;
    assert_eq!(body["data"]["pageSize"], 100);
    assert_eq!(body["data"]["total"], 4);

    let (status, _) = app.get("/api/images?category=cats", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_owner_can_update_or_delete() {
    let app = test_app();
    let (alice, _) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let id = app.create_image(&alice, "Original", "art").await;
    let uri = format!("/api/images/{}", id);

    let (status, _) = app
        .json(Method::PUT, &uri, Some(&bob), json!({ "title": "Hijacked" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.json(Method::DELETE, &uri, Some(&bob), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get(&uri, None).await;
    assert_eq!(body["data"]["title"], "Original");

    let (status, body) = app
        .json(
            Method::PUT,
            &uri,
            Some(&alice),
            json!({ "description": "Oil on canvas", "category": "design" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Original");
    assert_eq!(body["data"]["description"], "Oil on canvas");
    assert_eq!(body["data"]["category"], "design");

    let (status, body) = app
        .json(Method::PUT, &uri, Some(&alice), json!({ "title": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");

    let (status, body) = app
        .json(Method::PUT, &uri, Some(&alice), json!({ "title": "  Renamed " }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Renamed");
}

#[tokio::test]
async fn test_like_is_idempotent_and_viewer_specific() {
    let app = test_app();
    let (alice, _) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let id = app.create_image(&alice, "Pic", "art").await;

    app.post(&format!("/api/images/{}/like", id), &bob).await;
    let (status, body) = app.post(&format!("/api/images/{}/like", id), &bob).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["likes"], 1);
    assert_eq!(body["data"]["isLiked"], true);

    let (_, body) = app.get(&format!("/api/images/{}", id), Some(&alice)).await;
    assert_eq!(body["data"]["isLiked"], false);
    let (_, body) = app.get(&format!("/api/images/{}", id), None).await;
    assert_eq!(body["data"]["isLiked"], false);

    let (_, body) = app.post(&format!("/api/images/{}/unlike", id), &alice).await;
    assert_eq!(body["data"]["likes"], 1);
    let (_, body) = app.post(&format!("/api/images/{}/unlike", id), &bob).await;
    assert_eq!(body["data"]["likes"], 0);

    let (status, _) = app.post("/api/images/9999/like", &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_popular_orders_by_engagement() {
    let app = test_app();
    let (alice, _) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let quiet = app.create_image(&alice, "Quiet", "art").await;
    let loved = app.create_image(&alice, "Loved", "art").await;
    app.create_image(&alice, "Newest", "art").await;
    app.post(&format!("/api/images/{}/like", loved), &bob).await;
    app.post(&format!("/api/images/{}/like", quiet), &bob).await;
    app.post(&format!("/api/images/{}/like", loved), &alice).await;

    let (_, body) = app.get("/api/images/popular", None).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items[0]["id"], loved);
    assert_eq!(items[1]["id"], quiet);
}

// ============================================================================
// COLLECTIONS & SAVES
// ============================================================================

#[tokio::test]
async fn test_save_into_collection() {
    let app = test_app();
    let (alice, _) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let image = app.create_image(&alice, "Chair", "design").await;
    let board = app.create_collection(&bob, "Furniture").await;
    let alices_board = app.create_collection(&alice, "Mine").await;

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/api/images/{}/save", image),
            Some(&bob),
            json!({ "collectionId": alices_board }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/api/images/{}/save", image),
            Some(&bob),
            json!({ "collectionId": board }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["saves"], 1);
    assert_eq!(body["data"]["isSaved"], true);

    let (_, body) = app.get(&format!("/api/collections/{}", board), None).await;
    assert_eq!(body["data"]["imagesCount"], 1);
    assert_eq!(body["data"]["coverImage"], "https://cdn.example.com/pic.jpg");

    let (_, body) = app
        .get(&format!("/api/collections/{}/images", board), Some(&bob))
        .await;
    let members = body["data"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["id"], image);
    assert_eq!(members[0]["isSaved"], true);

    let (_, body) = app.post(&format!("/api/images/{}/unsave", image), &bob).await;
    assert_eq!(body["data"]["saves"], 0);
    assert_eq!(body["data"]["isSaved"], false);
}

#[tokio::test]
async fn test_upload_into_own_collection_only() {
    let app = test_app();
    let (alice, _) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let bobs_board = app.create_collection(&bob, "Bob's").await;
    let alices_board = app.create_collection(&alice, "Alice's").await;

    let other = bobs_board.to_string();
    let (status, _) = app
        .upload(
            &alice,
            &[("title", "x"), ("url", "https://e.com/a.jpg"), ("collectionId", &other)],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let own = alices_board.to_string();
    let (status, body) = app
        .upload(
            &alice,
            &[("title", "x"), ("url", "https://e.com/a.jpg"), ("collectionId", &own)],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["collectionId"], alices_board);

    let (_, body) = app
        .get(&format!("/api/collections/{}", alices_board), None)
        .await;
    assert_eq!(body["data"]["imagesCount"], 1);
}

#[tokio::test]
async fn test_collection_crud_and_ownership() {
    let app = test_app();
    let (alice, alice_id) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let board = app.create_collection(&alice, "Trips").await;
    let image = app.create_image(&alice, "Alps", "travel").await;
    app.json(
        Method::PUT,
        &format!("/api/images/{}", image),
        Some(&alice),
        json!({ "collectionId": board }),
    )
    .await;
    let uri = format!("/api/collections/{}", board);

    let (status, _) = app
        .json(Method::PUT, &uri, Some(&bob), json!({ "name": "Mine now" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(Method::PUT, &uri, Some(&alice), json!({ "name": "Journeys" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Journeys");
    assert_eq!(body["data"]["category"], "design");

    let (_, body) = app
        .get(&format!("/api/collections?userId={}", alice_id), None)
        .await;
    assert_eq!(body["data"]["total"], 1);
    let (_, body) = app
        .get(&format!("/api/collections/user/{}", alice_id), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.json(Method::DELETE, &uri, Some(&bob), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.json(Method::DELETE, &uri, Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = app.get(&format!("/api/images/{}", image), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["collectionId"], Value::Null);
}

// ============================================================================
// COMMENTS & PROFILES
// ============================================================================

#[tokio::test]
async fn test_comment_thread() {
    let app = test_app();
    let (alice, _) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let (carol, _) = app.register("carol").await;
    let image = app.create_image(&alice, "Pic", "art").await;
    let uri = format!("/api/images/{}/comments", image);

    let (status, body) = app
        .json(Method::POST, &uri, Some(&bob), json!({ "content": "  Lovely  " }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["content"], "Lovely");
    assert_eq!(body["data"]["user"]["username"], "bob");
    let comment = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .json(Method::POST, &uri, Some(&bob), json!({ "content": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&uri, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let delete_uri = format!("{}/{}", uri, comment);
    let (status, _) = app
        .json(Method::DELETE, &delete_uri, Some(&carol), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .json(Method::DELETE, &delete_uri, Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/images/9999/comments", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_updates_are_self_only() {
    let app = test_app();
    let (alice, alice_id) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let uri = format!("/api/users/{}", alice_id);

    let (status, _) = app
        .json(Method::PUT, &uri, Some(&bob), json!({ "bio": "hacked" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(Method::PUT, &uri, Some(&alice), json!({ "bio": "Photographer" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bio"], "Photographer");

    let (status, _) = app
        .json(Method::PUT, &uri, Some(&alice), json!({ "username": "bob" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get(&uri, None).await;
    assert_eq!(body["data"]["username"], "alice");

    let (status, _) = app.json(Method::DELETE, &uri, Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/auth/me", Some(&alice)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_email_is_private_to_its_owner() {
    let app = test_app();
    let (alice, alice_id) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let uri = format!("/api/users/{}", alice_id);

    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("email").is_none());

    let (_, body) = app.get(&uri, Some(&bob)).await;
    assert!(body["data"].get("email").is_none());

    let (_, body) = app.get(&uri, Some(&alice)).await;
    assert_eq!(body["data"]["email"], "alice@example.com");
    let (_, body) = app.get("/api/auth/me", Some(&alice)).await;
    assert_eq!(body["data"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_account_deletion_removes_uploaded_files() {
    let app = test_app();
    let (alice, alice_id) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let uploads = app.tmp.path().join("uploads");

    let (_, body) = app
        .upload(&alice, &[("title", "Mine")], Some(("mine.png", b"alice bytes")))
        .await;
    let alices = uploads.join(
        body["data"]["url"]
            .as_str()
            .unwrap()
            .trim_start_matches("/uploads/"),
    );
    let (_, body) = app
        .upload(&bob, &[("title", "Theirs")], Some(("theirs.png", b"bob bytes")))
        .await;
    let bobs = uploads.join(
        body["data"]["url"]
            .as_str()
            .unwrap()
            .trim_start_matches("/uploads/"),
    );
    assert!(alices.exists() && bobs.exists());

    let uri = format!("/api/users/{}", alice_id);
    let (status, _) = app.json(Method::DELETE, &uri, Some(&bob), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(alices.exists());

    let (status, _) = app.json(Method::DELETE, &uri, Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!alices.exists());
    assert!(bobs.exists());
}
