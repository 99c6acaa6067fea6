#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use foodies_api::config::AppConfig;
use foodies_api::schema::{areas, categories, ingredients};
use foodies_api::{build_router, db, AppState};
use foodies_shared::clients::db::{DbConn, DbPool};
use foodies_shared::clients::storage::ImageStore;

pub const BOUNDARY: &str = "foodies-test-boundary";

/// State backed by a pool that never connects. Only for paths that fail
/// before touching the database.
pub fn offline_state() -> Arc<AppState> {
    let pool = Pool::builder()
        .max_size(1)
        .min_idle(Some(0))
        .connection_timeout(Duration::from_millis(250))
        .build_unchecked(ConnectionManager::new("postgres://invalid@127.0.0.1:1/none"));
    let config = AppConfig::load().expect("config");
    Arc::new(AppState::new(config, pool, ImageStore::Inline))
}

pub struct TestDb {
    pub pool: DbPool,
    pub state: Arc<AppState>,
}

impl TestDb {
    /// `None` when `FOODIES_TEST_DATABASE_URL` is unset.
    pub fn connect() -> Option<Self> {
        let url = match std::env::var("FOODIES_TEST_DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => {
                eprintln!("skipping: FOODIES_TEST_DATABASE_URL not set");
                return None;
            }
        };
        let pool = db::connect(&url, 8).expect("test database");
        let config = AppConfig::load().expect("config");
        let state = Arc::new(AppState::new(config, pool.clone(), ImageStore::Inline));
        Some(Self { pool, state })
    }

    pub fn conn(&self) -> DbConn {
        self.pool.get().expect("connection")
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }
}

pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

pub fn seed_category(conn: &mut PgConnection) -> Uuid {
    diesel::insert_into(categories::table)
        .values(categories::name.eq(unique("category")))
        .returning(categories::id)
        .get_result(conn)
        .expect("category")
}

pub fn seed_area(conn: &mut PgConnection) -> Uuid {
    diesel::insert_into(areas::table)
        .values(areas::name.eq(unique("area")))
        .returning(areas::id)
        .get_result(conn)
        .expect("area")
}

pub fn seed_ingredient(conn: &mut PgConnection) -> Uuid {
    diesel::insert_into(ingredients::table)
        .values(ingredients::name.eq(unique("ingredient")))
        .returning(ingredients::id)
        .get_result(conn)
        .expect("ingredient")
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.expect("response");
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

pub fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        req = req.header("Authorization", format!("Bearer {token}"));
    }
    req.body(Body::from(body.to_string())).expect("request")
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header("Authorization", format!("Bearer {token}"));
    }
    req.body(Body::empty()).expect("request")
}

/// Text parts plus an optional `(field, content_type, bytes)` file part.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    if let Some((name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(method: &str, uri: &str, body: Vec<u8>, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body))
        .expect("request")
}

/// Registers through the API and returns `(user_id, access_token)`.
pub async fn register(app: Router, name: &str) -> (Uuid, String) {
    let email = format!("{}@example.com", unique(name));
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/v1/auth/register",
            serde_json::json!({ "name": name, "email": email, "password": "secret-123" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["user"]["id"].as_str().expect("user id").parse().expect("uuid");
    let token = body["data"]["token"].as_str().expect("token").to_string();
    (id, token)
}
