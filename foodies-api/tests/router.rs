mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{empty_request, json_request, offline_state, send};
use foodies_api::build_router;

#[tokio::test]
async fn unknown_route_gets_json_404() {
    let app = build_router(offline_state());
    let (status, body) = send(app, empty_request("GET", "/api/v1/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Not found"));
    assert_eq!(body["code"], json!("E0003"));
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    for (method, uri) in [
        ("GET", "/api/v1/users/current"),
        ("GET", "/api/v1/auth/me"),
        ("POST", "/api/v1/auth/logout"),
        ("GET", "/api/v1/users/followers"),
        ("POST", "/api/v1/recipes"),
    ] {
        let app = build_router(offline_state());
        let (status, body) = send(app, empty_request(method, uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["message"], json!("Authorization header missing"));
    }
}

#[tokio::test]
async fn logout_acknowledges_a_valid_token() {
    let state = offline_state();
    let pair = state.token_keys.issue_pair(Uuid::new_v4(), "chef@example.com").unwrap();
    let app = build_router(state);
    let (status, body) = send(app, empty_request("POST", "/api/v1/auth/logout", Some(&pair.token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "message": "Logged out", "data": {} }));
}

#[tokio::test]
async fn malformed_recipe_id_is_a_validation_error() {
    let app = build_router(offline_state());
    let (status, body) = send(app, empty_request("GET", "/api/v1/recipes/not-a-uuid", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], json!("id"));
}

#[tokio::test]
async fn malformed_filter_id_is_rejected() {
    let app = build_router(offline_state());
    let (status, body) =
        send(app, empty_request("GET", "/api/v1/recipes?categoryId=abc&page=2", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], json!("categoryId"));
}

#[tokio::test]
async fn register_validates_every_field() {
    let app = build_router(offline_state());
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/v1/auth/register",
            json!({ "name": "a", "email": "nope", "password": "123" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Validation failed"));
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "name", "password"]);
}

#[tokio::test]
async fn access_token_is_not_a_refresh_token() {
    let state = offline_state();
    let pair = state.token_keys.issue_pair(Uuid::new_v4(), "chef@example.com").unwrap();
    let app = build_router(state);
    let (status, _) = send(
        app,
        json_request("POST", "/api/v1/auth/refresh", json!({ "refreshToken": pair.token }), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleting_with_a_bad_id_never_reaches_storage() {
    let state = offline_state();
    let pair = state.token_keys.issue_pair(Uuid::new_v4(), "chef@example.com").unwrap();
    let app = build_router(state);
    let (status, _) = send(app, empty_request("DELETE", "/api/v1/recipes/123", Some(&pair.token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metrics_endpoint_renders_without_recorder() {
    let app = build_router(offline_state());
    let res = tower::ServiceExt::oneshot(app, empty_request("GET", "/metrics", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = build_router(offline_state());
    let (status, doc) = send(app, empty_request("GET", "/api/docs/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["info"]["title"], json!("Foodies API"));
    assert!(doc["paths"]["/api/v1/recipes"]["get"].is_object());
    assert!(doc["paths"]["/api/v1/users/{id}/follow"]["post"].is_object());
}

#[tokio::test]
async fn swagger_ui_is_mounted() {
    let app = build_router(offline_state());
    let res = tower::ServiceExt::oneshot(app, empty_request("GET", "/api/docs/", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
