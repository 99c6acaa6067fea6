use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use validator::Validate;

use foodies_shared::clients::db::run_blocking;
use foodies_shared::errors::{AppError, AppResult, ErrorCode};
use foodies_shared::types::auth::{AuthUser, TokenPair};
use foodies_shared::types::{ApiErrorResponse, ApiResponse, Empty};

use crate::models::UserProfile;
use crate::services::{auth_service, user_service};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: UserProfile,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserPayload {
    pub user: UserProfile,
}

async fn session_for(state: &AppState, user_id: uuid::Uuid, email: &str) -> AppResult<AuthPayload> {
    let user = user_service::get_user_profile_with_stats(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "User not found"))?;
    let TokenPair { token, refresh_token, .. } = state.token_keys.issue_pair(user_id, email)?;
    Ok(AuthPayload { user, token, refresh_token })
}

// --- POST /auth/register ---

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = ApiResponse<AuthPayload>),
        (status = 400, description = "Validation failed", body = ApiErrorResponse),
        (status = 409, description = "Email already in use", body = ApiErrorResponse)
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthPayload>>)> {
    req.validate()?;

    let RegisterRequest { name, email, password } = req;
    let (user_id, email) = run_blocking(&state.db, move |conn| {
        let id = auth_service::register_user(conn, &name, &email, &password)?;
        Ok((id, auth_service::normalize_email(&email)))
    })
    .await?;

    let payload = session_for(&state, user_id, &email).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(payload, "User registered"))))
}

// --- POST /auth/login ---

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<AuthPayload>),
        (status = 400, description = "Validation failed", body = ApiErrorResponse),
        (status = 401, description = "Invalid credentials", body = ApiErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthPayload>>> {
    req.validate()?;

    let LoginRequest { email, password } = req;
    let user = run_blocking(&state.db, move |conn| {
        auth_service::authenticate(conn, &email, &password)
    })
    .await?;

    let payload = session_for(&state, user.id, &user.email).await?;
    Ok(Json(ApiResponse::ok(payload, "Login successful")))
}

// --- POST /auth/refresh ---

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Fresh token pair", body = ApiResponse<TokenPair>),
        (status = 401, description = "Invalid or expired refresh token", body = ApiErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let claims = state.token_keys.verify_refresh(&req.refresh_token)?;

    let user_id = claims.sub;
    let exists = run_blocking(&state.db, move |conn| user_service::user_exists(conn, user_id)).await?;
    if !exists {
        return Err(AppError::new(ErrorCode::TokenInvalid, "Invalid or expired token"));
    }

    let pair = state.token_keys.issue_pair(claims.sub, &claims.email)?;
    Ok(Json(ApiResponse::ok(pair, "Token refreshed")))
}

// --- POST /auth/logout ---

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<Empty>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
/// Tokens are stateless; logout only acknowledges an authenticated caller.
pub async fn logout(user: AuthUser) -> Json<ApiResponse<Empty>> {
    tracing::info!(user_id = %user.id, "user logged out");
    Json(ApiResponse::message("Logged out"))
}

// --- GET /auth/me ---

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Caller profile with stats", body = ApiResponse<UserPayload>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "User not found", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UserPayload>>> {
    let profile = user_service::get_user_profile_with_stats(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "User not found"))?;
    Ok(Json(ApiResponse::ok(UserPayload { user: profile }, "User fetched")))
}

#[derive(OpenApi)]
#[openapi(paths(register, login, refresh, logout, me))]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_rules() {
        let ok = RegisterRequest {
            name: "Jo".into(),
            email: "jo@example.com".into(),
            password: "secret".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            name: "J".into(),
            email: "not-an-email".into(),
            password: "123".into(),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn login_requires_valid_email() {
        let req = LoginRequest {
            email: "nope".into(),
            password: "secret1".into(),
        };
        assert!(req.validate().unwrap_err().field_errors().contains_key("email"));
    }

    #[test]
    fn refresh_request_reads_camel_case() {
        let req: RefreshRequest = serde_json::from_str(r#"{"refreshToken":"abc"}"#).unwrap();
        assert_eq!(req.refresh_token, "abc");
    }
}
