use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, TokenKeys};

/// Router state that can verify bearer tokens.
pub trait AuthState {
    fn token_keys(&self) -> &TokenKeys;
}

impl AuthState for TokenKeys {
    fn token_keys(&self) -> &TokenKeys {
        self
    }
}

impl<T: AuthState> AuthState for Arc<T> {
    fn token_keys(&self) -> &TokenKeys {
        (**self).token_keys()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: AuthState + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = state.token_keys().verify_access(&token)?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "Token expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::unauthorized("Authorization header missing"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid authorization header"))?;

    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AppError::unauthorized("Token missing")),
    }
}

/// Optional auth extractor: anonymous or badly-authenticated callers become `None`.
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: AuthState + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(_) => Ok(Self(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn keys() -> TokenKeys {
        TokenKeys::new("access-secret", 3600, "refresh-secret", 7200)
    }

    async fn whoami(user: AuthUser) -> String {
        user.email
    }

    async fn maybe(OptionalAuthUser(user): OptionalAuthUser) -> String {
        user.map(|u| u.email).unwrap_or_else(|| "anonymous".into())
    }

    fn app() -> Router {
        Router::new()
            .route("/me", get(whoami))
            .route("/maybe", get(maybe))
            .with_state(keys())
    }

    async fn call(uri: &str, auth: Option<String>) -> (StatusCode, String) {
        let mut req = Request::get(uri);
        if let Some(value) = auth {
            req = req.header("Authorization", value);
        }
        let res = app().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let (status, body) = call("/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Authorization header missing"));
    }

    #[tokio::test]
    async fn empty_bearer_is_unauthorized() {
        let (status, body) = call("/me", Some("Bearer ".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Token missing"));
    }

    #[tokio::test]
    async fn valid_token_is_accepted() {
        let pair = keys().issue_pair(Uuid::new_v4(), "chef@example.com").unwrap();
        let (status, body) = call("/me", Some(format!("Bearer {}", pair.token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "chef@example.com");
    }

    #[tokio::test]
    async fn optional_auth_falls_back_to_anonymous() {
        let (status, body) = call("/maybe", Some("Bearer garbage".into())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }
}
