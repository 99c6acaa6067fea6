use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult, ErrorCode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(user_id: Uuid, email: impl Into<String>, duration_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            email: email.into(),
            iat: now,
            exp: now + duration_secs,
            jti: Uuid::now_v7(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl TokenPair {
    pub fn new(token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Signing material for access and refresh tokens. Both are HS256 JWTs;
/// refresh tokens use their own secret so one can never stand in for the other.
#[derive(Debug, Clone)]
pub struct TokenKeys {
    access_secret: String,
    access_ttl: i64,
    refresh_secret: String,
    refresh_ttl: i64,
}

impl TokenKeys {
    pub fn new(
        access_secret: impl Into<String>,
        access_ttl: i64,
        refresh_secret: impl Into<String>,
        refresh_ttl: i64,
    ) -> Self {
        Self {
            access_secret: access_secret.into(),
            access_ttl,
            refresh_secret: refresh_secret.into(),
            refresh_ttl,
        }
    }

    pub fn issue_pair(&self, user_id: Uuid, email: &str) -> AppResult<TokenPair> {
        let access = sign(&Claims::new(user_id, email, self.access_ttl), &self.access_secret)?;
        let refresh = sign(&Claims::new(user_id, email, self.refresh_ttl), &self.refresh_secret)?;
        Ok(TokenPair::new(access, refresh, self.access_ttl))
    }

    pub fn verify_access(&self, token: &str) -> AppResult<Claims> {
        verify(token, &self.access_secret)
    }

    pub fn verify_refresh(&self, token: &str) -> AppResult<Claims> {
        verify(token, &self.refresh_secret)
    }
}

fn sign(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
}

fn verify(token: &str, secret: &str) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::new(ErrorCode::TokenExpired, "Token expired")
        }
        _ => AppError::new(ErrorCode::TokenInvalid, "Invalid or expired token"),
    })?;

    Ok(token_data.claims)
}
