pub mod auth;
pub mod catalog;
pub mod health;
pub mod rate_limit;
pub mod recipes;
pub mod users;

use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;
use uuid::Uuid;

use foodies_shared::errors::{AppError, AppResult, ErrorCode};
use foodies_shared::types::{ApiErrorResponse, FieldError};

pub const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub const DOCS_PATH: &str = "/api/docs";
pub const OPENAPI_PATH: &str = "/api/docs/openapi.json";

/// The OpenAPI document served under [`OPENAPI_PATH`].
pub fn openapi() -> utoipa::openapi::OpenApi {
    #[derive(OpenApi)]
    #[openapi(
        info(title = "Foodies API", description = "Recipes, profiles, follows and favorites"),
        tags(
            (name = "auth", description = "Registration and tokens"),
            (name = "recipes", description = "Browsing, creating and favoriting recipes"),
            (name = "users", description = "Profiles, avatars and follows"),
            (name = "catalog", description = "Categories, areas, ingredients and testimonials"),
            (name = "health", description = "Liveness and metrics")
        ),
        components(schemas(ApiErrorResponse, FieldError))
    )]
    struct BaseApi;

    let mut spec = BaseApi::openapi();
    spec.components
        .get_or_insert_with(Default::default)
        .add_security_scheme("bearer_auth", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));

    for module in [
        auth::ApiDoc::openapi(),
        recipes::ApiDoc::openapi(),
        users::ApiDoc::openapi(),
        catalog::ApiDoc::openapi(),
        health::ApiDoc::openapi(),
    ] {
        spec.merge(module);
    }
    spec
}

/// Path ids are validated here so a bad id gets the JSON error envelope.
pub(crate) fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::invalid_fields(vec![FieldError::new("id", "Invalid value")]))
}

pub(crate) struct Upload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub(crate) fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(ErrorCode::PayloadTooLarge, "File too large")
    } else {
        AppError::bad_request(format!("File upload error: {}", err.body_text()))
    }
}

/// Reads a file part. Empty parts count as no file.
pub(crate) async fn read_upload(field: Field<'_>) -> AppResult<Option<Upload>> {
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field.bytes().await.map_err(multipart_error)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(Upload {
        content_type,
        bytes: bytes.to_vec(),
    }))
}

pub(crate) async fn read_text(field: Field<'_>) -> AppResult<String> {
    field.text().await.map_err(multipart_error)
}
