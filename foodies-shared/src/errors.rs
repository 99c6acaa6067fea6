use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};

use crate::types::{ApiErrorResponse, FieldError};

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: User and social graph errors
/// - E3xxx: Recipe errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    BadRequest,
    PayloadTooLarge,
    Conflict,
    UnprocessableEntity,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    TokenExpired,
    TokenInvalid,

    // User (E2xxx)
    UserNotFound,
    ImageUploadFailed,
    UnsupportedImage,
    CannotFollowSelf,
    AvatarRequired,

    // Recipe (E3xxx)
    RecipeNotFound,
    NotRecipeOwner,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::RateLimited => "E0006",
            Self::BadRequest => "E0008",
            Self::PayloadTooLarge => "E0009",
            Self::Conflict => "E0010",
            Self::UnprocessableEntity => "E0011",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::TokenExpired => "E1004",
            Self::TokenInvalid => "E1005",

            // User
            Self::UserNotFound => "E2001",
            Self::ImageUploadFailed => "E2004",
            Self::UnsupportedImage => "E2005",
            Self::CannotFollowSelf => "E2007",
            Self::AvatarRequired => "E2008",

            // Recipe
            Self::RecipeNotFound => "E3001",
            Self::NotRecipeOwner => "E3002",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ImageUploadFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::UnsupportedImage
            | Self::CannotFollowSelf | Self::AvatarRequired => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::UserNotFound | Self::RecipeNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotRecipeOwner => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Conflict | Self::EmailAlreadyExists => StatusCode::CONFLICT,
            Self::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] DieselError),

    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Validation failure carrying a per-field error list.
    pub fn invalid_fields(errors: Vec<FieldError>) -> Self {
        Self::with_details(
            ErrorCode::ValidationError,
            "Validation failed",
            serde_json::to_value(errors).unwrap_or_default(),
        )
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// HTTP status this error will be rendered with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Known { code, .. } => code.status_code(),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(err) => database_error_parts(err).0,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Constraint name to `(field, message)` as reported to clients.
const KNOWN_CONSTRAINTS: &[(&str, &str, &str)] = &[
    ("recipes_category_id_fkey", "categoryId", "Category not found"),
    ("recipes_area_id_fkey", "areaId", "Area not found"),
    ("recipes_owner_id_fkey", "ownerId", "User not found"),
    ("recipes_time_check", "time", "Time must be a positive number of minutes"),
    ("recipe_ingredients_ingredient_id_fkey", "ingredients", "Ingredient not found"),
    ("recipe_ingredients_recipe_id_fkey", "recipeId", "Recipe not found"),
    ("user_favorite_recipes_recipe_id_fkey", "recipeId", "Recipe not found"),
    ("user_favorite_recipes_user_id_fkey", "userId", "User not found"),
    ("user_followers_follower_id_fkey", "userId", "User not found"),
    ("user_followers_following_id_fkey", "userId", "User not found"),
    ("user_followers_no_self_follow", "id", "You cannot follow yourself"),
];

/// Never echoes the database message, it names tables and constraints.
fn constraint_field_error(
    kind: &DatabaseErrorKind,
    constraint: Option<&str>,
    column: Option<&str>,
) -> FieldError {
    if let Some((_, field, message)) = constraint
        .and_then(|name| KNOWN_CONSTRAINTS.iter().find(|(known, _, _)| *known == name))
    {
        return FieldError::new(*field, *message);
    }

    let field = column.map(camel_case).unwrap_or_else(|| "request".to_string());
    let message = match kind {
        DatabaseErrorKind::ForeignKeyViolation => "Referenced record does not exist",
        DatabaseErrorKind::NotNullViolation => "Value is required",
        _ => "Invalid value",
    };
    FieldError::new(field, message)
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Translates the storage-layer error shapes the API knows about.
/// Anything unrecognised becomes a sanitized 500.
fn database_error_parts(err: &DieselError) -> (StatusCode, ApiErrorResponse) {
    match err {
        DieselError::NotFound => (
            StatusCode::NOT_FOUND,
            ApiErrorResponse::new(ErrorCode::NotFound.code(), "Resource not found"),
        ),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => (
            StatusCode::CONFLICT,
            ApiErrorResponse::new(ErrorCode::Conflict.code(), "Resource already exists"),
        ),
        DieselError::DatabaseError(
            kind @ (DatabaseErrorKind::ForeignKeyViolation
            | DatabaseErrorKind::CheckViolation
            | DatabaseErrorKind::NotNullViolation),
            info,
        ) => {
            let errors = vec![constraint_field_error(kind, info.constraint_name(), info.column_name())];
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiErrorResponse::new(ErrorCode::UnprocessableEntity.code(), "Validation failed")
                    .with_errors(serde_json::to_value(errors).unwrap_or_default()),
            )
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorResponse::new(ErrorCode::InternalError.code(), "Internal Server Error"),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                if status.is_server_error() {
                    tracing::error!(code = code.code(), error = %message, "request failed");
                }
                let public_message = match code {
                    ErrorCode::InternalError => "Internal Server Error",
                    _ => message.as_str(),
                };
                let mut resp = ApiErrorResponse::new(code.code(), public_message);
                if let Some(d) = details {
                    resp = resp.with_errors(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new(ErrorCode::InternalError.code(), "Internal Server Error"),
                )
            }
            AppError::Database(err) => {
                let (status, resp) = database_error_parts(err);
                if status.is_server_error() {
                    tracing::error!(error = %err, "database error");
                } else {
                    tracing::warn!(error = %err, status = status.as_u16(), "database constraint rejected request");
                }
                (status, resp)
            }
            AppError::Validation(errs) => {
                let errors = FieldError::from_validation(errs);
                (
                    StatusCode::BAD_REQUEST,
                    ApiErrorResponse::new(ErrorCode::ValidationError.code(), "Validation failed")
                        .with_errors(serde_json::to_value(errors).unwrap_or_default()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[derive(Validate)]
    struct Signup {
        #[validate(length(min = 2, message = "name must be at least 2 characters"))]
        display_name: String,
    }

    #[test]
    fn taxonomy_status_codes() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::NotRecipeOwner.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::RecipeNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::EmailAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::UnprocessableEntity.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ErrorCode::InternalError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn known_error_uses_envelope() {
        let (status, value) = body_json(AppError::new(ErrorCode::RecipeNotFound, "Recipe not found")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Recipe not found");
        assert_eq!(value["code"], "E3001");
        assert!(value.get("errors").is_none());
    }

    #[tokio::test]
    async fn internal_error_is_sanitized() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let (status, value) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn diesel_not_found_maps_to_404() {
        let (status, value) = body_json(AppError::Database(DieselError::NotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["code"], "E0003");
    }

    #[tokio::test]
    async fn unique_violation_maps_to_conflict() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint \"users_email_key\"".to_string()),
        );
        let (status, value) = body_json(AppError::Database(err)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(value["message"], "Resource already exists");
    }

    struct PgViolation {
        constraint: Option<&'static str>,
        column: Option<&'static str>,
    }

    impl diesel::result::DatabaseErrorInformation for PgViolation {
        fn message(&self) -> &str {
            "insert or update on table \"recipes\" violates foreign key constraint"
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            Some("recipes")
        }
        fn column_name(&self) -> Option<&str> {
            self.column
        }
        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn violation(kind: DatabaseErrorKind, constraint: Option<&'static str>, column: Option<&'static str>) -> AppError {
        AppError::Database(DieselError::DatabaseError(kind, Box::new(PgViolation { constraint, column })))
    }

    #[tokio::test]
    async fn known_constraint_gets_a_field_message() {
        let err = violation(DatabaseErrorKind::ForeignKeyViolation, Some("recipes_category_id_fkey"), None);
        let (status, value) = body_json(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(value["errors"][0]["field"], "categoryId");
        assert_eq!(value["errors"][0]["message"], "Category not found");

        let err = violation(
            DatabaseErrorKind::ForeignKeyViolation,
            Some("recipe_ingredients_ingredient_id_fkey"),
            None,
        );
        let (_, value) = body_json(err).await;
        assert_eq!(value["errors"][0]["field"], "ingredients");
    }

    #[tokio::test]
    async fn unknown_constraint_never_leaks_database_text() {
        let err = violation(DatabaseErrorKind::NotNullViolation, Some("mystery_check"), Some("owner_id"));
        let (_, value) = body_json(err).await;
        assert_eq!(value["errors"][0]["field"], "ownerId");
        assert_eq!(value["errors"][0]["message"], "Value is required");

        let err = DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new("insert or update violates foreign key constraint".to_string()),
        );
        let (status, value) = body_json(AppError::Database(err)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(value["errors"][0]["field"], "request");
        assert_eq!(value["errors"][0]["message"], "Referenced record does not exist");
        assert!(!value.to_string().contains("constraint"));
    }

    #[tokio::test]
    async fn validation_errors_are_listed_per_field() {
        let signup = Signup { display_name: "a".into() };
        let err = AppError::from(signup.validate().unwrap_err());
        let (status, value) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["message"], "Validation failed");
        assert_eq!(value["errors"][0]["field"], "displayName");
        assert_eq!(value["errors"][0]["message"], "name must be at least 2 characters");
    }

    #[test]
    fn status_matches_rendered_response() {
        let err = AppError::Database(DieselError::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::new(ErrorCode::NotRecipeOwner, "Forbidden").status(), StatusCode::FORBIDDEN);
    }
}
