use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use foodies_shared::clients::db::run_blocking;
use foodies_shared::errors::{AppError, AppResult, ErrorCode};
use foodies_shared::types::auth::AuthUser;
use foodies_shared::types::pagination::{lenient_i64, paginate, Pagination, MAX_LIMIT};
use foodies_shared::types::{ApiErrorResponse, ApiResponse, Empty, FieldError};

use super::{multipart_error, parse_id, read_text, read_upload, Upload};
use crate::models::{PopularRecipe, RecipeDetails};
use crate::services::recipe_service::{
    self, CreateRecipe, IngredientInput, RecipeFilter, RecipePage, DEFAULT_POPULAR_LIMIT,
};
use crate::AppState;

pub const RECIPE_FOLDER: &str = "foodies/recipes";

#[derive(Debug, Serialize, ToSchema)]
pub struct RecipePayload {
    pub recipe: RecipeDetails,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PopularPayload {
    pub recipes: Vec<PopularRecipe>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RecipeListQuery {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub limit: Option<i64>,
    #[param(value_type = Option<Uuid>)]
    pub category_id: Option<String>,
    #[param(value_type = Option<Uuid>)]
    pub area_id: Option<String>,
    #[param(value_type = Option<Uuid>)]
    pub owner_id: Option<String>,
    /// Recipes that use this ingredient.
    #[param(value_type = Option<Uuid>)]
    pub ingredient_id: Option<String>,
    /// Case-insensitive match on title and description.
    pub search: Option<String>,
}

fn optional_uuid(field: &str, raw: Option<&str>, errors: &mut Vec<FieldError>) -> Option<Uuid> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(FieldError::new(field, "Invalid value"));
            None
        }
    }
}

impl RecipeListQuery {
    /// Blank filter values count as absent; malformed ids are rejected.
    pub fn into_parts(self) -> AppResult<(RecipeFilter, Pagination)> {
        let mut errors = Vec::new();
        let filter = RecipeFilter {
            category_id: optional_uuid("categoryId", self.category_id.as_deref(), &mut errors),
            area_id: optional_uuid("areaId", self.area_id.as_deref(), &mut errors),
            owner_id: optional_uuid("ownerId", self.owner_id.as_deref(), &mut errors),
            ingredient_id: optional_uuid("ingredientId", self.ingredient_id.as_deref(), &mut errors),
            search: self.search.filter(|s| !s.trim().is_empty()),
        };
        if !errors.is_empty() {
            return Err(AppError::invalid_fields(errors));
        }
        Ok((filter, paginate(self.page, self.limit)))
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PopularQuery {
    /// Defaults to 10, capped at 100.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub limit: Option<i64>,
}

impl PopularQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_POPULAR_LIMIT)
            .min(MAX_LIMIT)
    }
}

fn validate_uuid(value: &str) -> Result<(), ValidationError> {
    Uuid::parse_str(value.trim())
        .map(|_| ())
        .map_err(|_| ValidationError::new("uuid"))
}

/// Text parts of the multipart create form.
#[derive(Debug, Default, Validate)]
pub struct RecipeForm {
    #[validate(length(min = 3, message = "Title must be at least 3 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(min = 10, message = "Instructions must be at least 10 characters"))]
    pub instructions: String,
    #[validate(
        required(message = "Time is required"),
        range(min = 1, max = 2147483647, message = "Time must be a positive number of minutes")
    )]
    pub time: Option<i64>,
    #[validate(custom(function = "validate_uuid", message = "Invalid category id"))]
    pub category_id: String,
    #[validate(custom(function = "validate_uuid", message = "Invalid area id"))]
    pub area_id: String,
    pub ingredients: Vec<IngredientInput>,
}

/// Multipart body of `POST /recipes`.
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct CreateRecipeUpload {
    title: String,
    description: Option<String>,
    instructions: String,
    /// Minutes.
    time: i64,
    category_id: Uuid,
    area_id: Uuid,
    /// JSON array of `{"ingredientId", "measure"}` objects.
    ingredients: String,
    #[schema(value_type = Option<String>, format = Binary)]
    thumb: Option<Vec<u8>>,
}

/// A malformed ingredients payload is treated as an empty list.
pub fn parse_ingredients(raw: &str) -> Vec<IngredientInput> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    serde_json::from_str(raw).unwrap_or_default()
}

impl RecipeForm {
    fn into_create(self, thumb: Option<String>) -> AppResult<CreateRecipe> {
        self.validate()?;
        let category_id = Uuid::parse_str(self.category_id.trim())
            .map_err(|_| AppError::invalid_fields(vec![FieldError::new("categoryId", "Invalid category id")]))?;
        let area_id = Uuid::parse_str(self.area_id.trim())
            .map_err(|_| AppError::invalid_fields(vec![FieldError::new("areaId", "Invalid area id")]))?;

        Ok(CreateRecipe {
            title: self.title.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            instructions: self.instructions,
            time: self.time.unwrap_or_default() as i32,
            category_id: Some(category_id),
            area_id: Some(area_id),
            thumb,
            ingredients: self.ingredients,
        })
    }
}

async fn read_recipe_form(mut multipart: Multipart) -> AppResult<(RecipeForm, Option<Upload>)> {
    let mut form = RecipeForm::default();
    let mut thumb = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "thumb" => thumb = read_upload(field).await?,
            "title" => form.title = read_text(field).await?,
            "description" => form.description = Some(read_text(field).await?),
            "instructions" => form.instructions = read_text(field).await?,
            "time" => form.time = read_text(field).await?.trim().parse::<i64>().ok(),
            "categoryId" => form.category_id = read_text(field).await?,
            "areaId" => form.area_id = read_text(field).await?,
            "ingredients" => form.ingredients = parse_ingredients(&read_text(field).await?),
            _ => {}
        }
    }

    Ok((form, thumb))
}

// --- GET /recipes ---

#[utoipa::path(
    get,
    path = "/api/v1/recipes",
    tag = "recipes",
    params(RecipeListQuery),
    responses(
        (status = 200, description = "Newest recipes first", body = ApiResponse<RecipePage>),
        (status = 400, description = "Malformed filter id", body = ApiErrorResponse)
    )
)]
pub async fn list_recipes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecipeListQuery>,
) -> AppResult<Json<ApiResponse<RecipePage>>> {
    let (filter, pagination) = query.into_parts()?;
    let page = run_blocking(&state.db, move |conn| {
        recipe_service::list_recipes(conn, &filter, pagination)
    })
    .await?;
    Ok(Json(ApiResponse::ok(page, "Recipes fetched")))
}

// --- GET /recipes/popular ---

#[utoipa::path(
    get,
    path = "/api/v1/recipes/popular",
    tag = "recipes",
    params(PopularQuery),
    responses(
        (status = 200, description = "Most favorited recipes", body = ApiResponse<PopularPayload>)
    )
)]
pub async fn popular_recipes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PopularQuery>,
) -> AppResult<Json<ApiResponse<PopularPayload>>> {
    let limit = query.limit();
    let recipes = run_blocking(&state.db, move |conn| recipe_service::popular_recipes(conn, limit)).await?;
    Ok(Json(ApiResponse::ok(PopularPayload { recipes }, "Popular recipes fetched")))
}

// --- GET /recipes/:id ---

#[utoipa::path(
    get,
    path = "/api/v1/recipes/{id}",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Recipe with category, area, owner and ingredients", body = ApiResponse<RecipePayload>),
        (status = 400, description = "Malformed id", body = ApiErrorResponse),
        (status = 404, description = "Recipe not found", body = ApiErrorResponse)
    )
)]
pub async fn get_recipe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<RecipePayload>>> {
    let recipe_id = parse_id(&id)?;
    let recipe = run_blocking(&state.db, move |conn| recipe_service::get_recipe(conn, recipe_id))
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::RecipeNotFound, "Recipe not found"))?;
    Ok(Json(ApiResponse::ok(RecipePayload { recipe }, "Recipe fetched")))
}

// --- POST /recipes ---

#[utoipa::path(
    post,
    path = "/api/v1/recipes",
    tag = "recipes",
    request_body(content_type = "multipart/form-data", content = CreateRecipeUpload),
    responses(
        (status = 201, description = "Recipe created", body = ApiResponse<RecipePayload>),
        (status = 400, description = "Invalid form", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 413, description = "Thumbnail too large", body = ApiErrorResponse),
        (status = 422, description = "Unknown category, area or ingredient", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_recipe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<RecipePayload>>)> {
    let (form, upload) = read_recipe_form(multipart).await?;
    form.validate()?;

    let thumb = match upload {
        Some(Upload { content_type, bytes }) => {
            Some(state.storage.store(RECIPE_FOLDER, bytes, &content_type).await?)
        }
        None => None,
    };
    let input = form.into_create(thumb)?;

    let owner_id = user.id;
    let recipe = run_blocking(&state.db, move |conn| {
        recipe_service::create_recipe(conn, owner_id, &input)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(RecipePayload { recipe }, "Recipe created")),
    ))
}

// --- DELETE /recipes/:id ---

#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{id}",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Recipe deleted", body = ApiResponse<Empty>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Caller does not own the recipe", body = ApiErrorResponse),
        (status = 404, description = "Recipe not found", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_recipe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Empty>>> {
    let recipe_id = parse_id(&id)?;
    let user_id = user.id;
    run_blocking(&state.db, move |conn| recipe_service::delete_recipe(conn, user_id, recipe_id)).await?;
    Ok(Json(ApiResponse::message("Recipe deleted")))
}

// --- POST /recipes/:id/favorite ---

#[utoipa::path(
    post,
    path = "/api/v1/recipes/{id}/favorite",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe id")),
    responses(
        (status = 201, description = "Recipe is in the caller's favorites", body = ApiResponse<Empty>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Recipe not found", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_favorite(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<ApiResponse<Empty>>)> {
    let recipe_id = parse_id(&id)?;
    let user_id = user.id;
    run_blocking(&state.db, move |conn| recipe_service::add_favorite(conn, user_id, recipe_id)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::message("Recipe added to favorites"))))
}

// --- DELETE /recipes/:id/favorite ---

#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{id}/favorite",
    tag = "recipes",
    params(("id" = Uuid, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Recipe is no longer a favorite", body = ApiResponse<Empty>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_favorite(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Empty>>> {
    let recipe_id = parse_id(&id)?;
    let user_id = user.id;
    run_blocking(&state.db, move |conn| recipe_service::remove_favorite(conn, user_id, recipe_id)).await?;
    Ok(Json(ApiResponse::message("Recipe removed from favorites")))
}

#[derive(OpenApi)]
#[openapi(paths(
    list_recipes,
    popular_recipes,
    get_recipe,
    create_recipe,
    delete_recipe,
    add_favorite,
    remove_favorite,
))]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RecipeForm {
        RecipeForm {
            title: "Borscht".into(),
            description: None,
            instructions: "Simmer beets for an hour.".into(),
            time: Some(60),
            category_id: Uuid::new_v4().to_string(),
            area_id: Uuid::new_v4().to_string(),
            ingredients: Vec::new(),
        }
    }

    #[test]
    fn malformed_ingredients_become_empty() {
        assert!(parse_ingredients("not json").is_empty());
        assert!(parse_ingredients("").is_empty());
        assert!(parse_ingredients(r#"[{"ingredientId":"nope"}]"#).is_empty());
    }

    #[test]
    fn ingredients_parse_with_measures() {
        let id = Uuid::new_v4();
        let raw = format!(r#"[{{"ingredientId":"{id}","measure":"2 cups"}},{{"ingredientId":"{id}"}}]"#);
        let parsed = parse_ingredients(&raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].measure.as_deref(), Some("2 cups"));
        assert_eq!(parsed[1].measure, None);
    }

    #[test]
    fn form_validation_reports_each_field() {
        let form = RecipeForm {
            title: "ab".into(),
            instructions: "short".into(),
            time: Some(0),
            category_id: "x".into(),
            area_id: String::new(),
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["title", "instructions", "time", "category_id", "area_id"] {
            assert!(fields.contains_key(field), "missing error for {field}");
        }
    }

    #[test]
    fn missing_time_is_rejected() {
        let form = RecipeForm { time: None, ..valid_form() };
        assert!(form.validate().unwrap_err().field_errors().contains_key("time"));
    }

    #[test]
    fn valid_form_converts() {
        let input = valid_form().into_create(Some("data:image/png;base64,AA==".into())).unwrap();
        assert_eq!(input.time, 60);
        assert!(input.category_id.is_some());
        assert_eq!(input.thumb.as_deref(), Some("data:image/png;base64,AA=="));
    }

    #[test]
    fn list_query_rejects_bad_ids_and_ignores_blanks() {
        let query = RecipeListQuery {
            category_id: Some("garbage".into()),
            area_id: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(query.into_parts().unwrap_err().status(), StatusCode::BAD_REQUEST);

        let owner = Uuid::new_v4();
        let query = RecipeListQuery {
            owner_id: Some(owner.to_string()),
            search: Some("   ".into()),
            page: Some(3),
            limit: Some(20),
            ..Default::default()
        };
        let (filter, pagination) = query.into_parts().unwrap();
        assert_eq!(filter.owner_id, Some(owner));
        assert_eq!(filter.search, None);
        assert_eq!((pagination.page, pagination.limit, pagination.offset), (3, 20, 40));
    }

    #[test]
    fn popular_limit_defaults_and_caps() {
        assert_eq!(PopularQuery { limit: None }.limit(), 10);
        assert_eq!(PopularQuery { limit: Some(0) }.limit(), 10);
        assert_eq!(PopularQuery { limit: Some(-5) }.limit(), 10);
        assert_eq!(PopularQuery { limit: Some(3) }.limit(), 3);
        assert_eq!(PopularQuery { limit: Some(1000) }.limit(), 100);
    }
}
