use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use foodies_shared::clients::db::run_blocking;
use foodies_shared::errors::AppResult;
use foodies_shared::types::pagination::PaginationParams;
use foodies_shared::types::ApiResponse;

use crate::models::{Area, Category, Testimonial};
use crate::services::catalog_service::{self, IngredientPage};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoriesPayload {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AreasPayload {
    pub areas: Vec<Area>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TestimonialsPayload {
    pub testimonials: Vec<Testimonial>,
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "catalog",
    responses(
        (status = 200, description = "All categories by name", body = ApiResponse<CategoriesPayload>)
    )
)]
pub async fn categories(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<CategoriesPayload>>> {
    let categories = run_blocking(&state.db, catalog_service::list_categories).await?;
    Ok(Json(ApiResponse::ok(CategoriesPayload { categories }, "Categories fetched")))
}

#[utoipa::path(
    get,
    path = "/api/v1/areas",
    tag = "catalog",
    responses(
        (status = 200, description = "All areas by name", body = ApiResponse<AreasPayload>)
    )
)]
pub async fn areas(State(state): State<Arc<AppState>>) -> AppResult<Json<ApiResponse<AreasPayload>>> {
    let areas = run_blocking(&state.db, catalog_service::list_areas).await?;
    Ok(Json(ApiResponse::ok(AreasPayload { areas }, "Areas fetched")))
}

#[utoipa::path(
    get,
    path = "/api/v1/ingredients",
    tag = "catalog",
    params(PaginationParams),
    responses(
        (status = 200, description = "One page of ingredients by name", body = ApiResponse<IngredientPage>)
    )
)]
pub async fn ingredients(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<IngredientPage>>> {
    let pagination = params.paginate();
    let page = run_blocking(&state.db, move |conn| {
        catalog_service::list_ingredients(conn, pagination)
    })
    .await?;
    Ok(Json(ApiResponse::ok(page, "Ingredients fetched")))
}

#[utoipa::path(
    get,
    path = "/api/v1/testimonials",
    tag = "catalog",
    responses(
        (status = 200, description = "Newest testimonials first", body = ApiResponse<TestimonialsPayload>)
    )
)]
pub async fn testimonials(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<TestimonialsPayload>>> {
    let testimonials = run_blocking(&state.db, catalog_service::list_testimonials).await?;
    Ok(Json(ApiResponse::ok(TestimonialsPayload { testimonials }, "Testimonials fetched")))
}

#[derive(OpenApi)]
#[openapi(paths(categories, areas, ingredients, testimonials))]
pub struct ApiDoc;
