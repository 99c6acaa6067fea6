use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use foodies_shared::errors::AppResult;
use foodies_shared::types::pagination::{PageMeta, Pagination};

use crate::models::{Area, Category, Ingredient, Testimonial};
use crate::schema::{areas, categories, ingredients, testimonials};

#[derive(Debug, Serialize, ToSchema)]
pub struct IngredientPage {
    pub ingredients: Vec<Ingredient>,
    pub pagination: PageMeta,
}

pub fn list_categories(conn: &mut PgConnection) -> AppResult<Vec<Category>> {
    Ok(categories::table
        .order(categories::name.asc())
        .select(Category::as_select())
        .load(conn)?)
}

pub fn list_areas(conn: &mut PgConnection) -> AppResult<Vec<Area>> {
    Ok(areas::table
        .order(areas::name.asc())
        .select(Area::as_select())
        .load(conn)?)
}

pub fn list_ingredients(conn: &mut PgConnection, pagination: Pagination) -> AppResult<IngredientPage> {
    let total: i64 = ingredients::table.count().get_result(conn)?;
    let rows = ingredients::table
        .order(ingredients::name.asc())
        .select(Ingredient::as_select())
        .limit(pagination.limit)
        .offset(pagination.offset)
        .load(conn)?;

    Ok(IngredientPage {
        ingredients: rows,
        pagination: PageMeta::new(total, &pagination),
    })
}

pub fn list_testimonials(conn: &mut PgConnection) -> AppResult<Vec<Testimonial>> {
    Ok(testimonials::table
        .order(testimonials::created_at.desc())
        .select(Testimonial::as_select())
        .load(conn)?)
}
