use std::collections::HashMap;

use diesel::dsl::count;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use foodies_shared::errors::{AppError, AppResult, ErrorCode};
use foodies_shared::types::pagination::{PageMeta, Pagination};

use crate::models::{
    NamedRef, NewFavorite, NewRecipe, NewRecipeIngredient, PopularRecipe, Recipe, RecipeDetails,
    RecipeIngredientView, UserSummary,
};
use crate::schema::{
    areas, categories, ingredients, recipe_ingredients, recipes, user_favorite_recipes, users,
};

pub const DEFAULT_POPULAR_LIMIT: i64 = 10;

/// Optional list filters. Present filters are AND-ed together.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub category_id: Option<Uuid>,
    pub area_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub ingredient_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecipePage {
    pub recipes: Vec<RecipeDetails>,
    pub pagination: PageMeta,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngredientInput {
    pub ingredient_id: Uuid,
    #[serde(default)]
    pub measure: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateRecipe {
    pub title: String,
    pub description: Option<String>,
    pub instructions: String,
    pub time: i32,
    pub category_id: Option<Uuid>,
    pub area_id: Option<Uuid>,
    pub thumb: Option<String>,
    pub ingredients: Vec<IngredientInput>,
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn filtered(filter: &RecipeFilter) -> recipes::BoxedQuery<'static, Pg> {
    let mut query = recipes::table.into_boxed();

    if let Some(category_id) = filter.category_id {
        query = query.filter(recipes::category_id.eq(category_id));
    }
    if let Some(area_id) = filter.area_id {
        query = query.filter(recipes::area_id.eq(area_id));
    }
    if let Some(owner_id) = filter.owner_id {
        query = query.filter(recipes::owner_id.eq(owner_id));
    }
    // Membership test only, the hydrated ingredient list stays complete.
    if let Some(ingredient_id) = filter.ingredient_id {
        query = query.filter(
            recipes::id.eq_any(
                recipe_ingredients::table
                    .filter(recipe_ingredients::ingredient_id.eq(ingredient_id))
                    .select(recipe_ingredients::recipe_id),
            ),
        );
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        query = query.filter(
            recipes::title
                .ilike(pattern.clone())
                .or(recipes::description.ilike(pattern)),
        );
    }

    query
}

/// Filtered, newest-first page of recipes plus the pagination block.
/// A page past the end yields an empty list, not an error.
pub fn list_recipes(
    conn: &mut PgConnection,
    filter: &RecipeFilter,
    pagination: Pagination,
) -> AppResult<RecipePage> {
    let total: i64 = filtered(filter).count().get_result(conn)?;

    let ids: Vec<Uuid> = filtered(filter)
        .order((recipes::created_at.desc(), recipes::id.desc()))
        .select(recipes::id)
        .limit(pagination.limit)
        .offset(pagination.offset)
        .load(conn)?;

    let recipes = load_details(conn, &ids)?;

    Ok(RecipePage {
        recipes,
        pagination: PageMeta::new(total, &pagination),
    })
}

pub fn get_recipe(conn: &mut PgConnection, recipe_id: Uuid) -> AppResult<Option<RecipeDetails>> {
    Ok(load_details(conn, &[recipe_id])?.into_iter().next())
}

/// Recipes ranked by how many users favorited them.
pub fn popular_recipes(conn: &mut PgConnection, limit: i64) -> AppResult<Vec<PopularRecipe>> {
    let ranked: Vec<(Uuid, i64)> = recipes::table
        .left_join(user_favorite_recipes::table)
        .group_by(recipes::id)
        .select((recipes::id, count(user_favorite_recipes::id.nullable())))
        .order_by((
            count(user_favorite_recipes::id.nullable()).desc(),
            recipes::created_at.desc(),
            recipes::id.asc(),
        ))
        .limit(limit.max(1))
        .load(conn)?;

    let ids: Vec<Uuid> = ranked.iter().map(|(id, _)| *id).collect();
    let counts: HashMap<Uuid, i64> = ranked.into_iter().collect();

    let popular = load_details(conn, &ids)?
        .into_iter()
        .map(|recipe| {
            let favorites_count = counts.get(&recipe.recipe.id).copied().unwrap_or(0);
            PopularRecipe { recipe, favorites_count }
        })
        .collect();

    Ok(popular)
}

/// Inserts the recipe and its ingredient rows atomically, then re-reads it hydrated.
pub fn create_recipe(
    conn: &mut PgConnection,
    owner_id: Uuid,
    input: &CreateRecipe,
) -> AppResult<RecipeDetails> {
    let recipe_id = conn.transaction::<Uuid, AppError, _>(|conn| {
        let recipe_id: Uuid = diesel::insert_into(recipes::table)
            .values(&NewRecipe {
                title: &input.title,
                description: input.description.as_deref(),
                instructions: &input.instructions,
                time: input.time,
                thumb: input.thumb.as_deref(),
                category_id: input.category_id,
                area_id: input.area_id,
                owner_id,
            })
            .returning(recipes::id)
            .get_result(conn)?;

        if !input.ingredients.is_empty() {
            let rows: Vec<NewRecipeIngredient> = input
                .ingredients
                .iter()
                .map(|item| NewRecipeIngredient {
                    recipe_id,
                    ingredient_id: item.ingredient_id,
                    measure: item.measure.as_deref(),
                })
                .collect();

            diesel::insert_into(recipe_ingredients::table)
                .values(&rows)
                .execute(conn)?;
        }

        Ok(recipe_id)
    })?;

    tracing::info!(
        recipe_id = %recipe_id,
        owner_id = %owner_id,
        ingredients = input.ingredients.len(),
        "recipe created"
    );

    get_recipe(conn, recipe_id)?
        .ok_or_else(|| AppError::new(ErrorCode::RecipeNotFound, "Recipe not found"))
}

/// Owner-only hard delete. Non-owners are rejected before any row is touched.
pub fn delete_recipe(conn: &mut PgConnection, user_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
    let owner_id: Uuid = recipes::table
        .find(recipe_id)
        .select(recipes::owner_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::RecipeNotFound, "Recipe not found"))?;

    if owner_id != user_id {
        return Err(AppError::new(ErrorCode::NotRecipeOwner, "Forbidden"));
    }

    diesel::delete(recipes::table.find(recipe_id)).execute(conn)?;

    tracing::info!(recipe_id = %recipe_id, user_id = %user_id, "recipe deleted");
    Ok(())
}

pub fn recipe_exists(conn: &mut PgConnection, recipe_id: Uuid) -> AppResult<bool> {
    let found = diesel::select(diesel::dsl::exists(recipes::table.find(recipe_id)))
        .get_result::<bool>(conn)?;
    Ok(found)
}

/// Idempotent: favoriting twice leaves a single row.
pub fn add_favorite(conn: &mut PgConnection, user_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
    if !recipe_exists(conn, recipe_id)? {
        return Err(AppError::new(ErrorCode::RecipeNotFound, "Recipe not found"));
    }

    let inserted = diesel::insert_into(user_favorite_recipes::table)
        .values(&NewFavorite { user_id, recipe_id })
        .on_conflict((user_favorite_recipes::user_id, user_favorite_recipes::recipe_id))
        .do_nothing()
        .execute(conn)?;

    tracing::debug!(recipe_id = %recipe_id, user_id = %user_id, inserted, "recipe favorited");
    Ok(())
}

/// Idempotent: removing a favorite that does not exist succeeds.
pub fn remove_favorite(conn: &mut PgConnection, user_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
    diesel::delete(
        user_favorite_recipes::table
            .filter(user_favorite_recipes::user_id.eq(user_id))
            .filter(user_favorite_recipes::recipe_id.eq(recipe_id)),
    )
    .execute(conn)?;
    Ok(())
}

type RecipeRow = (Recipe, Option<NamedRef>, Option<NamedRef>, UserSummary);

/// Loads recipes by id with category, area, owner and ingredients attached,
/// preserving the order of `ids`.
pub fn load_details(conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<Vec<RecipeDetails>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<RecipeRow> = recipes::table
        .left_join(categories::table)
        .left_join(areas::table)
        .inner_join(users::table)
        .filter(recipes::id.eq_any(ids))
        .select((
            Recipe::as_select(),
            (categories::id, categories::name).nullable(),
            (areas::id, areas::name).nullable(),
            UserSummary::as_select(),
        ))
        .load(conn)?;

    let ingredient_rows: Vec<(Uuid, RecipeIngredientView)> = recipe_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_ingredients::recipe_id.eq_any(ids))
        .order((ingredients::name.asc(), recipe_ingredients::id.asc()))
        .select((
            recipe_ingredients::recipe_id,
            (ingredients::id, ingredients::name, recipe_ingredients::measure),
        ))
        .load(conn)?;

    let mut by_recipe: HashMap<Uuid, Vec<RecipeIngredientView>> = HashMap::new();
    for (recipe_id, ingredient) in ingredient_rows {
        by_recipe.entry(recipe_id).or_default().push(ingredient);
    }

    let mut details: Vec<RecipeDetails> = rows
        .into_iter()
        .map(|(recipe, category, area, owner)| {
            let ingredients = by_recipe.remove(&recipe.id).unwrap_or_default();
            RecipeDetails { recipe, category, area, owner, ingredients }
        })
        .collect();

    let id_order: HashMap<Uuid, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    details.sort_by_key(|d| id_order.get(&d.recipe.id).copied().unwrap_or(usize::MAX));

    Ok(details)
}
