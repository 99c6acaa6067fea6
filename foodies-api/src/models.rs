use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::{
    areas, categories, ingredients, recipe_ingredients, recipes, testimonials,
    user_favorite_recipes, user_followers, users,
};

// --- User ---

#[derive(Debug, Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Public projection used for recipe owners and social lists.
#[derive(Debug, Queryable, Selectable, Serialize, Clone, PartialEq, ToSchema)]
#[diesel(table_name = users)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Queryable, Selectable, Clone)]
#[diesel(table_name = users)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub recipes_count: i64,
    pub favorites_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
}

#[derive(Debug, Serialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub stats: UserStats,
}

impl UserProfile {
    pub fn new(record: UserRecord, stats: UserStats) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            avatar: record.avatar,
            created_at: record.created_at,
            stats,
        }
    }
}

// --- Lookups ---

#[derive(Debug, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = categories)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = areas)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = ingredients)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = testimonials)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: Uuid,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub content: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `{id, name}` reference to a category or area.
#[derive(Debug, Queryable, Serialize, Clone, PartialEq, ToSchema)]
pub struct NamedRef {
    pub id: Uuid,
    pub name: String,
}

// --- Recipe ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone, ToSchema)]
#[diesel(table_name = recipes)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub instructions: String,
    pub time: i32,
    pub thumb: Option<String>,
    pub category_id: Option<Uuid>,
    pub area_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = recipes)]
pub struct NewRecipe<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub instructions: &'a str,
    pub time: i32,
    pub thumb: Option<&'a str>,
    pub category_id: Option<Uuid>,
    pub area_id: Option<Uuid>,
    pub owner_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = recipe_ingredients)]
pub struct NewRecipeIngredient<'a> {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub measure: Option<&'a str>,
}

/// Ingredient as attached to a recipe, with the recipe-specific measure.
#[derive(Debug, Queryable, Serialize, Clone, PartialEq, ToSchema)]
pub struct RecipeIngredientView {
    pub id: Uuid,
    pub name: String,
    pub measure: Option<String>,
}

/// A recipe with its category, area, owner and ingredient list attached.
#[derive(Debug, Serialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetails {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub category: Option<NamedRef>,
    pub area: Option<NamedRef>,
    pub owner: UserSummary,
    pub ingredients: Vec<RecipeIngredientView>,
}

#[derive(Debug, Serialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PopularRecipe {
    #[serde(flatten)]
    pub recipe: RecipeDetails,
    pub favorites_count: i64,
}

// --- Social ---

#[derive(Debug, Insertable)]
#[diesel(table_name = user_followers)]
pub struct NewFollow {
    pub follower_id: Uuid,
    pub following_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_favorite_recipes)]
pub struct NewFavorite {
    pub user_id: Uuid,
    pub recipe_id: Uuid,
}
