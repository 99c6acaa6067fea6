//! Reference data loader.
//!
//! Ids are UUIDv5 over the source document keys, so re-running the seed
//! against a populated database inserts nothing and existing rows keep
//! their ids across environments.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use diesel::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::schema::{areas, categories, ingredients, recipe_ingredients, recipes, testimonials, users};
use crate::services::auth_service::{hash_password, normalize_email};

pub const CATEGORY_NAMESPACE: Uuid = Uuid::from_u128(0x123e4567_e89b_12d3_a456_426614174000);
pub const AREA_NAMESPACE: Uuid = Uuid::from_u128(0x223e4567_e89b_12d3_a456_426614174000);
pub const INGREDIENT_NAMESPACE: Uuid = Uuid::from_u128(0x323e4567_e89b_12d3_a456_426614174000);
pub const USER_NAMESPACE: Uuid = Uuid::from_u128(0x423e4567_e89b_12d3_a456_426614174000);
pub const TESTIMONIAL_NAMESPACE: Uuid = Uuid::from_u128(0x523e4567_e89b_12d3_a456_426614174000);
pub const RECIPE_NAMESPACE: Uuid = Uuid::from_u128(0x623e4567_e89b_12d3_a456_426614174000);
pub const RECIPE_INGREDIENT_NAMESPACE: Uuid = Uuid::from_u128(0x723e4567_e89b_12d3_a456_426614174000);

/// Login password of every seeded account.
pub const SEED_PASSWORD: &str = "password123";
const FALLBACK_USER_NAME: &str = "Foodies User";
const TESTIMONIAL_RATING: i32 = 5;

pub fn seed_id(namespace: Uuid, key: &str) -> Uuid {
    Uuid::new_v5(&namespace, key.as_bytes())
}

/// Document key, either `{"$oid": "..."}` or a bare string.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SourceId {
    Oid {
        #[serde(rename = "$oid")]
        oid: String,
    },
    Plain(String),
}

impl SourceId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Oid { oid } => oid,
            Self::Plain(s) => s,
        }
    }
}

/// Cooking time, exported as a number or a numeric string.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Minutes {
    Number(f64),
    Text(String),
}

impl Minutes {
    /// Whole minutes, or `None` when the value is not a positive number.
    pub fn to_minutes(&self) -> Option<i32> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        let minutes = value.trunc();
        if minutes >= 1.0 && minutes <= i32::MAX as f64 {
            Some(minutes as i32)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryDoc {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AreaDoc {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientDoc {
    #[serde(rename = "_id")]
    pub id: SourceId,
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: SourceId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestimonialDoc {
    #[serde(rename = "_id")]
    pub id: SourceId,
    #[serde(default)]
    pub owner: Option<SourceId>,
    pub testimonial: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeIngredientDoc {
    pub id: String,
    #[serde(default)]
    pub measure: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeDoc {
    #[serde(rename = "_id")]
    pub id: SourceId,
    pub title: String,
    pub category: String,
    pub area: String,
    pub owner: SourceId,
    #[serde(default)]
    pub description: Option<String>,
    pub instructions: String,
    #[serde(default)]
    pub thumb: Option<String>,
    pub time: Minutes,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredientDoc>,
}

#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub categories: Vec<CategoryDoc>,
    pub areas: Vec<AreaDoc>,
    pub ingredients: Vec<IngredientDoc>,
    pub users: Vec<UserDoc>,
    pub testimonials: Vec<TestimonialDoc>,
    pub recipes: Vec<RecipeDoc>,
}

const FILES: [&str; 6] = [
    "categories.json",
    "areas.json",
    "ingredients.json",
    "users.json",
    "testimonials.json",
    "recipes.json",
];

fn parse<T: serde::de::DeserializeOwned>(name: &str, raw: &str) -> anyhow::Result<Vec<T>> {
    serde_json::from_str(raw).with_context(|| format!("invalid seed file {name}"))
}

impl SeedData {
    /// The dataset compiled into the binary.
    pub fn bundled() -> anyhow::Result<Self> {
        Ok(Self {
            categories: parse(FILES[0], include_str!("../seed/categories.json"))?,
            areas: parse(FILES[1], include_str!("../seed/areas.json"))?,
            ingredients: parse(FILES[2], include_str!("../seed/ingredients.json"))?,
            users: parse(FILES[3], include_str!("../seed/users.json"))?,
            testimonials: parse(FILES[4], include_str!("../seed/testimonials.json"))?,
            recipes: parse(FILES[5], include_str!("../seed/recipes.json"))?,
        })
    }

    /// Reads the six export files from `dir`.
    pub fn from_dir(dir: &Path) -> anyhow::Result<Self> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read seed file {}", path.display()))
        };
        Ok(Self {
            categories: parse(FILES[0], &read(FILES[0])?)?,
            areas: parse(FILES[1], &read(FILES[1])?)?,
            ingredients: parse(FILES[2], &read(FILES[2])?)?,
            users: parse(FILES[3], &read(FILES[3])?)?,
            testimonials: parse(FILES[4], &read(FILES[4])?)?,
            recipes: parse(FILES[5], &read(FILES[5])?)?,
        })
    }

    /// Files from `dir` when given, otherwise the bundled dataset.
    pub fn load(dir: Option<&str>) -> anyhow::Result<Self> {
        match dir {
            Some(dir) => Self::from_dir(Path::new(dir)),
            None => Self::bundled(),
        }
    }

    /// Dangling references and unusable values, one message per problem.
    pub fn check(&self) -> Vec<String> {
        let categories: HashSet<&str> = self.categories.iter().map(|c| c.name.as_str()).collect();
        let areas: HashSet<&str> = self.areas.iter().map(|a| a.name.as_str()).collect();
        let ingredients: HashSet<&str> = self.ingredients.iter().map(|i| i.id.as_str()).collect();
        let users: HashSet<&str> = self.users.iter().map(|u| u.id.as_str()).collect();

        // Testimonials with an unknown author fall back to a generic name.
        let mut problems = Vec::new();
        for r in &self.recipes {
            let id = r.id.as_str();
            if !categories.contains(r.category.as_str()) {
                problems.push(format!("recipe {id}: unknown category {}", r.category));
            }
            if !areas.contains(r.area.as_str()) {
                problems.push(format!("recipe {id}: unknown area {}", r.area));
            }
            if !users.contains(r.owner.as_str()) {
                problems.push(format!("recipe {id}: unknown owner {}", r.owner.as_str()));
            }
            if r.time.to_minutes().is_none() {
                problems.push(format!("recipe {id}: time must be a positive number of minutes"));
            }
            for i in &r.ingredients {
                if !ingredients.contains(i.id.as_str()) {
                    problems.push(format!("recipe {id}: unknown ingredient {}", i.id));
                }
            }
        }
        problems
    }
}

/// Rows inserted per table. Rows already present are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub areas: usize,
    pub ingredients: usize,
    pub users: usize,
    pub testimonials: usize,
    pub recipes: usize,
    pub recipe_ingredients: usize,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.categories
            + self.areas
            + self.ingredients
            + self.users
            + self.testimonials
            + self.recipes
            + self.recipe_ingredients
    }
}

#[derive(Insertable)]
#[diesel(table_name = categories)]
struct SeedCategory<'a> {
    id: Uuid,
    name: &'a str,
    description: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = areas)]
struct SeedArea<'a> {
    id: Uuid,
    name: &'a str,
    description: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = ingredients)]
struct SeedIngredient<'a> {
    id: Uuid,
    name: &'a str,
    description: Option<&'a str>,
    image: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct SeedUser<'a> {
    id: Uuid,
    name: &'a str,
    email: String,
    password: &'a str,
    avatar: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = testimonials)]
struct SeedTestimonial<'a> {
    id: Uuid,
    user_name: &'a str,
    user_avatar: Option<&'a str>,
    content: &'a str,
    rating: i32,
}

#[derive(Insertable)]
#[diesel(table_name = recipes)]
struct SeedRecipe<'a> {
    id: Uuid,
    title: &'a str,
    description: Option<&'a str>,
    instructions: &'a str,
    time: i32,
    thumb: Option<&'a str>,
    category_id: Option<Uuid>,
    area_id: Option<Uuid>,
    owner_id: Uuid,
}

#[derive(Insertable)]
#[diesel(table_name = recipe_ingredients)]
struct SeedRecipeIngredient<'a> {
    id: Uuid,
    recipe_id: Uuid,
    ingredient_id: Uuid,
    measure: Option<&'a str>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Inserts the dataset in one transaction. Existing rows are left untouched.
pub fn run(conn: &mut PgConnection, data: &SeedData) -> anyhow::Result<SeedReport> {
    let problems = data.check();
    if !problems.is_empty() {
        anyhow::bail!("seed data is inconsistent: {}", problems.join("; "));
    }

    let password = hash_password(SEED_PASSWORD)?;
    let users_by_source: HashMap<&str, &UserDoc> =
        data.users.iter().map(|u| (u.id.as_str(), u)).collect();

    let category_rows: Vec<SeedCategory> = data
        .categories
        .iter()
        .map(|c| SeedCategory {
            id: seed_id(CATEGORY_NAMESPACE, &c.name),
            name: &c.name,
            description: non_empty(&c.description),
        })
        .collect();

    let area_rows: Vec<SeedArea> = data
        .areas
        .iter()
        .map(|a| SeedArea {
            id: seed_id(AREA_NAMESPACE, &a.name),
            name: &a.name,
            description: non_empty(&a.description),
        })
        .collect();

    let ingredient_rows: Vec<SeedIngredient> = data
        .ingredients
        .iter()
        .map(|i| SeedIngredient {
            id: seed_id(INGREDIENT_NAMESPACE, i.id.as_str()),
            name: &i.name,
            description: non_empty(&i.desc),
            image: non_empty(&i.img),
        })
        .collect();

    let user_rows: Vec<SeedUser> = data
        .users
        .iter()
        .map(|u| SeedUser {
            id: seed_id(USER_NAMESPACE, u.id.as_str()),
            name: &u.name,
            email: normalize_email(&u.email),
            password: &password,
            avatar: non_empty(&u.avatar),
        })
        .collect();

    let testimonial_rows: Vec<SeedTestimonial> = data
        .testimonials
        .iter()
        .map(|t| {
            let author = t
                .owner
                .as_ref()
                .and_then(|o| users_by_source.get(o.as_str()))
                .copied();
            SeedTestimonial {
                id: seed_id(TESTIMONIAL_NAMESPACE, t.id.as_str()),
                user_name: author
                    .map(|u| u.name.as_str())
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(FALLBACK_USER_NAME),
                user_avatar: author.and_then(|u| non_empty(&u.avatar)),
                content: &t.testimonial,
                rating: TESTIMONIAL_RATING,
            }
        })
        .collect();

    let mut recipe_rows = Vec::with_capacity(data.recipes.len());
    let mut link_rows = Vec::new();
    for r in &data.recipes {
        let recipe_id = seed_id(RECIPE_NAMESPACE, r.id.as_str());
        let time = r
            .time
            .to_minutes()
            .with_context(|| format!("recipe {} has no usable time", r.id.as_str()))?;
        recipe_rows.push(SeedRecipe {
            id: recipe_id,
            title: &r.title,
            description: non_empty(&r.description),
            instructions: &r.instructions,
            time,
            thumb: non_empty(&r.thumb),
            category_id: Some(seed_id(CATEGORY_NAMESPACE, &r.category)),
            area_id: Some(seed_id(AREA_NAMESPACE, &r.area)),
            owner_id: seed_id(USER_NAMESPACE, r.owner.as_str()),
        });
        for i in &r.ingredients {
            let ingredient_id = seed_id(INGREDIENT_NAMESPACE, &i.id);
            link_rows.push(SeedRecipeIngredient {
                id: seed_id(RECIPE_INGREDIENT_NAMESPACE, &format!("{recipe_id}-{ingredient_id}")),
                recipe_id,
                ingredient_id,
                measure: non_empty(&i.measure),
            });
        }
    }

    let report = conn.transaction::<_, anyhow::Error, _>(|conn| {
        let mut report = SeedReport::default();
        if !category_rows.is_empty() {
            report.categories = diesel::insert_into(categories::table)
                .values(&category_rows)
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        if !area_rows.is_empty() {
            report.areas = diesel::insert_into(areas::table)
                .values(&area_rows)
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        if !ingredient_rows.is_empty() {
            report.ingredients = diesel::insert_into(ingredients::table)
                .values(&ingredient_rows)
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        if !user_rows.is_empty() {
            report.users = diesel::insert_into(users::table)
                .values(&user_rows)
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        if !testimonial_rows.is_empty() {
            report.testimonials = diesel::insert_into(testimonials::table)
                .values(&testimonial_rows)
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        if !recipe_rows.is_empty() {
            report.recipes = diesel::insert_into(recipes::table)
                .values(&recipe_rows)
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        if !link_rows.is_empty() {
            report.recipe_ingredients = diesel::insert_into(recipe_ingredients::table)
                .values(&link_rows)
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        Ok(report)
    })?;

    tracing::info!(
        categories = report.categories,
        areas = report.areas,
        ingredients = report.ingredients,
        users = report.users,
        testimonials = report.testimonials,
        recipes = report.recipes,
        recipe_ingredients = report.recipe_ingredients,
        "seed applied"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_the_exported_dataset() {
        assert_eq!(
            seed_id(CATEGORY_NAMESPACE, "Beef").to_string(),
            "bb420c3c-d14f-58cc-8642-b3f26852404c"
        );
        assert_eq!(
            seed_id(USER_NAMESPACE, "64c8d958249fae54bae90bb9").to_string(),
            "36bb54d5-85fe-5ef7-9fa0-302def127e3f"
        );
        assert_eq!(
            seed_id(RECIPE_INGREDIENT_NAMESPACE, "a-b").to_string(),
            "2a3c92d2-c1a6-56f8-8c6e-7a7a83634e08"
        );
    }

    #[test]
    fn source_ids_accept_both_shapes() {
        let oid: SourceId = serde_json::from_str(r#"{"$oid":"64c8d958249fae54bae90bb9"}"#).unwrap();
        let plain: SourceId = serde_json::from_str(r#""640c2dd963a319ea671e3746""#).unwrap();
        assert_eq!(oid.as_str(), "64c8d958249fae54bae90bb9");
        assert_eq!(plain.as_str(), "640c2dd963a319ea671e3746");
    }

    #[test]
    fn time_accepts_numbers_and_numeric_strings() {
        let parse = |raw: &str| serde_json::from_str::<Minutes>(raw).unwrap().to_minutes();
        assert_eq!(parse("40"), Some(40));
        assert_eq!(parse(r#""90""#), Some(90));
        assert_eq!(parse("12.7"), Some(12));
        assert_eq!(parse(r#""soon""#), None);
        assert_eq!(parse("0"), None);
        assert_eq!(parse("-5"), None);
    }

    #[test]
    fn bundled_dataset_is_consistent() {
        let data = SeedData::bundled().unwrap();
        assert!(data.check().is_empty(), "{:?}", data.check());
        assert!(data.categories.iter().any(|c| c.name == "Beef"));
        assert!(!data.recipes.is_empty());
        assert!(data.recipes.iter().all(|r| !r.ingredients.is_empty()));
    }

    #[test]
    fn dangling_references_are_reported() {
        let mut data = SeedData::bundled().unwrap();
        data.recipes[0].category = "Nonexistent".into();
        data.recipes[0].ingredients[0].id = "ffffffffffffffffffffffff".into();
        data.recipes[1].owner = SourceId::Plain("nobody".into());
        data.testimonials[0].owner = Some(SourceId::Plain("ghost".into()));

        let problems = data.check();
        assert_eq!(problems.len(), 3, "{problems:?}");
        assert!(problems.iter().any(|p| p.contains("unknown category Nonexistent")));
        assert!(problems.iter().any(|p| p.contains("unknown ingredient")));
        assert!(problems.iter().any(|p| p.contains("unknown owner nobody")));
    }

    #[test]
    fn empty_report_totals_zero() {
        assert_eq!(SeedReport::default().total(), 0);
    }
}
