pub mod auth_service;
pub mod catalog_service;
pub mod recipe_service;
pub mod user_service;
