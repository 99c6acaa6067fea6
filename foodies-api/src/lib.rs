pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod schema;
pub mod seed;
pub mod services;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

use foodies_shared::clients::db::DbPool;
use foodies_shared::clients::redis::RedisClient;
use foodies_shared::clients::storage::ImageStore;
use foodies_shared::errors::AppError;
use foodies_shared::middleware::{metrics_middleware, AuthState};
use foodies_shared::types::auth::TokenKeys;

use config::AppConfig;
use routes::{auth, catalog, health, rate_limit, recipes, users, DOCS_PATH, OPENAPI_PATH, UPLOAD_LIMIT_BYTES};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub token_keys: TokenKeys,
    pub storage: ImageStore,
    pub redis: Option<RedisClient>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool, storage: ImageStore) -> Self {
        let token_keys = TokenKeys::new(
            config.jwt_secret.clone(),
            config.jwt_access_ttl,
            config.refresh_token_secret.clone(),
            config.jwt_refresh_ttl,
        );
        Self {
            db,
            config,
            token_keys,
            storage,
            redis: None,
            metrics_handle: None,
        }
    }

    pub fn with_redis(mut self, redis: Option<RedisClient>) -> Self {
        self.redis = redis;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

impl AuthState for AppState {
    fn token_keys(&self) -> &TokenKeys {
        &self.token_keys
    }
}

async fn not_found() -> AppError {
    AppError::not_found("Not found")
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let Some(origins) = config.allowed_origins() else {
        return CorsLayer::permissive();
    };
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_credentials(true)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route(
            "/recipes",
            get(recipes::list_recipes)
                .post(recipes::create_recipe)
                .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route("/recipes/popular", get(recipes::popular_recipes))
        .route("/recipes/:id", get(recipes::get_recipe).delete(recipes::delete_recipe))
        .route(
            "/recipes/:id/favorite",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route("/users/current", get(users::current_user))
        .route("/users/followers", get(users::followers))
        .route("/users/following", get(users::following))
        .route("/users/own", get(users::own_recipes))
        .route("/users/favorites", get(users::favorite_recipes))
        .route(
            "/users/avatar",
            patch(users::update_avatar).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/follow", post(users::follow))
        .route("/users/:id/unfollow", delete(users::unfollow))
        .route("/categories", get(catalog::categories))
        .route("/areas", get(catalog::areas))
        .route("/ingredients", get(catalog::ingredients))
        .route("/testimonials", get(catalog::testimonials))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .nest("/api/v1", api_routes())
        .merge(SwaggerUi::new(DOCS_PATH).url(OPENAPI_PATH, routes::openapi()))
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit::rate_limit))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
