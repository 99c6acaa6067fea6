use std::net::SocketAddr;
use std::sync::Arc;

use foodies_api::config::AppConfig;
use foodies_api::seed::{self, SeedData};
use foodies_api::{build_router, db, AppState};
use foodies_shared::clients::redis::RedisClient;
use foodies_shared::clients::storage::{ImageStore, MinioClient};
use foodies_shared::middleware::{init_metrics, init_tracing, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing("foodies-api", LogFormat::for_env(&config.env));
    let port = config.port;

    let pool = db::connect(&config.database_url, config.database_pool_size)?;

    if config.seed_on_start {
        let data = SeedData::load(config.seed_dir())?;
        let mut conn = pool.get()?;
        seed::run(&mut conn, &data)?;
    }

    let storage = if config.is_storage_configured() {
        ImageStore::Remote(
            MinioClient::new(
                &config.storage_endpoint,
                &config.storage_access_key,
                &config.storage_secret_key,
                &config.storage_bucket,
                config.storage_public_url(),
            )
            .await,
        )
    } else {
        tracing::warn!("object storage not configured, images will be stored as data URIs");
        ImageStore::Inline
    };

    let redis = if config.rate_limit_enabled {
        match RedisClient::connect(&config.redis_url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, rate limiting disabled");
                None
            }
        }
    } else {
        None
    };

    let metrics_handle = init_metrics()?;

    let state = Arc::new(
        AppState::new(config, pool, storage)
            .with_redis(redis)
            .with_metrics(metrics_handle),
    );

    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "foodies-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
