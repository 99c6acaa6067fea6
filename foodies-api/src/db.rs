use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use foodies_shared::clients::db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Creates the pool and brings the schema up to date.
pub fn connect(database_url: &str, max_size: u32) -> anyhow::Result<DbPool> {
    let pool = create_pool(database_url, max_size)?;
    run_migrations(&pool)?;
    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("failed to run database migrations: {e}"))?;
    tracing::info!(count = applied.len(), "database migrations applied");
    Ok(())
}
