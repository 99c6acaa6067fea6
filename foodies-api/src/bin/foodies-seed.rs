use foodies_api::config::AppConfig;
use foodies_api::db;
use foodies_api::seed::{self, SeedData};
use foodies_shared::middleware::{init_tracing, LogFormat};

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing("foodies-seed", LogFormat::for_env(&config.env));

    let data = SeedData::load(config.seed_dir())?;
    tracing::info!(
        source = config.seed_dir().unwrap_or("bundled"),
        recipes = data.recipes.len(),
        "seeding database"
    );

    let pool = db::connect(&config.database_url, 2)?;
    let mut conn = pool.get()?;
    let report = seed::run(&mut conn, &data)?;

    if report.total() == 0 {
        tracing::info!("database already seeded");
    }
    Ok(())
}
