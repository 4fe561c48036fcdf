use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the catalog schema. Safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS journeys (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            image_prompt TEXT,
            hero_image_url TEXT,
            short_description TEXT,
            arc_description TEXT,
            duration_days INTEGER,
            price_eur INTEGER,
            epic_price_eur INTEGER,
            start_city TEXT,
            focus_type TEXT,
            route_sequence TEXT,
            category TEXT,
            destinations TEXT,
            journey_type TEXT,
            marketing_priority TEXT,
            published INTEGER NOT NULL DEFAULT 0,
            show_on_journeys_page INTEGER NOT NULL DEFAULT 0,
            featured_on_homepage INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS routes (
            id TEXT PRIMARY KEY,
            route_narrative TEXT,
            route_description TEXT,
            image_prompt TEXT,
            image_url TEXT,
            from_city TEXT,
            to_city TEXT,
            via_cities TEXT,
            region TEXT,
            route_type TEXT,
            travel_time_hours REAL,
            day_duration_hours REAL,
            difficulty_level TEXT,
            activities TEXT,
            meals TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_journeys_published ON journeys(published)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_journeys_category ON journeys(category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_routes_region ON routes(region)")
        .execute(pool)
        .await?;

    Ok(())
}
