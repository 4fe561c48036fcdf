//! Relational catalog of journeys and routes.
//!
//! The catalog is the structured counterpart of the `Website_Journeys`
//! sheet: typed columns, explicit visibility flags, and the per-day routes a
//! journey is assembled from. Queries mirror what the site asks for; the
//! `*View` types are the camelCase shapes served over HTTP.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Executor, QueryBuilder, Row, Sqlite};
use std::collections::HashMap;

use crate::config::Config;
use crate::db;
use crate::migrate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogJourney {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub image_prompt: Option<String>,
    #[serde(default)]
    pub hero_image_url: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub arc_description: Option<String>,
    #[serde(default)]
    pub duration_days: Option<i64>,
    #[serde(default)]
    pub price_eur: Option<i64>,
    #[serde(default)]
    pub epic_price_eur: Option<i64>,
    #[serde(default)]
    pub start_city: Option<String>,
    #[serde(default)]
    pub focus_type: Option<String>,
    #[serde(default)]
    pub route_sequence: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub destinations: Option<String>,
    #[serde(default)]
    pub journey_type: Option<String>,
    #[serde(default)]
    pub marketing_priority: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub show_on_journeys_page: bool,
    #[serde(default)]
    pub featured_on_homepage: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    #[serde(default)]
    pub route_narrative: Option<String>,
    #[serde(default)]
    pub route_description: Option<String>,
    #[serde(default)]
    pub image_prompt: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub from_city: Option<String>,
    #[serde(default)]
    pub to_city: Option<String>,
    #[serde(default)]
    pub via_cities: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub route_type: Option<String>,
    #[serde(default)]
    pub travel_time_hours: Option<f64>,
    #[serde(default)]
    pub day_duration_hours: Option<f64>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub activities: Option<String>,
    #[serde(default)]
    pub meals: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Filters for [`Catalog::get_journeys`].
///
/// When `published` is unset, unpublished journeys are excluded unless
/// `include_hidden` is true.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JourneyQuery {
    pub published: Option<bool>,
    pub show_on_journeys_page: Option<bool>,
    pub featured_on_homepage: Option<bool>,
    pub category: Option<String>,
    pub include_hidden: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteQuery {
    pub region: Option<String>,
    pub route_type: Option<String>,
    pub from_city: Option<String>,
    pub to_city: Option<String>,
}

/// Journey as served by `/api/catalog/journeys`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyView {
    pub slug: String,
    pub title: String,
    pub hero_image: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub duration_days: Option<i64>,
    pub price: Option<i64>,
    pub epic_price: Option<i64>,
    pub start_city: Option<String>,
    pub focus: Option<String>,
    pub category: Option<String>,
    pub destinations: Option<String>,
    pub route_sequence: Option<String>,
    pub journey_type: Option<String>,
    pub marketing_priority: Option<String>,
    pub published: bool,
    pub show_on_journeys_page: bool,
    pub featured_on_homepage: bool,
    pub hidden: bool,
}

impl From<CatalogJourney> for JourneyView {
    fn from(j: CatalogJourney) -> Self {
        Self {
            hidden: !j.show_on_journeys_page,
            slug: j.slug,
            title: j.title,
            hero_image: j.hero_image_url,
            short_description: j.short_description,
            description: j.arc_description,
            duration_days: j.duration_days,
            price: j.price_eur,
            epic_price: j.epic_price_eur,
            start_city: j.start_city,
            focus: j.focus_type,
            category: j.category,
            destinations: j.destinations,
            route_sequence: j.route_sequence,
            journey_type: j.journey_type,
            marketing_priority: j.marketing_priority,
            published: j.published,
            show_on_journeys_page: j.show_on_journeys_page,
            featured_on_homepage: j.featured_on_homepage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteView {
    pub id: String,
    pub narrative: Option<String>,
    pub description: Option<String>,
    pub image_prompt: Option<String>,
    pub image_url: Option<String>,
    pub from_city: Option<String>,
    pub to_city: Option<String>,
    pub via_cities: Option<String>,
    pub region: Option<String>,
    pub route_type: Option<String>,
    pub travel_time_hours: Option<f64>,
    pub day_duration_hours: Option<f64>,
    pub difficulty_level: Option<String>,
    pub activities: Option<String>,
    pub meals: Option<String>,
}

impl From<Route> for RouteView {
    fn from(r: Route) -> Self {
        Self {
            id: r.id,
            narrative: r.route_narrative,
            description: r.route_description,
            image_prompt: r.image_prompt,
            image_url: r.image_url,
            from_city: r.from_city,
            to_city: r.to_city,
            via_cities: r.via_cities,
            region: r.region,
            route_type: r.route_type,
            travel_time_hours: r.travel_time_hours,
            day_duration_hours: r.day_duration_hours,
            difficulty_level: r.difficulty_level,
            activities: r.activities,
            meals: r.meals,
        }
    }
}

/// Export format read by `slowmo import-catalog`.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogExport {
    #[serde(default)]
    pub journeys: Vec<CatalogJourney>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

fn journey_from_row(row: &SqliteRow) -> CatalogJourney {
    CatalogJourney {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        image_prompt: row.get("image_prompt"),
        hero_image_url: row.get("hero_image_url"),
        short_description: row.get("short_description"),
        arc_description: row.get("arc_description"),
        duration_days: row.get("duration_days"),
        price_eur: row.get("price_eur"),
        epic_price_eur: row.get("epic_price_eur"),
        start_city: row.get("start_city"),
        focus_type: row.get("focus_type"),
        route_sequence: row.get("route_sequence"),
        category: row.get("category"),
        destinations: row.get("destinations"),
        journey_type: row.get("journey_type"),
        marketing_priority: row.get("marketing_priority"),
        published: row.get("published"),
        show_on_journeys_page: row.get("show_on_journeys_page"),
        featured_on_homepage: row.get("featured_on_homepage"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn route_from_row(row: &SqliteRow) -> Route {
    Route {
        id: row.get("id"),
        route_narrative: row.get("route_narrative"),
        route_description: row.get("route_description"),
        image_prompt: row.get("image_prompt"),
        image_url: row.get("image_url"),
        from_city: row.get("from_city"),
        to_city: row.get("to_city"),
        via_cities: row.get("via_cities"),
        region: row.get("region"),
        route_type: row.get("route_type"),
        travel_time_hours: row.get("travel_time_hours"),
        day_duration_hours: row.get("day_duration_hours"),
        difficulty_level: row.get("difficulty_level"),
        activities: row.get("activities"),
        meals: row.get("meals"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Upsert one journey by id through any executor (pool or open transaction).
async fn write_journey<'e, E>(executor: E, j: &CatalogJourney) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = now_iso();
    let created = if j.created_at.is_empty() { now.clone() } else { j.created_at.clone() };
    let updated = if j.updated_at.is_empty() { now } else { j.updated_at.clone() };

    sqlx::query(
        r#"
        INSERT INTO journeys (
            id, title, slug, image_prompt, hero_image_url, short_description,
            arc_description, duration_days, price_eur, epic_price_eur, start_city,
            focus_type, route_sequence, category, destinations, journey_type,
            marketing_priority, published, show_on_journeys_page,
            featured_on_homepage, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            slug = excluded.slug,
            image_prompt = excluded.image_prompt,
            hero_image_url = excluded.hero_image_url,
            short_description = excluded.short_description,
            arc_description = excluded.arc_description,
            duration_days = excluded.duration_days,
            price_eur = excluded.price_eur,
            epic_price_eur = excluded.epic_price_eur,
            start_city = excluded.start_city,
            focus_type = excluded.focus_type,
            route_sequence = excluded.route_sequence,
            category = excluded.category,
            destinations = excluded.destinations,
            journey_type = excluded.journey_type,
            marketing_priority = excluded.marketing_priority,
            published = excluded.published,
            show_on_journeys_page = excluded.show_on_journeys_page,
            featured_on_homepage = excluded.featured_on_homepage,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&j.id)
    .bind(&j.title)
    .bind(&j.slug)
    .bind(&j.image_prompt)
    .bind(&j.hero_image_url)
    .bind(&j.short_description)
    .bind(&j.arc_description)
    .bind(j.duration_days)
    .bind(j.price_eur)
    .bind(j.epic_price_eur)
    .bind(&j.start_city)
    .bind(&j.focus_type)
    .bind(&j.route_sequence)
    .bind(&j.category)
    .bind(&j.destinations)
    .bind(&j.journey_type)
    .bind(&j.marketing_priority)
    .bind(j.published)
    .bind(j.show_on_journeys_page)
    .bind(j.featured_on_homepage)
    .bind(created)
    .bind(updated)
    .execute(executor)
    .await?;
    Ok(())
}

async fn write_route<'e, E>(executor: E, r: &Route) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = now_iso();
    let created = if r.created_at.is_empty() { now.clone() } else { r.created_at.clone() };
    let updated = if r.updated_at.is_empty() { now } else { r.updated_at.clone() };

    sqlx::query(
        r#"
        INSERT INTO routes (
            id, route_narrative, route_description, image_prompt, image_url,
            from_city, to_city, via_cities, region, route_type, travel_time_hours,
            day_duration_hours, difficulty_level, activities, meals,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            route_narrative = excluded.route_narrative,
            route_description = excluded.route_description,
            image_prompt = excluded.image_prompt,
            image_url = excluded.image_url,
            from_city = excluded.from_city,
            to_city = excluded.to_city,
            via_cities = excluded.via_cities,
            region = excluded.region,
            route_type = excluded.route_type,
            travel_time_hours = excluded.travel_time_hours,
            day_duration_hours = excluded.day_duration_hours,
            difficulty_level = excluded.difficulty_level,
            activities = excluded.activities,
            meals = excluded.meals,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&r.id)
    .bind(&r.route_narrative)
    .bind(&r.route_description)
    .bind(&r.image_prompt)
    .bind(&r.image_url)
    .bind(&r.from_city)
    .bind(&r.to_city)
    .bind(&r.via_cities)
    .bind(&r.region)
    .bind(&r.route_type)
    .bind(r.travel_time_hours)
    .bind(r.day_duration_hours)
    .bind(&r.difficulty_level)
    .bind(&r.activities)
    .bind(&r.meals)
    .bind(created)
    .bind(updated)
    .execute(executor)
    .await?;
    Ok(())
}

/// Handle on the catalog database.
#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    /// Connect and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ============ Journeys ============

    /// Journeys matching `q`, shortest first (unknown durations last).
    pub async fn get_journeys(&self, q: &JourneyQuery) -> Result<Vec<CatalogJourney>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM journeys WHERE 1 = 1");

        if let Some(published) = q.published {
            qb.push(" AND published = ").push_bind(published);
        } else if !q.include_hidden {
            qb.push(" AND published = 1");
        }
        if let Some(show) = q.show_on_journeys_page {
            qb.push(" AND show_on_journeys_page = ").push_bind(show);
        }
        if let Some(featured) = q.featured_on_homepage {
            qb.push(" AND featured_on_homepage = ").push_bind(featured);
        }
        if let Some(ref category) = q.category {
            if !category.is_empty() {
                qb.push(" AND category = ").push_bind(category.clone());
            }
        }
        qb.push(" ORDER BY duration_days IS NULL, duration_days ASC, slug ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(journey_from_row).collect())
    }

    pub async fn get_journey_by_slug(&self, slug: &str) -> Result<Option<CatalogJourney>> {
        let row = sqlx::query("SELECT * FROM journeys WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(journey_from_row))
    }

    pub async fn upsert_journey(&self, j: &CatalogJourney) -> Result<()> {
        write_journey(&self.pool, j).await
    }

    // ============ Routes ============

    pub async fn get_routes(&self, q: &RouteQuery) -> Result<Vec<Route>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM routes WHERE 1 = 1");
        for (column, value) in [
            ("region", &q.region),
            ("route_type", &q.route_type),
            ("from_city", &q.from_city),
            ("to_city", &q.to_city),
        ] {
            if let Some(v) = value.as_ref().filter(|v| !v.is_empty()) {
                qb.push(format!(" AND {} = ", column)).push_bind(v.clone());
            }
        }
        qb.push(" ORDER BY id ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(route_from_row).collect())
    }

    pub async fn get_route_by_id(&self, id: &str) -> Result<Option<Route>> {
        let row = sqlx::query("SELECT * FROM routes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(route_from_row))
    }

    /// Routes in the order their ids were given. Unknown ids are skipped.
    pub async fn get_routes_by_ids(&self, ids: &[String]) -> Result<Vec<Route>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM routes WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let by_id: HashMap<String, Route> = rows
            .iter()
            .map(route_from_row)
            .map(|r| (r.id.clone(), r))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    pub async fn upsert_route(&self, r: &Route) -> Result<()> {
        write_route(&self.pool, r).await
    }

    /// Load an export file's journeys and routes in one transaction.
    /// Returns `(journeys, routes)` written; on any failure nothing is kept.
    pub async fn import(&self, export: &CatalogExport) -> Result<(usize, usize)> {
        let mut tx = self.pool.begin().await?;
        for j in &export.journeys {
            write_journey(&mut *tx, j).await?;
        }
        for r in &export.routes {
            write_route(&mut *tx, r).await?;
        }
        tx.commit().await?;
        Ok((export.journeys.len(), export.routes.len()))
    }
}
