//! JSON HTTP API for the site.
//!
//! Each handler pulls rows from the [`ContentStore`] (or the [`Catalog`]),
//! runs them through [`crate::normalize`] and [`crate::relevance`], and
//! returns JSON.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/journeys` | Website journeys (`?includeHidden=true`) |
//! | `GET`  | `/api/gentle-journeys` | Gentle journeys, team and settings |
//! | `GET`  | `/api/page-banners` | All banners, or one with `?slug=` |
//! | `GET`  | `/api/stories` | Published stories |
//! | `GET`  | `/api/stories/{slug}` | One story with images and related stories |
//! | `POST` | `/api/stories/add` | Append a batch of stories |
//! | `GET`  | `/api/related-stories` | `?destinations=&focus=&limit=` |
//! | `GET`  | `/api/related-journeys` | `?region=&tags=&category=&limit=` |
//! | `GET`  | `/api/places` | Published places |
//! | `GET`  | `/api/day-trips` | Published day trips |
//! | `POST` | `/api/overnight-booking` | Record an overnight booking |
//! | `GET`  | `/api/catalog/journeys` | Catalog journeys |
//! | `GET`  | `/api/catalog/journeys/{slug}` | One catalog journey |
//! | `GET`  | `/api/catalog/routes` | Catalog routes (`?ids=a,b` for an ordered lookup) |
//! | `GET`  | `/api/catalog/routes/{id}` | One catalog route |
//!
//! # Error Contract
//!
//! A failed request still answers with the endpoint's usual shape, emptied,
//! plus an `error` string:
//!
//! ```json
//! { "success": false, "journeys": [], "error": "Failed to fetch journeys" }
//! ```
//!
//! Statuses: 400 for unusable input, 404 for unknown items, 500 when the
//! store or catalog fails.
//!
//! Every `/api` response carries `Cache-Control: no-store`. CORS is open to
//! all origins for the browser client.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::catalog::{Catalog, JourneyQuery, JourneyView, RouteQuery, RouteView};
use crate::config::Config;
use crate::connector_sheets::SheetsStore;
use crate::intake::{self, IntakeError};
use crate::models::{BookingRequest, StoryCard, StoryInput};
use crate::normalize::{self, parse_int_opt, split_list};
use crate::relevance;
use crate::store::{collections, normalize_row, ContentStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ContentStore>,
    pub catalog: Catalog,
}

/// Serve the API against the configured Google spreadsheet.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SheetsStore::new(config.sheets.clone())?;
    run_server_with_store(config, Arc::new(store)).await
}

/// Serve the API against any [`ContentStore`].
///
/// Opens (and migrates) the catalog at `[db].path`, binds `[server].bind`
/// and runs until Ctrl-C.
pub async fn run_server_with_store(
    config: &Config,
    store: Arc<dyn ContentStore>,
) -> anyhow::Result<()> {
    let catalog = Catalog::open(config).await?;
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        catalog,
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        store = state.store.name(),
        "server listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let no_store = SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );

    Router::new()
        .route("/api/journeys", get(handle_journeys))
        .route("/api/gentle-journeys", get(handle_gentle_journeys))
        .route("/api/page-banners", get(handle_page_banners))
        .route("/api/stories", get(handle_stories))
        .route("/api/stories/add", post(handle_add_stories))
        .route("/api/stories/{slug}", get(handle_story))
        .route("/api/related-stories", get(handle_related_stories))
        .route("/api/related-journeys", get(handle_related_journeys))
        .route("/api/places", get(handle_places))
        .route("/api/day-trips", get(handle_day_trips))
        .route("/api/overnight-booking", post(handle_overnight_booking))
        .route("/api/catalog/journeys", get(handle_catalog_journeys))
        .route("/api/catalog/journeys/{slug}", get(handle_catalog_journey))
        .route("/api/catalog/routes", get(handle_catalog_routes))
        .route("/api/catalog/routes/{id}", get(handle_catalog_route))
        .layer(no_store)
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// Error that still renders the endpoint's empty payload.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    /// JSON object the `error` field is merged into.
    fallback: Value,
}

impl AppError {
    fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback = fallback;
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = match self.fallback {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        body.insert("error".to_string(), Value::String(self.message));
        body.insert("code".to_string(), Value::String(self.code.to_string()));
        (self.status, Json(Value::Object(body))).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
        fallback: json!({ "success": false }),
    }
}

// Malformed bodies and query strings get the same JSON error shape as
// everything else instead of axum's plain-text rejection.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = %rejection.status(), "rejected JSON body: {}", rejection.body_text());
        bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(format!("Invalid query string: {}", rejection.body_text()))
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
        fallback: json!({}),
    }
}

/// Log `err` and produce a 500 whose message names what failed.
fn internal(what: &str, err: anyhow::Error) -> AppError {
    error!(error = %format!("{:#}", err), "failed to {}", what);
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: format!("Failed to {}", what),
        fallback: json!({}),
    }
}

fn intake_error(what: &str, err: IntakeError) -> AppError {
    match err {
        IntakeError::Invalid(msg) => bad_request(msg),
        IntakeError::Store(e) => internal(what, e).with_fallback(json!({ "success": false })),
    }
}

type ApiResult = Result<Json<Value>, AppError>;

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Website journeys ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JourneysParams {
    include_hidden: Option<String>,
}

async fn handle_journeys(
    State(state): State<AppState>,
    params: Result<Query<JourneysParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params.map_err(|e| {
        AppError::from(e).with_fallback(json!({ "success": false, "journeys": [] }))
    })?;
    // Only the literal `true` opts in; `1` or `yes` do not.
    let include_hidden = params.include_hidden.as_deref() == Some("true");
    let rows = state
        .store
        .fetch_rows(collections::WEBSITE_JOURNEYS)
        .await
        .map_err(|e| {
            internal("fetch journeys", e).with_fallback(json!({ "success": false, "journeys": [] }))
        })?;

    Ok(Json(json!({
        "success": true,
        "journeys": normalize::journeys(&rows, include_hidden),
    })))
}

async fn handle_gentle_journeys(State(state): State<AppState>) -> ApiResult {
    let fetched = tokio::try_join!(
        state.store.fetch_rows(collections::GENTLE_JOURNEYS),
        state.store.fetch_rows(collections::WEBSITE_TEAM),
        state.store.fetch_rows(collections::GENTLE_SETTINGS),
    );
    let (journey_rows, team_rows, settings_rows) = fetched.map_err(|e| {
        internal("fetch gentle journeys", e).with_fallback(json!({
            "success": false,
            "journeys": [],
            "team": [],
            "settings": {},
        }))
    })?;

    Ok(Json(json!({
        "success": true,
        "journeys": normalize::gentle_journeys(&journey_rows),
        "team": normalize::gentle_team(&team_rows),
        "settings": normalize::gentle_settings(&settings_rows),
    })))
}

// ============ Page banners ============

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BannerParams {
    slug: Option<String>,
}

async fn handle_page_banners(
    State(state): State<AppState>,
    params: Result<Query<BannerParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) =
        params.map_err(|e| AppError::from(e).with_fallback(json!({ "banners": [], "banner": null })))?;
    let rows = state
        .store
        .fetch_rows(collections::PAGE_BANNERS)
        .await
        .map_err(|e| {
            internal("fetch page banners", e).with_fallback(json!({ "banners": [], "banner": null }))
        })?;

    let banners: Vec<_> = rows.iter().map(normalize::page_banner).collect();
    match params.slug.filter(|s| !s.is_empty()) {
        Some(slug) => {
            let banner = banners.into_iter().find(|b| b.page_slug == slug);
            Ok(Json(json!({ "banner": banner })))
        }
        None => Ok(Json(json!({ "banners": banners }))),
    }
}

// ============ Stories ============

async fn handle_stories(State(state): State<AppState>) -> ApiResult {
    let rows = state
        .store
        .fetch_rows(collections::STORIES)
        .await
        .map_err(|e| internal("fetch stories", e).with_fallback(json!({ "stories": [] })))?;

    Ok(Json(json!({ "stories": normalize::published_stories(&rows) })))
}

async fn handle_story(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult {
    let fallback = json!({ "story": null, "images": [], "related": [] });
    let fetched = tokio::try_join!(
        state.store.fetch_rows(collections::STORIES),
        state.store.fetch_rows(collections::STORY_IMAGES),
    );
    let (story_rows, image_rows) =
        fetched.map_err(|e| internal("fetch story", e).with_fallback(fallback.clone()))?;

    let stories = normalize::published_stories(&story_rows);
    let story = stories
        .iter()
        .find(|s| s.slug == slug)
        .cloned()
        .ok_or_else(|| not_found(format!("story not found: {}", slug)).with_fallback(fallback))?;

    let images = normalize::story_images_for(&image_rows, &slug);
    let related =
        relevance::related_to_story(&story, stories, state.config.relevance.story_related_limit);

    Ok(Json(json!({
        "story": story,
        "images": images,
        "related": related,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AddStoriesBody {
    stories: Option<Vec<StoryInput>>,
}

async fn handle_add_stories(
    State(state): State<AppState>,
    body: Result<Json<AddStoriesBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    let stories = body.stories.unwrap_or_default();
    let added = intake::add_stories(state.store.as_ref(), &stories)
        .await
        .map_err(|e| intake_error("add stories", e))?;
    Ok(Json(json!(added)))
}

// ============ Related content ============

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelatedStoriesParams {
    destinations: String,
    focus: String,
    limit: Option<String>,
}

async fn handle_related_stories(
    State(state): State<AppState>,
    params: Result<Query<RelatedStoriesParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) =
        params.map_err(|e| AppError::from(e).with_fallback(json!({ "stories": [] })))?;
    if params.destinations.trim().is_empty() {
        return Ok(Json(json!({ "stories": [] })));
    }
    let relevance = &state.config.relevance;
    let limit = relevance.clamp(
        params.limit.as_deref().and_then(parse_int_opt),
        relevance.related_stories_limit,
    );

    let rows = state
        .store
        .fetch_rows(collections::STORIES)
        .await
        .map_err(|e| {
            internal("fetch related stories", e).with_fallback(json!({ "stories": [] }))
        })?;

    // Headers are lowercased here so hand-edited tabs still match. Only a
    // case-insensitive `true` counts as published on this endpoint.
    let cards: Vec<StoryCard> = rows
        .iter()
        .map(normalize_row)
        .filter(|row| {
            row.get("published")
                .is_some_and(|p| p.trim().eq_ignore_ascii_case("true"))
        })
        .map(|row| StoryCard::from(&normalize::story(&row)))
        .collect();

    let related = relevance::related_stories(&params.destinations, &params.focus, cards, limit);
    Ok(Json(json!({ "stories": related })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelatedJourneysParams {
    region: String,
    tags: String,
    category: String,
    limit: Option<String>,
}

async fn handle_related_journeys(
    State(state): State<AppState>,
    params: Result<Query<RelatedJourneysParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) =
        params.map_err(|e| AppError::from(e).with_fallback(json!({ "journeys": [] })))?;
    let relevance = &state.config.relevance;
    let limit = relevance.clamp(
        params.limit.as_deref().and_then(parse_int_opt),
        relevance.related_journeys_limit,
    );

    let rows = state
        .store
        .fetch_rows(collections::WEBSITE_JOURNEYS)
        .await
        .map_err(|e| {
            internal("fetch related journeys", e).with_fallback(json!({ "journeys": [] }))
        })?;

    let related = relevance::related_journeys(
        &params.region,
        &params.tags,
        &params.category,
        normalize::journeys(&rows, false),
        limit,
    );
    Ok(Json(json!({ "journeys": related })))
}

// ============ Places / day trips ============

async fn handle_places(State(state): State<AppState>) -> ApiResult {
    let rows = state
        .store
        .fetch_rows(collections::PLACES)
        .await
        .map_err(|e| internal("fetch places", e).with_fallback(json!({ "places": [] })))?;
    Ok(Json(json!({ "places": normalize::published_places(&rows) })))
}

async fn handle_day_trips(State(state): State<AppState>) -> ApiResult {
    let rows = state
        .store
        .fetch_rows(collections::DAY_TRIPS)
        .await
        .map_err(|e| internal("fetch day trips", e).with_fallback(json!({ "dayTrips": [] })))?;
    Ok(Json(json!({ "dayTrips": normalize::published_day_trips(&rows) })))
}

// ============ POST /api/overnight-booking ============

async fn handle_overnight_booking(
    State(state): State<AppState>,
    req: Result<Json<BookingRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = req?;
    let confirmation = intake::record_booking(state.store.as_ref(), &req)
        .await
        .map_err(|e| intake_error("record booking", e))?;
    Ok(Json(json!(confirmation)))
}

// ============ Catalog ============

async fn handle_catalog_journeys(
    State(state): State<AppState>,
    query: Result<Query<JourneyQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) =
        query.map_err(|e| AppError::from(e).with_fallback(json!({ "journeys": [] })))?;
    let journeys = state
        .catalog
        .get_journeys(&query)
        .await
        .map_err(|e| {
            internal("fetch catalog journeys", e).with_fallback(json!({ "journeys": [] }))
        })?;
    let views: Vec<JourneyView> = journeys.into_iter().map(JourneyView::from).collect();
    Ok(Json(json!({ "journeys": views })))
}

async fn handle_catalog_journey(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult {
    let journey = state
        .catalog
        .get_journey_by_slug(&slug)
        .await
        .map_err(|e| internal("fetch catalog journey", e).with_fallback(json!({ "journey": null })))?
        .ok_or_else(|| {
            not_found(format!("journey not found: {}", slug)).with_fallback(json!({ "journey": null }))
        })?;
    Ok(Json(json!({ "journey": JourneyView::from(journey) })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RoutesParams {
    #[serde(flatten)]
    query: RouteQuery,
    ids: Option<String>,
}

async fn handle_catalog_routes(
    State(state): State<AppState>,
    params: Result<Query<RoutesParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) =
        params.map_err(|e| AppError::from(e).with_fallback(json!({ "routes": [] })))?;
    let result = match params.ids.as_deref() {
        Some(ids) => state.catalog.get_routes_by_ids(&split_list(ids, ',')).await,
        None => state.catalog.get_routes(&params.query).await,
    };
    let routes = result
        .map_err(|e| internal("fetch catalog routes", e).with_fallback(json!({ "routes": [] })))?;
    let views: Vec<RouteView> = routes.into_iter().map(RouteView::from).collect();
    Ok(Json(json!({ "routes": views })))
}

async fn handle_catalog_route(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let route = state
        .catalog
        .get_route_by_id(&id)
        .await
        .map_err(|e| internal("fetch catalog route", e).with_fallback(json!({ "route": null })))?
        .ok_or_else(|| {
            not_found(format!("route not found: {}", id)).with_fallback(json!({ "route": null }))
        })?;
    Ok(Json(json!({ "route": RouteView::from(route) })))
}
