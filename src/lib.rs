//! # Slow Morocco
//!
//! Content service behind the Slow Morocco travel site.
//!
//! Editorial content lives in a Google spreadsheet, one tab per collection
//! (journeys, stories, places, team, banners, settings). The service reads
//! those tabs, turns loosely-typed rows into typed view models, ranks
//! related content, and serves it all as JSON. Journeys and routes also
//! live in a relational catalog (SQLite) with proper types and visibility
//! flags. Two write paths append to the spreadsheet: story batches and
//! overnight bookings.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  ContentStore   │──▶│  normalize   │──▶│  HTTP (axum) │
//! │ Sheets / Memory │   │ + relevance  │   │   JSON API   │
//! └─────────────────┘   └──────────────┘   └──────┬───────┘
//! ┌─────────────────┐                             │
//! │ Catalog (SQLite)│─────────────────────────────┘
//! └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! slowmo init                          # create the catalog
//! slowmo import-catalog catalog.json   # load journeys and routes
//! slowmo rows Stories --limit 3        # check a sheet is readable
//! slowmo serve                         # start the API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Rows and view models |
//! | [`store`] | Content store trait and in-memory store |
//! | [`connector_sheets`] | Google Sheets backend |
//! | [`normalize`] | Row → view model normalizers |
//! | [`relevance`] | Related-content ranking |
//! | [`catalog`] | Journeys and routes in SQLite |
//! | [`intake`] | Booking and story writes |
//! | [`server`] | HTTP server |
//! | [`inspect`] | CLI helpers |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod catalog;
pub mod config;
pub mod connector_sheets;
pub mod db;
pub mod inspect;
pub mod intake;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod relevance;
pub mod server;
pub mod store;
