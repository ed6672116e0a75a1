//! NHL ETL
//!
//! Batch loader that pulls teams, rostered players and year-by-year season
//! stats from the NHL stats API and replaces three PostgreSQL tables with the
//! normalized results. Each pipeline runs on its own connection; the stats
//! pipeline reads player ids from the player table, so it must run last.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod store;

pub use api::NhlApiClient;
pub use config::EtlConfig;
pub use error::{EtlError, Result};
pub use pipeline::{
    collect_all, collect_players, collect_stats, collect_teams, dry_run, Stage,
};
pub use store::{LoadReport, MemoryStore, PgStore, TableStore};
