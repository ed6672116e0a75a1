//! The three ETL pipelines: fetch, normalize, replace table, bulk insert.

use crate::api::NhlApiClient;
use crate::config::{EtlConfig, TableNames};
use crate::error::{EtlError, Result};
use crate::models::{Player, SeasonStat, Team};
use crate::normalize::{normalize_player, normalize_season, normalize_team};
use crate::store::{replace_and_load, LoadReport, MemoryStore, PgStore, TableStore};
use std::fmt;
use tracing::{error, info, warn};

/// One pipeline; `Stage::ALL` is the order they must run in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Teams,
    Players,
    Stats,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Teams, Stage::Players, Stage::Stats];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Teams => "teams",
            Stage::Players => "players",
            Stage::Stats => "stats",
        };
        f.write_str(name)
    }
}

/// Fetch and normalize every current team
pub async fn fetch_teams(api: &NhlApiClient) -> Result<Vec<Team>> {
    info!("Getting NHL TEAM data...");

    let teams = api.fetch_teams().await?.unwrap_or_default();
    Ok(teams.into_iter().map(normalize_team).collect())
}

/// Fetch teams, then each roster, then each rostered player
pub async fn fetch_players(api: &NhlApiClient) -> Result<Vec<Player>> {
    info!("Getting NHL PLAYER data...");

    let Some(teams) = api.fetch_teams().await? else {
        return Ok(Vec::new());
    };

    let mut players = Vec::new();
    for team in teams {
        let Some(roster) = api.fetch_roster(team.id).await? else {
            continue;
        };

        for entry in roster {
            let player_id = entry.person.id;
            let Some(person) = api.fetch_person(player_id).await? else {
                continue;
            };

            let player = normalize_player(player_id, team.id, person).map_err(|source| {
                EtlError::Normalize { entity: format!("player id {player_id}"), source }
            })?;
            players.push(player);
        }
    }

    info!("Fetched {} players", players.len());
    Ok(players)
}

/// Fetch year-by-year splits for each player id
pub async fn fetch_stats(api: &NhlApiClient, player_ids: &[i32]) -> Result<Vec<SeasonStat>> {
    info!("Getting NHL STATS data for {} players...", player_ids.len());

    let mut stats = Vec::new();
    for &player_id in player_ids {
        let Some(splits) = api.fetch_year_by_year(player_id).await? else {
            continue;
        };
        stats.extend(splits.into_iter().map(|split| normalize_season(player_id, split)));
    }

    info!("Fetched {} season stat rows", stats.len());
    Ok(stats)
}

pub async fn load_teams<S: TableStore + ?Sized>(
    api: &NhlApiClient,
    store: &mut S,
    table: &str,
) -> Result<LoadReport> {
    let teams = fetch_teams(api).await?;
    Ok(replace_and_load(store, table, &teams).await)
}

pub async fn load_players<S: TableStore + ?Sized>(
    api: &NhlApiClient,
    store: &mut S,
    table: &str,
) -> Result<LoadReport> {
    let players = fetch_players(api).await?;
    Ok(replace_and_load(store, table, &players).await)
}

/// Player ids are read back from `player_table`, so the player pipeline must
/// have run first.
pub async fn load_stats<S: TableStore + ?Sized>(
    api: &NhlApiClient,
    store: &mut S,
    player_table: &str,
    stats_table: &str,
) -> Result<LoadReport> {
    let player_ids = store.distinct_player_ids(player_table).await?;
    if player_ids.is_empty() {
        warn!("No players stored in {}; stats table will be empty", player_table);
    }

    let stats = fetch_stats(api, &player_ids).await?;
    Ok(replace_and_load(store, stats_table, &stats).await)
}

/// Run one stage against an open store, then close the store on every path
pub async fn run_stage<S: TableStore + ?Sized>(
    stage: Stage,
    api: &NhlApiClient,
    tables: &TableNames,
    store: &mut S,
) -> Result<LoadReport> {
    let result = match stage {
        Stage::Teams => load_teams(api, store, &tables.team).await,
        Stage::Players => load_players(api, store, &tables.player).await,
        Stage::Stats => load_stats(api, store, &tables.player, &tables.stats).await,
    };

    if let Err(e) = store.close().await {
        warn!("Failed to close database connection: {}", e);
    }

    if let Err(e) = &result {
        error!("The {} pipeline failed: {}", stage, e);
    }
    result
}

/// Run one stage against PostgreSQL on a fresh connection
pub async fn collect(stage: Stage, config: &EtlConfig) -> Result<LoadReport> {
    let api = NhlApiClient::new(&config.api)?;

    let mut store = match PgStore::connect(&config.database).await {
        Ok(store) => store,
        Err(e) => {
            error!("{}", e);
            return Err(e);
        }
    };

    run_stage(stage, &api, &config.tables, &mut store).await
}

pub async fn collect_teams(config: &EtlConfig) -> Result<LoadReport> {
    collect(Stage::Teams, config).await
}

pub async fn collect_players(config: &EtlConfig) -> Result<LoadReport> {
    collect(Stage::Players, config).await
}

pub async fn collect_stats(config: &EtlConfig) -> Result<LoadReport> {
    collect(Stage::Stats, config).await
}

/// Run `stages` in order against PostgreSQL, stopping at the first failure
pub async fn collect_all(config: &EtlConfig, stages: &[Stage]) -> Result<Vec<LoadReport>> {
    let mut reports = Vec::with_capacity(stages.len());
    for &stage in stages {
        reports.push(collect(stage, config).await?);
    }
    Ok(reports)
}

/// Run `stages` in order against an in-memory store; nothing reaches PostgreSQL
pub async fn dry_run(
    config: &EtlConfig,
    stages: &[Stage],
) -> Result<(Vec<LoadReport>, MemoryStore)> {
    let api = NhlApiClient::new(&config.api)?;
    let mut store = MemoryStore::new();

    let mut reports = Vec::with_capacity(stages.len());
    for &stage in stages {
        store.reconnect();
        reports.push(run_stage(stage, &api, &config.tables, &mut store).await?);
    }
    Ok((reports, store))
}
