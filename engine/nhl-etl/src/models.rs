use crate::schema::{TableSchema, PLAYER_SCHEMA, STATS_SCHEMA, TEAM_SCHEMA};
use crate::store::{Record, SqlValue};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Upstream API payloads
// ---------------------------------------------------------------------------

/// `GET /teams`
#[derive(Debug, Deserialize)]
pub struct TeamsResponse {
    pub teams: Vec<ApiTeam>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTeam {
    pub id: i32,
    pub name: String,
    pub venue: Venue,
    pub abbreviation: String,
    pub location_name: String,
    pub first_year_of_play: String,
    pub division: Named,
    pub conference: Named,
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Venue {
    pub name: String,
    pub city: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

/// `GET /teams/{id}/roster`
#[derive(Debug, Deserialize)]
pub struct RosterResponse {
    #[serde(default)]
    pub roster: Vec<RosterEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    pub person: PersonRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonRef {
    pub id: i32,
}

/// `GET /people/{id}`
#[derive(Debug, Deserialize)]
pub struct PeopleResponse {
    #[serde(default)]
    pub people: Vec<ApiPerson>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPerson {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub birth_city: String,
    pub birth_country: String,
    pub nationality: String,
    pub height: String,
    pub weight: f64,
    pub shoots_catches: String,
    pub primary_position: PositionRef,
    pub rookie: bool,
    pub active: bool,

    #[serde(default)]
    pub captain: Option<bool>,

    #[serde(default)]
    pub alternate_captain: Option<bool>,

    /// Sent as a string ("97"); anything unparseable is treated as absent.
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub primary_number: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionRef {
    pub code: String,
}

/// `GET /people/{id}/stats?stats=yearByYear`
#[derive(Debug, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub stats: Vec<StatGroup>,
}

#[derive(Debug, Deserialize)]
pub struct StatGroup {
    #[serde(default)]
    pub splits: Vec<StatSplit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatSplit {
    pub season: String,
    pub league: Named,

    /// Non-NHL clubs come without an id.
    #[serde(default)]
    pub team: Option<SplitTeam>,

    #[serde(default)]
    pub stat: SplitStat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitTeam {
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub id: Option<i32>,
}

/// Every stat is optional; leagues report different subsets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitStat {
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub goals: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub assists: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub pim: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub shots: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub games: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub power_play_goals: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub power_play_points: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub power_play_time_on_ice: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub game_winning_goals: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub over_time_goals: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub short_handed_goals: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub short_handed_points: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub short_handed_time_on_ice: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub plus_minus: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub shifts: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_lenient_i32")]
    pub blocked: Option<i32>,
}

// Optional fields: null, missing or malformed all collapse to None.
fn deserialize_lenient_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Normalized records
// ---------------------------------------------------------------------------

/// Row of the `team` table
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub team_id: i32,
    pub name: String,
    pub arena_name: String,
    pub arena_city: String,
    pub abbr: String,
    pub location: String,
    pub initial_year: String,
    pub division_name: String,
    pub conference_name: String,
    pub active: bool,
}

/// Row of the `player` table
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub player_id: i32,
    pub team_id: i32,
    pub fname: String,
    pub lname: String,
    pub number: Option<i32>,
    pub birthdate: NaiveDate,
    pub birth_city: String,
    pub birth_country: String,
    pub nationality: String,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub handedness: String,
    pub captain: Option<bool>,
    pub alternate: Option<bool>,
    pub position: String,
    pub active: bool,
    pub rookie: bool,
}

/// Row of the `stats` table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonStat {
    pub player_id: i32,
    pub season: String,
    pub league_name: String,
    pub goals: Option<i32>,
    pub assists: Option<i32>,
    pub team_id: Option<i32>,
    pub pim: Option<i32>,
    pub shots: Option<i32>,
    pub games: Option<i32>,
    pub pp_goals: Option<i32>,
    pub pp_points: Option<i32>,
    pub pp_toi_seconds: Option<i32>,
    pub gwg: Option<i32>,
    pub ot_goals: Option<i32>,
    pub sh_goals: Option<i32>,
    pub sh_points: Option<i32>,
    pub sh_toi_seconds: Option<i32>,
    pub plus_minus: Option<i32>,
    pub shifts: Option<i32>,
    pub blocked: Option<i32>,
}

impl Record for Team {
    const SCHEMA: TableSchema = TEAM_SCHEMA;

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.team_id.into(),
            self.name.as_str().into(),
            self.arena_name.as_str().into(),
            self.arena_city.as_str().into(),
            self.abbr.as_str().into(),
            self.location.as_str().into(),
            self.initial_year.as_str().into(),
            self.division_name.as_str().into(),
            self.conference_name.as_str().into(),
            self.active.into(),
        ]
    }
}

impl Record for Player {
    const SCHEMA: TableSchema = PLAYER_SCHEMA;

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.player_id.into(),
            self.team_id.into(),
            self.fname.as_str().into(),
            self.lname.as_str().into(),
            self.number.into(),
            self.birthdate.into(),
            self.birth_city.as_str().into(),
            self.birth_country.as_str().into(),
            self.nationality.as_str().into(),
            self.height_cm.into(),
            self.weight_kg.into(),
            self.handedness.as_str().into(),
            self.captain.into(),
            self.alternate.into(),
            self.position.as_str().into(),
            self.active.into(),
            self.rookie.into(),
        ]
    }
}

impl Record for SeasonStat {
    const SCHEMA: TableSchema = STATS_SCHEMA;

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.player_id.into(),
            self.season.as_str().into(),
            self.league_name.as_str().into(),
            self.goals.into(),
            self.assists.into(),
            self.team_id.into(),
            self.pim.into(),
            self.shots.into(),
            self.games.into(),
            self.pp_goals.into(),
            self.pp_points.into(),
            self.pp_toi_seconds.into(),
            self.gwg.into(),
            self.ot_goals.into(),
            self.sh_goals.into(),
            self.sh_points.into(),
            self.sh_toi_seconds.into(),
            self.plus_minus.into(),
            self.shifts.into(),
            self.blocked.into(),
        ]
    }
}
