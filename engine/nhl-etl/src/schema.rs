//! Fixed destination table layouts and the DDL built from them.

use crate::error::{EtlError, Result};

/// PostgreSQL caps a single statement at 65535 bind parameters.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// PostgreSQL truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

/// A single destination column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub primary_key: bool,
}

impl Column {
    const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self { name, sql_type, primary_key: false }
    }

    const fn primary(name: &'static str, sql_type: &'static str) -> Self {
        Self { name, sql_type, primary_key: true }
    }
}

/// Ordered column list of one destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: &'static [Column],
}

pub const TEAM_SCHEMA: TableSchema = TableSchema {
    columns: &[
        Column::primary("team_id", "INTEGER"),
        Column::new("name", "VARCHAR(50)"),
        Column::new("arena_name", "VARCHAR(50)"),
        Column::new("arena_city", "VARCHAR(50)"),
        Column::new("abbr", "VARCHAR(3)"),
        Column::new("location", "VARCHAR(50)"),
        Column::new("initial_year", "VARCHAR(4)"),
        Column::new("division_name", "VARCHAR(50)"),
        Column::new("conference_name", "VARCHAR(50)"),
        Column::new("active", "BOOLEAN"),
    ],
};

pub const PLAYER_SCHEMA: TableSchema = TableSchema {
    columns: &[
        Column::primary("player_id", "INTEGER"),
        Column::new("team_id", "INTEGER"),
        Column::new("fname", "VARCHAR(50)"),
        Column::new("lname", "VARCHAR(50)"),
        Column::new("number", "INTEGER"),
        Column::new("birthdate", "DATE"),
        Column::new("birth_city", "VARCHAR(50)"),
        Column::new("birth_country", "VARCHAR(50)"),
        Column::new("nationality", "VARCHAR(50)"),
        Column::new("height_cm", "REAL"),
        Column::new("weight_kg", "REAL"),
        Column::new("handedness", "VARCHAR(10)"),
        Column::new("captain", "BOOLEAN"),
        Column::new("alternate", "BOOLEAN"),
        Column::new("position", "VARCHAR(10)"),
        Column::new("active", "BOOLEAN"),
        Column::new("rookie", "BOOLEAN"),
    ],
};

/// No primary key: one row per (player, season, league split).
pub const STATS_SCHEMA: TableSchema = TableSchema {
    columns: &[
        Column::new("player_id", "INTEGER"),
        Column::new("season", "VARCHAR(8)"),
        Column::new("league_name", "VARCHAR(30)"),
        Column::new("goals", "INTEGER"),
        Column::new("assists", "INTEGER"),
        Column::new("team_id", "INTEGER"),
        Column::new("pim", "INTEGER"),
        Column::new("shots", "INTEGER"),
        Column::new("games", "INTEGER"),
        Column::new("pp_goals", "INTEGER"),
        Column::new("pp_points", "INTEGER"),
        Column::new("pp_toi_seconds", "INTEGER"),
        Column::new("gwg", "INTEGER"),
        Column::new("ot_goals", "INTEGER"),
        Column::new("sh_goals", "INTEGER"),
        Column::new("sh_points", "INTEGER"),
        Column::new("sh_toi_seconds", "INTEGER"),
        Column::new("plus_minus", "INTEGER"),
        Column::new("shifts", "INTEGER"),
        Column::new("blocked", "INTEGER"),
    ],
};

impl TableSchema {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Comma-separated column names, in table order
    pub fn column_list(&self) -> String {
        self.columns.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
    }

    /// Index of the primary key column, if the table has one
    pub fn primary_key(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.primary_key)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Largest number of rows one multi-row INSERT can carry
    pub fn rows_per_statement(&self) -> usize {
        (MAX_BIND_PARAMS / self.len().max(1)).max(1)
    }
}

/// Accept only plain unquoted SQL identifiers
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                && name.len() <= MAX_IDENTIFIER_LEN
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(EtlError::InvalidIdentifier { name: name.to_string() })
    }
}

pub fn drop_table_sql(table: &str) -> Result<String> {
    validate_identifier(table)?;
    Ok(format!("DROP TABLE IF EXISTS {table}"))
}

pub fn create_table_sql(schema: &TableSchema, table: &str) -> Result<String> {
    validate_identifier(table)?;

    let columns = schema
        .columns
        .iter()
        .map(|c| {
            if c.primary_key {
                format!("    {} {} PRIMARY KEY", c.name, c.sql_type)
            } else {
                format!("    {} {}", c.name, c.sql_type)
            }
        })
        .collect::<Vec<_>>()
        .join(",\n");

    Ok(format!("CREATE TABLE {table} (\n{columns}\n)"))
}
