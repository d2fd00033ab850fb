//! SQLite-backed voter roll: one registrant table per county.
//!
//! The roll is owned by the election authority's import, not by the petition
//! store, so it lives in its own database and creates its own tables.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
    Row, SqlitePool,
};

use crate::core::{
    errors::{AppError, AppResult},
    jurisdiction::County,
    types::MatchedVoter,
};
use crate::matcher::{RegistrantQuery, VoterRoll};

/// One registrant as loaded into the roll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoterRecord {
    pub state_voter_id: String,
    pub first_name: String,
    pub last_name: String,
    pub street_number: String,
    pub street_name: String,
    pub city: String,
    pub zip_code: String,
    pub assembly_district: Option<String>,
    pub senate_district: Option<String>,
    pub congressional_district: Option<String>,
    pub enrolled_party: Option<String>,
}

#[derive(Clone)]
pub struct SqliteVoterRoll {
    pool: SqlitePool,
}

impl SqliteVoterRoll {
    pub async fn open(path: &Path) -> AppResult<Self> {
        let connect_options = SqliteConnectOptions::from_str(&format!(
            "sqlite:{}",
            path.to_string_lossy().replace('\\', "/")
        ))
        .map_err(|err| AppError::Database(err.to_string()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let roll = Self { pool };
        roll.ensure_schema().await?;
        Ok(roll)
    }

    pub async fn in_memory() -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let roll = Self { pool };
        roll.ensure_schema().await?;
        Ok(roll)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> AppResult<()> {
        for county in County::ALL {
            let table = county.voter_table();
            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    state_voter_id TEXT PRIMARY KEY,
                    first_name TEXT NOT NULL,
                    last_name TEXT NOT NULL,
                    street_number TEXT NOT NULL DEFAULT '',
                    street_name TEXT NOT NULL DEFAULT '',
                    city TEXT NOT NULL DEFAULT '',
                    zip_code TEXT NOT NULL DEFAULT '',
                    assembly_district TEXT,
                    senate_district TEXT,
                    congressional_district TEXT,
                    enrolled_party TEXT
                )
                "#
            ))
            .execute(&self.pool)
            .await?;
            sqlx::query(&format!(
                r#"
                CREATE INDEX IF NOT EXISTS idx_{table}_last_name
                ON {table} (last_name COLLATE NOCASE)
                "#
            ))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn insert_voter(&self, county: County, voter: &VoterRecord) -> AppResult<()> {
        let table = county.voter_table();
        sqlx::query(&format!(
            r#"
            INSERT INTO {table} (
                state_voter_id, first_name, last_name, street_number, street_name,
                city, zip_code, assembly_district, senate_district,
                congressional_district, enrolled_party
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#
        ))
        .bind(&voter.state_voter_id)
        .bind(&voter.first_name)
        .bind(&voter.last_name)
        .bind(&voter.street_number)
        .bind(&voter.street_name)
        .bind(&voter.city)
        .bind(&voter.zip_code)
        .bind(&voter.assembly_district)
        .bind(&voter.senate_district)
        .bind(&voter.congressional_district)
        .bind(&voter.enrolled_party)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VoterRoll for SqliteVoterRoll {
    async fn find_registrants(
        &self,
        county: County,
        query: &RegistrantQuery,
        limit: u32,
    ) -> AppResult<Vec<MatchedVoter>> {
        let table = county.voter_table();
        let rows = sqlx::query(&format!(
            r#"
            SELECT state_voter_id, first_name, last_name, street_number, street_name,
                   city, zip_code, assembly_district, senate_district,
                   congressional_district, enrolled_party
            FROM {table}
            WHERE first_name LIKE ?1 ESCAPE '\'
              AND last_name LIKE ?2 ESCAPE '\'
              AND street_name LIKE ?3 ESCAPE '\'
            ORDER BY rowid ASC
            LIMIT ?4
            "#
        ))
        .bind(format!("{}%", escape_like(&query.first_name)))
        .bind(format!("{}%", escape_like(&query.last_name)))
        .bind(format!("%{}%", escape_like(&query.street_name)))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_matched_voter).collect()
    }

    async fn find_by_state_voter_id(
        &self,
        county: County,
        state_voter_id: &str,
    ) -> AppResult<Option<MatchedVoter>> {
        let table = county.voter_table();
        let row = sqlx::query(&format!(
            r#"
            SELECT state_voter_id, first_name, last_name, street_number, street_name,
                   city, zip_code, assembly_district, senate_district,
                   congressional_district, enrolled_party
            FROM {table}
            WHERE state_voter_id = ?1
            "#
        ))
        .bind(state_voter_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_matched_voter).transpose()
    }
}

/// Escapes LIKE wildcards so OCR text is matched literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn compose_address(street_number: &str, street_name: &str, city: &str, zip_code: &str) -> String {
    let street = [street_number, street_name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let locality = [city, zip_code]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    match (street.is_empty(), locality.is_empty()) {
        (false, false) => format!("{street}, {locality}"),
        (false, true) => street,
        _ => locality,
    }
}

fn map_matched_voter(row: SqliteRow) -> AppResult<MatchedVoter> {
    let street_number: String = row.try_get("street_number")?;
    let street_name: String = row.try_get("street_name")?;
    let city: String = row.try_get("city")?;
    let zip_code: String = row.try_get("zip_code")?;
    Ok(MatchedVoter {
        state_voter_id: row.try_get("state_voter_id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        address: compose_address(&street_number, &street_name, &city, &zip_code),
        assembly_district: row.try_get("assembly_district")?,
        senate_district: row.try_get("senate_district")?,
        congressional_district: row.try_get("congressional_district")?,
        enrolled_party: row.try_get("enrolled_party")?,
    })
}
