use chrono::{DateTime, Utc};

use crate::core::errors::{AppError, AppResult};

pub mod petitions;
pub mod signatures;
pub mod voters;

pub(crate) fn parse_timestamp(value: String) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|err| AppError::Database(format!("invalid timestamp {value}: {err}")))
}
