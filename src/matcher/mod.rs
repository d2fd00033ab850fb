//! Best-effort prefix/substring lookup of a signer in the voter roll.

mod parse;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::core::{
    errors::{AppError, AppResult},
    jurisdiction::County,
    types::MatchedVoter,
};

pub use parse::{parse_name, parse_street, ParsedName, ParsedStreet};

/// Filters for one registrant lookup. Names match as case-insensitive
/// prefixes, the street as a case-insensitive substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrantQuery {
    pub first_name: String,
    pub last_name: String,
    pub street_name: String,
}

impl RegistrantQuery {
    pub fn from_signature(name: &str, address: &str) -> Option<Self> {
        let parsed = parse_name(name)?;
        Some(Self {
            first_name: parsed.first,
            last_name: parsed.last,
            street_name: parse_street(address).name,
        })
    }
}

/// Read-only access to a county-partitioned voter roll.
#[async_trait]
pub trait VoterRoll: Send + Sync {
    async fn find_registrants(
        &self,
        county: County,
        query: &RegistrantQuery,
        limit: u32,
    ) -> AppResult<Vec<MatchedVoter>>;

    async fn find_by_state_voter_id(
        &self,
        county: County,
        state_voter_id: &str,
    ) -> AppResult<Option<MatchedVoter>>;
}

#[derive(Clone)]
pub struct VoterMatcher {
    roll: Arc<dyn VoterRoll>,
    lookup_timeout: Duration,
}

impl VoterMatcher {
    pub fn new(roll: Arc<dyn VoterRoll>, lookup_timeout: Duration) -> Self {
        Self {
            roll,
            lookup_timeout,
        }
    }

    /// First registrant in the address's county matching `name` and the
    /// street of `address`, or `None`.
    pub async fn find_match(&self, name: &str, address: &str) -> AppResult<Option<MatchedVoter>> {
        let Some(query) = RegistrantQuery::from_signature(name, address) else {
            return Ok(None);
        };
        let county = County::infer(address);
        debug!(county = county.as_str(), ?query, "voter lookup");

        let registrants = tokio::time::timeout(
            self.lookup_timeout,
            self.roll.find_registrants(county, &query, 1),
        )
        .await
        .map_err(|_| AppError::LookupTimeout)??;
        Ok(registrants.into_iter().next())
    }

    pub async fn find_by_state_voter_id(
        &self,
        county: County,
        state_voter_id: &str,
    ) -> AppResult<Option<MatchedVoter>> {
        tokio::time::timeout(
            self.lookup_timeout,
            self.roll.find_by_state_voter_id(county, state_voter_id),
        )
        .await
        .map_err(|_| AppError::LookupTimeout)?
    }
}
