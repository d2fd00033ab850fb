//! Durable accumulation of validated pages into named petitions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use crate::core::{
    errors::{AppError, AppResult},
    types::{PageCommit, SavePageReceipt, ValidationResult},
};
use crate::db::{
    repositories::{petitions, signatures},
    Database,
};

#[derive(Debug, Clone)]
pub struct SavePage {
    pub petition_name: String,
    pub district: String,
    pub party: Option<String>,
    pub required_signatures: Option<i64>,
    pub page_number: i64,
    pub result: ValidationResult,
}

/// Commits pages one at a time per petition name.
#[derive(Clone)]
pub struct PetitionAggregator {
    db: Database,
    write_timeout: Duration,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl PetitionAggregator {
    pub fn new(db: Database, write_timeout: Duration) -> Self {
        Self {
            db,
            write_timeout,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts `page.result` toward the petition named `page.petition_name`,
    /// creating it on first use. Re-submitting a page already counted is a
    /// no-op that reports [`PageCommit::AlreadyCounted`], whatever result it
    /// carries.
    pub async fn save_page(&self, page: &SavePage) -> AppResult<SavePageReceipt> {
        let petition_name = page.petition_name.as_str();
        if petition_name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "petition name cannot be empty".to_string(),
            ));
        }
        if petition_name.trim() != petition_name {
            return Err(AppError::InvalidInput(
                "petition name has leading or trailing whitespace".to_string(),
            ));
        }
        if page.district.trim().is_empty() {
            return Err(AppError::InvalidInput("district cannot be empty".to_string()));
        }
        if page.page_number < 1 {
            return Err(AppError::InvalidInput(format!(
                "invalid page number {}",
                page.page_number
            )));
        }
        if !page.result.stats.is_consistent() || !page.result.stats_match_signatures() {
            return Err(AppError::InvalidInput(
                "result stats do not match its signatures".to_string(),
            ));
        }

        let lock = self.lock_for(petition_name).await;
        let outcome = {
            let _guard = lock.lock().await;
            tokio::time::timeout(self.write_timeout, self.commit(petition_name, page)).await
        };
        self.release_lock(petition_name, lock).await;
        let receipt = outcome.map_err(|_| AppError::WriteTimeout)??;

        match receipt.commit {
            PageCommit::AlreadyCounted => info!(
                petition = petition_name,
                page = page.page_number,
                "page already counted"
            ),
            commit => info!(
                petition = petition_name,
                petition_id = %receipt.petition_id,
                page = page.page_number,
                ?commit,
                signatures = page.result.stats.total,
                "page committed"
            ),
        }
        Ok(receipt)
    }

    async fn commit(&self, petition_name: &str, page: &SavePage) -> AppResult<SavePageReceipt> {
        if page.result.signatures.is_empty() {
            return self.recount_empty(petition_name, page.page_number).await;
        }
        let submission = petitions::PageSubmission {
            petition_name,
            district: page.district.trim(),
            party: page
                .party
                .as_deref()
                .map(str::trim)
                .filter(|party| !party.is_empty()),
            required_signatures: page.required_signatures,
            page_number: page.page_number,
            result: &page.result,
        };
        petitions::commit_page(self.db.pool(), &submission).await
    }

    /// An empty result can only ever be a resubmission of a counted page.
    async fn recount_empty(
        &self,
        petition_name: &str,
        page_number: i64,
    ) -> AppResult<SavePageReceipt> {
        let pool = self.db.pool();
        if let Some(petition) = petitions::find_petition_by_name(pool, petition_name).await? {
            if signatures::page_is_counted(pool, &petition.id, page_number).await? {
                return Ok(SavePageReceipt {
                    petition_id: petition.id,
                    page_number,
                    commit: PageCommit::AlreadyCounted,
                });
            }
        }
        Err(AppError::InvalidInput(
            "nothing to commit: page has no signatures".to_string(),
        ))
    }

    async fn lock_for(&self, petition_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(petition_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the per-name lock once no other save holds or awaits it.
    async fn release_lock(&self, petition_name: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // one reference in the map, one held here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(petition_name);
        }
    }

    #[cfg(test)]
    async fn tracked_names(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ImageRegion, SignatureStatus, SignatureValidation};

    fn one_signature(page_number: u32) -> ValidationResult {
        ValidationResult::new(
            vec![SignatureValidation {
                id: format!("p{page_number}-r0"),
                name: "Ana Ruiz".to_string(),
                address: "40 Grand St, Brooklyn".to_string(),
                status: SignatureStatus::Valid,
                matched_voter: None,
                reason: None,
                confidence: 0.9,
                image_region: ImageRegion {
                    x: 0,
                    y: 0,
                    width: 60,
                    height: 20,
                },
                page_number,
            }],
            None,
        )
    }

    fn page(name: &str, page_number: i64, result: ValidationResult) -> SavePage {
        SavePage {
            petition_name: name.to_string(),
            district: "AD-52".to_string(),
            party: None,
            required_signatures: None,
            page_number,
            result,
        }
    }

    #[tokio::test]
    async fn name_locks_are_released_after_each_save() {
        let db = Database::in_memory().await.expect("db");
        let aggregator = PetitionAggregator::new(db, Duration::from_secs(5));

        for name in ["Alpha", "Bravo", "Charlie"] {
            aggregator
                .save_page(&page(name, 1, one_signature(1)))
                .await
                .expect("save");
        }
        assert_eq!(aggregator.tracked_names().await, 0);

        aggregator
            .save_page(&page("Delta", 1, ValidationResult::empty()))
            .await
            .expect_err("empty page");
        assert_eq!(aggregator.tracked_names().await, 0);
    }

    #[tokio::test]
    async fn concurrent_saves_share_one_lock_until_both_finish() {
        let db = Database::in_memory().await.expect("db");
        let aggregator = PetitionAggregator::new(db, Duration::from_secs(5));
        let first = page("Alpha", 1, one_signature(1));
        let second = page("Alpha", 2, one_signature(2));

        let (a, b) = tokio::join!(aggregator.save_page(&first), aggregator.save_page(&second));
        a.expect("page 1");
        b.expect("page 2");
        assert_eq!(aggregator.tracked_names().await, 0);
    }
}
