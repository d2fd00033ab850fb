use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::core::{
    errors::{AppError, AppResult},
    types::{PageCommit, Petition, SavePageReceipt, ValidationResult},
};

use super::{parse_timestamp, signatures};

/// Everything needed to count one validated page toward a petition.
#[derive(Debug, Clone, Copy)]
pub struct PageSubmission<'a> {
    pub petition_name: &'a str,
    pub district: &'a str,
    pub party: Option<&'a str>,
    pub required_signatures: Option<i64>,
    pub page_number: i64,
    pub result: &'a ValidationResult,
}

/// Counts a page at most once, in a single transaction.
///
/// A new name creates the petition seeded with the page's tallies. For an
/// existing petition the counters only move when no signature row exists yet
/// for `(petition, page)`; otherwise nothing is written and the receipt says
/// `AlreadyCounted`.
pub async fn commit_page(
    pool: &SqlitePool,
    submission: &PageSubmission<'_>,
) -> AppResult<SavePageReceipt> {
    let stats = submission.result.stats;
    let mut tx = pool.begin().await?;

    // A write first, so the transaction holds the write lock before it reads.
    let created = sqlx::query(
        r#"
        INSERT INTO petitions (
          id, name, district, party, valid_signatures, invalid_signatures,
          uncertain_signatures, total_signatures, total_pages, completed_pages,
          required_signatures
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, 1, ?9)
        ON CONFLICT(name) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(submission.petition_name)
    .bind(submission.district)
    .bind(submission.party)
    .bind(i64::from(stats.valid))
    .bind(i64::from(stats.invalid))
    .bind(i64::from(stats.uncertain))
    .bind(i64::from(stats.total))
    .bind(submission.required_signatures)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        == 1;

    let petition_id: String = sqlx::query("SELECT id FROM petitions WHERE name = ?1")
        .bind(submission.petition_name)
        .fetch_one(&mut *tx)
        .await?
        .try_get("id")?;

    let commit = if created {
        PageCommit::Created
    } else {
        let affected = sqlx::query(
            r#"
            UPDATE petitions
            SET valid_signatures = valid_signatures + ?3,
                invalid_signatures = invalid_signatures + ?4,
                uncertain_signatures = uncertain_signatures + ?5,
                total_signatures = total_signatures + ?6,
                total_pages = total_pages + 1,
                completed_pages = completed_pages + 1,
                required_signatures = COALESCE(required_signatures, ?7),
                updated_at = (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            WHERE id = ?1
              AND NOT EXISTS (
                SELECT 1
                FROM petition_signatures
                WHERE petition_id = ?1 AND page_number = ?2
              )
            "#,
        )
        .bind(&petition_id)
        .bind(submission.page_number)
        .bind(i64::from(stats.valid))
        .bind(i64::from(stats.invalid))
        .bind(i64::from(stats.uncertain))
        .bind(i64::from(stats.total))
        .bind(submission.required_signatures)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if affected == 0 {
            tx.rollback().await?;
            return Ok(SavePageReceipt {
                petition_id,
                page_number: submission.page_number,
                commit: PageCommit::AlreadyCounted,
            });
        }
        PageCommit::Counted
    };

    signatures::insert_page_signatures(
        &mut *tx,
        &petition_id,
        submission.page_number,
        &submission.result.signatures,
    )
    .await?;
    tx.commit().await?;

    Ok(SavePageReceipt {
        petition_id,
        page_number: submission.page_number,
        commit,
    })
}

pub async fn list_petitions(pool: &SqlitePool) -> AppResult<Vec<Petition>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, district, party, valid_signatures, invalid_signatures,
               uncertain_signatures, total_signatures, total_pages, completed_pages,
               required_signatures, created_at, updated_at
        FROM petitions
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_petition).collect()
}

pub async fn get_petition(pool: &SqlitePool, id: &str) -> AppResult<Petition> {
    let row = sqlx::query(
        r#"
        SELECT id, name, district, party, valid_signatures, invalid_signatures,
               uncertain_signatures, total_signatures, total_pages, completed_pages,
               required_signatures, created_at, updated_at
        FROM petitions
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("petition {id}")))?;

    map_petition(row)
}

/// Exact, case-sensitive lookup on the petition's natural key.
pub async fn find_petition_by_name(pool: &SqlitePool, name: &str) -> AppResult<Option<Petition>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, district, party, valid_signatures, invalid_signatures,
               uncertain_signatures, total_signatures, total_pages, completed_pages,
               required_signatures, created_at, updated_at
        FROM petitions
        WHERE name = ?1
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    row.map(map_petition).transpose()
}

fn map_petition(row: SqliteRow) -> AppResult<Petition> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(Petition {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        district: row.try_get("district")?,
        party: row.try_get("party")?,
        valid_signatures: row.try_get("valid_signatures")?,
        invalid_signatures: row.try_get("invalid_signatures")?,
        uncertain_signatures: row.try_get("uncertain_signatures")?,
        total_signatures: row.try_get("total_signatures")?,
        total_pages: row.try_get("total_pages")?,
        completed_pages: row.try_get("completed_pages")?,
        required_signatures: row.try_get("required_signatures")?,
        created_at: parse_timestamp(created_at)?,
        updated_at: parse_timestamp(updated_at)?,
    })
}
