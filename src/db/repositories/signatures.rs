use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::core::{
    errors::{AppError, AppResult},
    jurisdiction::County,
    types::{ImageRegion, PersistedSignature, SignatureStatus, SignatureValidation},
};

use super::parse_timestamp;

/// Writes one row per signature of a page. Runs on the caller's transaction.
pub async fn insert_page_signatures(
    conn: &mut SqliteConnection,
    petition_id: &str,
    page_number: i64,
    signatures: &[SignatureValidation],
) -> AppResult<()> {
    for signature in signatures {
        let county = County::infer(&signature.address);
        sqlx::query(
            r#"
            INSERT INTO petition_signatures (
              id, petition_id, page_number, name, address, status, reason,
              confidence, matched_voter_id, county, image_region_json
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(petition_id)
        .bind(page_number)
        .bind(&signature.name)
        .bind(&signature.address)
        .bind(signature.status.as_str())
        .bind(&signature.reason)
        .bind(signature.confidence)
        .bind(
            signature
                .matched_voter
                .as_ref()
                .map(|voter| voter.state_voter_id.as_str()),
        )
        .bind(county.as_str())
        .bind(serde_json::to_string(&signature.image_region)?)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn page_is_counted(
    pool: &SqlitePool,
    petition_id: &str,
    page_number: i64,
) -> AppResult<bool> {
    let row = sqlx::query(
        r#"
        SELECT 1
        FROM petition_signatures
        WHERE petition_id = ?1 AND page_number = ?2
        LIMIT 1
        "#,
    )
    .bind(petition_id)
    .bind(page_number)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Signatures of a petition in page order, then insertion order.
pub async fn list_signatures(
    pool: &SqlitePool,
    petition_id: &str,
    page_number: Option<i64>,
) -> AppResult<Vec<PersistedSignature>> {
    let rows = sqlx::query(
        r#"
        SELECT id, petition_id, page_number, name, address, status, reason,
               confidence, matched_voter_id, county, image_region_json, created_at
        FROM petition_signatures
        WHERE petition_id = ?1 AND (?2 IS NULL OR page_number = ?2)
        ORDER BY page_number ASC, rowid ASC
        "#,
    )
    .bind(petition_id)
    .bind(page_number)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_signature).collect()
}

fn map_signature(row: SqliteRow) -> AppResult<PersistedSignature> {
    let status: String = row.try_get("status")?;
    let county: String = row.try_get("county")?;
    let image_region_json: Option<String> = row.try_get("image_region_json")?;
    let created_at: String = row.try_get("created_at")?;

    let county = County::from_str(&county)
        .ok_or_else(|| AppError::Database(format!("unknown county {county}")))?;
    let image_region = image_region_json
        .map(|raw| serde_json::from_str::<ImageRegion>(&raw))
        .transpose()
        .map_err(|err| AppError::Database(format!("invalid image region: {err}")))?;

    Ok(PersistedSignature {
        id: row.try_get("id")?,
        petition_id: row.try_get("petition_id")?,
        page_number: row.try_get("page_number")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        status: SignatureStatus::from_str(&status),
        reason: row.try_get("reason")?,
        confidence: row.try_get("confidence")?,
        matched_voter_id: row.try_get("matched_voter_id")?,
        county,
        image_region,
        created_at: parse_timestamp(created_at)?,
    })
}
