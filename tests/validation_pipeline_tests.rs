mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{blank_sheet, png_bytes, ruled_sheet, state_with, state_with_roll, upload, voter};
use petition_validator::{
    commands::validation,
    core::{
        district::TargetDistrict,
        errors::{AppError, AppResult},
        jurisdiction::County,
        types::{
            DetectionMethod, MatchedVoter, PageOutcome, PageUpload, PageWarning, SignatureStatus,
            ValidatePagesRequest,
        },
    },
    extraction::{ScriptedExtractor, ScriptedRow},
    matcher::{RegistrantQuery, VoterRoll},
};

fn request(pages: Vec<PageUpload>, district: &str) -> ValidatePagesRequest {
    ValidatePagesRequest {
        pages,
        target_district: district.to_string(),
        petition_name: Some("Smith2024".to_string()),
        party: Some("DEM".to_string()),
        required_signatures: None,
    }
}

fn jane_smith() -> (County, petition_validator::db::repositories::voters::VoterRecord) {
    (
        County::Kings,
        voter("NY000123", "JANE", "SMITH", "123", "MAIN ST", "52"),
    )
}

#[tokio::test]
async fn eligible_signer_is_valid() {
    let extractor = ScriptedExtractor::new().with_row(
        1,
        0,
        ScriptedRow::new("Jane Smith", "123 Main St, Brooklyn", 0.9),
    );
    let state = state_with(extractor, &[jane_smith()]).await;

    let pages = vec![upload(1, ruled_sheet(1))];
    let response = validation::validate_pages(&state, request(pages, "AD-52"))
        .await
        .expect("validate");

    let page = &response.batch.pages[0];
    assert_eq!(page.detection_method, Some(DetectionMethod::Ruled));
    assert!(page.warnings.is_empty());
    let stats = response.batch.combined.stats;
    assert_eq!((stats.total, stats.valid, stats.invalid, stats.uncertain), (1, 1, 0, 0));

    let signature = &response.batch.combined.signatures[0];
    assert_eq!(signature.id, "p1-r0");
    assert_eq!(signature.status, SignatureStatus::Valid);
    assert_eq!(signature.reason, None);
    assert_eq!(
        signature
            .matched_voter
            .as_ref()
            .map(|voter| voter.state_voter_id.as_str()),
        Some("NY000123")
    );
    assert!((signature.confidence - 0.9).abs() < 1e-9);
    assert_eq!(response.reports[0].message, "1 valid / 0 invalid / 0 uncertain");

    let info = response.batch.combined.petition_info.as_ref().expect("petition info");
    assert_eq!(info.district, "AD-52");
    assert_eq!(info.required_signatures, Some(500));
    assert_eq!(info.name.as_deref(), Some("Smith2024"));
}

#[tokio::test]
async fn unknown_signer_is_invalid() {
    let extractor = ScriptedExtractor::new().with_row(
        1,
        0,
        ScriptedRow::new("John Doe", "9 Elm St, Queens", 0.95),
    );
    let state = state_with(extractor, &[jane_smith()]).await;

    let pages = vec![upload(1, ruled_sheet(1))];
    let response = validation::validate_pages(&state, request(pages, "AD-52"))
        .await
        .expect("validate");
    let signature = &response.batch.combined.signatures[0];
    assert_eq!(signature.status, SignatureStatus::Invalid);
    assert_eq!(signature.reason.as_deref(), Some("No matching voter found"));
    assert!(signature.matched_voter.is_none());
}

#[tokio::test]
async fn signer_outside_target_district_is_invalid() {
    let extractor = ScriptedExtractor::new().with_row(
        1,
        0,
        ScriptedRow::new("Jane Smith", "123 Main St, Brooklyn", 0.9),
    );
    let state = state_with(extractor, &[jane_smith()]).await;

    let pages = vec![upload(1, ruled_sheet(1))];
    let response = validation::validate_pages(&state, request(pages, "AD-73"))
        .await
        .expect("validate");
    let signature = &response.batch.combined.signatures[0];
    assert_eq!(signature.status, SignatureStatus::Invalid);
    assert_eq!(signature.reason.as_deref(), Some("Voter not in required district"));
}

#[tokio::test]
async fn low_confidence_extraction_is_uncertain() {
    let extractor = ScriptedExtractor::new().with_row(
        1,
        0,
        ScriptedRow::new("Jane Smith", "123 Main St, Brooklyn", 0.65),
    );
    let state = state_with(extractor, &[jane_smith()]).await;

    let pages = vec![upload(1, ruled_sheet(1))];
    let response = validation::validate_pages(&state, request(pages, "AD-52"))
        .await
        .expect("validate");
    let signature = &response.batch.combined.signatures[0];
    assert_eq!(signature.status, SignatureStatus::Uncertain);
    assert_eq!(
        signature.reason.as_deref(),
        Some("Low confidence in signature extraction")
    );
    assert!(signature.matched_voter.is_some());
}

#[tokio::test]
async fn partial_ocr_text_still_matches_by_prefix_and_substring() {
    let extractor = ScriptedExtractor::new().with_row(
        1,
        0,
        ScriptedRow::new("Jan Smi", "123 main, Brooklyn NY", 0.9),
    );
    let state = state_with(extractor, &[jane_smith()]).await;

    let pages = vec![upload(1, ruled_sheet(1))];
    let response = validation::validate_pages(&state, request(pages, "AD-52"))
        .await
        .expect("validate");
    assert_eq!(
        response.batch.combined.signatures[0].status,
        SignatureStatus::Valid
    );
}

struct FailingRoll;

#[async_trait]
impl VoterRoll for FailingRoll {
    async fn find_registrants(
        &self,
        _county: County,
        _query: &RegistrantQuery,
        _limit: u32,
    ) -> AppResult<Vec<MatchedVoter>> {
        Err(AppError::Database("voter roll unavailable".to_string()))
    }

    async fn find_by_state_voter_id(
        &self,
        _county: County,
        _state_voter_id: &str,
    ) -> AppResult<Option<MatchedVoter>> {
        Err(AppError::Database("voter roll unavailable".to_string()))
    }
}

#[tokio::test]
async fn lookup_failure_downgrades_only_that_signature() {
    let extractor = ScriptedExtractor::new()
        .with_row(1, 0, ScriptedRow::new("Jane Smith", "123 Main St, Brooklyn", 0.9))
        .with_row(1, 1, ScriptedRow::new("Ana Ruiz", "40 Grand St, Bronx", 0.9));
    let state = state_with_roll(extractor, Arc::new(FailingRoll)).await;

    let pages = vec![upload(1, ruled_sheet(2))];
    let response = validation::validate_pages(&state, request(pages, "AD-52"))
        .await
        .expect("page still validates");
    let stats = response.batch.combined.stats;
    assert_eq!((stats.total, stats.uncertain), (2, 2));
    for signature in &response.batch.combined.signatures {
        assert_eq!(signature.reason.as_deref(), Some("Error during validation"));
        assert!(signature.matched_voter.is_none());
    }
}

#[tokio::test]
async fn extraction_failure_is_uncertain_and_other_rows_continue() {
    let extractor = ScriptedExtractor::new()
        .with_failure(1, 0, "vision service returned garbage")
        .with_row(1, 1, ScriptedRow::new("Jane Smith", "123 Main St, Brooklyn", 0.9));
    let state = state_with(extractor, &[jane_smith()]).await;

    let pages = vec![upload(1, ruled_sheet(2))];
    let response = validation::validate_pages(&state, request(pages, "AD-52"))
        .await
        .expect("validate");
    let signatures = &response.batch.combined.signatures;
    assert_eq!(signatures.len(), 2);
    assert_eq!(signatures[0].id, "p1-r0");
    assert_eq!(signatures[0].status, SignatureStatus::Uncertain);
    assert_eq!(signatures[0].reason.as_deref(), Some("Error during validation"));
    assert_eq!(signatures[1].id, "p1-r1");
    assert_eq!(signatures[1].status, SignatureStatus::Valid);
}

#[tokio::test]
async fn blank_extraction_drops_the_row_with_a_warning() {
    // row 1 is detected but nothing is scripted for it
    let extractor = ScriptedExtractor::new().with_row(
        1,
        0,
        ScriptedRow::new("Jane Smith", "123 Main St, Brooklyn", 0.9),
    );
    let state = state_with(extractor, &[jane_smith()]).await;

    let pages = vec![upload(1, ruled_sheet(2))];
    let response = validation::validate_pages(&state, request(pages, "AD-52"))
        .await
        .expect("validate");
    let page = &response.batch.pages[0];
    assert_eq!(page.result.stats.total, 1);
    assert_eq!(page.warnings, vec![PageWarning::UnreadableRegions { count: 1 }]);
}

#[tokio::test]
async fn page_without_regions_is_an_empty_result_with_warning() {
    let state = state_with(ScriptedExtractor::new(), &[]).await;

    let pages = vec![upload(1, blank_sheet())];
    let response = validation::validate_pages(&state, request(pages, "AD-52"))
        .await
        .expect("validate");
    let page = &response.batch.pages[0];
    assert_eq!(page.result.stats.total, 0);
    assert_eq!(page.warnings, vec![PageWarning::NoRegionsDetected]);
    assert_eq!(response.reports[0].outcome, PageOutcome::NoSignaturesDetected);
    assert_eq!(response.reports[0].message, "No signatures detected");
}

#[tokio::test]
async fn undecodable_page_is_reported_not_fatal() {
    let state = state_with(ScriptedExtractor::new(), &[]).await;
    let pages = vec![
        PageUpload {
            page_number: 1,
            image: b"definitely not a png".to_vec(),
        },
        upload(2, blank_sheet()),
    ];

    let response = validation::validate_pages(&state, request(pages, "AD-52"))
        .await
        .expect("validate");
    assert!(matches!(
        response.batch.pages[0].warnings.as_slice(),
        [PageWarning::ImageUnreadable { .. }]
    ));
    assert_eq!(response.batch.pages[0].detection_method, None);
    assert_eq!(response.batch.pages.len(), 2);
}

#[tokio::test]
async fn batch_combines_pages_with_unique_ids() {
    let extractor = ScriptedExtractor::new()
        .with_row(1, 0, ScriptedRow::new("Jane Smith", "123 Main St, Brooklyn", 0.9))
        .with_row(2, 0, ScriptedRow::new("John Doe", "9 Elm St, Queens", 0.9))
        .with_row(2, 1, ScriptedRow::new("Jane Smith", "123 Main St, Brooklyn", 0.7));
    let state = state_with(extractor, &[jane_smith()]).await;

    let pages = vec![upload(1, ruled_sheet(1)), upload(2, ruled_sheet(2))];
    let response = validation::validate_pages(&state, request(pages, "AD-52"))
        .await
        .expect("validate");

    let combined = &response.batch.combined;
    let stats = combined.stats;
    assert_eq!((stats.total, stats.valid, stats.invalid, stats.uncertain), (3, 1, 1, 1));
    assert!(combined.stats_match_signatures());
    let ids: Vec<&str> = combined.signatures.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["p1-r0", "p2-r0", "p2-r1"]);

    for signature in &combined.signatures {
        if signature.status == SignatureStatus::Valid {
            assert!(signature.matched_voter.is_some());
            assert!(signature.confidence >= state.config.validity_threshold);
        } else {
            assert!(signature.reason.is_some());
        }
    }
}

#[tokio::test]
async fn duplicate_page_numbers_are_rejected() {
    let state = state_with(ScriptedExtractor::new(), &[]).await;
    let pages = vec![upload(1, blank_sheet()), upload(1, blank_sheet())];
    let err = validation::validate_pages(&state, request(pages, "AD-52"))
        .await
        .expect_err("duplicate pages");
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let state = state_with(ScriptedExtractor::new(), &[]).await;
    let err = validation::validate_pages(&state, request(vec![], "AD-52"))
        .await
        .expect_err("no pages");
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn identical_bytes_give_identical_results() {
    let extractor = ScriptedExtractor::new().with_row(
        1,
        0,
        ScriptedRow::new("Jane Smith", "123 Main St, Brooklyn", 0.9),
    );
    let state = state_with(extractor, &[jane_smith()]).await;
    let bytes = png_bytes(ruled_sheet(1));
    let district = TargetDistrict::parse("AD-52");

    let first = state
        .engine
        .process_page(&bytes, 1, &district)
        .await
        .expect("first");
    let second = state
        .engine
        .process_page(&bytes, 1, &district)
        .await
        .expect("second");
    assert_eq!(first, second);
    assert_eq!(first.page_checksum.len(), 64);
}

#[tokio::test]
async fn decoded_raster_validates_like_uploaded_bytes() {
    petition_validator::init_tracing();
    let extractor = ScriptedExtractor::new().with_row(
        4,
        0,
        ScriptedRow::new("Jane Smith", "123 Main St, Brooklyn", 0.9),
    );
    let state = state_with(extractor, &[jane_smith()]).await;
    let district = TargetDistrict::parse("AD-52");
    let raster = petition_validator::detection::PageRaster::from_image(ruled_sheet(1));

    let from_raster = state.engine.process_raster(&raster, 4, &district).await;
    let from_bytes = state
        .engine
        .process_page(&png_bytes(ruled_sheet(1)), 4, &district)
        .await
        .expect("process bytes");
    assert_eq!(from_raster.result, from_bytes.result);
    assert_eq!(from_raster.result.signatures[0].id, "p4-r0");
    assert_eq!(state.engine.extractor_name(), "scripted");
}
