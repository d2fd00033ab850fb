use std::collections::HashSet;
use std::sync::Arc;

use futures::future::{join_all, try_join};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::{
    config::{DetectorConfig, EngineConfig},
    district::TargetDistrict,
    errors::{AppError, AppResult},
    types::{
        BatchValidation, ExtractedSignature, PageUpload, PageValidation, PageWarning,
        PetitionInfo, RegionCandidate, RegionKind, SignatureValidation, ValidationResult,
    },
};
use crate::detection::{detect_regions, DetectedPage, PageRaster};
use crate::extraction::{FieldBand, FieldExtractor, FieldRequest, FieldText};
use crate::matcher::VoterMatcher;

use super::classifier::{classify, Verdict};

fn checksum_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn signature_id(page_number: u32, row: usize) -> String {
    format!("p{page_number}-r{row}")
}

enum RowOutcome {
    Validated(SignatureValidation),
    Unreadable,
}

/// Runs detect, extract, match and classify for petition pages.
#[derive(Clone)]
pub struct ValidationEngine {
    extractor: Arc<dyn FieldExtractor>,
    matcher: VoterMatcher,
    validity_threshold: f64,
    detector: DetectorConfig,
}

impl ValidationEngine {
    pub fn new(
        extractor: Arc<dyn FieldExtractor>,
        matcher: VoterMatcher,
        config: &EngineConfig,
    ) -> Self {
        Self {
            extractor,
            matcher,
            validity_threshold: config.validity_threshold,
            detector: config.detector.clone(),
        }
    }

    pub fn extractor_name(&self) -> &str {
        self.extractor.name()
    }

    /// Validates one uploaded page image.
    ///
    /// An unreadable image or a page without candidates yields an empty
    /// result with a warning rather than an error.
    pub async fn process_page(
        &self,
        bytes: &[u8],
        page_number: u32,
        district: &TargetDistrict,
    ) -> AppResult<PageValidation> {
        let page_checksum = checksum_bytes(bytes);
        let owned = bytes.to_vec();
        let detector = self.detector.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            PageRaster::decode(&owned).map(|raster| {
                let detected = detect_regions(&raster, &detector);
                (raster, detected)
            })
        })
        .await?;

        let (raster, detected) = match decoded {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(page = page_number, error = %err, "page image could not be decoded");
                return Ok(PageValidation {
                    page_number,
                    page_checksum,
                    detection_method: None,
                    result: ValidationResult::new(vec![], Some(page_info(district))),
                    warnings: vec![PageWarning::ImageUnreadable {
                        message: err.to_string(),
                    }],
                });
            }
        };

        let mut validation = self
            .validate_detected(&raster, detected, page_number, district)
            .await;
        validation.page_checksum = page_checksum;
        Ok(validation)
    }

    /// Validates an already-decoded page. Detection runs on the calling task.
    pub async fn process_raster(
        &self,
        raster: &PageRaster,
        page_number: u32,
        district: &TargetDistrict,
    ) -> PageValidation {
        let detected = detect_regions(raster, &self.detector);
        let mut validation = self
            .validate_detected(raster, detected, page_number, district)
            .await;
        validation.page_checksum = checksum_bytes(raster.image().as_raw());
        validation
    }

    /// Validates pages in order and combines them into one result carrying
    /// `info`. Page numbers must be positive and distinct.
    pub async fn process_pages(
        &self,
        pages: &[PageUpload],
        district: &TargetDistrict,
        info: PetitionInfo,
    ) -> AppResult<BatchValidation> {
        let mut seen = HashSet::new();
        for page in pages {
            if page.page_number == 0 {
                return Err(AppError::InvalidInput(
                    "page numbers start at 1".to_string(),
                ));
            }
            if !seen.insert(page.page_number) {
                return Err(AppError::InvalidInput(format!(
                    "page {} submitted twice",
                    page.page_number
                )));
            }
        }

        let mut validations = Vec::with_capacity(pages.len());
        for page in pages {
            validations.push(
                self.process_page(&page.image, page.page_number, district)
                    .await?,
            );
        }

        let signatures = validations
            .iter()
            .flat_map(|page| page.result.signatures.iter().cloned())
            .collect();
        let combined = ValidationResult::new(signatures, Some(info));
        info!(
            pages = validations.len(),
            total = combined.stats.total,
            valid = combined.stats.valid,
            "batch validated"
        );
        Ok(BatchValidation {
            pages: validations,
            combined,
        })
    }

    async fn validate_detected(
        &self,
        raster: &PageRaster,
        detected: DetectedPage,
        page_number: u32,
        district: &TargetDistrict,
    ) -> PageValidation {
        let method = detected.method;
        let signature_rows: Vec<&RegionCandidate> = detected
            .candidates
            .iter()
            .filter(|candidate| candidate.kind == RegionKind::Signature)
            .collect();

        if signature_rows.is_empty() {
            debug!(page = page_number, ?method, "no signature regions detected");
            return PageValidation {
                page_number,
                page_checksum: String::new(),
                detection_method: Some(method),
                result: ValidationResult::new(vec![], Some(page_info(district))),
                warnings: vec![PageWarning::NoRegionsDetected],
            };
        }

        let outcomes = join_all(signature_rows.iter().map(|signature| {
            let address = detected.candidates.iter().find(|candidate| {
                candidate.kind == RegionKind::Address && candidate.row == signature.row
            });
            self.validate_row(raster, page_number, signature, address, district)
        }))
        .await;

        let mut signatures = Vec::with_capacity(outcomes.len());
        let mut unreadable = 0usize;
        for outcome in outcomes {
            match outcome {
                RowOutcome::Validated(signature) => signatures.push(signature),
                RowOutcome::Unreadable => unreadable += 1,
            }
        }

        let mut warnings = Vec::new();
        if unreadable > 0 {
            warnings.push(PageWarning::UnreadableRegions { count: unreadable });
        }
        let result = ValidationResult::new(signatures, Some(page_info(district)));
        info!(
            page = page_number,
            ?method,
            total = result.stats.total,
            valid = result.stats.valid,
            invalid = result.stats.invalid,
            uncertain = result.stats.uncertain,
            unreadable,
            "page validated"
        );
        PageValidation {
            page_number,
            page_checksum: String::new(),
            detection_method: Some(method),
            result,
            warnings,
        }
    }

    async fn validate_row(
        &self,
        raster: &PageRaster,
        page_number: u32,
        signature: &RegionCandidate,
        address: Option<&RegionCandidate>,
        district: &TargetDistrict,
    ) -> RowOutcome {
        let id = signature_id(page_number, signature.row);
        let fields = try_join(
            self.extract_field(raster, page_number, signature, FieldBand::Name),
            async {
                match address {
                    Some(address) => {
                        self.extract_field(raster, page_number, address, FieldBand::Address)
                            .await
                    }
                    None => Ok(FieldText::empty()),
                }
            },
        )
        .await;

        let (name, address) = match fields {
            Ok(fields) => fields,
            Err(err) => {
                warn!(
                    page = page_number,
                    row = signature.row,
                    error = %err,
                    "field extraction failed"
                );
                return RowOutcome::Validated(errored(
                    id,
                    String::new(),
                    String::new(),
                    signature,
                    page_number,
                ));
            }
        };
        if name.is_blank() || address.is_blank() {
            debug!(page = page_number, row = signature.row, "dropping unreadable row");
            return RowOutcome::Unreadable;
        }

        let extracted = ExtractedSignature {
            name: name.text.trim().to_string(),
            address: address.text.trim().to_string(),
            image_region: signature.region,
            page_number,
            confidence: signature
                .confidence
                .min(name.confidence)
                .min(address.confidence),
        };

        let voter = match self
            .matcher
            .find_match(&extracted.name, &extracted.address)
            .await
        {
            Ok(voter) => voter,
            Err(err) => {
                warn!(page = page_number, row = signature.row, error = %err, "voter lookup failed");
                let mut validation = errored(
                    id,
                    extracted.name,
                    extracted.address,
                    signature,
                    page_number,
                );
                validation.confidence = extracted.confidence;
                return RowOutcome::Validated(validation);
            }
        };

        let verdict = classify(&extracted, voter.as_ref(), district, self.validity_threshold);
        RowOutcome::Validated(SignatureValidation {
            id,
            name: extracted.name,
            address: extracted.address,
            status: verdict.status,
            matched_voter: voter,
            reason: verdict.reason,
            confidence: extracted.confidence,
            image_region: extracted.image_region,
            page_number,
        })
    }

    async fn extract_field(
        &self,
        raster: &PageRaster,
        page_number: u32,
        candidate: &RegionCandidate,
        band: FieldBand,
    ) -> AppResult<FieldText> {
        let request = FieldRequest {
            page_number,
            row: candidate.row,
            region: candidate.region,
            band,
        };
        self.extractor.extract(raster, &request).await
    }
}

fn page_info(district: &TargetDistrict) -> PetitionInfo {
    PetitionInfo {
        district: district.to_string(),
        required_signatures: district.default_required_signatures(),
        party: None,
        name: None,
    }
}

fn errored(
    id: String,
    name: String,
    address: String,
    signature: &RegionCandidate,
    page_number: u32,
) -> SignatureValidation {
    let verdict = Verdict::error();
    SignatureValidation {
        id,
        name,
        address,
        status: verdict.status,
        matched_voter: None,
        reason: verdict.reason,
        confidence: signature.confidence,
        image_region: signature.region,
        page_number,
    }
}
