use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::jurisdiction::County;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
}

/// Pixel-space rectangle on a page image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ImageRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ImageRegion {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Grows the region by `margin` on every side, clipped to the page.
    pub fn expanded(&self, margin: u32, page_width: u32, page_height: u32) -> Self {
        let x = self.x.saturating_sub(margin);
        let y = self.y.saturating_sub(margin);
        let right = (self.right() + margin).min(page_width);
        let bottom = (self.bottom() + margin).min(page_height);
        Self {
            x,
            y,
            width: right.saturating_sub(x).max(1),
            height: bottom.saturating_sub(y).max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Signature,
    Address,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Ruled,
    Unruled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegionCandidate {
    pub row: usize,
    pub kind: RegionKind,
    pub region: ImageRegion,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedSignature {
    pub name: String,
    pub address: String,
    pub image_region: ImageRegion,
    pub page_number: u32,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchedVoter {
    pub state_voter_id: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub assembly_district: Option<String>,
    pub senate_district: Option<String>,
    pub congressional_district: Option<String>,
    pub enrolled_party: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    Valid,
    Invalid,
    Uncertain,
}

impl SignatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Uncertain => "uncertain",
        }
    }

    pub fn from_str(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "valid" => Self::Valid,
            "invalid" => Self::Invalid,
            _ => Self::Uncertain,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignatureValidation {
    pub id: String,
    pub name: String,
    pub address: String,
    pub status: SignatureStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_voter: Option<MatchedVoter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub confidence: f64,
    pub image_region: ImageRegion,
    pub page_number: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResultStats {
    pub total: u32,
    pub valid: u32,
    pub invalid: u32,
    pub uncertain: u32,
}

impl ValidationResultStats {
    pub fn tally(signatures: &[SignatureValidation]) -> Self {
        signatures
            .iter()
            .fold(Self::default(), |mut stats, signature| {
                stats.total += 1;
                match signature.status {
                    SignatureStatus::Valid => stats.valid += 1,
                    SignatureStatus::Invalid => stats.invalid += 1,
                    SignatureStatus::Uncertain => stats.uncertain += 1,
                }
                stats
            })
    }

    pub fn is_consistent(&self) -> bool {
        self.valid + self.invalid + self.uncertain == self.total
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PetitionInfo {
    pub district: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_signatures: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub signatures: Vec<SignatureValidation>,
    pub stats: ValidationResultStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub petition_info: Option<PetitionInfo>,
}

impl ValidationResult {
    pub fn new(signatures: Vec<SignatureValidation>, petition_info: Option<PetitionInfo>) -> Self {
        let stats = ValidationResultStats::tally(&signatures);
        Self {
            signatures,
            stats,
            petition_info,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }

    /// True when `stats` still describes `signatures`.
    pub fn stats_match_signatures(&self) -> bool {
        ValidationResultStats::tally(&self.signatures) == self.stats
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PageWarning {
    ImageUnreadable { message: String },
    NoRegionsDetected,
    UnreadableRegions { count: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageValidation {
    pub page_number: u32,
    pub page_checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_method: Option<DetectionMethod>,
    pub result: ValidationResult,
    #[serde(default)]
    pub warnings: Vec<PageWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchValidation {
    pub pages: Vec<PageValidation>,
    pub combined: ValidationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Petition {
    pub id: String,
    pub name: String,
    pub district: String,
    pub party: Option<String>,
    pub valid_signatures: i64,
    pub invalid_signatures: i64,
    pub uncertain_signatures: i64,
    pub total_signatures: i64,
    pub total_pages: i64,
    pub completed_pages: i64,
    pub required_signatures: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Petition {
    /// Valid signatures still needed to reach the requirement, if one is known.
    pub fn remaining_signatures(&self) -> Option<i64> {
        self.required_signatures
            .map(|required| (required - self.valid_signatures).max(0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSignature {
    pub id: String,
    pub petition_id: String,
    pub page_number: i64,
    pub name: String,
    pub address: String,
    pub status: SignatureStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(rename = "matchedVoter", default, skip_serializing_if = "Option::is_none")]
    pub matched_voter_id: Option<String>,
    pub county: County,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_region: Option<ImageRegion>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PageCommit {
    Created,
    Counted,
    AlreadyCounted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavePageReceipt {
    pub petition_id: String,
    pub page_number: i64,
    pub commit: PageCommit,
}

/// What the caller renders once a page has been validated or committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum PageOutcome {
    NoSignaturesDetected,
    AlreadyCounted,
    Tally {
        valid: u32,
        invalid: u32,
        uncertain: u32,
    },
}

impl PageOutcome {
    pub fn for_result(result: &ValidationResult) -> Self {
        if result.stats.total == 0 {
            return Self::NoSignaturesDetected;
        }
        Self::Tally {
            valid: result.stats.valid,
            invalid: result.stats.invalid,
            uncertain: result.stats.uncertain,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::NoSignaturesDetected => "No signatures detected".to_string(),
            Self::AlreadyCounted => "Page already counted".to_string(),
            Self::Tally {
                valid,
                invalid,
                uncertain,
            } => format!("{valid} valid / {invalid} invalid / {uncertain} uncertain"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUpload {
    pub page_number: u32,
    #[serde(with = "base64_bytes")]
    pub image: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePagesRequest {
    pub pages: Vec<PageUpload>,
    pub target_district: String,
    #[serde(default)]
    pub petition_name: Option<String>,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub required_signatures: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub page_number: u32,
    pub outcome: PageOutcome,
    pub message: String,
    pub warnings: Vec<PageWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePagesResponse {
    pub batch: BatchValidation,
    pub reports: Vec<PageReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePageRequest {
    pub petition_name: String,
    pub district: String,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub required_signatures: Option<i64>,
    pub page_number: i64,
    pub result: ValidationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePageResponse {
    pub receipt: SavePageReceipt,
    pub outcome: PageOutcome,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPetitionsResponse {
    pub petitions: Vec<Petition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPetitionResponse {
    pub petition: Petition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSignaturesResponse {
    pub petition_id: String,
    pub signatures: Vec<PersistedSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetProviderKeyResponse {
    pub stored: bool,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
