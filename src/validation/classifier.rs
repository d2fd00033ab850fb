use crate::core::{
    district::{Eligibility, TargetDistrict},
    types::{ExtractedSignature, MatchedVoter, SignatureStatus},
};

pub const REASON_NO_MATCH: &str = "No matching voter found";
pub const REASON_OUT_OF_DISTRICT: &str = "Voter not in required district";
pub const REASON_UNVERIFIABLE_DISTRICT: &str = "District type cannot be verified";
pub const REASON_LOW_CONFIDENCE: &str = "Low confidence in signature extraction";
pub const REASON_ERROR: &str = "Error during validation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: SignatureStatus,
    pub reason: Option<String>,
}

impl Verdict {
    fn valid() -> Self {
        Self {
            status: SignatureStatus::Valid,
            reason: None,
        }
    }

    fn with_reason(status: SignatureStatus, reason: &str) -> Self {
        Self {
            status,
            reason: Some(reason.to_string()),
        }
    }

    /// Verdict for a row whose extraction or lookup failed.
    pub fn error() -> Self {
        Self::with_reason(SignatureStatus::Uncertain, REASON_ERROR)
    }
}

/// First applicable rule wins: no voter, district, confidence, valid.
pub fn classify(
    signature: &ExtractedSignature,
    voter: Option<&MatchedVoter>,
    district: &TargetDistrict,
    validity_threshold: f64,
) -> Verdict {
    let Some(voter) = voter else {
        return Verdict::with_reason(SignatureStatus::Invalid, REASON_NO_MATCH);
    };
    match district.eligibility(voter) {
        Eligibility::OutOfDistrict => {
            return Verdict::with_reason(SignatureStatus::Invalid, REASON_OUT_OF_DISTRICT)
        }
        Eligibility::Unverifiable => {
            return Verdict::with_reason(SignatureStatus::Uncertain, REASON_UNVERIFIABLE_DISTRICT)
        }
        Eligibility::Eligible => {}
    }
    if signature.confidence < validity_threshold {
        return Verdict::with_reason(SignatureStatus::Uncertain, REASON_LOW_CONFIDENCE);
    }
    Verdict::valid()
}
