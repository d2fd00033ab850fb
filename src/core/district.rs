use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::MatchedVoter;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistrictKind {
    Assembly,
    Senate,
    Congressional,
    CityCouncil,
}

impl DistrictKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Assembly => "AD",
            Self::Senate => "SD",
            Self::Congressional => "CD",
            Self::CityCouncil => "CC",
        }
    }

    fn from_prefix(raw: &str) -> Option<Self> {
        match raw {
            "AD" => Some(Self::Assembly),
            "SD" => Some(Self::Senate),
            "CD" => Some(Self::Congressional),
            "CC" => Some(Self::CityCouncil),
            _ => None,
        }
    }
}

/// The district a petition is circulated in, as supplied by the caller in the
/// `"<TYPE>-<NUMBER>"` or `"CITYWIDE"` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetDistrict {
    Citywide,
    District { kind: DistrictKind, number: String },
    Unrecognized(String),
}

/// Result of checking one matched voter against the target district.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    OutOfDistrict,
    /// The voter record carries no field for this district type.
    Unverifiable,
}

impl TargetDistrict {
    /// Never fails: anything that is not a known form becomes `Unrecognized`
    /// and is handled by the classifier.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let upper = trimmed.to_ascii_uppercase();
        if upper == "CITYWIDE" {
            return Self::Citywide;
        }
        if let Some((prefix, number)) = upper.split_once('-') {
            let number = number.trim();
            let numeric = !number.is_empty() && number.chars().all(|ch| ch.is_ascii_digit());
            if let (Some(kind), true) = (DistrictKind::from_prefix(prefix.trim()), numeric) {
                return Self::District {
                    kind,
                    number: normalize_district_number(number),
                };
            }
        }
        Self::Unrecognized(trimmed.to_string())
    }

    pub fn eligibility(&self, voter: &MatchedVoter) -> Eligibility {
        match self {
            Self::Citywide => Eligibility::Eligible,
            Self::Unrecognized(_) => Eligibility::Unverifiable,
            Self::District { kind, number } => {
                let field = match kind {
                    DistrictKind::Assembly => voter.assembly_district.as_deref(),
                    DistrictKind::Senate => voter.senate_district.as_deref(),
                    DistrictKind::Congressional => voter.congressional_district.as_deref(),
                    DistrictKind::CityCouncil => return Eligibility::Unverifiable,
                };
                match field {
                    Some(value) if normalize_district_number(value) == *number => {
                        Eligibility::Eligible
                    }
                    _ => Eligibility::OutOfDistrict,
                }
            }
        }
    }

    /// New York designating-petition minimums, used when the caller does not
    /// supply a requirement of its own.
    pub fn default_required_signatures(&self) -> Option<i64> {
        match self {
            Self::Citywide => Some(7500),
            Self::District { kind, .. } => Some(match kind {
                DistrictKind::Assembly => 500,
                DistrictKind::Senate => 1000,
                DistrictKind::Congressional => 1250,
                DistrictKind::CityCouncil => 450,
            }),
            Self::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for TargetDistrict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Citywide => write!(f, "CITYWIDE"),
            Self::District { kind, number } => write!(f, "{}-{}", kind.prefix(), number),
            Self::Unrecognized(raw) => write!(f, "{raw}"),
        }
    }
}

fn normalize_district_number(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed.trim_start_matches('0');
    if stripped.is_empty() && !trimmed.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}
