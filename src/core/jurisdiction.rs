use serde::{Deserialize, Serialize};

/// The five voter-roll partitions, one per New York City borough.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum County {
    Richmond,
    Kings,
    Bronx,
    Queens,
    NewYork,
}

/// Checked in order; the first keyword found in the address wins.
const BOROUGH_KEYWORDS: &[(&str, County)] = &[
    ("staten island", County::Richmond),
    ("brooklyn", County::Kings),
    ("bronx", County::Bronx),
    ("queens", County::Queens),
    ("manhattan", County::NewYork),
];

impl County {
    pub const ALL: [County; 5] = [
        County::Richmond,
        County::Kings,
        County::Bronx,
        County::Queens,
        County::NewYork,
    ];

    /// Infers the partition from free-text address. Addresses with no borough
    /// keyword fall back to New York County.
    ///
    /// Both voter matching and signature persistence go through this function,
    /// so a signature is always stored under the county it was matched in.
    pub fn infer(address: &str) -> Self {
        let normalized = address.to_ascii_lowercase();
        BOROUGH_KEYWORDS
            .iter()
            .find(|(keyword, _)| normalized.contains(keyword))
            .map(|(_, county)| *county)
            .unwrap_or(County::NewYork)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Richmond => "richmond",
            Self::Kings => "kings",
            Self::Bronx => "bronx",
            Self::Queens => "queens",
            Self::NewYork => "new_york",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "richmond" => Some(Self::Richmond),
            "kings" => Some(Self::Kings),
            "bronx" => Some(Self::Bronx),
            "queens" => Some(Self::Queens),
            "new_york" | "new york" => Some(Self::NewYork),
            _ => None,
        }
    }

    pub fn voter_table(&self) -> &'static str {
        match self {
            Self::Richmond => "voters_richmond",
            Self::Kings => "voters_kings",
            Self::Bronx => "voters_bronx",
            Self::Queens => "voters_queens",
            Self::NewYork => "voters_new_york",
        }
    }
}
