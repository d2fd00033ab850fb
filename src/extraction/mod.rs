//! The seam between region detection and voter matching: turns a detected
//! cell into text.

mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{errors::AppResult, types::ImageRegion};
use crate::detection::PageRaster;

pub use scripted::{ScriptedExtractor, ScriptedRow};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldBand {
    Name,
    Address,
}

impl FieldBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldRequest {
    pub page_number: u32,
    pub row: usize,
    pub region: ImageRegion,
    pub band: FieldBand,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldText {
    pub text: String,
    pub confidence: f64,
}

impl FieldText {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn empty() -> Self {
        Self::new(String::new(), 0.0)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Reads the text inside one region of a page.
///
/// Implementations may be slow or remote; callers run many requests for the
/// same page concurrently.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(&self, page: &PageRaster, request: &FieldRequest) -> AppResult<FieldText>;

    fn name(&self) -> &str;
}
