use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::errors::{AppError, AppResult};
use crate::detection::PageRaster;

use super::{FieldBand, FieldExtractor, FieldRequest, FieldText};

/// Text a [`ScriptedExtractor`] hands back for one form row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedRow {
    pub name: FieldText,
    pub address: FieldText,
}

impl ScriptedRow {
    pub fn new(name: &str, address: &str, confidence: f64) -> Self {
        Self {
            name: FieldText::new(name, confidence),
            address: FieldText::new(address, confidence),
        }
    }
}

/// Deterministic extractor keyed by `(page, row)`, for demos and tests.
///
/// Unscripted rows read as blank; rows marked failing return an
/// [`AppError::ProviderInvalidResponse`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedExtractor {
    rows: HashMap<(u32, usize), ScriptedRow>,
    failing: HashMap<(u32, usize), String>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(mut self, page_number: u32, row: usize, scripted: ScriptedRow) -> Self {
        self.rows.insert((page_number, row), scripted);
        self
    }

    pub fn with_failure(mut self, page_number: u32, row: usize, message: &str) -> Self {
        self.failing.insert((page_number, row), message.to_string());
        self
    }
}

#[async_trait]
impl FieldExtractor for ScriptedExtractor {
    async fn extract(&self, _page: &PageRaster, request: &FieldRequest) -> AppResult<FieldText> {
        let key = (request.page_number, request.row);
        if let Some(message) = self.failing.get(&key) {
            return Err(AppError::ProviderInvalidResponse(message.clone()));
        }
        let text = self
            .rows
            .get(&key)
            .map(|scripted| match request.band {
                FieldBand::Name => scripted.name.clone(),
                FieldBand::Address => scripted.address.clone(),
            })
            .unwrap_or_else(FieldText::empty);
        Ok(text)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
