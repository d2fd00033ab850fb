//! Locates candidate signature and address cells on a scanned petition page
//! using raster data only.
//!
//! Detection is a pure function of the pixels and the [`DetectorConfig`]:
//! the same buffer always yields the same candidates and confidences.

mod ruled;
mod unruled;

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{
    config::DetectorConfig,
    errors::{AppError, AppResult},
    types::{DetectionMethod, ImageRegion, RegionCandidate},
};

/// A decoded page image in RGBA.
#[derive(Debug, Clone)]
pub struct PageRaster {
    image: RgbaImage,
}

impl PageRaster {
    pub fn decode(bytes: &[u8]) -> AppResult<Self> {
        if bytes.is_empty() {
            return Err(AppError::InvalidInput("page image is empty".to_string()));
        }
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self {
            image: decoded.to_rgba8(),
        })
    }

    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> AppResult<Self> {
        let image = RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "pixel buffer does not hold {width}x{height} RGBA pixels"
            ))
        })?;
        Ok(Self { image })
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn luminance(&self, x: u32, y: u32) -> f64 {
        let [r, g, b, _] = self.image.get_pixel(x, y).0;
        0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
    }

    /// PNG bytes of `region` (clipped to the page).
    pub fn crop_png(&self, region: &ImageRegion) -> AppResult<Vec<u8>> {
        let x = region.x.min(self.width().saturating_sub(1));
        let y = region.y.min(self.height().saturating_sub(1));
        let width = region.width.min(self.width() - x).max(1);
        let height = region.height.min(self.height() - y).max(1);
        let cropped = image::imageops::crop_imm(&self.image, x, y, width, height).to_image();
        let mut out = Cursor::new(Vec::new());
        cropped.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPage {
    pub method: DetectionMethod,
    pub candidates: Vec<RegionCandidate>,
}

/// Ruled-form detection first; when the page has fewer than two rule lines
/// the unruled band scan is used instead.
pub fn detect_regions(raster: &PageRaster, config: &DetectorConfig) -> DetectedPage {
    if raster.width() == 0 || raster.height() == 0 {
        return DetectedPage {
            method: DetectionMethod::Unruled,
            candidates: vec![],
        };
    }

    let lines = ruled::find_rule_lines(raster, config);
    if lines.len() >= 2 {
        let candidates = ruled::detect(raster, &lines, config);
        debug!(
            lines = lines.len(),
            candidates = candidates.len(),
            "ruled form detection"
        );
        return DetectedPage {
            method: DetectionMethod::Ruled,
            candidates,
        };
    }

    let candidates = unruled::detect(raster, config);
    debug!(candidates = candidates.len(), "unruled band detection");
    DetectedPage {
        method: DetectionMethod::Unruled,
        candidates,
    }
}

/// First row below the instructional header.
fn header_end(raster: &PageRaster, config: &DetectorConfig) -> u32 {
    ((raster.height() as f64 * config.header_fraction).floor() as u32).min(raster.height())
}

/// Pixel span of a form cell, shrunk by the configured inset.
#[derive(Debug, Clone, Copy)]
struct Cell {
    x0: u32,
    x1: u32,
    y0: u32,
    y1: u32,
}

impl Cell {
    fn new(columns: (u32, u32), rows: (u32, u32), inset: u32) -> Option<Self> {
        let x0 = columns.0 + inset;
        let x1 = columns.1.saturating_sub(inset);
        if x0 >= x1 || rows.0 >= rows.1 {
            return None;
        }
        Some(Self {
            x0,
            x1,
            y0: rows.0,
            y1: rows.1,
        })
    }

    fn region(&self) -> ImageRegion {
        ImageRegion {
            x: self.x0,
            y: self.y0,
            width: self.x1 - self.x0,
            height: self.y1 - self.y0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct InkBox {
    region: ImageRegion,
    confidence: f64,
}

/// Minimal box around ink pixels inside `cell`, or `None` when the cell holds
/// too little ink or the box is too small to be handwriting.
fn ink_box(raster: &PageRaster, cell: Cell, config: &DetectorConfig) -> Option<InkBox> {
    let mut ink = 0u32;
    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    let (mut max_x, mut max_y) = (0u32, 0u32);

    for y in cell.y0..cell.y1 {
        for x in cell.x0..cell.x1 {
            if raster.luminance(x, y) < config.ink_luminance {
                ink += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }

    if ink < config.min_ink_pixels {
        return None;
    }
    let width = max_x - min_x + 1;
    let height = max_y - min_y + 1;
    if width < config.min_box_width || height < config.min_box_height {
        return None;
    }

    let fraction = ink as f64 / (width as f64 * height as f64);
    Some(InkBox {
        region: ImageRegion {
            x: min_x,
            y: min_y,
            width,
            height,
        },
        confidence: (config.ruled_base_confidence + fraction).min(config.max_confidence),
    })
}
