use crate::core::{
    config::DetectorConfig,
    types::{ImageRegion, RegionCandidate, RegionKind},
};

use super::{header_end, Cell, PageRaster};

/// Splits the area under the header into equal bands and infers a signature
/// box in each band whose signature column carries enough sampled ink.
pub(super) fn detect(raster: &PageRaster, config: &DetectorConfig) -> Vec<RegionCandidate> {
    let width = raster.width();
    let start = header_end(raster, config);
    let bands = config.fallback_bands.max(1);
    let band_height = (raster.height() - start) / bands;
    if band_height == 0 {
        return vec![];
    }
    let step = config.fallback_sample_step.max(1);
    let mut candidates = Vec::new();

    for band in 0..bands {
        let y0 = start + band * band_height;
        let rows = (y0, y0 + band_height);
        let Some(cell) = Cell::new(config.signature_band.columns(width), rows, 0) else {
            continue;
        };

        let mut samples = 0u32;
        let mut dark = 0u32;
        let mut darkest: Option<(f64, u32, u32)> = None;
        let mut y = cell.y0;
        while y < cell.y1 {
            let mut x = cell.x0;
            while x < cell.x1 {
                samples += 1;
                let luminance = raster.luminance(x, y);
                if luminance < config.ink_luminance {
                    dark += 1;
                    if darkest.map_or(true, |(current, _, _)| luminance < current) {
                        darkest = Some((luminance, x, y));
                    }
                }
                x += step;
            }
            y += step;
        }

        if dark <= config.fallback_min_dark_samples {
            continue;
        }
        let Some((_, center_x, center_y)) = darkest else {
            continue;
        };

        let density = dark as f64 / samples as f64;
        let row = band as usize;
        candidates.push(RegionCandidate {
            row,
            kind: RegionKind::Signature,
            region: centered_box(cell, center_x, center_y, config),
            confidence: (config.fallback_base_confidence + density).min(config.max_confidence),
        });

        if let Some(address_cell) = Cell::new(config.address_band.columns(width), rows, 0) {
            candidates.push(RegionCandidate {
                row,
                kind: RegionKind::Address,
                region: address_cell.region(),
                confidence: config.empty_cell_confidence,
            });
        }
    }
    candidates
}

fn centered_box(cell: Cell, center_x: u32, center_y: u32, config: &DetectorConfig) -> ImageRegion {
    let cell_width = cell.x1 - cell.x0;
    let cell_height = cell.y1 - cell.y0;
    let width =
        ((cell_width as f64 * config.fallback_box_width).round() as u32).clamp(1, cell_width);
    let height =
        ((cell_height as f64 * config.fallback_box_height).round() as u32).clamp(1, cell_height);

    let x = center_x
        .saturating_sub(width / 2)
        .clamp(cell.x0, cell.x1 - width);
    let y = center_y
        .saturating_sub(height / 2)
        .clamp(cell.y0, cell.y1 - height);
    ImageRegion {
        x,
        y,
        width,
        height,
    }
}
