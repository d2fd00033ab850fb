use crate::core::{
    config::DetectorConfig,
    types::{RegionCandidate, RegionKind},
};

use super::{header_end, ink_box, Cell, PageRaster};

/// Y coordinates of horizontal rule lines below the header.
pub(super) fn find_rule_lines(raster: &PageRaster, config: &DetectorConfig) -> Vec<u32> {
    let width = raster.width();
    let height = raster.height();
    let step = config.line_sample_step.max(1);
    let mut lines = Vec::new();

    let mut y = header_end(raster, config);
    while y < height {
        let mut sampled = 0u32;
        let mut dark = 0u32;
        let mut x = 0;
        while x < width {
            sampled += 1;
            if raster.luminance(x, y) < config.line_luminance {
                dark += 1;
            }
            x += step;
        }

        if sampled > 0 && dark as f64 / sampled as f64 > config.line_dark_ratio {
            lines.push(y);
            y += config.line_skip_rows + 1;
        } else {
            y += 1;
        }
    }
    lines
}

/// One signature candidate (and its address cell) per form row that holds
/// enough ink in the signature band.
pub(super) fn detect(
    raster: &PageRaster,
    lines: &[u32],
    config: &DetectorConfig,
) -> Vec<RegionCandidate> {
    let width = raster.width();
    let mut candidates = Vec::new();

    for (row, pair) in lines.windows(2).enumerate() {
        let (top, bottom) = (pair[0], pair[1]);
        if bottom - top < config.min_row_height {
            continue;
        }
        let rows = (top + config.line_skip_rows + 1, bottom);

        let Some(signature_cell) =
            Cell::new(config.signature_band.columns(width), rows, config.cell_inset)
        else {
            continue;
        };
        let Some(signature) = ink_box(raster, signature_cell, config) else {
            continue;
        };
        candidates.push(RegionCandidate {
            row,
            kind: RegionKind::Signature,
            region: signature.region,
            confidence: signature.confidence,
        });

        if let Some(address_cell) =
            Cell::new(config.address_band.columns(width), rows, config.cell_inset)
        {
            let (region, confidence) = match ink_box(raster, address_cell, config) {
                Some(address) => (address.region, address.confidence),
                None => (address_cell.region(), config.empty_cell_confidence),
            };
            candidates.push(RegionCandidate {
                row,
                kind: RegionKind::Address,
                region,
                confidence,
            });
        }
    }
    candidates
}
