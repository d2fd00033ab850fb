use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// A horizontal span of the page expressed as fractions of its width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub start: f64,
    pub end: f64,
}

impl Band {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Pixel columns `[start, end)` covered by this band on a page `width` wide.
    pub fn columns(&self, width: u32) -> (u32, u32) {
        let start = (width as f64 * self.start).floor() as u32;
        let end = ((width as f64 * self.end).floor() as u32).min(width);
        (start.min(end), end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Fraction of the page height treated as instructional header.
    pub header_fraction: f64,
    pub line_luminance: f64,
    pub line_dark_ratio: f64,
    pub line_sample_step: u32,
    /// Rows skipped after a rule line so a thick line is counted once.
    pub line_skip_rows: u32,
    pub min_row_height: u32,
    pub ink_luminance: f64,
    pub signature_band: Band,
    pub address_band: Band,
    pub cell_inset: u32,
    pub min_ink_pixels: u32,
    pub min_box_width: u32,
    pub min_box_height: u32,
    /// Confidence of a box with no ink; ink fraction is added on top.
    pub ruled_base_confidence: f64,
    pub max_confidence: f64,
    /// Confidence given to an address cell that carries no measurable ink.
    pub empty_cell_confidence: f64,
    pub fallback_bands: u32,
    pub fallback_sample_step: u32,
    pub fallback_min_dark_samples: u32,
    pub fallback_base_confidence: f64,
    /// Size of an inferred signature box relative to its cell.
    pub fallback_box_width: f64,
    pub fallback_box_height: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            header_fraction: 1.0 / 3.0,
            line_luminance: 200.0,
            line_dark_ratio: 0.5,
            line_sample_step: 2,
            line_skip_rows: 5,
            min_row_height: 20,
            ink_luminance: 180.0,
            signature_band: Band::new(0.30, 0.50),
            address_band: Band::new(0.55, 0.80),
            cell_inset: 2,
            min_ink_pixels: 50,
            min_box_width: 20,
            min_box_height: 5,
            ruled_base_confidence: 0.5,
            max_confidence: 0.95,
            empty_cell_confidence: 0.5,
            fallback_bands: 5,
            fallback_sample_step: 4,
            fallback_min_dark_samples: 10,
            fallback_base_confidence: 0.3,
            fallback_box_width: 0.8,
            fallback_box_height: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub validity_threshold: f64,
    pub lookup_timeout: Duration,
    pub write_timeout: Duration,
    pub provider_timeout: Duration,
    pub gemini_model: String,
    pub max_connections: u32,
    pub detector: DetectorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".petition-validator"),
            validity_threshold: 0.8,
            lookup_timeout: Duration::from_millis(5_000),
            write_timeout: Duration::from_millis(10_000),
            provider_timeout: Duration::from_secs(60),
            gemini_model: "gemini-2.0-flash".to_string(),
            max_connections: 10,
            detector: DetectorConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset keys keep their
    /// defaults and unparsable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let data_dir = lookup("PETITION_DATA_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let validity_threshold = parse_or(
            &lookup,
            "PETITION_VALIDITY_THRESHOLD",
            defaults.validity_threshold,
        );
        let validity_threshold = if validity_threshold.is_finite() {
            validity_threshold.clamp(0.0, 1.0)
        } else {
            warn!(
                key = "PETITION_VALIDITY_THRESHOLD",
                "ignoring non-finite validity threshold"
            );
            defaults.validity_threshold
        };
        let lookup_timeout = Duration::from_millis(parse_or(
            &lookup,
            "PETITION_LOOKUP_TIMEOUT_MS",
            defaults.lookup_timeout.as_millis() as u64,
        ));
        let write_timeout = Duration::from_millis(parse_or(
            &lookup,
            "PETITION_WRITE_TIMEOUT_MS",
            defaults.write_timeout.as_millis() as u64,
        ));
        let provider_timeout = Duration::from_secs(parse_or(
            &lookup,
            "PETITION_PROVIDER_TIMEOUT_SECS",
            defaults.provider_timeout.as_secs(),
        ));
        let gemini_model = lookup("PETITION_GEMINI_MODEL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.gemini_model);
        let max_connections =
            parse_or(&lookup, "PETITION_DB_MAX_CONNECTIONS", defaults.max_connections).max(1);

        Self {
            data_dir,
            validity_threshold,
            lookup_timeout,
            write_timeout,
            provider_timeout,
            gemini_model,
            max_connections,
            detector: defaults.detector,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "ignoring unparsable configuration value");
                default
            }
        },
        None => default,
    }
}
