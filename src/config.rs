// THEORY:
// Every tunable of the decoder lives in one plain configuration struct, in the
// same spirit as the engine's `PipelineConfig`: public fields, a sensible
// `Default` that reproduces the reference transmitter setup, and nothing hidden.
//
// The reference setup is an 8x8 LED matrix blinking a 64-bit frame whose first
// byte is the sync header 0b1011_1001. The grid dimension and the 8-bit field
// width are fixed by the frame layout and are therefore constants, not fields.
//
// The struct is serde-serializable so a deployment can tune the blob filter or
// threshold bias from a JSON file without recompiling.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of rows and columns in the LED matrix.
pub const GRID_DIM: usize = 8;
/// Width in bits of the header and of every payload field.
pub const FIELD_BITS: usize = 8;
/// Total number of bits in one optical frame.
pub const FRAME_BITS: usize = GRID_DIM * GRID_DIM;
/// Sync header `1 0 1 1 1 0 0 1`, most significant bit first.
pub const DEFAULT_SYNC_PATTERN: u8 = 0b1011_1001;
/// Largest accepted Gaussian window.
pub const MAX_THRESHOLD_WINDOW: u32 = 255;

/// Which derived grids are remembered for the stale-grid fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GridRetention {
    /// Keep every grid derived from a non-empty blob set.
    #[default]
    Derived,
    /// Keep a grid only when its frame also passed the header check.
    Decoded,
}

/// Configuration for the `LedMatrixDecoder`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Side of the square Gaussian window used for the local mean. Must be odd,
    /// between 3 and `MAX_THRESHOLD_WINDOW`.
    pub threshold_window: u32,
    /// How far above the local mean a pixel must be to count as lit.
    pub threshold_bias: f32,
    /// Exclusive lower bound on blob bounding-box width and height, in pixels.
    pub min_blob_size: u32,
    /// Exclusive upper bound on blob bounding-box width and height, in pixels.
    pub max_blob_size: u32,
    /// Expected value of bits 0-7.
    pub sync_pattern: u8,
    pub grid_retention: GridRetention,
    /// Log a session report every N decoded regions. `None` disables it.
    pub report_every: Option<u64>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            threshold_window: 9,
            threshold_bias: 30.0,
            min_blob_size: 2,
            max_blob_size: 20,
            sync_pattern: DEFAULT_SYNC_PATTERN,
            grid_retention: GridRetention::Derived,
            report_every: None,
        }
    }
}

impl DecoderConfig {
    /// Checks ranges that would otherwise make the decoder silently useless.
    pub fn validate(&self) -> Result<()> {
        if !(3..=MAX_THRESHOLD_WINDOW).contains(&self.threshold_window)
            || self.threshold_window % 2 == 0
        {
            return Err(Error::InvalidConfig(format!(
                "threshold_window must be odd and within 3..={MAX_THRESHOLD_WINDOW}, got {}",
                self.threshold_window
            )));
        }
        if !self.threshold_bias.is_finite() {
            return Err(Error::InvalidConfig(
                "threshold_bias must be finite".to_string(),
            ));
        }
        if self.max_blob_size <= self.min_blob_size.saturating_add(1) {
            return Err(Error::InvalidConfig(format!(
                "blob size range ({}, {}) admits no integer size",
                self.min_blob_size, self.max_blob_size
            )));
        }
        if self.report_every == Some(0) {
            return Err(Error::InvalidConfig(
                "report_every must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Loads and validates a JSON configuration. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_setup() {
        let config = DecoderConfig::default();
        assert_eq!(config.threshold_window, 9);
        assert_eq!(config.threshold_bias, 30.0);
        assert_eq!((config.min_blob_size, config.max_blob_size), (2, 20));
        assert_eq!(config.sync_pattern, 0xB9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn even_window_is_rejected() {
        let config = DecoderConfig {
            threshold_window: 8,
            ..DecoderConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn empty_blob_range_is_rejected() {
        let config = DecoderConfig {
            min_blob_size: 5,
            max_blob_size: 6,
            ..DecoderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn extreme_sizes_are_rejected_without_overflow() {
        let config = DecoderConfig {
            min_blob_size: u32::MAX,
            max_blob_size: u32::MAX,
            ..DecoderConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = DecoderConfig {
            threshold_window: u32::MAX,
            ..DecoderConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = DecoderConfig {
            threshold_window: MAX_THRESHOLD_WINDOW,
            ..DecoderConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_file_is_loaded_and_validated() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("decoder.json");
        std::fs::write(&path, r#"{ "threshold_bias": 25.5, "report_every": 50 }"#).unwrap();
        let config = DecoderConfig::from_json_file(&path).unwrap();
        assert_eq!(config.threshold_bias, 25.5);
        assert_eq!(config.report_every, Some(50));
        assert_eq!(config.min_blob_size, 2);

        std::fs::write(&path, r#"{ "min_blob_size": 4294967295 }"#).unwrap();
        assert!(matches!(
            DecoderConfig::from_json_file(&path),
            Err(Error::InvalidConfig(_))
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(DecoderConfig::from_json_file(&path), Err(Error::Json(_))));

        let missing = dir.path().join("missing.json");
        assert!(matches!(DecoderConfig::from_json_file(&missing), Err(Error::Io(_))));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: DecoderConfig =
            serde_json::from_str(r#"{ "max_blob_size": 30, "grid_retention": "decoded" }"#)
                .expect("valid json");
        assert_eq!(config.max_blob_size, 30);
        assert_eq!(config.grid_retention, GridRetention::Decoded);
        assert_eq!(config.threshold_window, 9);
    }
}
