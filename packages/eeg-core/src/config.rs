use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::montage::MontagePolicy;

/// Options for parsing and validating an uploaded recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// How channels beyond the base montage are treated
    #[serde(default)]
    pub montage_policy: MontagePolicy,

    /// Smallest channel count a binary header may declare
    #[serde(default = "default_minimum_channels")]
    pub minimum_channels: usize,

    /// Decode sample data; header-only validation leaves this off
    #[serde(default = "default_decode_signals")]
    pub decode_signals: bool,
}

fn default_minimum_channels() -> usize {
    19
}
fn default_decode_signals() -> bool {
    true
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            montage_policy: MontagePolicy::Superset,
            minimum_channels: 19,
            decode_signals: true,
        }
    }
}

impl IngestConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Header and montage checks only, no sample decoding
    pub fn header_only() -> Self {
        Self {
            decode_signals: false,
            ..Default::default()
        }
    }
}

/// Options for the windowed extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Extra signal filtered on each side of the window to absorb edge transients
    #[serde(default = "default_overfetch_seconds")]
    pub overfetch_seconds: f64,

    /// Point budget per channel for rendered windows
    #[serde(default = "default_max_points")]
    pub max_points: usize,
}

fn default_overfetch_seconds() -> f64 {
    1.0
}
fn default_max_points() -> usize {
    2000
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            overfetch_seconds: 1.0,
            max_points: 2000,
        }
    }
}
