//! Hand-off to the external analysis worker.
//!
//! The worker receives full-resolution filtered samples for a channel
//! selection and time range, plus its processing configuration, and returns
//! opaque results (band power, coherence, imagery references, ...).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::signal_processing::{FilterSpec, WindowedExtractor};
use crate::types::{SignalMatrix, TimeWindow};

/// Worker-side preprocessing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Target sampling rate (Hz)
    #[serde(default = "default_resample_freq")]
    pub resample_freq: f64,

    /// High-pass cutoff (Hz)
    #[serde(default = "default_filter_low")]
    pub filter_low: f64,

    /// Low-pass cutoff (Hz)
    #[serde(default = "default_filter_high")]
    pub filter_high: f64,

    /// 60 for US mains, 50 for EU
    #[serde(default = "default_notch_freq")]
    pub notch_freq: f64,

    /// Epoch length in seconds
    #[serde(default = "default_epoch_duration")]
    pub epoch_duration: f64,

    #[serde(default = "default_ica_n_components")]
    pub ica_n_components: usize,

    /// Peak-to-peak amplitude rejection threshold (µV)
    #[serde(default = "default_rejection_threshold_uv")]
    pub rejection_threshold_uv: f64,
}

fn default_resample_freq() -> f64 {
    250.0
}
fn default_filter_low() -> f64 {
    0.5
}
fn default_filter_high() -> f64 {
    45.0
}
fn default_notch_freq() -> f64 {
    60.0
}
fn default_epoch_duration() -> f64 {
    2.0
}
fn default_ica_n_components() -> usize {
    15
}
fn default_rejection_threshold_uv() -> f64 {
    150.0
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            resample_freq: 250.0,
            filter_low: 0.5,
            filter_high: 45.0,
            notch_freq: 60.0,
            epoch_duration: 2.0,
            ica_n_components: 15,
            rejection_threshold_uv: 150.0,
        }
    }
}

impl ProcessingConfig {
    /// Filter settings equivalent to this configuration at `sample_rate`.
    pub fn filter_spec(&self, sample_rate: f64) -> FilterSpec {
        FilterSpec {
            sample_rate,
            highpass_hz: self.filter_low,
            lowpass_hz: self.filter_high,
            notch_hz: self.notch_freq,
        }
    }
}

/// Everything the worker needs for one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub channels: Vec<String>,
    /// `[channel][sample]`, full resolution, filtered per `config`
    pub data: Vec<Vec<f64>>,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub sample_rate: f64,
    pub config: ProcessingConfig,
}

impl AnalysisRequest {
    /// Build a request from a decoded recording.
    ///
    /// `channels` selects labels by name (`None` = all); unknown labels are
    /// skipped with a warning. The window is clamped to the recording.
    pub fn from_recording(
        matrix: &SignalMatrix,
        window: &TimeWindow,
        channels: Option<&[String]>,
        config: &ProcessingConfig,
    ) -> Self {
        let window = window.clamped(matrix.duration_seconds());
        let spec = config.filter_spec(matrix.sample_rate());
        let slice = WindowedExtractor::default().filtered_window(matrix, &window, &spec);

        let selected: Vec<usize> = match channels {
            Some(wanted) => wanted
                .iter()
                .filter_map(|label| {
                    let index = slice.labels.iter().position(|l| l == label);
                    if index.is_none() {
                        log::warn!("Requested channel '{}' not in recording", label);
                    }
                    index
                })
                .collect(),
            None => (0..slice.labels.len()).collect(),
        };

        AnalysisRequest {
            channels: selected.iter().map(|&i| slice.labels[i].clone()).collect(),
            data: selected.iter().map(|&i| slice.channels[i].clone()).collect(),
            start_seconds: window.start_seconds,
            end_seconds: window.end_seconds(),
            sample_rate: matrix.sample_rate(),
            config: config.clone(),
        }
    }
}

/// Opaque worker output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResults(pub serde_json::Value);

/// External analysis collaborator.
pub trait AnalysisWorker {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResults>;
}
