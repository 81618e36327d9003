//! Filter Pipeline
//!
//! Turns a [`FilterSpec`] into one cascade of biquads and applies it with
//! zero net phase:
//! 1. High-pass (drift removal)
//! 2. Low-pass (band limit)
//! 3. Notch (power line noise removal)
//!
//! Bad settings never raise; offending stages are disabled with a warning
//! so the viewer stays usable while the user edits values.

use super::filters::{filtfilt, ButterworthFilter, FilterType, NotchFilter, SosFilter, NOTCH_Q};
use serde::{Deserialize, Serialize};

/// Butterworth order of the high-pass and low-pass stages
const BUTTERWORTH_ORDER: usize = 2;

/// Residual transient amplitude treated as fully settled
pub const SETTLE_TOLERANCE: f64 = 1e-12;

/// User-facing filter settings. A cutoff of 0 disables that stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Sample rate of the data (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    /// High-pass cutoff (Hz)
    #[serde(default = "default_highpass")]
    pub highpass_hz: f64,

    /// Low-pass cutoff (Hz)
    #[serde(default = "default_lowpass")]
    pub lowpass_hz: f64,

    /// Notch frequency (typically 50 or 60 Hz)
    #[serde(default = "default_notch")]
    pub notch_hz: f64,
}

fn default_sample_rate() -> f64 {
    250.0
}
fn default_highpass() -> f64 {
    0.5
}
fn default_lowpass() -> f64 {
    45.0
}
fn default_notch() -> f64 {
    60.0
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            sample_rate: 250.0,
            highpass_hz: 0.5,
            lowpass_hz: 45.0,
            notch_hz: 60.0,
        }
    }
}

impl FilterSpec {
    /// Default EEG band at the given sample rate
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    /// Every stage off
    pub fn disabled(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            highpass_hz: 0.0,
            lowpass_hz: 0.0,
            notch_hz: 0.0,
        }
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }

    /// Copy with every unusable stage disabled. Each adjustment is logged.
    pub fn sanitized(&self) -> Self {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            log::warn!(
                "Invalid sample rate {} Hz; filtering disabled",
                self.sample_rate
            );
            return Self::disabled(self.sample_rate);
        }

        let nyquist = self.nyquist();
        let mut spec = self.clone();
        spec.highpass_hz = sanitize_cutoff("high-pass", self.highpass_hz, nyquist);
        spec.lowpass_hz = sanitize_cutoff("low-pass", self.lowpass_hz, nyquist);
        spec.notch_hz = sanitize_cutoff("notch", self.notch_hz, nyquist);

        if spec.highpass_hz > 0.0 && spec.lowpass_hz > 0.0 && spec.highpass_hz >= spec.lowpass_hz {
            log::warn!(
                "High-pass cutoff {} Hz is not below low-pass cutoff {} Hz; high-pass disabled",
                spec.highpass_hz,
                spec.lowpass_hz
            );
            spec.highpass_hz = 0.0;
        }

        spec
    }
}

fn sanitize_cutoff(stage: &str, cutoff: f64, nyquist: f64) -> f64 {
    if !cutoff.is_finite() || cutoff < 0.0 {
        log::warn!("Invalid {} cutoff {}; stage disabled", stage, cutoff);
        0.0
    } else if cutoff >= nyquist {
        if cutoff > 0.0 {
            log::warn!(
                "{} cutoff {} Hz at or above Nyquist ({} Hz); stage disabled",
                stage,
                cutoff,
                nyquist
            );
        }
        0.0
    } else {
        cutoff
    }
}

/// Compiled filter cascade for one sanitized spec.
///
/// Holds no running state between calls; every application starts from rest.
#[derive(Debug, Clone)]
pub struct FilterPipeline {
    spec: FilterSpec,
    stages: Vec<FilterType>,
    cascade: SosFilter,
}

impl FilterPipeline {
    pub fn new(spec: &FilterSpec) -> Self {
        let spec = spec.sanitized();
        let mut stages = Vec::new();
        let mut sections = Vec::new();

        if spec.highpass_hz > 0.0 {
            stages.push(FilterType::Highpass);
            sections.extend(
                ButterworthFilter::highpass(spec.highpass_hz, spec.sample_rate, BUTTERWORTH_ORDER)
                    .sections(),
            );
        }
        if spec.lowpass_hz > 0.0 {
            stages.push(FilterType::Lowpass);
            sections.extend(
                ButterworthFilter::lowpass(spec.lowpass_hz, spec.sample_rate, BUTTERWORTH_ORDER)
                    .sections(),
            );
        }
        if spec.notch_hz > 0.0 {
            stages.push(FilterType::Notch);
            sections.extend(NotchFilter::design(spec.notch_hz, spec.sample_rate, NOTCH_Q).sections());
        }

        log::debug!("Filter pipeline {:?} at {} Hz", stages, spec.sample_rate);

        Self {
            spec,
            stages,
            cascade: SosFilter::new(sections),
        }
    }

    /// The sanitized spec actually applied
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn stages(&self) -> &[FilterType] {
        &self.stages
    }

    pub fn is_passthrough(&self) -> bool {
        self.stages.is_empty()
    }

    /// Samples of context needed on each side before edge transients decay
    /// below [`SETTLE_TOLERANCE`]. Dominated by the lowest high-pass cutoff.
    pub fn settle_samples(&self) -> usize {
        self.cascade.settle_samples(SETTLE_TOLERANCE)
    }

    /// Zero-phase filtering; output has the input's length.
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        filtfilt(&self.cascade, signal)
    }

    /// Single causal pass of the same cascade (introduces phase lag).
    pub fn apply_forward(&self, signal: &[f64]) -> Vec<f64> {
        let mut pass = self.cascade.clone();
        pass.reset();
        pass.filter(signal)
    }

    pub fn apply_all(&self, channels: &[Vec<f64>]) -> Vec<Vec<f64>> {
        channels.iter().map(|channel| self.apply(channel)).collect()
    }
}

/// One-shot zero-phase filtering of a single channel
pub fn filter_signal(signal: &[f64], spec: &FilterSpec) -> Vec<f64> {
    FilterPipeline::new(spec).apply(signal)
}
