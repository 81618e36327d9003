//! Digital Filter Implementations
//!
//! IIR filters built from second-order sections (biquads) run with a
//! Direct Form II Transposed recursion. Supports Butterworth highpass/lowpass
//! and notch designs, plus zero-phase (forward-backward) application.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Signals shorter than this are returned unfiltered
pub const MIN_FILTER_LEN: usize = 10;

/// Upper bound on the edge-reflection padding of [`filtfilt`]
pub const MAX_PAD_LEN: usize = 1000;

/// Quality factor of the power-line notch
pub const NOTCH_Q: f64 = 30.0;

/// Filter type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    Lowpass,
    Highpass,
    Notch,
}

/// Second-order section (biquad) coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Magnitude response at `freq` Hz.
    pub fn magnitude_at(&self, freq: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq / sample_rate;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }

    /// Largest pole magnitude; below 1 for a stable section.
    pub fn pole_radius(&self) -> f64 {
        let discriminant = self.a1 * self.a1 - 4.0 * self.a2;
        if discriminant < 0.0 {
            self.a2.sqrt()
        } else {
            let root = discriminant.sqrt();
            ((-self.a1 + root) / 2.0)
                .abs()
                .max(((-self.a1 - root) / 2.0).abs())
        }
    }
}

/// State for a single biquad section (Direct Form II Transposed)
#[derive(Debug, Clone, Default)]
pub struct BiquadState {
    z1: f64,
    z2: f64,
}

/// Single biquad filter section
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }

    /// Process a single sample using Direct Form II Transposed
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }

    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.state = BiquadState::default();
    }
}

/// Cascaded second-order sections filter
#[derive(Debug, Clone)]
pub struct SosFilter {
    sections: Vec<BiquadFilter>,
}

impl SosFilter {
    pub fn new(sections: Vec<BiquadCoeffs>) -> Self {
        Self {
            sections: sections.into_iter().map(BiquadFilter::new).collect(),
        }
    }

    pub fn sections(&self) -> Vec<BiquadCoeffs> {
        self.sections.iter().map(BiquadFilter::coeffs).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Process a single sample through all sections
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let mut output = input;
        for section in &mut self.sections {
            output = section.process(output);
        }
        output
    }

    /// Process an entire signal array in-place
    pub fn process_signal(&mut self, signal: &mut [f64]) {
        for sample in signal.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Process a signal and return a new array (original unchanged)
    pub fn filter(&mut self, signal: &[f64]) -> Vec<f64> {
        signal.iter().map(|&s| self.process(s)).collect()
    }

    /// Reset all section states
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }

    /// Samples until the slowest pole's response falls below `tolerance`
    /// of its initial amplitude. Saturates for unstable cascades.
    pub fn settle_samples(&self, tolerance: f64) -> usize {
        let radius = self
            .sections
            .iter()
            .map(|s| s.coeffs().pole_radius())
            .fold(0.0, f64::max);
        if radius <= 0.0 {
            return 0;
        }
        if radius >= 1.0 {
            return usize::MAX;
        }
        (tolerance.ln() / radius.ln()).ceil() as usize
    }
}

/// Butterworth filter designer (bilinear transform with prewarping)
pub struct ButterworthFilter;

impl ButterworthFilter {
    /// Design a Butterworth lowpass filter
    pub fn lowpass(cutoff: f64, sample_rate: f64, order: usize) -> SosFilter {
        let wn = Self::prewarp(cutoff, sample_rate);
        SosFilter::new(Self::design(wn, order, FilterType::Lowpass))
    }

    /// Design a Butterworth highpass filter
    pub fn highpass(cutoff: f64, sample_rate: f64, order: usize) -> SosFilter {
        let wn = Self::prewarp(cutoff, sample_rate);
        SosFilter::new(Self::design(wn, order, FilterType::Highpass))
    }

    /// Prewarp frequency for bilinear transform
    fn prewarp(freq: f64, sample_rate: f64) -> f64 {
        (PI * freq / sample_rate).tan()
    }

    /// Analog prototype pole pairs `s^2 + a*s + 1` with `a = 2 sin(theta_k)`,
    /// mapped through the bilinear transform.
    fn design(wn: f64, order: usize, kind: FilterType) -> Vec<BiquadCoeffs> {
        let order = order.max(1);
        let num_sections = (order + 1) / 2;
        let mut sections = Vec::with_capacity(num_sections);
        let wn2 = wn * wn;

        for k in 0..num_sections {
            if order % 2 == 1 && k == num_sections - 1 {
                // First-order section: H(s) = wn / (s + wn) or s / (s + wn)
                let k_coeff = match kind {
                    FilterType::Highpass => 1.0 / (1.0 + wn),
                    _ => wn / (1.0 + wn),
                };
                let b1 = match kind {
                    FilterType::Highpass => -k_coeff,
                    _ => k_coeff,
                };
                sections.push(BiquadCoeffs {
                    b0: k_coeff,
                    b1,
                    b2: 0.0,
                    a1: (wn - 1.0) / (wn + 1.0),
                    a2: 0.0,
                });
                continue;
            }

            let theta = PI * (2.0 * k as f64 + 1.0) / (2.0 * order as f64);
            let alpha = 2.0 * theta.sin();
            let denom = 1.0 + alpha * wn + wn2;

            let (b0, b1, b2) = match kind {
                FilterType::Highpass => (1.0 / denom, -2.0 / denom, 1.0 / denom),
                _ => (wn2 / denom, 2.0 * wn2 / denom, wn2 / denom),
            };
            let a1 = 2.0 * (wn2 - 1.0) / denom;
            let a2 = (1.0 - alpha * wn + wn2) / denom;

            sections.push(BiquadCoeffs { b0, b1, b2, a1, a2 });
        }

        sections
    }
}

/// Notch (band-reject) filter for removing specific frequencies
pub struct NotchFilter;

impl NotchFilter {
    /// Design a notch filter to remove a specific frequency
    ///
    /// # Arguments
    /// * `center_freq` - Frequency to remove (Hz)
    /// * `sample_rate` - Sampling rate (Hz)
    /// * `q_factor` - Quality factor (higher = narrower notch, typical: 30-50)
    pub fn design(center_freq: f64, sample_rate: f64, q_factor: f64) -> SosFilter {
        let w0 = 2.0 * PI * center_freq / sample_rate;
        let bandwidth = w0 / q_factor;
        let gain = 1.0 / (1.0 + (bandwidth / 2.0).tan());
        let cos_w0 = w0.cos();

        SosFilter::new(vec![BiquadCoeffs {
            b0: gain,
            b1: -2.0 * gain * cos_w0,
            b2: gain,
            a1: -2.0 * gain * cos_w0,
            a2: 2.0 * gain - 1.0,
        }])
    }
}

/// Extend `signal` by `pad` samples on each side with an odd reflection
/// about the end samples (`2*x[0] - x[i]`).
pub fn odd_reflect_pad(signal: &[f64], pad: usize) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let pad = pad.min(n - 1);
    let (first, last) = (signal[0], signal[n - 1]);

    let mut padded = Vec::with_capacity(n + 2 * pad);
    padded.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
    padded.extend_from_slice(signal);
    padded.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));
    padded
}

/// Zero-phase application of a section cascade.
///
/// Pads by odd reflection (`min(len/4, MAX_PAD_LEN)` samples), filters
/// forward, reverses, filters again, reverses back and trims the padding.
/// Output always has the input's length.
pub fn filtfilt(filter: &SosFilter, signal: &[f64]) -> Vec<f64> {
    if signal.len() < MIN_FILTER_LEN || filter.is_empty() {
        return signal.to_vec();
    }

    let pad = (signal.len() / 4).min(MAX_PAD_LEN);
    let padded = odd_reflect_pad(signal, pad);

    let mut pass = filter.clone();
    pass.reset();
    let mut output = pass.filter(&padded);
    output.reverse();

    pass.reset();
    pass.process_signal(&mut output);
    output.reverse();

    output[pad..pad + signal.len()].to_vec()
}
