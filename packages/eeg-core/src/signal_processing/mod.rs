//! Signal Processing Module
//!
//! Zero-phase filtering and windowed extraction for decoded recordings:
//! - Butterworth highpass/lowpass and notch biquads
//! - Forward-backward (filtfilt) application with edge reflection
//! - Over-fetching window extraction and display decimation
//! - Variance-based channel quality screening
//!
//! All filters use second-order sections (biquads) for numerical stability.

mod filters;
mod pipeline;
pub mod quality;
mod window;

pub use filters::{
    filtfilt, odd_reflect_pad, BiquadCoeffs, BiquadFilter, ButterworthFilter, FilterType,
    NotchFilter, SosFilter, MAX_PAD_LEN, MIN_FILTER_LEN, NOTCH_Q,
};
pub use pipeline::{filter_signal, FilterPipeline, FilterSpec, SETTLE_TOLERANCE};
pub use quality::{detect_bad_channels, BadChannel, DEFAULT_VARIANCE_Z};
pub use window::{decimate, linspace, WindowSlice, WindowedExtractor};
