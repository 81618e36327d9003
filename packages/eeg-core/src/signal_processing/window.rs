//! Windowed Extraction
//!
//! Filters a time window without letting the window's own edges shape the
//! result: raw samples are over-fetched on both sides, the padded span is
//! filtered, and the output is trimmed back to the requested samples.
//! The over-fetch is at least the configured margin and at least the
//! filter's settle time, so panning never changes the values of samples
//! that stay visible.

use serde::Serialize;

use super::pipeline::{FilterPipeline, FilterSpec};
use crate::config::ExtractorConfig;
use crate::types::{SignalMatrix, TimeWindow};

/// Per-channel samples for one window, aligned to `timestamps`.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSlice {
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// Requested sample range in the source matrix, `[start, end)`
    pub start_sample: usize,
    pub end_sample: usize,
    pub labels: Vec<String>,
    pub timestamps: Vec<f64>,
    pub channels: Vec<Vec<f64>>,
}

impl WindowSlice {
    pub fn num_points(&self) -> usize {
        self.timestamps.len()
    }
}

pub struct WindowedExtractor {
    config: ExtractorConfig,
}

impl Default for WindowedExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl WindowedExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Sample range `[start, end)` covered by `window`, clamped to the recording.
    pub fn sample_range(window: &TimeWindow, sample_rate: f64, total: usize) -> (usize, usize) {
        let to_sample = |seconds: f64| ((seconds * sample_rate).round().max(0.0) as usize).min(total);
        let start = to_sample(window.start_seconds);
        let end = to_sample(window.end_seconds()).max(start);
        (start, end)
    }

    /// Samples fetched on each side of a window before filtering.
    pub fn overfetch_samples(&self, sample_rate: f64, pipeline: &FilterPipeline) -> usize {
        let margin = (self.config.overfetch_seconds.max(0.0) * sample_rate).round() as usize;
        margin.max(pipeline.settle_samples())
    }

    /// Filter one channel's samples for `[start, end)` using the over-fetched span.
    pub fn extract_channel(
        &self,
        samples: &[f64],
        start: usize,
        end: usize,
        sample_rate: f64,
        pipeline: &FilterPipeline,
    ) -> Vec<f64> {
        let end = end.min(samples.len());
        let start = start.min(end);
        let pad = self.overfetch_samples(sample_rate, pipeline);

        let fetch_start = start.saturating_sub(pad);
        let fetch_end = end.saturating_add(pad).min(samples.len());

        let filtered = pipeline.apply(&samples[fetch_start..fetch_end]);
        filtered[start - fetch_start..end - fetch_start].to_vec()
    }

    /// Full-resolution filtered window for analysis and export.
    ///
    /// Timestamps are the true sample times.
    pub fn filtered_window(
        &self,
        matrix: &SignalMatrix,
        window: &TimeWindow,
        spec: &FilterSpec,
    ) -> WindowSlice {
        let sample_rate = matrix.sample_rate();
        let (start, end) = Self::sample_range(window, sample_rate, matrix.num_samples());
        let pipeline = pipeline_for(spec, sample_rate);
        log::debug!(
            "Filtering samples {}..{} with {} samples of context per side",
            start,
            end,
            self.overfetch_samples(sample_rate, &pipeline)
        );

        let channels = matrix
            .channels()
            .iter()
            .map(|samples| self.extract_channel(samples, start, end, sample_rate, &pipeline))
            .collect();

        let timestamps = (start..end).map(|i| i as f64 / sample_rate).collect();

        WindowSlice {
            start_seconds: window.start_seconds,
            end_seconds: window.end_seconds(),
            start_sample: start,
            end_sample: end,
            labels: matrix.labels().to_vec(),
            timestamps,
            channels,
        }
    }

    /// Display-only window: filtered, then decimated to the point budget.
    ///
    /// Timestamps are synthetic and span exactly the requested window.
    pub fn render_window(
        &self,
        matrix: &SignalMatrix,
        window: &TimeWindow,
        spec: &FilterSpec,
    ) -> WindowSlice {
        let full = self.filtered_window(matrix, window, spec);
        let channels: Vec<Vec<f64>> = full
            .channels
            .iter()
            .map(|channel| decimate(channel, self.config.max_points))
            .collect();

        let points = channels.first().map_or(0, Vec::len);
        let timestamps = linspace(window.start_seconds, window.end_seconds(), points);

        log::debug!(
            "Rendered window {:.2}-{:.2}s: {} samples -> {} points",
            window.start_seconds,
            window.end_seconds(),
            full.end_sample - full.start_sample,
            points
        );

        WindowSlice {
            timestamps,
            channels,
            ..full
        }
    }
}

fn pipeline_for(spec: &FilterSpec, sample_rate: f64) -> FilterPipeline {
    if spec.sample_rate != sample_rate {
        log::debug!(
            "Filter spec rate {} Hz replaced by recording rate {} Hz",
            spec.sample_rate,
            sample_rate
        );
    }
    FilterPipeline::new(&FilterSpec {
        sample_rate,
        ..spec.clone()
    })
}

/// Uniform-stride nearest-sample selection down to `max_points`, endpoints kept.
pub fn decimate(samples: &[f64], max_points: usize) -> Vec<f64> {
    let n = samples.len();
    if n <= max_points || max_points == 0 {
        return samples.to_vec();
    }
    if max_points == 1 {
        return vec![samples[0]];
    }
    let stride = (n - 1) as f64 / (max_points - 1) as f64;
    (0..max_points)
        .map(|i| samples[((i as f64 * stride).round() as usize).min(n - 1)])
        .collect()
}

/// `count` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}
