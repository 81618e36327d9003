//! Channel quality screening based on per-channel variance.

use serde::Serialize;

use crate::types::SignalMatrix;

/// Default outlier threshold, in standard deviations of channel variance
pub const DEFAULT_VARIANCE_Z: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadChannel {
    pub label: String,
    pub variance: f64,
}

/// Population variance of one channel.
pub fn variance(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
}

/// Channels whose variance lies more than `z` standard deviations away from
/// the mean channel variance, in matrix order.
pub fn detect_bad_channels(matrix: &SignalMatrix, z: f64) -> Vec<BadChannel> {
    let variances: Vec<f64> = matrix.channels().iter().map(|c| variance(c)).collect();
    if variances.len() < 2 {
        return Vec::new();
    }

    let mean = variances.iter().sum::<f64>() / variances.len() as f64;
    let spread = variance(&variances).sqrt();

    matrix
        .labels()
        .iter()
        .zip(&variances)
        .filter(|(_, v)| (**v - mean).abs() > z * spread)
        .map(|(label, v)| {
            log::info!("Bad channel detected: {} (variance: {:.2e})", label, v);
            BadChannel {
                label: label.clone(),
                variance: *v,
            }
        })
        .collect()
}
