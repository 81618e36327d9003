use super::channel_classifier::{classify_csv_column, normalize_label};
use super::{LoadedRecording, RecordingParser};
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::montage::{montages_containing, ACCEPTED_MONTAGES};
use crate::types::{ChannelDescriptor, ChannelRole, RecordingFormat, RecordingHeader, SignalMatrix};
use csv::{ReaderBuilder, Trim};

/// Rows inspected when estimating the sampling interval
const RATE_ESTIMATION_ROWS: usize = 50;

/// CSV Recording Parser
///
/// Expects a `timestamp` first column followed by one column per channel.
/// Motion, impedance and unknown columns are dropped; the sampling rate is
/// inferred from the timestamps.
pub struct CsvRecordingParser;

impl RecordingParser for CsvRecordingParser {
    fn parse(&self, bytes: &[u8], config: &IngestConfig) -> Result<LoadedRecording> {
        let (header, signals) = parse_csv(bytes)?;
        let metadata = header.metadata();

        log::info!(
            "Loaded CSV recording: {} columns, {} retained, {:.1}s at {:.2} Hz",
            header.channel_count,
            metadata.channel_count,
            header.duration_seconds,
            header.sampling_rate
        );

        Ok(LoadedRecording {
            header,
            metadata,
            signals: config.decode_signals.then_some(signals),
            montage: None,
            skipped_channels: Vec::new(),
        })
    }

    fn format_name(&self) -> &str {
        "CSV"
    }
}

/// Unit of the timestamp column, decided from the first timestamp's magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Seconds,
    Milliseconds,
    Microseconds,
}

impl TimestampUnit {
    pub fn detect(first_timestamp: f64) -> Self {
        if first_timestamp > 1e9 {
            TimestampUnit::Microseconds
        } else if first_timestamp > 1e6 {
            TimestampUnit::Milliseconds
        } else {
            TimestampUnit::Seconds
        }
    }

    /// Timestamp ticks per second
    pub fn ticks_per_second(&self) -> f64 {
        match self {
            TimestampUnit::Seconds => 1.0,
            TimestampUnit::Milliseconds => 1e3,
            TimestampUnit::Microseconds => 1e6,
        }
    }
}

/// A channel column kept for the signal matrix.
struct KeptColumn {
    column: usize,
    label: String,
    values: Vec<f64>,
}

/// Parse a CSV upload into a header and a full-resolution signal matrix.
pub fn parse_csv(bytes: &[u8]) -> Result<(RecordingHeader, SignalMatrix)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let first = headers.get(0).unwrap_or_default();
    if !first.eq_ignore_ascii_case("timestamp") {
        return Err(IngestError::MissingTimestampColumn(first.to_string()));
    }
    if headers.len() < 2 {
        return Err(IngestError::NoChannelColumns);
    }

    let mut descriptors = Vec::with_capacity(headers.len() - 1);
    let mut kept: Vec<KeptColumn> = Vec::new();

    for (column, name) in headers.iter().enumerate().skip(1) {
        let descriptor = match classify_csv_column(name) {
            Some(classification) => {
                match classification.role {
                    ChannelRole::Excluded => {
                        log::info!("Excluding channel: {} (motion sensor or impedance)", name)
                    }
                    ChannelRole::Ecg => log::info!("Including ECG channel: {}", name),
                    ChannelRole::Eeg => {}
                }
                descriptor_for(column - 1, name, classification.normalized_labels, classification.role)
            }
            None => {
                log::info!("Skipping unknown channel: {}", name);
                descriptor_for(column - 1, name, normalize_label(name), ChannelRole::Excluded)
            }
        };

        if descriptor.is_retained() {
            kept.push(KeptColumn {
                column,
                label: descriptor.display_label(),
                values: Vec::new(),
            });
        }
        descriptors.push(descriptor);
    }

    if kept.is_empty() {
        return Err(IngestError::NoValidChannels(
            headers.iter().skip(1).map(str::to_string).collect(),
        ));
    }

    let mut timestamps = Vec::new();
    let mut skipped_rows = 0usize;
    for record in reader.records() {
        let record = record?;
        let timestamp = match record.get(0).and_then(|t| t.parse::<f64>().ok()) {
            Some(t) if t.is_finite() => t,
            _ => {
                skipped_rows += 1;
                continue;
            }
        };
        timestamps.push(timestamp);
        for channel in &mut kept {
            let value = record
                .get(channel.column)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(f64::NAN);
            channel.values.push(value);
        }
    }
    if skipped_rows > 0 {
        log::warn!("Skipped {} rows with unparseable timestamps", skipped_rows);
    }

    let (unit, sampling_rate) = infer_sampling_rate(&timestamps)?;
    let duration_seconds = match (timestamps.first(), timestamps.last()) {
        (Some(first), Some(last)) => (last - first) / unit.ticks_per_second(),
        _ => 0.0,
    };

    let mut labels = Vec::with_capacity(kept.len());
    let mut data = Vec::with_capacity(kept.len());
    for mut channel in kept {
        let gaps = channel.values.iter().filter(|v| v.is_nan()).count();
        if gaps > 0 {
            log::warn!("Interpolating {} missing samples in '{}'", gaps, channel.label);
            interpolate_gaps(&mut channel.values);
        }
        labels.push(channel.label);
        data.push(channel.values);
    }

    let header = RecordingHeader {
        format: RecordingFormat::Csv,
        channel_count: descriptors.len(),
        record_count: timestamps.len(),
        record_duration_seconds: 1.0 / sampling_rate,
        duration_seconds,
        sampling_rate,
        channels: descriptors,
        patient_id: String::new(),
        recording_id: String::new(),
        start_time: None,
        header_bytes: 0,
        edf_plus: false,
    };

    Ok((header, SignalMatrix::new(labels, data, sampling_rate)))
}

fn descriptor_for(
    index: usize,
    name: &str,
    normalized_labels: Vec<String>,
    role: ChannelRole,
) -> ChannelDescriptor {
    let mut montages: Vec<String> = Vec::new();
    for label in &normalized_labels {
        for montage in montages_containing(label, ACCEPTED_MONTAGES) {
            if !montages.contains(&montage) {
                montages.push(montage);
            }
        }
    }
    ChannelDescriptor {
        index,
        raw_label: name.to_string(),
        normalized_labels,
        role,
        montages,
        samples_per_record: 1,
        calibration: None,
    }
}

/// Detect the timestamp unit and estimate the sampling rate in Hz.
///
/// Uses the median of the positive consecutive deltas over the first rows.
pub fn infer_sampling_rate(timestamps: &[f64]) -> Result<(TimestampUnit, f64)> {
    if timestamps.len() < 2 {
        return Err(IngestError::SamplingRate(format!(
            "need at least two timestamped rows, found {}",
            timestamps.len()
        )));
    }

    let unit = TimestampUnit::detect(timestamps[0]);
    let window = &timestamps[..timestamps.len().min(RATE_ESTIMATION_ROWS)];
    let mut deltas: Vec<f64> = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|d| *d > 0.0)
        .collect();

    if deltas.is_empty() {
        return Err(IngestError::SamplingRate(
            "timestamps never increase".to_string(),
        ));
    }

    deltas.sort_by(|a, b| a.total_cmp(b));
    let mid = deltas.len() / 2;
    let median = if deltas.len() % 2 == 0 {
        (deltas[mid - 1] + deltas[mid]) / 2.0
    } else {
        deltas[mid]
    };

    let sampling_rate = unit.ticks_per_second() / median;
    log::debug!(
        "CSV timestamps in {:?}, median interval {}, sampling rate {:.2} Hz",
        unit,
        median,
        sampling_rate
    );
    Ok((unit, sampling_rate))
}

/// Fill NaN samples by linear interpolation over sample index.
///
/// Leading and trailing gaps hold the nearest valid value; an all-NaN
/// channel becomes zeros.
pub fn interpolate_gaps(values: &mut [f64]) {
    let valid: Vec<usize> = (0..values.len()).filter(|&i| !values[i].is_nan()).collect();
    let (Some(&first), Some(&last)) = (valid.first(), valid.last()) else {
        values.fill(0.0);
        return;
    };

    let (head, tail) = (values[first], values[last]);
    values[..first].fill(head);
    values[last + 1..].fill(tail);

    for pair in valid.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let (va, vb) = (values[a], values[b]);
        let span = (b - a) as f64;
        for (offset, value) in values[a + 1..b].iter_mut().enumerate() {
            let t = (offset + 1) as f64 / span;
            *value = va + t * (vb - va);
        }
    }
}
