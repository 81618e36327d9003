use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Container format a recording was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingFormat {
    /// European Data Format, 16-bit samples (version field starts with `0`)
    Edf,
    /// BioSemi Data Format, 24-bit samples (`0xFF` + `BIOSEMI`)
    Bdf,
    /// Timestamped CSV
    Csv,
}

impl RecordingFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingFormat::Edf => "EDF",
            RecordingFormat::Bdf => "BDF",
            RecordingFormat::Csv => "CSV",
        }
    }

    /// Bytes per stored sample in the data records (0 for text formats).
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            RecordingFormat::Edf => 2,
            RecordingFormat::Bdf => 3,
            RecordingFormat::Csv => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    Eeg,
    Ecg,
    Excluded,
}

/// One channel as declared by the file, plus what normalization made of it.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelDescriptor {
    pub index: usize,
    pub raw_label: String,
    /// Canonical labels; empty when nothing survives normalization,
    /// two entries for a combined dual-ear reference.
    pub normalized_labels: Vec<String>,
    pub role: ChannelRole,
    /// Names of the montage specs containing any of this channel's labels
    pub montages: Vec<String>,
    pub samples_per_record: usize,
    /// Binary formats only
    pub calibration: Option<ChannelCalibration>,
}

/// Per-channel header fields of a binary recording and the derived
/// digital-to-physical mapping `physical = gain * digital + offset`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelCalibration {
    pub transducer: String,
    pub physical_dimension: String,
    pub physical_min: f64,
    pub physical_max: f64,
    pub digital_min: i64,
    pub digital_max: i64,
    pub prefiltering: String,
    pub gain: f64,
    pub offset: f64,
}

impl ChannelDescriptor {
    /// Label used for display and as the signal matrix key.
    ///
    /// ECG channels keep their declared label (`ECG II` stays `ECG II`).
    pub fn display_label(&self) -> String {
        if self.role == ChannelRole::Ecg || self.normalized_labels.is_empty() {
            self.raw_label.trim().to_string()
        } else {
            self.normalized_labels.join("+")
        }
    }

    pub fn is_retained(&self) -> bool {
        self.role != ChannelRole::Excluded
    }
}

/// Decoded recording header. Built once per load and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingHeader {
    pub format: RecordingFormat,
    /// Channels declared by the file, excluded ones included
    pub channel_count: usize,
    pub record_count: usize,
    pub record_duration_seconds: f64,
    pub duration_seconds: f64,
    /// Derived from the first channel only
    pub sampling_rate: f64,
    pub channels: Vec<ChannelDescriptor>,
    pub patient_id: String,
    pub recording_id: String,
    pub start_time: Option<NaiveDateTime>,
    pub header_bytes: usize,
    pub edf_plus: bool,
}

impl RecordingHeader {
    pub fn retained_channels(&self) -> impl Iterator<Item = &ChannelDescriptor> {
        self.channels.iter().filter(|c| c.is_retained())
    }

    /// Flattened normalized labels of every EEG channel, in file order.
    pub fn eeg_labels(&self) -> Vec<String> {
        self.channels
            .iter()
            .filter(|c| c.role == ChannelRole::Eeg)
            .flat_map(|c| c.normalized_labels.iter().cloned())
            .collect()
    }

    /// Metadata over the retained (EEG + ECG) channels; excluded ones are
    /// never counted. One entry per physical channel, keyed like the
    /// signal matrix.
    pub fn metadata(&self) -> RecordingMetadata {
        let channels: Vec<String> = self
            .retained_channels()
            .map(ChannelDescriptor::display_label)
            .collect();

        RecordingMetadata {
            duration_seconds: self.duration_seconds,
            sampling_rate: self.sampling_rate,
            channel_count: channels.len(),
            channels,
            annotations: Vec::new(),
        }
    }
}

/// Sample data for the retained channels, `[channel][sample]`.
///
/// All channels share one length; the matrix is read-only once built.
#[derive(Debug, Clone)]
pub struct SignalMatrix {
    labels: Vec<String>,
    data: Vec<Vec<f64>>,
    sample_rate: f64,
}

impl SignalMatrix {
    /// Channels longer than the shortest one are truncated to keep the
    /// shared-length invariant.
    pub fn new(labels: Vec<String>, mut data: Vec<Vec<f64>>, sample_rate: f64) -> Self {
        let len = data.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut data {
            if channel.len() != len {
                log::warn!(
                    "Truncating channel from {} to {} samples",
                    channel.len(),
                    len
                );
                channel.truncate(len);
            }
        }
        Self {
            labels,
            data,
            sample_rate,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn channels(&self) -> &[Vec<f64>] {
        &self.data
    }

    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.data.get(index).map(Vec::as_slice)
    }

    pub fn channel_by_label(&self, label: &str) -> Option<&[f64]> {
        self.labels
            .iter()
            .position(|l| l == label)
            .and_then(|i| self.channel(i))
    }

    pub fn num_channels(&self) -> usize {
        self.data.len()
    }

    pub fn num_samples(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.num_samples() as f64 / self.sample_rate
        } else {
            0.0
        }
    }
}

/// A contiguous slice of the recording, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

impl TimeWindow {
    pub fn new(start_seconds: f64, duration_seconds: f64) -> Self {
        Self {
            start_seconds,
            duration_seconds,
        }
    }

    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }

    /// Clamp into `[0, total_seconds]`. Extraction itself never clamps the
    /// requested times; callers use this before invoking it.
    pub fn clamped(&self, total_seconds: f64) -> Self {
        let start = self.start_seconds.max(0.0).min(total_seconds);
        let end = self.end_seconds().max(start).min(total_seconds);
        Self::new(start, end - start)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub onset: f64,
    pub duration: f64,
    pub description: String,
}

/// Summary handed to cataloging and analysis callers.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingMetadata {
    pub duration_seconds: f64,
    pub sampling_rate: f64,
    #[serde(rename = "n_channels")]
    pub channel_count: usize,
    /// Display labels, the same keys the signal matrix uses
    pub channels: Vec<String>,
    /// Annotation channels are not decoded; always empty for now.
    pub annotations: Vec<Annotation>,
}
