use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unrecognized file format: {0}")]
    Format(String),

    #[error("File too small: need at least {required} bytes, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("Header incomplete: {channels} channels need {required} header bytes, got {actual}")]
    HeaderIncomplete {
        channels: usize,
        required: usize,
        actual: usize,
    },

    #[error("Expected at least {minimum} channels, found {found}")]
    ChannelCount { found: usize, minimum: usize },

    #[error("{}", montage_message(.missing, .unexpected))]
    Montage {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Invalid {field} '{value}'")]
    HeaderField { field: String, value: String },

    #[error("Cannot determine sampling rate: {0}")]
    SamplingRate(String),

    #[error("CSV file must have 'timestamp' as first column, found '{0}'")]
    MissingTimestampColumn(String),

    #[error("CSV file must have at least one channel column")]
    NoChannelColumns,

    #[error("No valid EEG or ECG channels found (columns: {})", .0.join(", "))]
    NoValidChannels(Vec<String>),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Coarse error taxonomy reported to the upload layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Format,
    Size,
    ChannelCount,
    Montage,
    HeaderField,
    SamplingRate,
    Csv,
    Io,
    Config,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Format(_) => ErrorKind::Format,
            IngestError::BufferTooSmall { .. } | IngestError::HeaderIncomplete { .. } => {
                ErrorKind::Size
            }
            IngestError::ChannelCount { .. } => ErrorKind::ChannelCount,
            IngestError::Montage { .. } => ErrorKind::Montage,
            IngestError::HeaderField { .. } => ErrorKind::HeaderField,
            IngestError::SamplingRate(_) => ErrorKind::SamplingRate,
            IngestError::MissingTimestampColumn(_)
            | IngestError::NoChannelColumns
            | IngestError::NoValidChannels(_)
            | IngestError::Csv(_) => ErrorKind::Csv,
            IngestError::Io(_) => ErrorKind::Io,
            IngestError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn header_field(field: &str, value: &str) -> Self {
        IngestError::HeaderField {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

fn montage_message(missing: &[String], unexpected: &[String]) -> String {
    match (missing.is_empty(), unexpected.is_empty()) {
        (false, true) => format!(
            "Missing required channels: {}. Expected 10-20 montage.",
            missing.join(", ")
        ),
        (true, false) => format!(
            "Unexpected channels found: {}. Only the standard montages are supported.",
            unexpected.join(", ")
        ),
        _ => format!(
            "Missing required channels: {}; unexpected channels: {}",
            missing.join(", "),
            unexpected.join(", ")
        ),
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
