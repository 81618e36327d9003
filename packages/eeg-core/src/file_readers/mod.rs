//! Recording Parsers
//!
//! Binary (EDF/BDF) and CSV uploads go through a common `RecordingParser`
//! interface and come out as the same `LoadedRecording` shape, so downstream
//! filtering and windowing never look at the source format.

use serde::Serialize;
use std::path::Path;

pub mod channel_classifier;
pub mod csv_reader;
pub mod edf_reader;

pub use csv_reader::CsvRecordingParser;
pub use edf_reader::BinaryRecordingParser;

use crate::config::IngestConfig;
use crate::error::{ErrorKind, IngestError, Result};
use crate::montage::MontageReport;
use crate::types::{RecordingHeader, RecordingMetadata, SignalMatrix};

/// Which parser a file name points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    Csv,
    /// EDF or BDF; the signature decides which
    Binary,
}

impl FormatHint {
    pub fn from_file_name(file_name: &str) -> Self {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "csv" | "txt" => FormatHint::Csv,
            _ => FormatHint::Binary,
        }
    }
}

/// A parsed upload.
#[derive(Debug, Clone)]
pub struct LoadedRecording {
    pub header: RecordingHeader,
    pub metadata: RecordingMetadata,
    /// `None` when decoding was disabled in the ingest config
    pub signals: Option<SignalMatrix>,
    /// Binary path only; CSV columns are filtered by classification instead
    pub montage: Option<MontageReport>,
    /// Retained channels left out of the signal matrix (sampling-rate mismatch)
    pub skipped_channels: Vec<String>,
}

/// Trait implemented by each upload format.
pub trait RecordingParser {
    /// Parse, classify, validate and (optionally) decode one upload.
    fn parse(&self, bytes: &[u8], config: &IngestConfig) -> Result<LoadedRecording>;

    /// Format name for logging (e.g. "EDF/BDF", "CSV")
    fn format_name(&self) -> &str;
}

/// Picks a parser for a file name.
pub struct RecordingParserFactory;

impl RecordingParserFactory {
    pub fn create_parser(hint: FormatHint) -> Box<dyn RecordingParser> {
        match hint {
            FormatHint::Csv => Box::new(CsvRecordingParser),
            FormatHint::Binary => Box::new(BinaryRecordingParser),
        }
    }

    pub fn supported_extensions() -> Vec<&'static str> {
        vec!["edf", "bdf", "csv", "txt"]
    }
}

/// Parse an in-memory upload.
pub fn load_recording(
    bytes: &[u8],
    file_name: &str,
    config: &IngestConfig,
) -> Result<LoadedRecording> {
    let parser = RecordingParserFactory::create_parser(FormatHint::from_file_name(file_name));
    log::debug!(
        "Parsing '{}' ({} bytes) as {}",
        file_name,
        bytes.len(),
        parser.format_name()
    );
    parser.parse(bytes, config)
}

/// Read a recording from disk and parse it.
pub fn load_path(path: &Path, config: &IngestConfig) -> Result<LoadedRecording> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    load_recording(&bytes, file_name, config)
}

/// Upload verdict, serialized verbatim for the upload layer.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub error: Option<String>,
    pub kind: Option<ErrorKind>,
    /// Base montage labels absent from the file
    pub missing: Vec<String>,
    /// Labels the validator did not recognize (or rejected under the strict policy)
    pub unrecognized: Vec<String>,
    pub metadata: Option<RecordingMetadata>,
}

impl ValidationOutcome {
    fn rejected(error: &IngestError) -> Self {
        let (missing, unrecognized) = match error {
            IngestError::Montage {
                missing,
                unexpected,
            } => (missing.clone(), unexpected.clone()),
            _ => (Vec::new(), Vec::new()),
        };
        Self {
            valid: false,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
            missing,
            unrecognized,
            metadata: None,
        }
    }
}

/// Validate an upload without raising: every failure becomes a typed outcome.
pub fn validate_upload(bytes: &[u8], file_name: &str, config: &IngestConfig) -> ValidationOutcome {
    let config = IngestConfig {
        decode_signals: false,
        ..config.clone()
    };
    match load_recording(bytes, file_name, &config) {
        Ok(recording) => ValidationOutcome {
            valid: true,
            error: None,
            kind: None,
            missing: Vec::new(),
            unrecognized: recording
                .montage
                .map(|m| m.unrecognized)
                .unwrap_or_default(),
            metadata: Some(recording.metadata),
        },
        Err(e) => {
            log::info!("Rejected upload '{}': {}", file_name, e);
            ValidationOutcome::rejected(&e)
        }
    }
}
