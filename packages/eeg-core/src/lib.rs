//! EEG recording ingestion and display filtering.
//!
//! Parses EDF/BDF and timestamped CSV uploads into a uniform metadata shape,
//! validates the electrode montage, and produces zero-phase filtered windows
//! for viewing and analysis.

pub mod analysis;
pub mod config;
pub mod edf;
pub mod error;
pub mod file_readers;
pub mod montage;
pub mod signal_processing;
pub mod types;

pub use analysis::{AnalysisRequest, AnalysisResults, AnalysisWorker, ProcessingConfig};
pub use config::{ExtractorConfig, IngestConfig};
pub use error::{ErrorKind, IngestError, Result};
pub use file_readers::{
    load_path, load_recording, validate_upload, FormatHint, LoadedRecording, ValidationOutcome,
};
pub use montage::{MontagePolicy, MontageReport, MontageSpec};
pub use signal_processing::{FilterPipeline, FilterSpec, WindowSlice, WindowedExtractor};
pub use types::*;
