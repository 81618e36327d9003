// EDF / BDF (European Data Format, BioSemi variant) header parser and record decoder
// Specification: https://www.edfplus.info/specs/edf.html

use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime};
use std::str::FromStr;

use crate::error::{IngestError, Result};
use crate::types::{ChannelCalibration, RecordingFormat};

pub const FIXED_HEADER_BYTES: usize = 256;
pub const SIGNAL_HEADER_BYTES: usize = 256;
const BDF_SIGNATURE: &[u8] = b"BIOSEMI";

/// Identify the container from its first 8 bytes.
pub fn detect_format(bytes: &[u8]) -> Result<RecordingFormat> {
    if bytes.len() >= 8 && bytes[0] == 0xFF && &bytes[1..8] == BDF_SIGNATURE {
        return Ok(RecordingFormat::Bdf);
    }
    if bytes.first() == Some(&b'0') {
        return Ok(RecordingFormat::Edf);
    }
    Err(IngestError::Format(
        "version field is neither EDF ('0') nor BDF (0xFF BIOSEMI)".to_string(),
    ))
}

#[derive(Debug, Clone)]
pub struct FixedHeader {
    pub version: String,              // 8 bytes: version of this data format (0)
    pub patient_id: String,           // 80 bytes: local patient identification
    pub recording_id: String,         // 80 bytes: local recording identification
    pub start_date: String,           // 8 bytes: startdate of recording (dd.mm.yy)
    pub start_time: String,           // 8 bytes: starttime of recording (hh.mm.ss)
    pub header_bytes: usize,          // 8 bytes: number of bytes in header record
    pub reserved: String,             // 44 bytes: reserved (EDF+C / EDF+D marker)
    pub num_data_records: i64,        // 8 bytes: number of data records (-1 if unknown)
    pub duration_of_data_record: f64, // 8 bytes: duration of a data record, in seconds
    pub num_signals: usize,           // 4 bytes: number of signals (channels)
}

/// Per-signal header fields.
///
/// The file stores these grouped by field (all labels, then all transducer
/// types, ...), so they are kept as parallel arrays indexed by channel.
#[derive(Debug, Clone, Default)]
pub struct SignalFieldArrays {
    pub labels: Vec<String>,              // 16 bytes each
    pub transducer_types: Vec<String>,    // 80 bytes each
    pub physical_dimensions: Vec<String>, // 8 bytes each
    pub physical_minimums: Vec<f64>,      // 8 bytes each
    pub physical_maximums: Vec<f64>,      // 8 bytes each
    pub digital_minimums: Vec<i64>,       // 8 bytes each
    pub digital_maximums: Vec<i64>,       // 8 bytes each
    pub prefilterings: Vec<String>,       // 80 bytes each
    pub samples_per_record: Vec<usize>,   // 8 bytes each
    pub reserved: Vec<String>,            // 32 bytes each
}

impl SignalFieldArrays {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn gain(&self, channel: usize) -> f64 {
        let digital_range = self.digital_maximums[channel] - self.digital_minimums[channel];
        if digital_range == 0 {
            return 1.0;
        }
        (self.physical_maximums[channel] - self.physical_minimums[channel]) / digital_range as f64
    }

    pub fn offset(&self, channel: usize) -> f64 {
        self.physical_maximums[channel] - self.gain(channel) * self.digital_maximums[channel] as f64
    }

    pub fn calibration(&self, channel: usize) -> ChannelCalibration {
        ChannelCalibration {
            transducer: self.transducer_types[channel].clone(),
            physical_dimension: self.physical_dimensions[channel].clone(),
            physical_min: self.physical_minimums[channel],
            physical_max: self.physical_maximums[channel],
            digital_min: self.digital_minimums[channel],
            digital_max: self.digital_maximums[channel],
            prefiltering: self.prefilterings[channel].clone(),
            gain: self.gain(channel),
            offset: self.offset(channel),
        }
    }

    pub fn sample_frequency(&self, channel: usize, record_duration: f64) -> f64 {
        self.samples_per_record[channel] as f64 / record_duration
    }
}

/// Walks the field-grouped signal header block: every call to `take`
/// consumes one field for all channels.
struct FieldCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    num_signals: usize,
}

impl<'a> FieldCursor<'a> {
    fn new(bytes: &'a [u8], num_signals: usize) -> Self {
        Self {
            bytes,
            offset: FIXED_HEADER_BYTES,
            num_signals,
        }
    }

    fn take(&mut self, width: usize) -> Vec<String> {
        let values = (0..self.num_signals)
            .map(|i| ascii_field(self.bytes, self.offset + i * width, width))
            .collect();
        self.offset += self.num_signals * width;
        values
    }

    fn take_numeric<T: FromStr>(&mut self, width: usize, field: &str) -> Result<Vec<T>> {
        self.take(width)
            .iter()
            .map(|raw| parse_numeric(field, raw))
            .collect()
    }
}

fn ascii_field(bytes: &[u8], offset: usize, width: usize) -> String {
    String::from_utf8_lossy(&bytes[offset..offset + width])
        .trim()
        .to_string()
}

fn parse_numeric<T: FromStr>(field: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| IngestError::header_field(field, raw))
}

/// Decoded header of an EDF or BDF file.
#[derive(Debug, Clone)]
pub struct BinaryHeader {
    pub format: RecordingFormat,
    pub fixed: FixedHeader,
    pub signals: SignalFieldArrays,
    /// Record count from the header, or inferred from the buffer when the
    /// header says -1
    pub record_count: usize,
}

impl BinaryHeader {
    /// Header size implied by the channel count.
    pub fn header_size(&self) -> usize {
        FIXED_HEADER_BYTES + self.fixed.num_signals * SIGNAL_HEADER_BYTES
    }

    pub fn record_size_bytes(&self) -> usize {
        self.signals.samples_per_record.iter().sum::<usize>() * self.format.bytes_per_sample()
    }

    /// Uniform-rate assumption: the first channel's rate applies to all.
    pub fn sampling_rate(&self) -> f64 {
        if self.signals.is_empty() {
            return 0.0;
        }
        self.signals
            .sample_frequency(0, self.fixed.duration_of_data_record)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.record_count as f64 * self.fixed.duration_of_data_record
    }

    pub fn is_edf_plus(&self) -> bool {
        self.fixed.reserved.starts_with("EDF+") || self.fixed.reserved.starts_with("BDF+")
    }

    pub fn start_datetime(&self) -> Option<NaiveDateTime> {
        parse_start_datetime(&self.fixed.start_date, &self.fixed.start_time)
    }

    /// Complete data records present in `bytes` after the header.
    pub fn complete_records_in(&self, bytes: &[u8]) -> usize {
        let record_size = self.record_size_bytes();
        if record_size == 0 {
            return 0;
        }
        bytes.len().saturating_sub(self.header_size()) / record_size
    }
}

/// Parse the fixed header and the field-grouped signal headers.
///
/// Only the header region is required; trailing data records are used to
/// infer the record count when the header leaves it at -1.
pub fn parse_header(bytes: &[u8], minimum_channels: usize) -> Result<BinaryHeader> {
    if bytes.len() < FIXED_HEADER_BYTES {
        return Err(IngestError::BufferTooSmall {
            required: FIXED_HEADER_BYTES,
            actual: bytes.len(),
        });
    }

    let format = detect_format(bytes)?;
    let fixed = parse_fixed_header(bytes, format)?;

    if fixed.num_signals < minimum_channels {
        return Err(IngestError::ChannelCount {
            found: fixed.num_signals,
            minimum: minimum_channels,
        });
    }

    let required = FIXED_HEADER_BYTES + fixed.num_signals * SIGNAL_HEADER_BYTES;
    if bytes.len() < required {
        return Err(IngestError::HeaderIncomplete {
            channels: fixed.num_signals,
            required,
            actual: bytes.len(),
        });
    }
    if fixed.header_bytes != required {
        log::warn!(
            "Header size field says {} bytes but {} channels imply {}; using {}",
            fixed.header_bytes,
            fixed.num_signals,
            required,
            required
        );
    }

    let signals = parse_signal_fields(bytes, fixed.num_signals)?;

    let mut header = BinaryHeader {
        format,
        fixed,
        signals,
        record_count: 0,
    };
    header.record_count = if header.fixed.num_data_records >= 0 {
        header.fixed.num_data_records as usize
    } else {
        let inferred = header.complete_records_in(bytes);
        log::info!(
            "Record count unknown in header, inferred {} records from data section",
            inferred
        );
        inferred
    };

    log::debug!(
        "{} header parsed: num_data_records={}, duration_of_data_record={}, num_signals={}",
        header.format.as_str(),
        header.record_count,
        header.fixed.duration_of_data_record,
        header.fixed.num_signals
    );

    Ok(header)
}

fn parse_fixed_header(bytes: &[u8], format: RecordingFormat) -> Result<FixedHeader> {
    let version = match format {
        RecordingFormat::Bdf => String::from_utf8_lossy(&bytes[1..8]).to_string(),
        _ => ascii_field(bytes, 0, 8),
    };

    let header_bytes = parse_numeric("header bytes", &ascii_field(bytes, 184, 8))?;
    let num_data_records: i64 =
        parse_numeric("number of data records", &ascii_field(bytes, 236, 8))?;
    let duration_raw = ascii_field(bytes, 244, 8);
    let duration_of_data_record: f64 = parse_numeric("data record duration", &duration_raw)?;
    if !duration_of_data_record.is_finite() || duration_of_data_record <= 0.0 {
        return Err(IngestError::header_field("data record duration", &duration_raw));
    }
    let num_signals = parse_numeric("number of signals", &ascii_field(bytes, 252, 4))?;

    if num_data_records < -1 {
        return Err(IngestError::header_field(
            "number of data records",
            &num_data_records.to_string(),
        ));
    }

    Ok(FixedHeader {
        version,
        patient_id: ascii_field(bytes, 8, 80),
        recording_id: ascii_field(bytes, 88, 80),
        start_date: ascii_field(bytes, 168, 8),
        start_time: ascii_field(bytes, 176, 8),
        header_bytes,
        reserved: ascii_field(bytes, 192, 44),
        num_data_records,
        duration_of_data_record,
        num_signals,
    })
}

fn parse_signal_fields(bytes: &[u8], num_signals: usize) -> Result<SignalFieldArrays> {
    let mut cursor = FieldCursor::new(bytes, num_signals);

    Ok(SignalFieldArrays {
        labels: cursor.take(16),
        transducer_types: cursor.take(80),
        physical_dimensions: cursor.take(8),
        physical_minimums: cursor.take_numeric(8, "physical minimum")?,
        physical_maximums: cursor.take_numeric(8, "physical maximum")?,
        digital_minimums: cursor.take_numeric(8, "digital minimum")?,
        digital_maximums: cursor.take_numeric(8, "digital maximum")?,
        prefilterings: cursor.take(80),
        samples_per_record: cursor.take_numeric(8, "number of samples")?,
        reserved: cursor.take(32),
    })
}

/// EDF dates are `dd.mm.yy`; years 85-99 belong to the 1900s.
pub fn parse_start_datetime(date: &str, time: &str) -> Option<NaiveDateTime> {
    let d: Vec<u32> = date
        .split('.')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    let t: Vec<u32> = time
        .split('.')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    if d.len() != 3 || t.len() != 3 {
        return None;
    }
    let year = if d[2] >= 85 { 1900 + d[2] } else { 2000 + d[2] };
    NaiveDate::from_ymd_opt(year as i32, d[1], d[0])?.and_hms_opt(t[0], t[1], t[2])
}

/// Decode the selected channels to physical units.
///
/// Records past the end of the buffer are dropped with a warning.
pub fn decode_channels(
    bytes: &[u8],
    header: &BinaryHeader,
    channels: &[usize],
) -> Result<Vec<Vec<f64>>> {
    let bytes_per_sample = header.format.bytes_per_sample();
    let record_size = header.record_size_bytes();
    let data_start = header.header_size();

    let complete = header.complete_records_in(bytes);
    let num_records = if complete < header.record_count {
        log::warn!(
            "Data section holds {} complete records, header declares {}; decoding {}",
            complete,
            header.record_count,
            complete
        );
        complete
    } else {
        header.record_count
    };

    // Byte offset of each channel inside one data record
    let mut channel_offsets = Vec::with_capacity(header.signals.len());
    let mut running = 0;
    for &spr in &header.signals.samples_per_record {
        channel_offsets.push(running);
        running += spr * bytes_per_sample;
    }

    let mut decoded = Vec::with_capacity(channels.len());
    for &channel in channels {
        if channel >= header.signals.len() {
            return Err(IngestError::header_field(
                "signal index",
                &channel.to_string(),
            ));
        }
        let spr = header.signals.samples_per_record[channel];
        let gain = header.signals.gain(channel);
        let offset = header.signals.offset(channel);

        let mut samples = Vec::with_capacity(num_records * spr);
        for record in 0..num_records {
            let start = data_start + record * record_size + channel_offsets[channel];
            let raw = &bytes[start..start + spr * bytes_per_sample];
            for chunk in raw.chunks_exact(bytes_per_sample) {
                let digital = match header.format {
                    RecordingFormat::Bdf => LittleEndian::read_i24(chunk),
                    _ => LittleEndian::read_i16(chunk) as i32,
                };
                samples.push(gain * digital as f64 + offset);
            }
        }
        decoded.push(samples);
    }

    Ok(decoded)
}
