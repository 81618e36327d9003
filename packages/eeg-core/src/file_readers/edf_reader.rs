use super::channel_classifier::classify_channel;
use super::{LoadedRecording, RecordingParser};
use crate::config::IngestConfig;
use crate::edf::{decode_channels, parse_header, BinaryHeader};
use crate::error::Result;
use crate::montage::{self, montages_containing, ACCEPTED_MONTAGES};
use crate::types::{ChannelDescriptor, ChannelRole, RecordingHeader, SignalMatrix};

/// EDF / BDF upload parser
///
/// Header, channel classification and montage validation always run;
/// sample decoding only when the ingest config asks for it.
pub struct BinaryRecordingParser;

impl RecordingParser for BinaryRecordingParser {
    fn parse(&self, bytes: &[u8], config: &IngestConfig) -> Result<LoadedRecording> {
        let binary = parse_header(bytes, config.minimum_channels)?;
        let header = build_recording_header(&binary);

        let report = montage::validate(
            &header.eeg_labels(),
            ACCEPTED_MONTAGES,
            config.montage_policy,
        )
        .into_result()?;

        let metadata = header.metadata();

        let (signals, skipped_channels) = if config.decode_signals {
            let (matrix, skipped) = decode_signal_matrix(bytes, &binary, &header)?;
            (Some(matrix), skipped)
        } else {
            (None, Vec::new())
        };

        log::info!(
            "Loaded {} recording: {} channels declared, {} retained, {:.1}s at {} Hz",
            header.format.as_str(),
            header.channel_count,
            metadata.channel_count,
            header.duration_seconds,
            header.sampling_rate
        );

        Ok(LoadedRecording {
            header,
            metadata,
            signals,
            montage: Some(report),
            skipped_channels,
        })
    }

    fn format_name(&self) -> &str {
        "EDF/BDF"
    }
}

/// Classify every declared channel and assemble the immutable header.
pub fn build_recording_header(binary: &BinaryHeader) -> RecordingHeader {
    let channels = binary
        .signals
        .labels
        .iter()
        .enumerate()
        .map(|(index, raw_label)| {
            let classification = classify_channel(raw_label);
            if classification.role == ChannelRole::Excluded {
                log::info!("Excluding channel '{}' (auxiliary or annotation)", raw_label);
            }

            let mut montages: Vec<String> = Vec::new();
            for label in &classification.normalized_labels {
                for name in montages_containing(label, ACCEPTED_MONTAGES) {
                    if !montages.contains(&name) {
                        montages.push(name);
                    }
                }
            }

            ChannelDescriptor {
                index,
                raw_label: raw_label.clone(),
                normalized_labels: classification.normalized_labels,
                role: classification.role,
                montages,
                samples_per_record: binary.signals.samples_per_record[index],
                calibration: Some(binary.signals.calibration(index)),
            }
        })
        .collect();

    RecordingHeader {
        format: binary.format,
        channel_count: binary.fixed.num_signals,
        record_count: binary.record_count,
        record_duration_seconds: binary.fixed.duration_of_data_record,
        duration_seconds: binary.duration_seconds(),
        sampling_rate: binary.sampling_rate(),
        channels,
        patient_id: binary.fixed.patient_id.clone(),
        recording_id: binary.fixed.recording_id.clone(),
        start_time: binary.start_datetime(),
        header_bytes: binary.header_size(),
        edf_plus: binary.is_edf_plus(),
    }
}

/// Decode retained channels sharing the first channel's rate.
///
/// Returns the matrix and the display labels of retained channels left out.
fn decode_signal_matrix(
    bytes: &[u8],
    binary: &BinaryHeader,
    header: &RecordingHeader,
) -> Result<(SignalMatrix, Vec<String>)> {
    let reference_spr = binary.signals.samples_per_record.first().copied().unwrap_or(0);

    let mut indices = Vec::new();
    let mut labels = Vec::new();
    let mut skipped = Vec::new();

    for channel in header.retained_channels() {
        if channel.samples_per_record == reference_spr {
            indices.push(channel.index);
            labels.push(channel.display_label());
        } else {
            log::warn!(
                "Skipping channel '{}': {} samples per record, expected {}",
                channel.raw_label.trim(),
                channel.samples_per_record,
                reference_spr
            );
            skipped.push(channel.display_label());
        }
    }

    let data = decode_channels(bytes, binary, &indices)?;
    Ok((SignalMatrix::new(labels, data, header.sampling_rate), skipped))
}
