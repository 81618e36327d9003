mod common;

use common::{init_logging, SyntheticRecording, STANDARD_LABELS};
use eeg_core::{
    load_path, load_recording, validate_upload, AnalysisRequest, ChannelRole, ErrorKind,
    IngestConfig, IngestError, MontagePolicy, ProcessingConfig, RecordingFormat, TimeWindow,
};
use std::io::Write;

#[test]
fn test_standard_recording_300_records() {
    init_logging();
    let bytes = SyntheticRecording::standard(250, 300).to_bytes();

    let loaded = load_recording(&bytes, "session.edf", &IngestConfig::default()).unwrap();

    assert_eq!(loaded.header.format, RecordingFormat::Edf);
    assert_eq!(loaded.header.duration_seconds, 300.0);
    assert_eq!(loaded.header.sampling_rate, 250.0);
    assert_eq!(loaded.metadata.duration_seconds, 300.0);
    assert_eq!(loaded.metadata.sampling_rate, 250.0);
    assert_eq!(loaded.metadata.channel_count, 19);
    assert_eq!(loaded.metadata.channels, STANDARD_LABELS.to_vec());
    assert!(loaded.metadata.annotations.is_empty());

    let calibration = loaded.header.channels[0].calibration.clone().unwrap();
    assert_eq!(calibration.physical_dimension, "uV");
    assert_eq!(calibration.prefiltering, "HP:0.1Hz LP:70Hz");
    assert_eq!((calibration.digital_min, calibration.digital_max), (-32767, 32767));
    assert!((calibration.gain - 200.0 / 65534.0).abs() < 1e-12);
    assert!(calibration.offset.abs() < 1e-9);

    let start = loaded.header.start_time.unwrap();
    assert_eq!(start.to_string(), "2024-01-01 09:30:00");

    let signals = loaded.signals.unwrap();
    assert_eq!(signals.num_channels(), 19);
    assert_eq!(signals.num_samples(), 75_000);
    assert_eq!(signals.duration_seconds(), 300.0);
}

#[test]
fn test_decoded_samples_match_physical_values() {
    let recording = SyntheticRecording::standard(128, 4);
    let bytes = recording.to_bytes();

    let loaded = load_recording(&bytes, "session.edf", &IngestConfig::default()).unwrap();
    let signals = loaded.signals.unwrap();
    let tolerance = recording.resolution();

    for channel in [0, 9, 18] {
        let samples = signals.channel(channel).unwrap();
        for i in (0..samples.len()).step_by(7) {
            let expected = recording.expected(channel, i);
            assert!(
                (samples[i] - expected).abs() <= tolerance,
                "channel {} sample {}: {} vs {}",
                channel,
                i,
                samples[i],
                expected
            );
        }
    }
}

#[test]
fn test_bdf_recording_decodes_24_bit_samples() {
    let recording = SyntheticRecording::standard(64, 3).bdf();
    let bytes = recording.to_bytes();

    let loaded = load_recording(&bytes, "session.bdf", &IngestConfig::default()).unwrap();
    assert_eq!(loaded.header.format, RecordingFormat::Bdf);
    assert_eq!(loaded.header.sampling_rate, 64.0);

    let signals = loaded.signals.unwrap();
    assert_eq!(signals.num_samples(), 192);
    let sample = signals.channel(4).unwrap()[10];
    assert!((sample - recording.expected(4, 10)).abs() <= recording.resolution());
}

#[test]
fn test_excluded_channels_never_counted() {
    let bytes = SyntheticRecording::standard(32, 2)
        .with_labels(&["aX", "EEG aY", "z-Cz", "EDF Annotations", "Battery"])
        .to_bytes();

    let loaded = load_recording(&bytes, "session.edf", &IngestConfig::default()).unwrap();

    assert_eq!(loaded.header.channel_count, 24);
    assert_eq!(loaded.metadata.channel_count, 19);
    for label in ["aX", "aY", "z-Cz", "EDF Annotations", "Battery"] {
        assert!(!loaded.metadata.channels.iter().any(|c| c == label));
    }
    let excluded = loaded
        .header
        .channels
        .iter()
        .filter(|c| c.role == ChannelRole::Excluded)
        .count();
    assert_eq!(excluded, 5);
    assert_eq!(loaded.signals.unwrap().num_channels(), 19);
}

#[test]
fn test_legacy_and_prefixed_labels_normalize() {
    let labels = [
        "EEG FP1-REF", "EEG FP2-REF", "EEG F7-REF", "EEG F3-REF", "EEG FZ-REF", "EEG F4-REF",
        "EEG F8-REF", "EEG T3-REF", "EEG C3-REF", "EEG CZ-REF", "EEG C4-REF", "EEG T4-REF",
        "EEG T5-REF", "EEG P3-REF", "EEG PZ-REF", "EEG P4-REF", "EEG T6-REF", "EEG O1-REF",
        "EEG O2-REF", "EEG A1A2",
    ];
    let bytes = SyntheticRecording::new(&labels, 16, 2).to_bytes();

    let loaded = load_recording(&bytes, "legacy.edf", &IngestConfig::default()).unwrap();
    let report = loaded.montage.unwrap();

    assert!(report.valid);
    assert!(report.matched_montages.contains(&"linked_ears_10_20".to_string()));
    assert_eq!(loaded.header.channels[19].normalized_labels, vec!["A1", "A2"]);
    assert_eq!(loaded.metadata.channel_count, 20);
    assert_eq!(&loaded.metadata.channels[7], "T7");
    assert_eq!(&loaded.metadata.channels[19], "A1+A2");
}

#[test]
fn test_linked_ear_referenced_labels_validate() {
    let labels: Vec<String> = STANDARD_LABELS
        .iter()
        .enumerate()
        .map(|(i, l)| match i % 3 {
            0 => format!("EEG {}-A1-A2", l),
            1 => format!("{}-M1/M2", l),
            _ => format!("{}-A1+A2", l),
        })
        .collect();
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
    let bytes = SyntheticRecording::new(&labels, 8, 1).to_bytes();

    let outcome = validate_upload(&bytes, "linked.edf", &IngestConfig::default());
    assert!(outcome.valid, "{:?}", outcome.error);
    assert_eq!(outcome.metadata.unwrap().channels, STANDARD_LABELS.to_vec());
}

#[test]
fn test_metadata_channels_key_the_signal_matrix() {
    let bytes = SyntheticRecording::standard(50, 4)
        .with_labels(&["A1A2", "ECG II", "aX"])
        .to_bytes();

    let loaded = load_recording(&bytes, "linked.edf", &IngestConfig::default()).unwrap();
    let signals = loaded.signals.unwrap();

    assert_eq!(loaded.metadata.channels, signals.labels());
    assert_eq!(loaded.metadata.channel_count, signals.num_channels());
    assert_eq!(&signals.labels()[19..], &["A1+A2".to_string(), "ECG II".to_string()]);

    // Every advertised channel can be requested for analysis
    let request = AnalysisRequest::from_recording(
        &signals,
        &TimeWindow::new(0.0, 4.0),
        Some(loaded.metadata.channels.as_slice()),
        &ProcessingConfig::default(),
    );
    assert_eq!(request.channels.len(), 21);
    assert_eq!(request.channels, loaded.metadata.channels);
}

#[test]
fn test_permuted_labels_with_extras_validate() {
    let mut labels: Vec<&str> = STANDARD_LABELS.to_vec();
    labels.reverse();
    labels.swap(2, 11);
    labels.extend(["Photic", "Oz", "ECG"]);
    let bytes = SyntheticRecording::new(&labels, 8, 1).to_bytes();

    let outcome = validate_upload(&bytes, "upload.edf", &IngestConfig::default());
    assert!(outcome.valid, "{:?}", outcome.error);
    assert_eq!(outcome.unrecognized, vec!["Photic"]);

    let metadata = outcome.metadata.unwrap();
    assert_eq!(metadata.channel_count, 22);
}

#[test]
fn test_removing_one_base_label_names_it() {
    for removed in STANDARD_LABELS {
        let labels: Vec<&str> = STANDARD_LABELS
            .iter()
            .map(|l| if *l == removed { "Oz" } else { *l })
            .collect();
        let bytes = SyntheticRecording::new(&labels, 8, 1).to_bytes();

        let outcome = validate_upload(&bytes, "upload.edf", &IngestConfig::default());
        assert!(!outcome.valid);
        assert_eq!(outcome.kind, Some(ErrorKind::Montage));
        assert_eq!(outcome.missing, vec![removed.to_string()]);
        assert!(outcome.error.unwrap().contains(removed));
    }
}

#[test]
fn test_strict_policy_rejects_unknown_channel() {
    let bytes = SyntheticRecording::standard(8, 1)
        .with_labels(&["Photic"])
        .to_bytes();
    let config = IngestConfig {
        montage_policy: MontagePolicy::Strict,
        ..Default::default()
    };

    let outcome = validate_upload(&bytes, "upload.edf", &config);
    assert!(!outcome.valid);
    assert_eq!(outcome.unrecognized, vec!["Photic"]);
    assert!(outcome.missing.is_empty());
}

#[test]
fn test_too_few_channels() {
    let bytes = SyntheticRecording::new(&STANDARD_LABELS[..12], 8, 1).to_bytes();
    match load_recording(&bytes, "short.edf", &IngestConfig::default()) {
        Err(IngestError::ChannelCount { found, minimum }) => {
            assert_eq!((found, minimum), (12, 19));
        }
        other => panic!("expected channel count error, got {:?}", other.map(|l| l.metadata)),
    }
}

#[test]
fn test_truncated_header_and_data() {
    let bytes = SyntheticRecording::standard(16, 4).to_bytes();

    let outcome = validate_upload(&bytes[..2000], "cut.edf", &IngestConfig::default());
    assert_eq!(outcome.kind, Some(ErrorKind::Size));

    // Header intact, last record cut in half
    let header_len = 256 + 19 * 256;
    let record_len = 19 * 16 * 2;
    let cut = header_len + 3 * record_len + record_len / 2;
    let loaded = load_recording(&bytes[..cut], "cut.edf", &IngestConfig::default()).unwrap();
    assert_eq!(loaded.signals.unwrap().num_samples(), 48);
}

#[test]
fn test_unknown_record_count_is_inferred() {
    let mut recording = SyntheticRecording::standard(10, 6);
    recording.record_count_field = Some("-1".to_string());
    let bytes = recording.to_bytes();

    let loaded = load_recording(&bytes, "stream.edf", &IngestConfig::default()).unwrap();
    assert_eq!(loaded.header.record_count, 6);
    assert_eq!(loaded.header.duration_seconds, 6.0);
}

#[test]
fn test_non_numeric_header_field() {
    let mut recording = SyntheticRecording::standard(10, 1);
    recording.record_count_field = Some("lots".to_string());
    let outcome = validate_upload(&recording.to_bytes(), "bad.edf", &IngestConfig::default());
    assert_eq!(outcome.kind, Some(ErrorKind::HeaderField));
}

#[test]
fn test_load_path_from_disk() {
    let bytes = SyntheticRecording::standard(50, 10).to_bytes();
    let mut file = tempfile::Builder::new().suffix(".edf").tempfile().unwrap();
    file.write_all(&bytes).unwrap();

    let loaded = load_path(file.path(), &IngestConfig::default()).unwrap();
    assert_eq!(loaded.metadata.duration_seconds, 10.0);
    assert_eq!(loaded.metadata.sampling_rate, 50.0);

    let missing = load_path(&file.path().with_extension("gone"), &IngestConfig::default());
    assert_eq!(missing.unwrap_err().kind(), ErrorKind::Io);
}
