use crate::types::ChannelRole;

/// 10-20 / 10-10 electrode positions in canonical capitalisation, plus the
/// legacy names that the alias table rewrites.
pub const KNOWN_POSITIONS: &[&str] = &[
    // 10-20 standard
    "Fp1", "Fp2", "F7", "F3", "Fz", "F4", "F8", "T7", "C3", "Cz", "C4", "T8", "P7", "P3", "Pz",
    "P4", "P8", "O1", "O2", "Fpz", "Oz", // 10-10 extensions
    "AF3", "AF4", "AF7", "AF8", "AFz", "F1", "F2", "F5", "F6", "F9", "F10", "FC1", "FC2", "FC3",
    "FC4", "FC5", "FC6", "FCz", "FT7", "FT8", "FT9", "FT10", "C1", "C2", "C5", "C6", "CP1", "CP2",
    "CP3", "CP4", "CP5", "CP6", "CPz", "TP7", "TP8", "TP9", "TP10", "P1", "P2", "P5", "P6", "P9",
    "P10", "PO3", "PO4", "PO7", "PO8", "POz", "O9", "O10", "Nz", "Iz",
    // ear references
    "A1", "A2", // legacy names
    "T3", "T4", "T5", "T6", "M1", "M2",
];

/// Historically renamed positions and mastoid/ear-reference equivalences.
pub const CHANNEL_ALIASES: &[(&str, &str)] = &[
    ("T3", "T7"),
    ("T4", "T8"),
    ("T5", "P7"),
    ("T6", "P8"),
    ("M1", "A1"),
    ("M2", "A2"),
    ("TP9", "A1"),
    ("TP10", "A2"),
];

const MODALITY_PREFIXES: &[&str] = &["EEG ", "EEG-", "ECG ", "EKG ", "EMG ", "EOG "];

/// Longest first so `-A1A2` wins over `-A2`.
const REFERENCE_SUFFIXES: &[&str] = &[
    "-A1+A2", "-M1+M2", "-A1-A2", "-M1-M2", "-A1/A2", "-M1/M2", "-A1A2", "-M1M2", "-REF", "-AVG",
    "-LE", "-AV", "-A1", "-A2", "-CZ", "-M1", "-M2",
];

/// Combined linked-ear references; each expands to both ear positions.
const DUAL_EAR_REFERENCES: &[&str] = &[
    "A1A2", "A1+A2", "A1-A2", "A1/A2", "M1M2", "M1+M2", "M1-M2", "M1/M2", "LE",
];

const ECG_ALIASES: &[&str] = &["ecg", "ekg", "ecg1", "ecg2", "ekg1", "ekg2"];

/// Label patterns for channels that are never EEG (matched lowercase).
#[derive(Debug, Clone, Copy)]
enum ExclusionPattern {
    /// Single letter followed by one of x/y/z (`aX`, `gZ`)
    Axis(char),
    Prefix(&'static str),
    Exact(&'static str),
    /// Prefix followed only by digits (`DC01`, `X3`)
    Numbered(&'static str),
}

const EXCLUSION_PATTERNS: &[ExclusionPattern] = &[
    // motion sensors
    ExclusionPattern::Axis('a'),
    ExclusionPattern::Axis('g'),
    ExclusionPattern::Prefix("acc"),
    ExclusionPattern::Prefix("gyro"),
    ExclusionPattern::Prefix("mag"),
    // environmental
    ExclusionPattern::Prefix("temp"),
    ExclusionPattern::Prefix("batt"),
    ExclusionPattern::Prefix("light"),
    ExclusionPattern::Prefix("ambient"),
    // impedance, trigger, status
    ExclusionPattern::Prefix("z-"),
    ExclusionPattern::Prefix("imp"),
    ExclusionPattern::Prefix("trig"),
    ExclusionPattern::Prefix("status"),
    ExclusionPattern::Prefix("stim"),
    ExclusionPattern::Prefix("sti "),
    ExclusionPattern::Numbered("sti"),
    ExclusionPattern::Prefix("event"),
    ExclusionPattern::Prefix("marker"),
    ExclusionPattern::Exact("edf annotations"),
    ExclusionPattern::Exact("bdf annotations"),
    // vendor auxiliaries
    ExclusionPattern::Prefix("aux"),
    ExclusionPattern::Prefix("counter"),
    ExclusionPattern::Numbered("dc"),
    ExclusionPattern::Numbered("x"),
    ExclusionPattern::Numbered("exg"),
];

impl ExclusionPattern {
    fn matches(&self, lower: &str) -> bool {
        match *self {
            ExclusionPattern::Axis(letter) => {
                let mut chars = lower.chars();
                chars.next() == Some(letter)
                    && matches!(chars.next(), Some('x' | 'y' | 'z'))
                    && chars.next().is_none()
            }
            ExclusionPattern::Prefix(prefix) => lower.starts_with(prefix),
            ExclusionPattern::Exact(label) => lower == label,
            ExclusionPattern::Numbered(prefix) => lower
                .strip_prefix(prefix)
                .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())),
        }
    }
}

/// Result of normalizing and classifying one raw label.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelClassification {
    pub normalized_labels: Vec<String>,
    pub role: ChannelRole,
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = s.len().checked_sub(suffix.len())?;
    let tail = s.get(cut..)?;
    if cut > 0 && tail.eq_ignore_ascii_case(suffix) {
        s.get(..cut)
    } else {
        None
    }
}

/// Canonical capitalisation of a known position, if it is one.
pub fn canonical_position(label: &str) -> Option<&'static str> {
    KNOWN_POSITIONS
        .iter()
        .find(|p| p.eq_ignore_ascii_case(label))
        .copied()
}

pub fn is_known_position(label: &str) -> bool {
    canonical_position(label).is_some()
}

/// Map a raw label to zero or more canonical labels.
///
/// Order: trim, modality prefix, interior whitespace, dual-ear expansion,
/// reference suffix, capitalisation, alias table.
pub fn normalize_label(raw: &str) -> Vec<String> {
    let mut clean = raw.trim();
    for prefix in MODALITY_PREFIXES {
        if let Some(rest) = strip_prefix_ignore_case(clean, prefix) {
            clean = rest;
            break;
        }
    }

    let compact: String = clean.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Vec::new();
    }

    if DUAL_EAR_REFERENCES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(&compact))
    {
        return vec!["A1".to_string(), "A2".to_string()];
    }

    let mut label = compact.as_str();
    for suffix in REFERENCE_SUFFIXES {
        if let Some(rest) = strip_suffix_ignore_case(label, suffix) {
            label = rest;
            break;
        }
    }

    let label = match canonical_position(label) {
        Some(canonical) => CHANNEL_ALIASES
            .iter()
            .find(|(from, _)| *from == canonical)
            .map_or(canonical, |(_, to)| *to),
        None => label,
    };

    vec![label.to_string()]
}

/// True when the raw or any normalized spelling matches an exclusion pattern.
pub fn is_excluded(raw: &str, normalized: &[String]) -> bool {
    std::iter::once(raw.trim())
        .chain(normalized.iter().map(String::as_str))
        .map(str::to_lowercase)
        .any(|lower| EXCLUSION_PATTERNS.iter().any(|p| p.matches(&lower)))
}

pub fn is_ecg_label(raw: &str) -> bool {
    let lower = raw.trim().to_lowercase();
    ECG_ALIASES.contains(&lower.as_str())
        || lower.starts_with("ecg ")
        || lower.starts_with("ekg ")
}

/// Classify a channel from a binary header.
///
/// Unrecognized labels stay EEG so montage validation can report them.
pub fn classify_channel(raw: &str) -> ChannelClassification {
    let normalized_labels = normalize_label(raw);
    let role = if is_excluded(raw, &normalized_labels) {
        ChannelRole::Excluded
    } else if is_ecg_label(raw) {
        ChannelRole::Ecg
    } else {
        ChannelRole::Eeg
    };
    ChannelClassification {
        normalized_labels,
        role,
    }
}

/// Classify a CSV column; `None` means unrecognized and dropped.
pub fn classify_csv_column(name: &str) -> Option<ChannelClassification> {
    let normalized_labels = normalize_label(name);
    let role = if is_excluded(name, &normalized_labels) {
        ChannelRole::Excluded
    } else if !normalized_labels.is_empty()
        && normalized_labels.iter().all(|l| is_known_position(l))
    {
        ChannelRole::Eeg
    } else if is_ecg_label(name) {
        ChannelRole::Ecg
    } else {
        return None;
    };
    Some(ChannelClassification {
        normalized_labels,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> Vec<String> {
        normalize_label(raw)
    }

    #[test]
    fn test_prefix_and_suffix_stripping() {
        assert_eq!(norm("EEG Fp1-REF"), vec!["Fp1"]);
        assert_eq!(norm("  eeg Cz-LE "), vec!["Cz"]);
        assert_eq!(norm("EEG-O2-A1"), vec!["O2"]);
        assert_eq!(norm("FP2-Avg"), vec!["Fp2"]);
        assert_eq!(norm("F 3"), vec!["F3"]);
    }

    #[test]
    fn test_linked_ear_reference_suffixes() {
        for raw in ["C3-A1-A2", "C3-M1-M2", "C3-A1/A2", "C3-M1/M2", "C3-A1+A2", "EEG C3-a1a2"] {
            assert_eq!(norm(raw), vec!["C3"], "{}", raw);
        }
        assert_eq!(norm("EEG T3-A1-A2"), vec!["T7"]);
    }

    #[test]
    fn test_alias_table() {
        assert_eq!(norm("T3"), vec!["T7"]);
        assert_eq!(norm("EEG T4-REF"), vec!["T8"]);
        assert_eq!(norm("t5"), vec!["P7"]);
        assert_eq!(norm("T6"), vec!["P8"]);
        assert_eq!(norm("M1"), vec!["A1"]);
        assert_eq!(norm("TP10"), vec!["A2"]);
    }

    #[test]
    fn test_dual_ear_reference_expands_to_two_labels() {
        assert_eq!(norm("A1A2"), vec!["A1", "A2"]);
        assert_eq!(norm("EEG A1+A2"), vec!["A1", "A2"]);
        assert_eq!(norm("m1-m2"), vec!["A1", "A2"]);
        // as a reference suffix it is stripped instead
        assert_eq!(norm("C3-A1A2"), vec!["C3"]);
    }

    #[test]
    fn test_empty_and_unknown_labels() {
        assert!(norm("   ").is_empty());
        assert!(norm("").is_empty());
        assert_eq!(norm("Photic"), vec!["Photic"]);
    }

    #[test]
    fn test_exclusion_patterns() {
        for label in [
            "aX", "gZ", "AccX", "Gyro1", "MagY", "Temperature", "Battery", "z-Cz", "Impedance",
            "Trigger", "Status", "STI 014", "STI014", "EDF Annotations", "AUX1", "Counter", "DC01",
            "X3", "EXG4", "Light",
        ] {
            let normalized = normalize_label(label);
            assert!(is_excluded(label, &normalized), "{} should be excluded", label);
        }
        for label in ["Fp1", "Cz", "ECG", "A1", "T3", "Oz", "AFz"] {
            let normalized = normalize_label(label);
            assert!(!is_excluded(label, &normalized), "{} should be kept", label);
        }
    }

    #[test]
    fn test_exclusion_checks_normalized_spelling() {
        let normalized = normalize_label("EEG aY");
        assert_eq!(normalized, vec!["aY"]);
        assert!(is_excluded("EEG aY", &normalized));
    }

    #[test]
    fn test_classify_channel_roles() {
        assert_eq!(classify_channel("EEG Fp1-REF").role, ChannelRole::Eeg);
        assert_eq!(classify_channel("ECG").role, ChannelRole::Ecg);
        assert_eq!(classify_channel("ECG II").role, ChannelRole::Ecg);
        assert_eq!(classify_channel("Status").role, ChannelRole::Excluded);
        // unknown labels stay EEG for the montage validator to report
        assert_eq!(classify_channel("Photic").role, ChannelRole::Eeg);
    }

    #[test]
    fn test_classify_csv_column() {
        assert_eq!(
            classify_csv_column("fp1").map(|c| c.role),
            Some(ChannelRole::Eeg)
        );
        assert_eq!(
            classify_csv_column("EKG").map(|c| c.role),
            Some(ChannelRole::Ecg)
        );
        assert_eq!(
            classify_csv_column("aX").map(|c| c.role),
            Some(ChannelRole::Excluded)
        );
        assert_eq!(classify_csv_column("Photic"), None);
    }

    #[test]
    fn test_canonical_position_lookup() {
        assert_eq!(canonical_position("FP1"), Some("Fp1"));
        assert_eq!(canonical_position("afz"), Some("AFz"));
        assert_eq!(canonical_position("Photic"), None);
    }
}
