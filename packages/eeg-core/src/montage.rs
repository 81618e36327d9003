//! Montage validation
//!
//! A recording is analyzable when its EEG labels cover the smallest
//! acceptable layout. Larger layouts are accepted; how extra channels are
//! treated depends on [`MontagePolicy`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::IngestError;
use crate::file_readers::channel_classifier::is_known_position;

/// A named, ordered electrode layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MontageSpec {
    pub name: &'static str,
    pub labels: &'static [&'static str],
}

impl MontageSpec {
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(&label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub const STANDARD_10_20: MontageSpec = MontageSpec {
    name: "standard_10_20",
    labels: &[
        "Fp1", "Fp2", "F7", "F3", "Fz", "F4", "F8", "T7", "C3", "Cz", "C4", "T8", "P7", "P3", "Pz",
        "P4", "P8", "O1", "O2",
    ],
};

pub const LINKED_EARS_10_20: MontageSpec = MontageSpec {
    name: "linked_ears_10_20",
    labels: &[
        "Fp1", "Fp2", "F7", "F3", "Fz", "F4", "F8", "T7", "C3", "Cz", "C4", "T8", "P7", "P3", "Pz",
        "P4", "P8", "O1", "O2", "A1", "A2",
    ],
};

pub const EXTENDED_10_10: MontageSpec = MontageSpec {
    name: "extended_10_10",
    labels: &[
        "Fp1", "Fp2", "F7", "F3", "Fz", "F4", "F8", "T7", "C3", "Cz", "C4", "T8", "P7", "P3", "Pz",
        "P4", "P8", "O1", "O2", "Fpz", "Oz", "AF3", "AF4", "AF7", "AF8", "AFz", "F1", "F2", "F5",
        "F6", "FC1", "FC2", "FC3", "FC4", "FC5", "FC6", "FCz", "FT7", "FT8", "C1", "C2", "C5", "C6",
        "CP1", "CP2", "CP3", "CP4", "CP5", "CP6", "CPz", "TP7", "TP8", "P1", "P2", "P5", "P6",
        "PO3", "PO4", "PO7", "PO8", "POz", "Iz",
    ],
};

/// Every layout the validator accepts by default.
pub const ACCEPTED_MONTAGES: &[MontageSpec] = &[STANDARD_10_20, LINKED_EARS_10_20, EXTENDED_10_10];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MontagePolicy {
    /// Valid iff the labels cover the base layout; extras only warn
    #[default]
    Superset,
    /// Additionally rejects labels outside every accepted layout
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MontageReport {
    pub valid: bool,
    /// Base-layout labels not present, in layout order
    pub missing: Vec<String>,
    /// Labels outside the base layout
    pub extra: Vec<String>,
    /// Extras that are neither in an accepted layout nor a known position
    pub unrecognized: Vec<String>,
    /// Names of the accepted layouts fully covered by the labels
    pub matched_montages: Vec<String>,
    /// Set when the strict policy rejected extra labels
    pub unexpected: Vec<String>,
}

impl MontageReport {
    pub fn into_result(self) -> Result<Self, IngestError> {
        if self.valid {
            Ok(self)
        } else {
            Err(IngestError::Montage {
                missing: self.missing,
                unexpected: self.unexpected,
            })
        }
    }
}

/// The smallest accepted layout; the minimum any recording must cover.
pub fn base_montage(specs: &[MontageSpec]) -> Option<&MontageSpec> {
    specs.iter().min_by_key(|s| s.len())
}

/// Names of the specs containing `label`.
pub fn montages_containing(label: &str, specs: &[MontageSpec]) -> Vec<String> {
    specs
        .iter()
        .filter(|s| s.contains(label))
        .map(|s| s.name.to_string())
        .collect()
}

/// Check a normalized EEG label set against the accepted layouts.
pub fn validate(
    labels: &[String],
    specs: &[MontageSpec],
    policy: MontagePolicy,
) -> MontageReport {
    let present: HashSet<&str> = labels.iter().map(String::as_str).collect();

    let Some(base) = base_montage(specs) else {
        return MontageReport {
            valid: true,
            missing: Vec::new(),
            extra: dedup(labels.iter().map(String::as_str)),
            unrecognized: Vec::new(),
            matched_montages: Vec::new(),
            unexpected: Vec::new(),
        };
    };

    let missing: Vec<String> = base
        .labels
        .iter()
        .filter(|l| !present.contains(*l))
        .map(|l| l.to_string())
        .collect();

    let extra = dedup(
        labels
            .iter()
            .map(String::as_str)
            .filter(|l| !base.contains(l)),
    );

    let outside_specs: Vec<String> = extra
        .iter()
        .filter(|l| !specs.iter().any(|s| s.contains(l)))
        .cloned()
        .collect();

    let unrecognized: Vec<String> = outside_specs
        .iter()
        .filter(|l| !is_known_position(l))
        .cloned()
        .collect();

    let matched_montages = specs
        .iter()
        .filter(|s| s.labels.iter().all(|l| present.contains(l)))
        .map(|s| s.name.to_string())
        .collect();

    let unexpected = match policy {
        MontagePolicy::Superset => Vec::new(),
        MontagePolicy::Strict => outside_specs,
    };

    let valid = missing.is_empty() && unexpected.is_empty();

    if valid {
        for label in &unrecognized {
            log::warn!("Unrecognized channel '{}' tolerated by montage validation", label);
        }
    } else {
        log::info!(
            "Montage rejected: missing {:?}, unexpected {:?}",
            missing,
            unexpected
        );
    }

    MontageReport {
        valid,
        missing,
        extra,
        unrecognized,
        matched_montages,
        unexpected,
    }
}

fn dedup<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .filter(|l| seen.insert(*l))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_labels() -> Vec<String> {
        STANDARD_10_20.labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_base_montage_is_smallest() {
        assert_eq!(base_montage(ACCEPTED_MONTAGES), Some(&STANDARD_10_20));
        assert_eq!(STANDARD_10_20.len(), 19);
    }

    #[test]
    fn test_exact_base_layout_is_valid() {
        let report = validate(&base_labels(), ACCEPTED_MONTAGES, MontagePolicy::Superset);
        assert!(report.valid);
        assert!(report.missing.is_empty());
        assert!(report.extra.is_empty());
        assert_eq!(report.matched_montages, vec!["standard_10_20"]);
    }

    #[test]
    fn test_permutations_with_extras_stay_valid() {
        let mut labels = base_labels();
        labels.reverse();
        labels.rotate_left(7);
        labels.extend(["A1", "A2", "Photic", "Fpz"].map(String::from));

        let report = validate(&labels, ACCEPTED_MONTAGES, MontagePolicy::Superset);
        assert!(report.valid);
        assert_eq!(report.extra, vec!["A1", "A2", "Photic", "Fpz"]);
        assert_eq!(report.unrecognized, vec!["Photic"]);
        assert!(report
            .matched_montages
            .contains(&"linked_ears_10_20".to_string()));
    }

    #[test]
    fn test_removing_any_base_label_invalidates() {
        for removed in STANDARD_10_20.labels {
            let labels: Vec<String> = base_labels()
                .into_iter()
                .filter(|l| l != removed)
                .chain(["A1".to_string(), "Oz".to_string()])
                .collect();
            let report = validate(&labels, ACCEPTED_MONTAGES, MontagePolicy::Superset);
            assert!(!report.valid);
            assert_eq!(report.missing, vec![removed.to_string()]);
        }
    }

    #[test]
    fn test_strict_policy_rejects_unknown_extras() {
        let mut labels = base_labels();
        labels.push("Photic".to_string());
        labels.push("A1".to_string());

        let report = validate(&labels, ACCEPTED_MONTAGES, MontagePolicy::Strict);
        assert!(!report.valid);
        assert!(report.missing.is_empty());
        assert_eq!(report.unexpected, vec!["Photic"]);

        match report.into_result() {
            Err(IngestError::Montage { unexpected, .. }) => assert_eq!(unexpected, vec!["Photic"]),
            other => panic!("expected montage error, got {:?}", other),
        }
    }

    #[test]
    fn test_montages_containing() {
        let names = montages_containing("A1", ACCEPTED_MONTAGES);
        assert_eq!(names, vec!["linked_ears_10_20"]);
        assert_eq!(montages_containing("Cz", ACCEPTED_MONTAGES).len(), 3);
    }
}
