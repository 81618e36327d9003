#![allow(dead_code)]

use std::f64::consts::PI;

pub const STANDARD_LABELS: [&str; 19] = [
    "Fp1", "Fp2", "F7", "F3", "Fz", "F4", "F8", "T7", "C3", "Cz", "C4", "T8", "P7", "P3", "Pz",
    "P4", "P8", "O1", "O2",
];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Binary container flavour written by [`SyntheticRecording::to_bytes`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flavor {
    Edf,
    Bdf,
}

/// Builder for small EDF/BDF files with a known signal in every channel.
///
/// Channel `c` carries a sine of `c + 1` Hz with amplitude 100 (physical
/// units), quantized through a symmetric digital range.
pub struct SyntheticRecording {
    pub flavor: Flavor,
    pub labels: Vec<String>,
    pub samples_per_record: Vec<usize>,
    pub records: usize,
    pub record_duration: f64,
    /// Written verbatim to the record-count field when set
    pub record_count_field: Option<String>,
}

impl SyntheticRecording {
    pub fn new(labels: &[&str], samples_per_record: usize, records: usize) -> Self {
        Self {
            flavor: Flavor::Edf,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            samples_per_record: vec![samples_per_record; labels.len()],
            records,
            record_duration: 1.0,
            record_count_field: None,
        }
    }

    pub fn standard(samples_per_record: usize, records: usize) -> Self {
        Self::new(&STANDARD_LABELS, samples_per_record, records)
    }

    pub fn bdf(mut self) -> Self {
        self.flavor = Flavor::Bdf;
        self
    }

    pub fn with_labels(mut self, extra: &[&str]) -> Self {
        let spr = self.samples_per_record[0];
        for label in extra {
            self.labels.push(label.to_string());
            self.samples_per_record.push(spr);
        }
        self
    }

    pub fn digital_max(&self) -> i64 {
        match self.flavor {
            Flavor::Edf => 32767,
            Flavor::Bdf => 8_388_607,
        }
    }

    /// Physical value of sample `i` in channel `channel`.
    pub fn expected(&self, channel: usize, i: usize) -> f64 {
        let rate = self.samples_per_record[channel] as f64 / self.record_duration;
        100.0 * (2.0 * PI * (channel + 1) as f64 * i as f64 / rate).sin()
    }

    /// Physical units per digital step
    pub fn resolution(&self) -> f64 {
        200.0 / (2 * self.digital_max()) as f64
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let n = self.labels.len();
        let dmax = self.digital_max();
        let mut out = Vec::new();

        match self.flavor {
            Flavor::Edf => out.extend(pad("0", 8)),
            Flavor::Bdf => {
                out.push(0xFF);
                out.extend_from_slice(b"BIOSEMI");
            }
        }
        out.extend(pad("X M 01-JAN-1980 Synthetic", 80));
        out.extend(pad("Startdate 01-JAN-2024 X X X", 80));
        out.extend(pad("01.01.24", 8));
        out.extend(pad("09.30.00", 8));
        out.extend(pad(&(256 + n * 256).to_string(), 8));
        out.extend(pad("", 44));
        let count = self
            .record_count_field
            .clone()
            .unwrap_or_else(|| self.records.to_string());
        out.extend(pad(&count, 8));
        out.extend(pad(&self.record_duration.to_string(), 8));
        out.extend(pad(&n.to_string(), 4));

        for label in &self.labels {
            out.extend(pad(label, 16));
        }
        let per_channel: [(String, usize); 7] = [
            ("AgAgCl electrode".to_string(), 80),
            ("uV".to_string(), 8),
            ("-100".to_string(), 8),
            ("100".to_string(), 8),
            ((-dmax).to_string(), 8),
            (dmax.to_string(), 8),
            ("HP:0.1Hz LP:70Hz".to_string(), 80),
        ];
        for (value, width) in &per_channel {
            for _ in 0..n {
                out.extend(pad(value, *width));
            }
        }
        for spr in &self.samples_per_record {
            out.extend(pad(&spr.to_string(), 8));
        }
        for _ in 0..n {
            out.extend(pad("", 32));
        }

        let scale = dmax as f64 / 100.0;
        for record in 0..self.records {
            for (channel, &spr) in self.samples_per_record.iter().enumerate() {
                for s in 0..spr {
                    let i = record * spr + s;
                    let digital = (self.expected(channel, i) * scale).round() as i32;
                    match self.flavor {
                        Flavor::Edf => out.extend((digital as i16).to_le_bytes()),
                        Flavor::Bdf => out.extend(&digital.to_le_bytes()[..3]),
                    }
                }
            }
        }
        out
    }
}

fn pad(s: &str, width: usize) -> Vec<u8> {
    let mut field = vec![b' '; width];
    let len = s.len().min(width);
    field[..len].copy_from_slice(&s.as_bytes()[..len]);
    field
}

/// CSV text with a `timestamp` column and one sine column per channel name.
pub fn csv_recording(columns: &[&str], first_timestamp: f64, step: f64, rows: usize) -> String {
    let mut text = format!("timestamp,{}\n", columns.join(","));
    for row in 0..rows {
        let timestamp = first_timestamp + step * row as f64;
        let values: Vec<String> = (0..columns.len())
            .map(|c| format!("{:.4}", (row as f64 * 0.1 * (c + 1) as f64).sin()))
            .collect();
        text.push_str(&format!("{},{}\n", timestamp, values.join(",")));
    }
    text
}
