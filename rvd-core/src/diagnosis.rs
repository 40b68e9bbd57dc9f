use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::RvdError;

/// Embedded display names and base colours for each diagnosis column.
pub static DIAGNOSES_CSV: &str = include_str!("../../fixtures/diagnoses.csv");

/// A SARI diagnosis column. The CSV/JSON field name is the upper-case code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Diagnosis {
    Covid,
    Influenza,
    Rsv,
    Pneumokokken,
    Sonstige,
}

impl Diagnosis {
    pub const ALL: [Diagnosis; 5] = [
        Diagnosis::Covid,
        Diagnosis::Influenza,
        Diagnosis::Rsv,
        Diagnosis::Pneumokokken,
        Diagnosis::Sonstige,
    ];

    /// Field name in the SARI feeds.
    pub fn field(&self) -> &'static str {
        match self {
            Diagnosis::Covid => "COVID",
            Diagnosis::Influenza => "INFLUENZA",
            Diagnosis::Rsv => "RSV",
            Diagnosis::Pneumokokken => "PNEUMOKOKKEN",
            Diagnosis::Sonstige => "SONSTIGE",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

impl FromStr for Diagnosis {
    type Err = RvdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Diagnosis::ALL
            .into_iter()
            .find(|d| d.field() == upper)
            .ok_or_else(|| RvdError::UnknownDiagnosis(s.to_string()))
    }
}

/// Per-diagnosis counts of one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisCounts([i64; 5]);

impl DiagnosisCounts {
    pub fn get(&self, diagnosis: Diagnosis) -> i64 {
        self.0[diagnosis.index()]
    }

    pub fn set(&mut self, diagnosis: Diagnosis, value: i64) {
        self.0[diagnosis.index()] = value;
    }

    pub fn add(&mut self, diagnosis: Diagnosis, value: i64) {
        self.0[diagnosis.index()] += value;
    }

    pub fn total(&self) -> i64 {
        self.0.iter().sum()
    }
}

/// Display metadata for a diagnosis.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DiagnosisInfo {
    pub diagnosis: Diagnosis,
    pub name: String,
    /// Base colour, `#rrggbb`.
    pub color: String,
}

impl DiagnosisInfo {
    /// Parse the lookup table. Expected columns: FIELD, NAME, COLOR.
    /// Rows naming an unknown diagnosis are skipped.
    pub fn parse_diagnosis_csv(csv_object: &str) -> Result<Vec<DiagnosisInfo>, csv::Error> {
        let mut list = Vec::new();
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .from_reader(csv_object.as_bytes());
        for row in rdr.records() {
            let record = row?;
            let Ok(diagnosis) = record.get(0).unwrap_or_default().parse::<Diagnosis>() else {
                continue;
            };
            list.push(DiagnosisInfo {
                diagnosis,
                name: record.get(1).unwrap_or_default().trim().to_string(),
                color: record.get(2).unwrap_or_default().trim().to_string(),
            });
        }
        Ok(list)
    }

    /// The embedded lookup table.
    pub fn get_diagnosis_vector() -> Vec<DiagnosisInfo> {
        Self::parse_diagnosis_csv(DIAGNOSES_CSV).unwrap_or_default()
    }

    /// Display name for a diagnosis, falling back to its field code.
    pub fn display_name(diagnosis: Diagnosis) -> String {
        Self::get_diagnosis_vector()
            .into_iter()
            .find(|info| info.diagnosis == diagnosis)
            .map(|info| info.name)
            .unwrap_or_else(|| diagnosis.field().to_string())
    }
}
