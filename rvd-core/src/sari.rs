//! SARI (severe acute respiratory infection) hospital surveillance records.
//!
//! The feeds arrive either as `;`-delimited CSV with a header row or as a
//! pre-aggregated JSON document with the same columns. Both end up as
//! [`SariRecord`]s carrying a resolved [`CalendarWeek`].

use crate::{
    calendar_week::CalendarWeek,
    diagnosis::{Diagnosis, DiagnosisCounts},
    error::{Result, RvdError},
};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// Delimiter of the SARI CSV files.
pub const CSV_DELIMITER: u8 = b';';

/// Column carrying the `19. KW 2023` week label.
pub const WEEK_FIELD: &str = "KW";

/// Columns coerced to integers (non-numeric or empty becomes 0).
pub const SARI_INT_FIELDS: [&str; 7] = [
    "COVID",
    "INFLUENZA",
    "RSV",
    "PNEUMOKOKKEN",
    "SONSTIGE",
    "AUFNAHMEN",
    "BEV_ZAHL",
];

pub const REGION_FIELDS: [&str; 3] = ["BUNDESLAND", "WOHNREGION", "REGION"];
pub const WARD_FIELD: &str = "STATION";
pub const AGE_GROUP_FIELD: &str = "ALTERSGRUPPE";
pub const GENDER_FIELD: &str = "GESCHLECHT";
pub const POPULATION_FIELD: &str = "BEV_ZAHL";
pub const ADMISSIONS_FIELD: &str = "AUFNAHMEN";

/// Which columns are numeric and which one holds the week label.
#[derive(Debug, Clone, Copy)]
pub struct CsvSchema<'a> {
    pub delimiter: u8,
    pub int_fields: &'a [&'a str],
    pub week_field: &'a str,
}

impl CsvSchema<'static> {
    pub const SARI: CsvSchema<'static> = CsvSchema {
        delimiter: CSV_DELIMITER,
        int_fields: &SARI_INT_FIELDS,
        week_field: WEEK_FIELD,
    };
}

/// A single cell after coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

/// One parsed row with its resolved week. Serializes as a flat object of its
/// fields plus an ISO `date` (the Monday of the week).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    #[serde(flatten)]
    pub fields: IndexMap<String, FieldValue>,
    pub date: NaiveDate,
    #[serde(skip)]
    pub week: CalendarWeek,
}

impl RawRecord {
    pub fn new(fields: IndexMap<String, FieldValue>, week: CalendarWeek) -> Self {
        Self {
            fields,
            date: week.monday(),
            week,
        }
    }

    /// Text value of a field; integers are not returned as text.
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(FieldValue::Text(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer value of a field; absent or textual fields count as 0.
    pub fn int(&self, field: &str) -> i64 {
        match self.fields.get(field) {
            Some(FieldValue::Int(v)) => *v,
            Some(FieldValue::Text(s)) => s.parse().unwrap_or(0),
            None => 0,
        }
    }
}

/// Result of parsing a delimited text: the header and the surviving rows.
#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
    /// Rows dropped for a field count mismatch or an unresolvable week.
    pub dropped: usize,
}

fn strip_quotes(value: &str) -> String {
    value.replace('"', "").trim().to_string()
}

/// Parse delimited text with a header row.
///
/// Every line is split on the delimiter as is and quotes are stripped from
/// the fields afterwards, so a stray quote never spans lines and a quoted
/// delimiter still splits. Rows whose field count differs from the header,
/// and rows whose week label does not resolve, are dropped. Output order is
/// input order.
pub fn parse_delimited(text: &str, schema: &CsvSchema) -> ParsedTable {
    let mut rdr = ReaderBuilder::new()
        .delimiter(schema.delimiter)
        .has_headers(true)
        .quoting(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = match rdr.headers() {
        Ok(headers) => headers.iter().map(strip_quotes).collect(),
        Err(e) => {
            debug!("unreadable header row: {e}");
            return ParsedTable::default();
        }
    };
    if columns.iter().all(|c| c.is_empty()) {
        return ParsedTable::default();
    }

    let mut table = ParsedTable {
        columns,
        ..ParsedTable::default()
    };
    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("skipping unreadable row: {e}");
                table.dropped += 1;
                continue;
            }
        };
        if record.len() != table.columns.len() {
            table.dropped += 1;
            continue;
        }

        let mut fields = IndexMap::with_capacity(record.len());
        for (column, raw) in table.columns.iter().zip(record.iter()) {
            let value = strip_quotes(raw);
            let value = if schema.int_fields.contains(&column.as_str()) {
                FieldValue::Int(value.parse().unwrap_or(0))
            } else {
                FieldValue::Text(value)
            };
            fields.insert(column.clone(), value);
        }

        let week = match fields.get(schema.week_field) {
            Some(FieldValue::Text(label)) => CalendarWeek::parse_kw(label),
            _ => None,
        };
        match week {
            Some(week) => table.records.push(RawRecord::new(fields, week)),
            None => table.dropped += 1,
        }
    }
    debug!(
        "parsed {} rows, dropped {}",
        table.records.len(),
        table.dropped
    );
    table
}

/// A typed hospital admission record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SariRecord {
    pub week: CalendarWeek,
    /// Region code (`BUNDESLAND`).
    pub region: String,
    /// Ward/station type, e.g. "Normalstation" or "Intensivstation".
    pub ward: Option<String>,
    pub age_group: Option<String>,
    pub gender: Option<String>,
    /// Population of the demographic cell (`BEV_ZAHL`), 0 when absent.
    pub population: i64,
    pub admissions: i64,
    pub counts: DiagnosisCounts,
}

impl SariRecord {
    pub fn date(&self) -> NaiveDate {
        self.week.monday()
    }

    pub fn count(&self, diagnosis: Diagnosis) -> i64 {
        self.counts.get(diagnosis)
    }
}

impl TryFrom<&RawRecord> for SariRecord {
    type Error = RvdError;

    fn try_from(value: &RawRecord) -> Result<Self> {
        let region = REGION_FIELDS
            .iter()
            .find_map(|field| value.text(field))
            .ok_or_else(|| RvdError::MissingField(REGION_FIELDS[0].to_string()))?;
        let mut counts = DiagnosisCounts::default();
        for diagnosis in Diagnosis::ALL {
            counts.set(diagnosis, value.int(diagnosis.field()));
        }
        Ok(SariRecord {
            week: value.week,
            region: region.to_string(),
            ward: value.text(WARD_FIELD).map(str::to_string),
            age_group: value.text(AGE_GROUP_FIELD).map(str::to_string),
            gender: value.text(GENDER_FIELD).map(str::to_string),
            population: value.int(POPULATION_FIELD),
            admissions: value.int(ADMISSIONS_FIELD),
            counts,
        })
    }
}

fn to_sari_records(raw: &[RawRecord]) -> Vec<SariRecord> {
    raw.iter()
        .filter_map(|r| match SariRecord::try_from(r) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("skipping record of {}: {e}", r.week);
                None
            }
        })
        .collect()
}

/// Parse a SARI CSV feed straight into typed records.
pub fn parse_sari_csv(text: &str) -> Vec<SariRecord> {
    to_sari_records(&parse_delimited(text, &CsvSchema::SARI).records)
}

#[derive(Debug, Deserialize)]
struct PreAggregatedPayload {
    #[serde(default)]
    data: Vec<IndexMap<String, serde_json::Value>>,
}

fn json_to_field(value: &serde_json::Value) -> Option<FieldValue> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(FieldValue::Int),
        serde_json::Value::String(s) => Some(FieldValue::Text(s.clone())),
        _ => None,
    }
}

/// Parse the pre-aggregated JSON variant `{ "data": [ { "date": ..., ... } ] }`.
///
/// The week comes from the `KW` label when present, otherwise from the ISO
/// `date`. Rows resolving to neither are dropped.
pub fn parse_pre_aggregated(json: &str) -> Result<Vec<SariRecord>> {
    let payload: PreAggregatedPayload = serde_json::from_str(json)?;
    let mut raw = Vec::with_capacity(payload.data.len());
    for row in payload.data {
        let fields: IndexMap<String, FieldValue> = row
            .iter()
            .filter(|(key, _)| key.as_str() != "date")
            .filter_map(|(key, value)| json_to_field(value).map(|v| (key.clone(), v)))
            .collect();
        let from_label = match fields.get(WEEK_FIELD) {
            Some(FieldValue::Text(label)) => CalendarWeek::parse_kw(label),
            _ => None,
        };
        let week = from_label.or_else(|| {
            row.get("date")
                .and_then(|d| d.as_str())
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .map(CalendarWeek::from_date)
        });
        match week {
            Some(week) => raw.push(RawRecord::new(fields, week)),
            None => debug!("dropping pre-aggregated row without a date"),
        }
    }
    Ok(to_sari_records(&raw))
}

/// JSON document written by the fetch pipeline for one SARI feed.
#[derive(Debug, Clone, Serialize)]
pub struct SariDocument {
    pub source: String,
    pub description: String,
    pub fetched_at: String,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub data: Vec<RawRecord>,
}

impl SariDocument {
    pub fn from_table(source: &str, description: &str, fetched_at: String, table: ParsedTable) -> Self {
        Self {
            source: source.to_string(),
            description: description.to_string(),
            fetched_at,
            columns: table.columns,
            row_count: table.records.len(),
            data: table.records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KRANKENANSTALT: &str = r#""KW";"BUNDESLAND";"STATION";"COVID";"INFLUENZA";"RSV";"PNEUMOKOKKEN";"SONSTIGE"
"19. KW 2023";"W";"Normalstation";"12";"3";"";"1";"x"
"19. KW 2023";"W";"Intensivstation";"2";"1";"0";"0";"0"
"19. KW 2023";"T";"Normalstation";"5"
"KW neunzehn";"T";"Normalstation";"5";"0";"0";"0";"0"
"20. KW 2023";"T";"Intensivstation";"1";"0";"2";"0";"0"
"#;

    #[test]
    fn test_parse_delimited_drops_bad_rows() {
        let table = parse_delimited(KRANKENANSTALT, &CsvSchema::SARI);
        assert_eq!(table.columns.len(), 8);
        assert_eq!(table.columns[0], "KW");
        assert_eq!(table.records.len(), 3);
        assert_eq!(table.dropped, 2);

        let first = &table.records[0];
        assert_eq!(first.text("BUNDESLAND"), Some("W"));
        assert_eq!(first.int("COVID"), 12);
        // empty and non-numeric counts coerce to zero
        assert_eq!(first.int("RSV"), 0);
        assert_eq!(first.int("SONSTIGE"), 0);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2023, 5, 8).unwrap());
    }

    #[test]
    fn test_unbalanced_quote_affects_only_its_own_line() {
        let text = "KW;BUNDESLAND;COVID\n1. KW 2024;W;1\n\"2. KW 2024;W;2\n3. KW 2024;W;3\n4. KW 2024;W;4\n5. KW 2024;W;5\n";
        let table = parse_delimited(text, &CsvSchema::SARI);
        let weeks: Vec<u32> = table.records.iter().map(|r| r.week.week()).collect();
        assert_eq!(weeks, vec![1, 2, 3, 4, 5]);
        assert_eq!(table.records[1].int("COVID"), 2);
        assert_eq!(table.dropped, 0);
    }

    #[test]
    fn test_quoted_delimiter_still_splits() {
        let text = "\"KW\";\"BUNDESLAND\";\"COVID\"\n\"1. KW 2024\";\"W;X\";\"1\"\n\"2. KW 2024\";\"W\";\"3\"\n";
        let table = parse_delimited(text, &CsvSchema::SARI);
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].week.week(), 2);
        assert_eq!(table.dropped, 1);
    }

    #[test]
    fn test_parse_delimited_preserves_input_order() {
        let table = parse_delimited(KRANKENANSTALT, &CsvSchema::SARI);
        let wards: Vec<_> = table.records.iter().map(|r| r.text("STATION")).collect();
        assert_eq!(
            wards,
            vec![Some("Normalstation"), Some("Intensivstation"), Some("Intensivstation")]
        );
    }

    #[test]
    fn test_parse_delimited_header_only_or_empty() {
        assert!(parse_delimited("", &CsvSchema::SARI).records.is_empty());
        assert!(parse_delimited("KW;COVID\n", &CsvSchema::SARI).records.is_empty());
        assert!(parse_delimited("\n\n", &CsvSchema::SARI).records.is_empty());
    }

    #[test]
    fn test_sari_records() {
        let records = parse_sari_csv(KRANKENANSTALT);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].region, "W");
        assert_eq!(records[0].ward.as_deref(), Some("Normalstation"));
        assert_eq!(records[0].count(Diagnosis::Covid), 12);
        assert_eq!(records[0].count(Diagnosis::Influenza), 3);
        assert_eq!(records[2].week.to_string(), "20. KW 2023");
        assert_eq!(records[2].population, 0);
    }

    #[test]
    fn test_patient_records_with_demographics() {
        let csv = "KW;BUNDESLAND;ALTERSGRUPPE;GESCHLECHT;BEV_ZAHL;COVID;INFLUENZA\n\
                   1. KW 2024;K;0-4;W;14000;2;5\n\
                   1. KW 2024;K;0-4;M;15000;1;0\n";
        let records = parse_sari_csv(csv);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].age_group.as_deref(), Some("0-4"));
        assert_eq!(records[0].gender.as_deref(), Some("W"));
        assert_eq!(records[0].population, 14000);
        assert_eq!(records[1].count(Diagnosis::Covid), 1);
        assert_eq!(records[1].date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_record_without_region_is_dropped() {
        let csv = "KW;STATION;COVID\n1. KW 2024;Normalstation;3\n";
        assert!(parse_sari_csv(csv).is_empty());
    }

    #[test]
    fn test_parse_pre_aggregated() {
        let json = r#"{"data": [
            {"date": "2023-05-08", "BUNDESLAND": "W", "STATION": "Normalstation", "COVID": 4, "INFLUENZA": 1},
            {"KW": "20. KW 2023", "date": null, "BUNDESLAND": "T", "COVID": 2.0},
            {"BUNDESLAND": "T", "COVID": 9}
        ]}"#;
        let records = parse_pre_aggregated(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].week.to_string(), "19. KW 2023");
        assert_eq!(records[0].count(Diagnosis::Covid), 4);
        assert_eq!(records[1].week.to_string(), "20. KW 2023");
        assert_eq!(records[1].count(Diagnosis::Covid), 2);
    }

    #[test]
    fn test_parse_pre_aggregated_rejects_invalid_json() {
        assert!(matches!(
            parse_pre_aggregated("{not json"),
            Err(RvdError::JsonParse(_))
        ));
    }

    #[test]
    fn test_sari_document_serialization() {
        let table = parse_delimited(KRANKENANSTALT, &CsvSchema::SARI);
        let doc = SariDocument::from_table("url", "SARI test", "now".into(), table);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["row_count"], 3);
        assert_eq!(json["data"][0]["COVID"], 12);
        assert_eq!(json["data"][0]["BUNDESLAND"], "W");
        assert_eq!(json["data"][0]["date"], "2023-05-08");
    }
}
