//! Trace extraction from Plotly-style figure payloads.
//!
//! The wastewater feeds ship a figure payload (`{ "data": [ trace, ... ] }`)
//! where each line trace is one treatment plant. Only the `data` field is read.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Traces whose name contains this marker are quartile bands, not plants.
pub const QUARTILE_MARKER: &str = "Quartil";

/// Figure payload; everything but `data` is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlotlyFigure {
    #[serde(default)]
    pub data: Vec<Trace>,
}

/// One trace as it appears in the payload. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Trace {
    pub name: Option<String>,
    pub x: Option<Vec<serde_json::Value>>,
    pub y: Option<Vec<Option<f64>>>,
    #[serde(rename = "type")]
    pub trace_type: Option<String>,
    pub mode: Option<String>,
}

/// A named series of parallel x/y arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSeries {
    pub x: Vec<String>,
    pub y: Vec<Option<f64>>,
}

impl TraceSeries {
    /// Points whose x parses as an ISO date and whose y is present, sorted by date.
    pub fn dated_points(&self) -> Vec<(NaiveDate, f64)> {
        let mut points: Vec<(NaiveDate, f64)> = self
            .x
            .iter()
            .zip(self.y.iter())
            .filter_map(|(x, y)| {
                let date = NaiveDate::parse_from_str(x.get(..10)?, "%Y-%m-%d").ok()?;
                Some((date, (*y)?))
            })
            .collect();
        points.sort_by_key(|(date, _)| *date);
        points
    }
}

fn axis_value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Trace {
    fn to_series(&self) -> Option<TraceSeries> {
        let x = self.x.as_ref()?;
        let y = self.y.as_ref()?;
        Some(TraceSeries {
            x: x.iter().map(axis_value_to_string).collect(),
            y: y.clone(),
        })
    }

    /// Whether this trace is a plotted data line: named, with both axes, not a
    /// quartile band, not a bar chart, not invisible.
    pub fn is_data_trace(&self) -> bool {
        let Some(name) = self.name.as_deref() else {
            return false;
        };
        self.x.is_some()
            && self.y.is_some()
            && !name.contains(QUARTILE_MARKER)
            && self.trace_type.as_deref() != Some("bar")
            && self.mode.as_deref() != Some("none")
    }
}

impl PlotlyFigure {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Map of trace name to series, in payload order. A repeated name
    /// overwrites the earlier series.
    pub fn extract_series(&self) -> IndexMap<String, TraceSeries> {
        let mut out = IndexMap::new();
        for trace in self.data.iter().filter(|t| t.is_data_trace()) {
            if let (Some(name), Some(series)) = (trace.name.as_ref(), trace.to_series()) {
                out.insert(name.clone(), series);
            }
        }
        out
    }

    /// The two quartile traces for a band fill, matched by exact name.
    pub fn extract_quartile_band(
        &self,
        lower_name: &str,
        upper_name: &str,
    ) -> Option<(TraceSeries, TraceSeries)> {
        let find = |wanted: &str| {
            self.data
                .iter()
                .rev()
                .find(|t| t.name.as_deref() == Some(wanted))
                .and_then(Trace::to_series)
        };
        Some((find(lower_name)?, find(upper_name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::PlotlyFigure;
    use chrono::NaiveDate;

    const FIGURE: &str = r#"{
        "layout": {"title": "ignored"},
        "data": [
            {"name": "Wien", "x": ["2024-01-08", "2024-01-01"], "y": [2.5, 1.5], "mode": "lines"},
            {"name": "Bezirk", "x": ["2024-01-01"], "y": [7], "type": "bar"},
            {"name": "Hidden", "x": ["2024-01-01"], "y": [3], "mode": "none"},
            {"name": "25%-Quartil", "x": ["2024-01-01"], "y": [1.0]},
            {"name": "75%-Quartil", "x": ["2024-01-01"], "y": [4.0]},
            {"x": ["2024-01-01"], "y": [1.0]},
            {"name": "NoY", "x": ["2024-01-01"]},
            {"name": "Graz", "x": ["2024-01-01", "2024-01-08"], "y": [null, 0.8], "type": "scatter"}
        ]
    }"#;

    #[test]
    fn test_extract_series_excludes_non_data_traces() {
        let figure = PlotlyFigure::from_json(FIGURE).unwrap();
        let series = figure.extract_series();
        let names: Vec<&str> = series.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Wien", "Graz"]);
        assert_eq!(series["Graz"].y, vec![None, Some(0.8)]);
    }

    #[test]
    fn test_name_collision_last_write_wins() {
        let json = r#"{"data": [
            {"name": "Linz", "x": ["2024-01-01"], "y": [1.0]},
            {"name": "Wels", "x": ["2024-01-01"], "y": [2.0]},
            {"name": "Linz", "x": ["2024-01-08"], "y": [3.0]}
        ]}"#;
        let series = PlotlyFigure::from_json(json).unwrap().extract_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series.get_index(0).unwrap().0, "Linz");
        assert_eq!(series["Linz"].y, vec![Some(3.0)]);
    }

    #[test]
    fn test_extract_quartile_band() {
        let figure = PlotlyFigure::from_json(FIGURE).unwrap();
        let (lower, upper) = figure
            .extract_quartile_band("25%-Quartil", "75%-Quartil")
            .unwrap();
        assert_eq!(lower.y, vec![Some(1.0)]);
        assert_eq!(upper.y, vec![Some(4.0)]);
        assert!(figure.extract_quartile_band("25%-Quartil", "90%-Quartil").is_none());
    }

    #[test]
    fn test_dated_points_sorted() {
        let figure = PlotlyFigure::from_json(FIGURE).unwrap();
        let series = figure.extract_series();
        let points = series["Wien"].dated_points();
        assert_eq!(
            points,
            vec![
                (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1.5),
                (NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(), 2.5),
            ]
        );
        assert_eq!(series["Graz"].dated_points().len(), 1);
    }

    #[test]
    fn test_missing_data_field() {
        let figure = PlotlyFigure::from_json("{}").unwrap();
        assert!(figure.extract_series().is_empty());
    }
}
