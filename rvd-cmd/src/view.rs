//! Rendering of dashboard views from a loaded snapshot to chart-ready JSON.

use crate::snapshot::{DashboardSnapshot, HOSPITAL_FEED, PATIENT_FEED};
use clap::ValueEnum;
use indexmap::IndexMap;
use rvd_core::{
    calendar_week::CalendarWeek,
    diagnosis::{Diagnosis, DiagnosisInfo},
    region::{Region, NATIONAL_CODE},
    sari::SariRecord,
};
use rvd_data::{
    filter::{RecordFilter, Selection, WeekIndex},
    views,
};
use serde_json::{json, Value};

/// Which chart to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewKind {
    /// Wastewater virus load per treatment plant
    Wastewater,
    /// Weekly SARI admissions per diagnosis
    SariSeries,
    /// Weekly SARI admissions per diagnosis and ward type
    WardSeries,
    /// Admissions by age group and gender
    Demographics,
    /// Age group by week heatmap
    Heatmap,
    /// Sentinel virus detections
    Sentinel,
}

/// User selection applied to a view.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub region: String,
    pub ward: String,
    /// Empty selects every diagnosis.
    pub diagnoses: Vec<Diagnosis>,
    /// Index bounds into the view's sorted distinct weeks.
    pub from_week: Option<usize>,
    pub to_week: Option<usize>,
    pub per_100k: bool,
    /// Treatment plants to show; empty shows all.
    pub locations: Vec<String>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            region: "ALL".to_string(),
            ward: "ALL".to_string(),
            diagnoses: Vec::new(),
            from_week: None,
            to_week: None,
            per_100k: false,
            locations: Vec::new(),
        }
    }
}

impl ViewOptions {
    fn diagnoses(&self) -> Vec<Diagnosis> {
        if self.diagnoses.is_empty() {
            Diagnosis::ALL.to_vec()
        } else {
            self.diagnoses.clone()
        }
    }

    fn region_name(&self) -> String {
        match Selection::region(&self.region) {
            Selection::All => Region::display_name(NATIONAL_CODE),
            Selection::Only(code) => Region::display_name(&code),
        }
    }

    fn record_filter(&self, records: &[SariRecord]) -> RecordFilter {
        RecordFilter {
            region: Selection::region(&self.region),
            ward: Selection::from_arg(&self.ward),
            dates: WeekIndex::from_records(records).bounds(self.from_week, self.to_week),
        }
    }
}

/// Placeholder returned for a selection without data.
pub fn no_data() -> Value {
    json!({ "status": "no_data" })
}

/// Diagnosis whose colour a wastewater feed is drawn in.
fn feed_diagnosis(feed: &str) -> Option<Diagnosis> {
    match feed {
        "sarscov2" => Some(Diagnosis::Covid),
        "influenza" => Some(Diagnosis::Influenza),
        "rsv" => Some(Diagnosis::Rsv),
        _ => None,
    }
}

fn render_wastewater(snapshot: &DashboardSnapshot, options: &ViewOptions) -> anyhow::Result<Value> {
    let infos = DiagnosisInfo::get_diagnosis_vector();
    let traces: IndexMap<&str, _> = snapshot
        .wastewater
        .iter()
        .map(|(feed, figure)| (feed.as_str(), (figure, figure.extract_series())))
        .collect();
    let index = WeekIndex::new(traces.values().flat_map(|(_, series)| {
        series
            .values()
            .flat_map(|s| s.dated_points())
            .map(|(date, _)| CalendarWeek::from_date(date))
            .collect::<Vec<_>>()
    }));
    let dates = index.bounds(options.from_week, options.to_week);

    let mut out = serde_json::Map::new();
    for (feed, (figure, series)) in &traces {
        let lines = views::wastewater(series, &options.locations, dates);
        if lines.is_empty() {
            continue;
        }
        let band = feed_diagnosis(feed)
            .and_then(|d| infos.iter().find(|i| i.diagnosis == d))
            .and_then(|info| views::quartile_band(figure, &info.color, dates));
        out.insert(
            feed.to_string(),
            json!({ "series": lines, "band": band }),
        );
    }
    Ok(Value::Object(out))
}

fn render_sentinel(snapshot: &DashboardSnapshot, options: &ViewOptions) -> anyhow::Result<Value> {
    let mut weeks: Vec<CalendarWeek> = Vec::new();
    if let Some(heatmap) = &snapshot.sentinel_heatmap {
        weeks.extend(heatmap.calendar_weeks().into_iter().map(|(_, w)| w));
    }
    if let Some(bars) = &snapshot.sentinel_bars {
        weeks.extend(bars.calendar_weeks().into_iter().map(|(_, w)| w));
    }
    let dates = WeekIndex::new(weeks).bounds(options.from_week, options.to_week);

    let mut out = serde_json::Map::new();
    if let Some(heatmap) = &snapshot.sentinel_heatmap {
        let matrix = views::sentinel_heatmap(heatmap, dates);
        if !matrix.is_empty() {
            out.insert("heatmap".to_string(), serde_json::to_value(matrix)?);
        }
    }
    if let Some(bars) = &snapshot.sentinel_bars {
        let series = views::sentinel_bars(bars, dates);
        if !series.is_empty() {
            out.insert("bars".to_string(), serde_json::to_value(series)?);
        }
    }
    Ok(Value::Object(out))
}

/// Render `kind` as JSON; an empty result becomes [`no_data`].
pub fn render_view(snapshot: &DashboardSnapshot, kind: ViewKind, options: &ViewOptions) -> anyhow::Result<Value> {
    let diagnoses = options.diagnoses();
    let rendered = match kind {
        ViewKind::Wastewater => render_wastewater(snapshot, options)?,
        ViewKind::SariSeries | ViewKind::WardSeries => {
            let records = snapshot.sari_records(HOSPITAL_FEED);
            let filter = options.record_filter(records);
            let series = if kind == ViewKind::SariSeries {
                views::sari_series(records, &filter, &diagnoses)
            } else {
                views::ward_series(records, &filter, &diagnoses)
            };
            if series.is_empty() {
                Value::Null
            } else {
                json!({ "region": options.region_name(), "series": series })
            }
        }
        ViewKind::Demographics => {
            let records = snapshot.sari_records(PATIENT_FEED);
            let filter = options.record_filter(records);
            let series = views::demographics(records, &filter, &diagnoses, options.per_100k);
            if series.is_empty() {
                Value::Null
            } else {
                json!({ "region": options.region_name(), "per_100k": options.per_100k, "series": series })
            }
        }
        ViewKind::Heatmap => {
            let records = snapshot.sari_records(PATIENT_FEED);
            let filter = options.record_filter(records);
            let matrix = views::age_heatmap(records, &filter, &diagnoses, options.per_100k);
            if matrix.is_empty() {
                Value::Null
            } else {
                json!({ "region": options.region_name(), "per_100k": options.per_100k, "heatmap": matrix })
            }
        }
        ViewKind::Sentinel => render_sentinel(snapshot, options)?,
    };
    let empty = match &rendered {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    Ok(if empty { no_data() } else { rendered })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvd_core::{sari::parse_sari_csv, sentinel::SentinelHeatmap, trace::PlotlyFigure};

    fn snapshot() -> DashboardSnapshot {
        let mut snapshot = DashboardSnapshot::default();
        snapshot.sari.insert(
            HOSPITAL_FEED.to_string(),
            parse_sari_csv(
                "KW;BUNDESLAND;STATION;COVID;RSV\n\
                 1. KW 2024;W;Normalstation;4;1\n\
                 1. KW 2024;T;Intensivstation;2;0\n\
                 2. KW 2024;W;Normalstation;3;5\n",
            ),
        );
        snapshot.sari.insert(
            PATIENT_FEED.to_string(),
            parse_sari_csv(
                "KW;BUNDESLAND;ALTERSGRUPPE;GESCHLECHT;BEV_ZAHL;COVID\n\
                 1. KW 2024;W;0-4;M;20000;4\n\
                 1. KW 2024;W;0-4;W;10000;1\n",
            ),
        );
        snapshot.wastewater.insert(
            "sarscov2".to_string(),
            PlotlyFigure::from_json(
                r#"{"data": [
                    {"name": "Wien", "x": ["2024-01-01", "2024-01-09"], "y": [1.0, 2.0]},
                    {"name": "25%-Quartil", "x": ["2024-01-01"], "y": [0.5]},
                    {"name": "75%-Quartil", "x": ["2024-01-01"], "y": [1.5]}
                ]}"#,
            )
            .unwrap(),
        );
        snapshot.sentinel_heatmap = Some(
            serde_json::from_str::<SentinelHeatmap>(
                r#"{"viruses": ["RSV"], "weeks": ["KW01/2024", "KW02/2024"],
                    "data": {"RSV": {"KW01/2024": 1, "KW02/2024": 3}}}"#,
            )
            .unwrap(),
        );
        snapshot
    }

    #[test]
    fn test_sari_series_view() {
        let options = ViewOptions {
            region: "W".to_string(),
            diagnoses: vec![Diagnosis::Covid],
            ..ViewOptions::default()
        };
        let json = render_view(&snapshot(), ViewKind::SariSeries, &options).unwrap();
        assert_eq!(json["region"], "Wien");
        assert_eq!(json["series"][0]["name"], "COVID-19");
        assert_eq!(json["series"][0]["x"], json!(["2024-01-01", "2024-01-08"]));
        assert_eq!(json["series"][0]["y"], json!([4.0, 3.0]));
    }

    #[test]
    fn test_ward_series_view_with_window() {
        let options = ViewOptions {
            from_week: Some(1),
            diagnoses: vec![Diagnosis::Rsv],
            ..ViewOptions::default()
        };
        let json = render_view(&snapshot(), ViewKind::WardSeries, &options).unwrap();
        let series = json["series"].as_array().unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0]["group"], "Normalstation");
        assert_eq!(series[0]["y"], json!([5.0]));
    }

    #[test]
    fn test_demographics_and_heatmap_views() {
        let options = ViewOptions {
            per_100k: true,
            ..ViewOptions::default()
        };
        let json = render_view(&snapshot(), ViewKind::Demographics, &options).unwrap();
        assert_eq!(json["per_100k"], true);
        assert_eq!(json["region"], "Österreich");
        // COVID, M, 0-4: 4 cases per 20000
        assert_eq!(json["series"][0]["y"][0], 20.0);

        let json = render_view(&snapshot(), ViewKind::Heatmap, &ViewOptions::default()).unwrap();
        assert_eq!(json["heatmap"]["rows"], json!(["0-4"]));
        assert_eq!(json["heatmap"]["values"][0][0], 5.0);
    }

    #[test]
    fn test_wastewater_view() {
        let json = render_view(&snapshot(), ViewKind::Wastewater, &ViewOptions::default()).unwrap();
        assert_eq!(json["sarscov2"]["series"][0]["name"], "Wien");
        assert_eq!(json["sarscov2"]["band"]["fill"], "rgba(230, 57, 70, 0.2)");

        let options = ViewOptions {
            to_week: Some(0),
            ..ViewOptions::default()
        };
        let json = render_view(&snapshot(), ViewKind::Wastewater, &options).unwrap();
        assert_eq!(json["sarscov2"]["series"][0]["y"], json!([1.0]));
        assert_eq!(json["sarscov2"]["band"]["lower"]["y"], json!([0.5]));

        let options = ViewOptions {
            from_week: Some(1),
            ..ViewOptions::default()
        };
        let json = render_view(&snapshot(), ViewKind::Wastewater, &options).unwrap();
        assert_eq!(json["sarscov2"]["series"][0]["y"], json!([2.0]));
        assert!(json["sarscov2"]["band"].is_null());
    }

    #[test]
    fn test_sentinel_view() {
        let options = ViewOptions {
            from_week: Some(1),
            ..ViewOptions::default()
        };
        let json = render_view(&snapshot(), ViewKind::Sentinel, &options).unwrap();
        assert_eq!(json["heatmap"]["columns"], json!(["KW02/2024"]));
        assert!(json.get("bars").is_none());
    }

    #[test]
    fn test_empty_selection_renders_no_data() {
        let options = ViewOptions {
            region: "V".to_string(),
            ..ViewOptions::default()
        };
        for kind in [ViewKind::SariSeries, ViewKind::WardSeries, ViewKind::Demographics, ViewKind::Heatmap] {
            assert_eq!(render_view(&snapshot(), kind, &options).unwrap(), no_data());
        }
        let empty = DashboardSnapshot::default();
        assert_eq!(
            render_view(&empty, ViewKind::Wastewater, &ViewOptions::default()).unwrap(),
            no_data()
        );
        assert_eq!(
            render_view(&empty, ViewKind::Sentinel, &ViewOptions::default()).unwrap(),
            no_data()
        );
    }
}
