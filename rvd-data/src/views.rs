//! The dashboard's chart views, each a pure function of a dataset and a
//! selection.
//!
//! An empty selection yields an empty result; callers render that as a
//! "no data" state.

use crate::{
    aggregate::{diagnosis_style, time_series, ward_time_series, BucketKey, CrossTab, Dimension},
    filter::{distinct_age_groups, RecordFilter},
    models::{Matrix, QuartileBand, Series},
};
use chrono::NaiveDate;
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use rvd_core::{
    calendar_week::CalendarWeek,
    diagnosis::{Diagnosis, DiagnosisInfo},
    sari::SariRecord,
    sentinel::{week_sort_key, SentinelBarChart, SentinelHeatmap, BAR_VIRUS_ORDER, HEATMAP_VIRUS_ORDER},
    trace::{PlotlyFigure, TraceSeries},
    week_range::WeekRange,
};
use rvd_utils::{
    color::{gender_color, hex_to_rgba},
    dates::format_date,
};

pub const LOWER_QUARTILE_TRACE: &str = "25%-Quartil";
pub const UPPER_QUARTILE_TRACE: &str = "75%-Quartil";
pub const BAND_ALPHA: f64 = 0.2;

/// Name of the submissions series in the sentinel bar view.
pub const SUBMISSIONS_SERIES: &str = "Einsendungen";

/// Weekly admissions per diagnosis.
pub fn sari_series(records: &[SariRecord], filter: &RecordFilter, diagnoses: &[Diagnosis]) -> Vec<Series> {
    time_series(&filter.apply(records), diagnoses)
}

/// Weekly admissions per diagnosis and ward type.
pub fn ward_series(records: &[SariRecord], filter: &RecordFilter, diagnoses: &[Diagnosis]) -> Vec<Series> {
    ward_time_series(&filter.apply(records), diagnoses)
}

/// Admissions by age group, one bar series per (diagnosis, gender).
///
/// `x` holds the age groups youngest first. With `per_100k` each bar is a
/// rate against the population of its age group and gender.
pub fn demographics(
    records: &[SariRecord],
    filter: &RecordFilter,
    diagnoses: &[Diagnosis],
    per_100k: bool,
) -> Vec<Series> {
    let selected = filter.apply(records);
    let ages = distinct_age_groups(selected.iter().copied());
    if ages.is_empty() {
        return Vec::new();
    }
    let genders: Vec<String> = selected
        .iter()
        .filter_map(|r| r.gender.clone())
        .sorted()
        .dedup()
        .collect();
    let tab = CrossTab::build(
        &selected,
        &[Dimension::AgeGroup, Dimension::Gender, Dimension::Diagnosis],
        diagnoses,
    );

    let infos = DiagnosisInfo::get_diagnosis_vector();
    let mut out = Vec::with_capacity(diagnoses.len() * genders.len());
    for diagnosis in diagnoses {
        let (name, base) = diagnosis_style(*diagnosis, &infos);
        for gender in &genders {
            let color = base.as_deref().and_then(|c| gender_color(c, gender).ok());
            let mut series = Series::new(name.clone()).with_group(gender.as_str()).with_color(color);
            for age in &ages {
                let key = BucketKey::default()
                    .age_group(age)
                    .gender(gender)
                    .diagnosis(*diagnosis);
                series.push(age.as_str(), tab.value(&key, per_100k));
            }
            out.push(series);
        }
    }
    out
}

/// Age group × week matrix of admissions for the selected diagnoses.
///
/// Rows are age groups oldest first (top row of the rendered heatmap),
/// columns are every week from the first to the last one with data.
pub fn age_heatmap(
    records: &[SariRecord],
    filter: &RecordFilter,
    diagnoses: &[Diagnosis],
    per_100k: bool,
) -> Matrix {
    let selected = filter.apply(records);
    let mut ages = distinct_age_groups(selected.iter().copied());
    if ages.is_empty() {
        return Matrix::default();
    }
    ages.reverse();
    let tab = CrossTab::build(&selected, &[Dimension::AgeGroup, Dimension::Week], diagnoses);
    let present = tab.weeks();
    let weeks: Vec<CalendarWeek> = match (present.first(), present.last()) {
        (Some(first), Some(last)) => WeekRange(*first, *last).collect(),
        _ => Vec::new(),
    };

    let values: Vec<Vec<f64>> = ages
        .iter()
        .map(|age| {
            weeks
                .iter()
                .map(|week| tab.value(&BucketKey::default().age_group(age).week(*week), per_100k))
                .collect()
        })
        .collect();
    debug!("age_heatmap: {} x {}", ages.len(), weeks.len());
    Matrix {
        columns: weeks.iter().map(|w| w.to_string()).collect(),
        rows: ages,
        values,
    }
}

/// `known` entries first in their listed order, then the rest alphabetically.
fn ordered_viruses(known: &[&str], present: &[String]) -> Vec<String> {
    let mut out: Vec<String> = known
        .iter()
        .filter(|v| present.iter().any(|p| p.as_str() == **v))
        .map(|v| v.to_string())
        .collect();
    out.extend(
        present
            .iter()
            .filter(|p| !known.contains(&p.as_str()))
            .sorted()
            .dedup()
            .cloned(),
    );
    out
}

fn weeks_in_window(labels: &[String], dates: Option<(NaiveDate, NaiveDate)>) -> Vec<String> {
    let mut weeks: Vec<String> = labels
        .iter()
        .filter(|label| match (dates, CalendarWeek::parse_sentinel_label(label)) {
            (None, _) => true,
            (Some((start, end)), Some(week)) => (start..=end).contains(&week.monday()),
            (Some(_), None) => false,
        })
        .cloned()
        .collect();
    weeks.sort_by_key(|w| week_sort_key(w));
    weeks.dedup();
    weeks
}

/// Sentinel detection heatmap: virus × week.
pub fn sentinel_heatmap(data: &SentinelHeatmap, dates: Option<(NaiveDate, NaiveDate)>) -> Matrix {
    let weeks = weeks_in_window(&data.weeks, dates);
    let mut present = data.viruses.clone();
    present.extend(data.data.keys().cloned());
    let viruses = ordered_viruses(&HEATMAP_VIRUS_ORDER, &present);
    if weeks.is_empty() || viruses.is_empty() {
        return Matrix::default();
    }
    let values: Vec<Vec<f64>> = viruses
        .iter()
        .map(|virus| weeks.iter().map(|week| data.value(virus, week)).collect())
        .collect();
    Matrix {
        rows: viruses,
        columns: weeks,
        values,
    }
}

/// Sentinel bar chart: one series per virus in stacking order, then the
/// number of submitted samples when the dataset carries it.
pub fn sentinel_bars(data: &SentinelBarChart, dates: Option<(NaiveDate, NaiveDate)>) -> Vec<Series> {
    let weeks = weeks_in_window(&data.weeks, dates);
    if weeks.is_empty() {
        return Vec::new();
    }
    let viruses = ordered_viruses(&BAR_VIRUS_ORDER, &data.viruses);
    let mut out: Vec<Series> = viruses
        .iter()
        .map(|virus| {
            let mut series = Series::new(virus.as_str());
            for week in &weeks {
                series.push(week.as_str(), data.value(week, virus));
            }
            series
        })
        .collect();
    if !data.einsendungen.is_empty() {
        let mut submissions = Series::new(SUBMISSIONS_SERIES);
        for week in &weeks {
            submissions.push(week.as_str(), data.submissions(week));
        }
        out.push(submissions);
    }
    out
}

fn dated_series(name: &str, trace: &TraceSeries, dates: Option<(NaiveDate, NaiveDate)>) -> Series {
    let mut series = Series::new(name);
    for (date, value) in trace.dated_points() {
        if dates.map_or(true, |(start, end)| (start..=end).contains(&date)) {
            series.push(format_date(&date), value);
        }
    }
    series
}

/// Wastewater virus load per treatment plant, dates ascending.
///
/// An empty `locations` list selects every plant.
pub fn wastewater(
    traces: &IndexMap<String, TraceSeries>,
    locations: &[String],
    dates: Option<(NaiveDate, NaiveDate)>,
) -> Vec<Series> {
    traces
        .iter()
        .filter(|(name, _)| locations.is_empty() || locations.contains(name))
        .map(|(name, trace)| dated_series(name, trace, dates))
        .filter(|series| !series.is_empty())
        .collect()
}

/// The quartile band behind the plant lines, filled with a translucent
/// variant of `color` and cut to the same date window as the lines.
/// `None` when the figure has no band or none of it falls in the window.
pub fn quartile_band(
    figure: &PlotlyFigure,
    color: &str,
    dates: Option<(NaiveDate, NaiveDate)>,
) -> Option<QuartileBand> {
    let (lower, upper) = figure.extract_quartile_band(LOWER_QUARTILE_TRACE, UPPER_QUARTILE_TRACE)?;
    let lower = dated_series(LOWER_QUARTILE_TRACE, &lower, dates);
    let upper = dated_series(UPPER_QUARTILE_TRACE, &upper, dates);
    if lower.is_empty() && upper.is_empty() {
        return None;
    }
    Some(QuartileBand {
        lower,
        upper,
        fill: hex_to_rgba(color, BAND_ALPHA).ok()?,
    })
}
