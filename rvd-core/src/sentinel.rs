//! Sentinel laboratory surveillance: the detection heatmap and the stacked
//! bar chart of positive detections and submitted samples.
//!
//! Both are published only as SVG charts. [`SentinelHeatmap::from_svg`] and
//! [`SentinelBarChart::from_svg`] read the values back out of the drawing;
//! the resulting datasets are merged into the previously extracted history.

use crate::{
    calendar_week::CalendarWeek,
    error::{Result, RvdError},
    svg::{distinct_sorted, round1, SvgChart, SvgRect, SvgText},
};
use log::debug;
use rvd_utils::color::parse_hex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Row order of the detection heatmap, top to bottom.
pub const HEATMAP_VIRUS_ORDER: [&str; 9] = [
    "Covid19",
    "Influenza",
    "Entero",
    "MPV",
    "RSV",
    "RH",
    "AD",
    "Para",
    "Corona",
];

/// Stacking order of the detection bar chart, bottom to top.
pub const BAR_VIRUS_ORDER: [&str; 11] = [
    "Entero",
    "Inf_A",
    "Inf_B",
    "Inf_C",
    "Metapneumo_V",
    "RSV",
    "Rhino",
    "Adeno",
    "ParaInfluenza",
    "Corona",
    "Covid-19",
];

/// Chronological sort key for `KW08/2025` labels: `(year, week)`.
/// Labels that do not follow the pattern sort first.
pub fn week_sort_key(label: &str) -> (i32, u32) {
    label
        .trim()
        .strip_prefix("KW")
        .and_then(|rest| rest.split_once('/'))
        .and_then(|(week, year)| Some((year.parse().ok()?, week.parse().ok()?)))
        .unwrap_or((0, 0))
}

fn merge_weeks(existing: &[String], newer: &[String]) -> Vec<String> {
    let mut weeks: Vec<String> = existing
        .iter()
        .chain(newer.iter())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    weeks.sort_by_key(|w| week_sort_key(w));
    weeks
}

fn merge_viruses(existing: &[String], newer: &[String]) -> Vec<String> {
    existing
        .iter()
        .chain(newer.iter())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn prefer_newer(newer: String, existing: String) -> String {
    if newer.is_empty() {
        existing
    } else {
        newer
    }
}

/// Sentinel detections per virus and week, as extracted from the heatmap chart.
///
/// `data` is keyed virus first: `data[virus][week]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentinelHeatmap {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    #[serde(default)]
    pub viruses: Vec<String>,
    #[serde(default)]
    pub weeks: Vec<String>,
    #[serde(default)]
    pub data: BTreeMap<String, BTreeMap<String, f64>>,
}

impl SentinelHeatmap {
    pub fn value(&self, virus: &str, week: &str) -> f64 {
        self.data
            .get(virus)
            .and_then(|weeks| weeks.get(week))
            .copied()
            .unwrap_or(0.0)
    }

    /// Weeks that resolve to ISO weeks, in dataset order.
    pub fn calendar_weeks(&self) -> Vec<(String, CalendarWeek)> {
        resolve_weeks(&self.weeks)
    }

    /// Merge a newer extraction into this one. All historical weeks are
    /// kept, new weeks are added, and overlapping cells take the newer value.
    pub fn merge(self, newer: SentinelHeatmap) -> SentinelHeatmap {
        let weeks = merge_weeks(&self.weeks, &newer.weeks);
        let viruses = merge_viruses(&self.viruses, &newer.viruses);
        let mut data = self.data;
        for (virus, cells) in newer.data {
            data.entry(virus).or_default().extend(cells);
        }
        SentinelHeatmap {
            source: prefer_newer(newer.source, self.source),
            description: prefer_newer(newer.description, self.description),
            scale: newer.scale.or(self.scale),
            viruses,
            weeks,
            data,
        }
    }
}

/// Positive detections per week and virus plus the number of submitted
/// samples ("Einsendungen"), as extracted from the stacked bar chart.
///
/// `data` is keyed week first: `data[week][virus]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentinelBarChart {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub viruses: Vec<String>,
    #[serde(default)]
    pub weeks: Vec<String>,
    #[serde(default)]
    pub data: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub einsendungen: BTreeMap<String, f64>,
}

impl SentinelBarChart {
    pub fn value(&self, week: &str, virus: &str) -> f64 {
        self.data
            .get(week)
            .and_then(|viruses| viruses.get(virus))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn submissions(&self, week: &str) -> f64 {
        self.einsendungen.get(week).copied().unwrap_or(0.0)
    }

    pub fn calendar_weeks(&self) -> Vec<(String, CalendarWeek)> {
        resolve_weeks(&self.weeks)
    }

    /// Same policy as [`SentinelHeatmap::merge`]; submissions merge per week.
    pub fn merge(self, newer: SentinelBarChart) -> SentinelBarChart {
        let weeks = merge_weeks(&self.weeks, &newer.weeks);
        let viruses = merge_viruses(&self.viruses, &newer.viruses);
        let mut data = self.data;
        for (week, cells) in newer.data {
            data.entry(week).or_default().extend(cells);
        }
        let mut einsendungen = self.einsendungen;
        einsendungen.extend(newer.einsendungen);
        SentinelBarChart {
            source: prefer_newer(newer.source, self.source),
            description: prefer_newer(newer.description, self.description),
            viruses,
            weeks,
            data,
            einsendungen,
        }
    }
}

/// Chart layout, in SVG pixels.
const CHART_AREA_Y_MIN: f64 = 70.0;
const RIGHT_AXIS_X_MIN: f64 = 700.0;
const LEFT_AXIS_X_MAX: f64 = 70.0;
const VIRUS_LABEL_Y_RANGE: (f64, f64) = (60.0, 340.0);
const VIRUS_LABEL_X_MAX: f64 = 100.0;
/// Virus labels sit this far below the top edge of their heatmap row.
const VIRUS_LABEL_ROW_OFFSET: f64 = 15.0;
const BAR_WIDTH_RANGE: (f64, f64) = (5.0, 15.0);
const LEGEND_SIZE_RANGE: (f64, f64) = (10.0, 15.0);
/// Legend labels sit right of their swatch, this far below its top edge.
const LEGEND_LABEL_DY: (f64, f64) = (8.0, 16.0);

/// Colour bar range assumed when the chart has no tick labels.
pub const DEFAULT_VALUE_RANGE: f64 = 120.0;
/// Bar chart baseline assumed when the right axis has no tick labels.
pub const DEFAULT_BASELINE_Y: f64 = 360.0;
/// Fill of the submissions ("Einsendungen") area of the bar chart.
pub const SUBMISSIONS_FILL: &str = "#E4E4E4";

pub const HEATMAP_DESCRIPTION: &str = "Virusnachweise im Sentinelsystem - Heatmap data";
pub const HEATMAP_SCALE: &str = "0-120 (Fallzahl)";
pub const BAR_CHART_DESCRIPTION: &str = "Anzahl der Einsendungen und positiven Virusnachweise";

fn is_filled(fill: &str) -> bool {
    !fill.is_empty() && !fill.eq_ignore_ascii_case("white") && !fill.contains("url")
}

fn closest_by<'a, T>(items: impl IntoIterator<Item = &'a T>, key: impl Fn(&T) -> f64) -> Option<&'a T>
where
    T: 'a,
{
    items
        .into_iter()
        .min_by(|a, b| key(a).total_cmp(&key(b)))
}

fn position(values: &[f64], value: f64) -> Option<usize> {
    values.iter().position(|v| *v == value)
}

/// Maps a cell colour back onto the colour bar: the nearest gradient stop
/// wins, offset 0% is the top of the range and 100% the bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    stops: Vec<(f64, (u8, u8, u8))>,
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    pub fn from_chart(chart: &SvgChart) -> Self {
        let ticks: Vec<f64> = chart
            .texts
            .iter()
            .filter(|t| t.x > RIGHT_AXIS_X_MIN)
            .filter_map(|t| t.integer().map(f64::from))
            .collect();
        let (min, max) = if ticks.is_empty() {
            (0.0, DEFAULT_VALUE_RANGE)
        } else {
            (
                ticks.iter().copied().fold(f64::INFINITY, f64::min),
                ticks.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };
        let stops = chart
            .gradient
            .iter()
            .filter_map(|stop| Some((stop.offset, parse_hex(&stop.color).ok()?)))
            .collect();
        Self { stops, min, max }
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Value for `fill`, rounded to one decimal; 0 for unknown colours or an
    /// empty colour bar.
    pub fn value(&self, fill: &str) -> f64 {
        let Ok((r, g, b)) = parse_hex(fill) else {
            return 0.0;
        };
        let distance = |(sr, sg, sb): (u8, u8, u8)| {
            let d = |p: u8, q: u8| (f64::from(p) - f64::from(q)).powi(2);
            (d(r, sr) + d(g, sg) + d(b, sb)).sqrt()
        };
        closest_by(&self.stops, |(_, rgb)| distance(*rgb))
            .map(|(offset, _)| round1((100.0 - offset) / 100.0 * self.range()))
            .unwrap_or(0.0)
    }
}

/// Vertical axis from its integer tick labels: `(pixels per unit, baseline)`.
/// The baseline is the lowest tick on screen (largest y).
fn axis_scale(texts: &[SvgText], on_axis: impl Fn(&SvgText) -> bool) -> Option<(f64, f64)> {
    let mut ticks: BTreeMap<u64, (f64, f64)> = BTreeMap::new();
    for text in texts.iter().filter(|t| on_axis(t)) {
        if let Some(value) = text.integer() {
            ticks.insert(text.y.to_bits(), (text.y, f64::from(value)));
        }
    }
    let mut ticks: Vec<(f64, f64)> = ticks.into_values().collect();
    ticks.sort_by(|a, b| a.0.total_cmp(&b.0));
    let [(y0, v0), (y1, v1), ..] = ticks.as_slice() else {
        return None;
    };
    if v0 == v1 {
        return None;
    }
    let baseline = ticks.iter().map(|(y, _)| *y).fold(f64::NEG_INFINITY, f64::max);
    Some(((y1 - y0).abs() / (v1 - v0).abs(), baseline))
}

/// First week label of a chart: the left-most label that resolves.
fn first_week_label<'a>(texts: impl Iterator<Item = &'a SvgText>) -> Option<(f64, CalendarWeek)> {
    texts
        .filter_map(|t| CalendarWeek::parse_sentinel_label(&t.content).map(|w| (t.x, w)))
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

fn sorted_labels(labels: BTreeSet<String>) -> Vec<String> {
    let mut labels: Vec<String> = labels.into_iter().collect();
    labels.sort_by_key(|w| week_sort_key(w));
    labels
}

impl SentinelHeatmap {
    /// Extract the heatmap from its SVG chart.
    ///
    /// Rows are matched to the virus labels on the left, columns are
    /// consecutive weeks counted from the left-most week label, and each
    /// cell colour is read back through the colour bar.
    pub fn from_svg(svg: &str, source: &str) -> Result<Self> {
        let chart = SvgChart::parse(svg)?;
        let scale = ColorScale::from_chart(&chart);
        debug!(
            "colour bar {}-{} with {} stops",
            scale.min,
            scale.max,
            scale.stops.len()
        );

        let virus_labels: Vec<&SvgText> = chart
            .texts
            .iter()
            .filter(|t| {
                t.transform.is_empty()
                    && t.x < VIRUS_LABEL_X_MAX
                    && VIRUS_LABEL_Y_RANGE.0 < t.y
                    && t.y < VIRUS_LABEL_Y_RANGE.1
            })
            .collect();
        let first_week = first_week_label(
            chart
                .texts
                .iter()
                .filter(|t| t.transform.contains("rotate") && t.content.contains("KW")),
        );

        let cells: Vec<&SvgRect> = chart
            .rects
            .iter()
            .filter(|r| r.width > 0.0 && r.height > 0.0 && is_filled(&r.fill))
            .collect();
        let rows = distinct_sorted(cells.iter().map(|r| r.y));
        let columns = distinct_sorted(cells.iter().map(|r| r.x));

        let row_viruses: Vec<Option<&str>> = rows
            .iter()
            .enumerate()
            .map(|(i, y)| {
                if i >= virus_labels.len() {
                    return None;
                }
                closest_by(virus_labels.iter().copied(), |t| {
                    (t.y - y - VIRUS_LABEL_ROW_OFFSET).abs()
                })
                .map(|t| t.content.as_str())
            })
            .collect();
        let column_weeks: Vec<Option<String>> = (0..columns.len())
            .map(|i| {
                let (_, first) = first_week?;
                Some(first.offset(i64::try_from(i).ok()?).sentinel_label())
            })
            .collect();

        let mut data: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        let mut weeks = BTreeSet::new();
        for cell in &cells {
            let virus = position(&rows, cell.y).and_then(|i| row_viruses[i]);
            let week = position(&columns, cell.x).and_then(|i| column_weeks[i].clone());
            let (Some(virus), Some(week)) = (virus, week) else {
                continue;
            };
            weeks.insert(week.clone());
            data.entry(virus.to_string())
                .or_default()
                .insert(week, scale.value(&cell.fill));
        }
        if data.is_empty() {
            return Err(RvdError::EmptyFeed(source.to_string()));
        }

        let weeks = sorted_labels(weeks);
        for cells in data.values_mut() {
            for week in &weeks {
                cells.entry(week.clone()).or_insert(0.0);
            }
        }
        Ok(SentinelHeatmap {
            source: source.to_string(),
            description: HEATMAP_DESCRIPTION.to_string(),
            scale: Some(HEATMAP_SCALE.to_string()),
            viruses: data.keys().cloned().collect(),
            weeks,
            data,
        })
    }
}

/// Legend swatch fill (upper case) to virus name. Names have spaces turned
/// into underscores and dots removed (`Inf. A` becomes `Inf_A`).
fn legend_colors(chart: &SvgChart) -> HashMap<String, String> {
    let in_range = |v: f64| LEGEND_SIZE_RANGE.0 <= v && v <= LEGEND_SIZE_RANGE.1;
    let labels: Vec<&SvgText> = chart
        .texts
        .iter()
        .filter(|t| t.y < CHART_AREA_Y_MIN)
        .collect();
    chart
        .rects
        .iter()
        .filter(|r| {
            in_range(r.width) && in_range(r.height) && r.y < CHART_AREA_Y_MIN && !r.fill.is_empty()
        })
        .filter_map(|swatch| {
            let candidates = labels.iter().copied().filter(|t| {
                let dy = t.y - swatch.y;
                t.x > swatch.x && LEGEND_LABEL_DY.0 <= dy && dy <= LEGEND_LABEL_DY.1
            });
            let label = closest_by(candidates.collect::<Vec<_>>(), |t| t.x - swatch.x)?;
            let name = label.content.replace(' ', "_").replace('.', "");
            Some((swatch.fill.to_uppercase(), name))
        })
        .collect()
}

impl SentinelBarChart {
    /// Extract the stacked bar chart from its SVG chart.
    ///
    /// Segment heights are converted through the left axis, the submissions
    /// area through the right axis. Every bar position is one week, counted
    /// from the bar nearest the left-most week label; bars without a usable
    /// label are keyed `x=<position>`.
    pub fn from_svg(svg: &str, source: &str) -> Result<Self> {
        let chart = SvgChart::parse(svg)?;
        let legend = legend_colors(&chart);
        debug!("{} legend colours", legend.len());

        let pixels_per_unit = axis_scale(&chart.texts, |t| t.x < LEFT_AXIS_X_MAX)
            .map_or(1.0, |(ppu, _)| ppu);
        let (right_ppu, baseline) = axis_scale(&chart.texts, |t| t.x > RIGHT_AXIS_X_MIN)
            .unwrap_or((1.0, DEFAULT_BASELINE_Y));

        let bars: Vec<&SvgRect> = chart
            .rects
            .iter()
            .filter(|r| {
                BAR_WIDTH_RANGE.0 < r.width
                    && r.width < BAR_WIDTH_RANGE.1
                    && r.height > 0.0
                    && r.y > CHART_AREA_Y_MIN
                    && is_filled(&r.fill)
                    && !r.fill.eq_ignore_ascii_case(SUBMISSIONS_FILL)
            })
            .collect();
        let positions = distinct_sorted(bars.iter().map(|r| r.x));

        let anchor = first_week_label(chart.texts.iter().filter(|t| t.content.contains("KW")))
            .and_then(|(label_x, week)| {
                let index = (0..positions.len())
                    .min_by(|a, b| {
                        (positions[*a] - label_x)
                            .abs()
                            .total_cmp(&(positions[*b] - label_x).abs())
                    })?;
                Some((index, week))
            });
        let week_at = |x: f64| -> String {
            anchor
                .and_then(|(anchor_index, week)| {
                    let index = i64::try_from(position(&positions, x)?).ok()?;
                    let anchor_index = i64::try_from(anchor_index).ok()?;
                    Some(week.offset(index - anchor_index).sentinel_label())
                })
                .unwrap_or_else(|| format!("x={x}"))
        };

        let mut sums: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        let mut viruses = BTreeSet::new();
        for bar in &bars {
            let fill = bar.fill.to_uppercase();
            let virus = legend
                .get(&fill)
                .cloned()
                .unwrap_or_else(|| format!("unknown_{fill}"));
            viruses.insert(virus.clone());
            *sums
                .entry(week_at(bar.x))
                .or_default()
                .entry(virus)
                .or_insert(0.0) += round1(bar.height / pixels_per_unit);
        }
        if sums.is_empty() {
            return Err(RvdError::EmptyFeed(source.to_string()));
        }

        let mut submissions = BTreeMap::new();
        for polygon in chart
            .polygons
            .iter()
            .filter(|p| p.fill.eq_ignore_ascii_case(SUBMISSIONS_FILL))
        {
            for (px, py) in polygon.points.iter().copied().filter(|(_, py)| *py < baseline - 1.0) {
                if let Some(x) = closest_by(&positions, |bx| (bx - px).abs()) {
                    submissions.insert(week_at(*x), round1((baseline - py) / right_ppu));
                }
            }
        }

        let weeks = sorted_labels(sums.keys().cloned().collect());
        let viruses: Vec<String> = viruses.into_iter().collect();
        let data = weeks
            .iter()
            .map(|week| {
                let cells: BTreeMap<String, f64> = viruses
                    .iter()
                    .map(|virus| {
                        let value = sums.get(week).and_then(|c| c.get(virus)).copied();
                        (virus.clone(), round1(value.unwrap_or(0.0)))
                    })
                    .collect();
                (week.clone(), cells)
            })
            .collect();
        let einsendungen = weeks
            .iter()
            .map(|week| (week.clone(), submissions.get(week).copied().unwrap_or(0.0)))
            .collect();
        Ok(SentinelBarChart {
            source: source.to_string(),
            description: BAR_CHART_DESCRIPTION.to_string(),
            viruses,
            weeks,
            data,
            einsendungen,
        })
    }
}

fn resolve_weeks(labels: &[String]) -> Vec<(String, CalendarWeek)> {
    labels
        .iter()
        .filter_map(|label| CalendarWeek::parse_sentinel_label(label).map(|w| (label.clone(), w)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heatmap(weeks: &[&str], cells: &[(&str, &str, f64)]) -> SentinelHeatmap {
        let mut data: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for (virus, week, value) in cells {
            data.entry(virus.to_string())
                .or_default()
                .insert(week.to_string(), *value);
        }
        SentinelHeatmap {
            source: "src".into(),
            description: "desc".into(),
            scale: Some("0-120 (Fallzahl)".into()),
            viruses: data.keys().cloned().collect(),
            weeks: weeks.iter().map(|w| w.to_string()).collect(),
            data,
        }
    }

    #[test]
    fn test_week_sort_key() {
        assert_eq!(week_sort_key("KW08/2025"), (2025, 8));
        assert_eq!(week_sort_key("x=80"), (0, 0));
        let mut weeks = vec!["KW02/2025", "KW52/2024", "KW01/2025"];
        weeks.sort_by_key(|w| week_sort_key(w));
        assert_eq!(weeks, vec!["KW52/2024", "KW01/2025", "KW02/2025"]);
    }

    #[test]
    fn test_heatmap_merge_keeps_history_and_overwrites_overlap() {
        let old = heatmap(
            &["KW51/2024", "KW52/2024"],
            &[("RSV", "KW51/2024", 10.0), ("RSV", "KW52/2024", 20.0)],
        );
        let new = heatmap(
            &["KW52/2024", "KW01/2025"],
            &[("RSV", "KW52/2024", 25.0), ("Influenza", "KW01/2025", 40.0)],
        );
        let merged = old.merge(new);
        assert_eq!(merged.weeks, vec!["KW51/2024", "KW52/2024", "KW01/2025"]);
        assert_eq!(merged.viruses, vec!["Influenza", "RSV"]);
        assert_eq!(merged.value("RSV", "KW51/2024"), 10.0);
        assert_eq!(merged.value("RSV", "KW52/2024"), 25.0);
        assert_eq!(merged.value("Influenza", "KW01/2025"), 40.0);
        assert_eq!(merged.value("Influenza", "KW51/2024"), 0.0);
    }

    #[test]
    fn test_bar_chart_merge_and_submissions() {
        let json_old = r#"{"viruses": ["RSV"], "weeks": ["KW01/2025"],
            "data": {"KW01/2025": {"RSV": 3.0}}, "einsendungen": {"KW01/2025": 50.0}}"#;
        let json_new = r#"{"source": "new", "viruses": ["Inf_A"], "weeks": ["KW02/2025"],
            "data": {"KW02/2025": {"Inf_A": 7.5}}, "einsendungen": {"KW02/2025": 61.0}}"#;
        let old: SentinelBarChart = serde_json::from_str(json_old).unwrap();
        let new: SentinelBarChart = serde_json::from_str(json_new).unwrap();
        let merged = old.merge(new);
        assert_eq!(merged.source, "new");
        assert_eq!(merged.weeks, vec!["KW01/2025", "KW02/2025"]);
        assert_eq!(merged.value("KW01/2025", "RSV"), 3.0);
        assert_eq!(merged.value("KW02/2025", "Inf_A"), 7.5);
        assert_eq!(merged.submissions("KW01/2025"), 50.0);
        assert_eq!(merged.submissions("KW02/2025"), 61.0);
    }

    #[test]
    fn test_calendar_weeks_skip_unresolvable() {
        let map = heatmap(&["KW08/2025", "x=80", "KW53/2023"], &[]);
        let weeks = map.calendar_weeks();
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].1.to_string(), "8. KW 2025");
    }

    const HEATMAP_SVG: &str = include_str!("../../fixtures/sentinel_heatmap.svg");
    const BAR_CHART_SVG: &str = include_str!("../../fixtures/sentinel_barchart.svg");

    #[test]
    fn test_heatmap_from_svg() {
        let map = SentinelHeatmap::from_svg(HEATMAP_SVG, "heatmap.svg").unwrap();
        assert_eq!(map.source, "heatmap.svg");
        assert_eq!(map.scale.as_deref(), Some(HEATMAP_SCALE));
        assert_eq!(map.viruses, vec!["Covid19", "RSV"]);
        // 2020 has an ISO week 53
        assert_eq!(map.weeks, vec!["KW52/2020", "KW53/2020", "KW01/2021"]);
        assert_eq!(map.value("Covid19", "KW52/2020"), 120.0);
        assert_eq!(map.value("Covid19", "KW53/2020"), 60.0);
        assert_eq!(map.value("Covid19", "KW01/2021"), 0.0);
        assert_eq!(map.value("RSV", "KW52/2020"), 60.0);
        assert_eq!(map.data["RSV"]["KW53/2020"], 0.0);
        assert_eq!(map.value("RSV", "KW01/2021"), 120.0);
    }

    #[test]
    fn test_color_scale_defaults_without_ticks() {
        let chart = SvgChart::parse(
            r##"<svg><defs><linearGradient id="gradient1">
                <stop offset="25%" style="stop-color:#00ff00"/>
            </linearGradient></defs></svg>"##,
        )
        .unwrap();
        let scale = ColorScale::from_chart(&chart);
        assert_eq!(scale.range(), DEFAULT_VALUE_RANGE);
        assert_eq!(scale.value("#00ee00"), 90.0);
        assert_eq!(scale.value("not a colour"), 0.0);
        assert_eq!(ColorScale::from_chart(&SvgChart::default()).value("#00ff00"), 0.0);
    }

    #[test]
    fn test_heatmap_without_cells_is_empty_feed() {
        let result = SentinelHeatmap::from_svg("<svg><text x=\"20\" y=\"115\">RSV</text></svg>", "h");
        assert!(matches!(result, Err(RvdError::EmptyFeed(_))));
        assert!(matches!(
            SentinelHeatmap::from_svg("<svg><rect></svg>", "h"),
            Err(RvdError::SvgParse(_))
        ));
    }

    #[test]
    fn test_bar_chart_from_svg() {
        let bars = SentinelBarChart::from_svg(BAR_CHART_SVG, "graph.svg").unwrap();
        assert_eq!(bars.description, BAR_CHART_DESCRIPTION);
        assert_eq!(bars.viruses, vec!["Inf_A", "RSV", "unknown_#123456"]);
        assert_eq!(bars.weeks, vec!["KW08/2025", "KW09/2025"]);
        assert_eq!(bars.value("KW08/2025", "Inf_A"), 5.0);
        assert_eq!(bars.value("KW08/2025", "RSV"), 5.0);
        assert_eq!(bars.value("KW08/2025", "unknown_#123456"), 1.5);
        assert_eq!(bars.value("KW09/2025", "Inf_A"), 7.0);
        assert_eq!(bars.data["KW09/2025"]["RSV"], 0.0);
        assert_eq!(bars.submissions("KW08/2025"), 50.0);
        assert_eq!(bars.submissions("KW09/2025"), 60.0);
    }

    #[test]
    fn test_bar_chart_without_week_labels_keys_by_position() {
        let svg = r##"<svg>
            <rect x="80" y="340" width="10" height="20" fill="#1f77b4"/>
            <rect x="95.5" y="350" width="10" height="10" fill="#1f77b4"/>
        </svg>"##;
        let bars = SentinelBarChart::from_svg(svg, "graph.svg").unwrap();
        assert_eq!(bars.weeks, vec!["x=80", "x=95.5"]);
        assert_eq!(bars.viruses, vec!["unknown_#1F77B4"]);
        // no axis ticks: one unit per pixel
        assert_eq!(bars.value("x=80", "unknown_#1F77B4"), 20.0);
        assert_eq!(bars.submissions("x=80"), 0.0);
    }

    #[test]
    fn test_extracted_chart_merges_into_history() {
        let history: SentinelBarChart = serde_json::from_str(
            r#"{"viruses": ["Inf_A"], "weeks": ["KW07/2025", "KW08/2025"],
                "data": {"KW07/2025": {"Inf_A": 2.0}, "KW08/2025": {"Inf_A": 1.0}},
                "einsendungen": {"KW07/2025": 40.0}}"#,
        )
        .unwrap();
        let merged = history.merge(SentinelBarChart::from_svg(BAR_CHART_SVG, "graph.svg").unwrap());
        assert_eq!(merged.weeks, vec!["KW07/2025", "KW08/2025", "KW09/2025"]);
        assert_eq!(merged.value("KW07/2025", "Inf_A"), 2.0);
        assert_eq!(merged.value("KW08/2025", "Inf_A"), 5.0);
        assert_eq!(merged.submissions("KW07/2025"), 40.0);
        assert_eq!(merged.source, "graph.svg");
    }
}
