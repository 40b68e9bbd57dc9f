//! Flat scan of the SVG elements the sentinel charts are drawn with.
//!
//! The charts are plain SVG: `<text>` labels, `<rect>` cells and bars, one
//! `<polygon>` for the submissions area and a `<linearGradient>` colour bar.
//! Only positions, fills and text content are kept; nesting is ignored.

use crate::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;

/// Id of the colour bar gradient in the heatmap chart.
pub const GRADIENT_ID: &str = "gradient1";

#[derive(Debug, Clone, PartialEq)]
pub struct SvgText {
    pub x: f64,
    pub y: f64,
    pub content: String,
    pub transform: String,
}

impl SvgText {
    /// The label as an integer, when it is only digits (axis ticks).
    pub fn integer(&self) -> Option<u32> {
        if !self.content.is_empty() && self.content.chars().all(|c| c.is_ascii_digit()) {
            self.content.parse().ok()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgPolygon {
    pub fill: String,
    pub points: Vec<(f64, f64)>,
}

/// A colour bar stop; `offset` is in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: String,
}

/// The elements of one chart, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SvgChart {
    pub texts: Vec<SvgText>,
    pub rects: Vec<SvgRect>,
    pub polygons: Vec<SvgPolygon>,
    /// Stops of the [`GRADIENT_ID`] gradient, sorted by offset.
    pub gradient: Vec<GradientStop>,
}

fn attributes(element: &BytesStart) -> HashMap<String, String> {
    element
        .attributes()
        .flatten()
        .filter_map(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}

fn number(attrs: &HashMap<String, String>, key: &str) -> Option<f64> {
    match attrs.get(key) {
        Some(value) => value.trim().parse().ok(),
        None => Some(0.0),
    }
}

fn text_attr(attrs: &HashMap<String, String>, key: &str) -> String {
    attrs.get(key).cloned().unwrap_or_default()
}

/// Rectangles with relative (`%`) or unreadable geometry are skipped.
fn rect(attrs: &HashMap<String, String>) -> Option<SvgRect> {
    if ["width", "height"]
        .iter()
        .any(|k| attrs.get(*k).is_some_and(|v| v.contains('%')))
    {
        return None;
    }
    Some(SvgRect {
        x: number(attrs, "x")?,
        y: number(attrs, "y")?,
        width: number(attrs, "width")?,
        height: number(attrs, "height")?,
        fill: text_attr(attrs, "fill"),
    })
}

/// `"x1,y1 x2,y2 ..."`; malformed pairs are skipped.
fn points(value: &str) -> Vec<(f64, f64)> {
    value
        .split_whitespace()
        .filter_map(|pair| {
            let (x, y) = pair.split_once(',')?;
            Some((x.parse().ok()?, y.parse().ok()?))
        })
        .collect()
}

/// Stop colour from `style="stop-color:#xxxxxx;..."` or a `stop-color` attribute.
fn stop(attrs: &HashMap<String, String>) -> Option<GradientStop> {
    let offset = attrs.get("offset")?.trim().trim_end_matches('%').parse().ok()?;
    let from_style = attrs.get("style").and_then(|style| {
        style
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .find(|(name, _)| name.trim() == "stop-color")
            .map(|(_, value)| value.trim().to_string())
    });
    let color = from_style.or_else(|| attrs.get("stop-color").map(|c| c.trim().to_string()))?;
    Some(GradientStop {
        offset,
        color: color.to_uppercase(),
    })
}

impl SvgChart {
    pub fn parse(svg: &str) -> Result<Self> {
        let mut reader = Reader::from_str(svg);

        let mut chart = SvgChart::default();
        let mut open_text: Option<SvgText> = None;
        let mut in_gradient = false;

        loop {
            let event = reader.read_event()?;
            let (element, is_empty) = match &event {
                Event::Start(e) => (Some(e), false),
                Event::Empty(e) => (Some(e), true),
                _ => (None, false),
            };
            if let Some(element) = element {
                let attrs = attributes(element);
                match element.local_name().as_ref() {
                    b"text" if !is_empty => {
                        open_text = Some(SvgText {
                            x: number(&attrs, "x").unwrap_or(0.0),
                            y: number(&attrs, "y").unwrap_or(0.0),
                            content: String::new(),
                            transform: text_attr(&attrs, "transform"),
                        });
                    }
                    b"rect" => chart.rects.extend(rect(&attrs)),
                    b"polygon" => chart.polygons.push(SvgPolygon {
                        fill: text_attr(&attrs, "fill"),
                        points: points(&text_attr(&attrs, "points")),
                    }),
                    b"linearGradient" => {
                        in_gradient = !is_empty && attrs.get("id").map(String::as_str) == Some(GRADIENT_ID);
                    }
                    b"stop" if in_gradient => chart.gradient.extend(stop(&attrs)),
                    _ => {}
                }
                continue;
            }
            match event {
                Event::Text(t) => {
                    if let Some(text) = open_text.as_mut() {
                        text.content.push_str(&t.unescape()?);
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"text" => {
                        if let Some(mut text) = open_text.take() {
                            text.content = text.content.trim().to_string();
                            if !text.content.is_empty() {
                                chart.texts.push(text);
                            }
                        }
                    }
                    b"linearGradient" => in_gradient = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }
        chart.gradient.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        Ok(chart)
    }
}

/// Distinct values in ascending order.
pub fn distinct_sorted(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.into_iter().collect();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

/// Round to one decimal.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="800" height="400">
  <defs>
    <linearGradient id="gradient1" x1="0%" y1="0%" x2="0%" y2="100%">
      <stop offset="100%" style="stop-color:#ffff00;stop-opacity:1"/>
      <stop offset="0%" style="stop-color:#8b0000"/>
    </linearGradient>
    <linearGradient id="other">
      <stop offset="50%" stop-color="#000000"/>
    </linearGradient>
  </defs>
  <rect x="0" y="0" width="100%" height="100%" fill="white"/>
  <rect x="80" y="100.5" width="10" height="20" fill="#abcdef"></rect>
  <polygon fill="#e4e4e4" points="80,360 80,300 bad 95,280"/>
  <text x="20" y="110">Covid<tspan> 19</tspan></text>
  <text x="82" y="380" transform="rotate(-90 82 380)">KW08/2025</text>
  <text x="750" y="90">120</text>
  <text x="10" y="10">  </text>
</svg>"##;

    #[test]
    fn test_parse_chart_elements() {
        let chart = SvgChart::parse(CHART).unwrap();

        assert_eq!(chart.rects.len(), 1);
        assert_eq!(chart.rects[0].y, 100.5);
        assert_eq!(chart.rects[0].fill, "#abcdef");

        assert_eq!(chart.polygons.len(), 1);
        assert_eq!(chart.polygons[0].points, vec![(80.0, 360.0), (80.0, 300.0), (95.0, 280.0)]);

        let contents: Vec<&str> = chart.texts.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["Covid 19", "KW08/2025", "120"]);
        assert!(chart.texts[1].transform.contains("rotate"));
        assert_eq!(chart.texts[2].integer(), Some(120));
        assert_eq!(chart.texts[0].integer(), None);
    }

    #[test]
    fn test_gradient_stops_sorted_and_scoped() {
        let chart = SvgChart::parse(CHART).unwrap();
        assert_eq!(
            chart.gradient,
            vec![
                GradientStop {
                    offset: 0.0,
                    color: "#8B0000".into()
                },
                GradientStop {
                    offset: 100.0,
                    color: "#FFFF00".into()
                },
            ]
        );
    }

    #[test]
    fn test_malformed_svg_is_an_error() {
        assert!(SvgChart::parse("<svg><text>open</svg>").is_err());
    }

    #[test]
    fn test_helpers() {
        assert_eq!(distinct_sorted([3.0, 1.0, 3.0, 2.5]), vec![1.0, 2.5, 3.0]);
        assert_eq!(round1(2.449), 2.4);
        assert_eq!(round1(7.25 / 0.5), 14.5);
    }
}
