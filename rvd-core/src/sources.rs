//! Static data source configuration.
//!
//! Upstream feeds are fixed public URLs: wastewater figures, SARI CSV files
//! and the sentinel SVG charts. The sentinel JSON datasets and the
//! pre-aggregated SARI documents are derived files produced by the fetch
//! pipeline and served next to the dashboard, so their URLs hang off a
//! configurable base.

use serde::{Deserialize, Serialize};

pub const AGES_BASE: &str = "https://abwasser.ages.at/de/cache/plotly";
pub const SARI_BASE: &str = "https://opendata-files.sozialversicherung.at/sari";

/// Sentinel charts published by the MedUni Wien virology department.
pub const SENTINEL_HEATMAP_URL: &str = "https://viro.meduniwien.ac.at/fileadmin/content/OE/virologie/dokumente/Virus_Epidemiogie/RespiratorischeViren/sentinelHeatmap.svg";
pub const SENTINEL_BAR_CHART_URL: &str = "https://viro.meduniwien.ac.at/fileadmin/content/OE/virologie/dokumente/Virus_Epidemiogie/RespiratorischeViren/SentinelGraph.svg";

/// Public relay used when a direct request fails; the original URL is passed
/// URL-encoded in the `url` query parameter.
pub const CORS_PROXY: &str = "https://api.allorigins.win/raw";

/// Default base for derived datasets (sentinel, pre-aggregated SARI).
pub const DEFAULT_DATA_BASE: &str = "http://localhost:8000/data";

/// The three kinds of surveillance feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFamily {
    Wastewater,
    Sari,
    Sentinel,
}

/// Payload shape of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    PlotlyJson,
    SariCsv,
    SariJson,
    SentinelHeatmapJson,
    SentinelBarChartJson,
    SentinelHeatmapSvg,
    SentinelBarChartSvg,
}

/// One fetchable data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub family: SourceFamily,
    /// Short key, also the output file stem (`sarscov2`, `patient`, ...).
    pub key: String,
    pub url: String,
    pub format: SourceFormat,
}

impl DataSource {
    fn new(family: SourceFamily, key: &str, url: String, format: SourceFormat) -> Self {
        Self {
            family,
            key: key.to_string(),
            url,
            format,
        }
    }
}

/// Wastewater virus load figures: SARS-CoV-2, influenza, RSV.
pub fn wastewater_sources() -> Vec<DataSource> {
    [
        ("sarscov2", "sarscov2_development.json"),
        ("influenza", "influenza_development.json"),
        ("rsv", "rsv_development.json"),
    ]
    .into_iter()
    .map(|(key, file)| {
        DataSource::new(
            SourceFamily::Wastewater,
            key,
            format!("{AGES_BASE}/{file}"),
            SourceFormat::PlotlyJson,
        )
    })
    .collect()
}

/// SARI CSV feeds: by hospital region and by patient residence.
pub fn sari_csv_sources() -> Vec<DataSource> {
    [
        ("krankenanstalt", "SARI_Region_Krankenanstalt_v202307.csv"),
        ("patient", "SARI_Wohnregion_Patient_v202307.csv"),
    ]
    .into_iter()
    .map(|(key, file)| {
        DataSource::new(
            SourceFamily::Sari,
            key,
            format!("{SARI_BASE}/{file}"),
            SourceFormat::SariCsv,
        )
    })
    .collect()
}

/// Pre-aggregated SARI documents under `data_base`.
pub fn sari_json_sources(data_base: &str) -> Vec<DataSource> {
    ["krankenanstalt", "patient"]
        .into_iter()
        .map(|key| {
            DataSource::new(
                SourceFamily::Sari,
                key,
                format!("{}/sari/{key}.json", data_base.trim_end_matches('/')),
                SourceFormat::SariJson,
            )
        })
        .collect()
}

/// The upstream sentinel charts, extracted by the fetch pipeline.
pub fn sentinel_svg_sources() -> Vec<DataSource> {
    vec![
        DataSource::new(
            SourceFamily::Sentinel,
            "heatmap",
            SENTINEL_HEATMAP_URL.to_string(),
            SourceFormat::SentinelHeatmapSvg,
        ),
        DataSource::new(
            SourceFamily::Sentinel,
            "barchart",
            SENTINEL_BAR_CHART_URL.to_string(),
            SourceFormat::SentinelBarChartSvg,
        ),
    ]
}

/// Sentinel heatmap and bar chart datasets extracted earlier, under `data_base`.
pub fn sentinel_sources(data_base: &str) -> Vec<DataSource> {
    let base = data_base.trim_end_matches('/');
    vec![
        DataSource::new(
            SourceFamily::Sentinel,
            "heatmap",
            format!("{base}/sentinel/heatmap.json"),
            SourceFormat::SentinelHeatmapJson,
        ),
        DataSource::new(
            SourceFamily::Sentinel,
            "barchart",
            format!("{base}/sentinel/barchart.json"),
            SourceFormat::SentinelBarChartJson,
        ),
    ]
}

/// `url` routed through the relay at `relay`.
pub fn relay_url(relay: &str, url: &str) -> String {
    format!("{relay}?url={}", urlencoding::encode(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_lists() {
        assert_eq!(wastewater_sources().len(), 3);
        assert_eq!(sari_csv_sources().len(), 2);
        let sentinel = sentinel_sources("http://example.org/data/");
        assert_eq!(sentinel[0].url, "http://example.org/data/sentinel/heatmap.json");
        assert_eq!(sentinel[1].format, SourceFormat::SentinelBarChartJson);
        let upstream = sentinel_svg_sources();
        assert_eq!(upstream[0].key, sentinel[0].key);
        assert!(upstream[1].url.ends_with("/SentinelGraph.svg"));
    }

    #[test]
    fn test_relay_url() {
        assert_eq!(
            relay_url(CORS_PROXY, "https://a.at/x.csv?y=1"),
            "https://api.allorigins.win/raw?url=https%3A%2F%2Fa.at%2Fx.csv%3Fy%3D1"
        );
    }
}
