//! Fetch pipeline: download every source, convert it, and write the derived
//! datasets plus a `metadata.json` report to an output directory. SARI CSV
//! becomes JSON documents and the sentinel SVG charts are extracted into
//! datasets.
//!
//! Layout written under the output directory:
//!
//! ```text
//! wastewater/{sarscov2,influenza,rsv}.json   figure payloads as fetched
//! sari/{krankenanstalt,patient}.json         CSV converted to JSON documents
//! sentinel/{heatmap,barchart}.json           merged with the previous files
//! metadata.json                              per-source status
//! ```

use crate::retrieve::Retriever;
use chrono::Local;
use log::{info, warn};
use rvd_core::{
    error::{Result, RvdError},
    sari::{parse_delimited, CsvSchema, SariDocument},
    sentinel::{SentinelBarChart, SentinelHeatmap},
    sources::{
        sari_csv_sources, sentinel_svg_sources, wastewater_sources, DataSource, SourceFamily,
        SourceFormat,
    },
};
use rvd_utils::dates::format_timestamp;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Which families to fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub skip_wastewater: bool,
    pub skip_sari: bool,
    pub skip_sentinel: bool,
}

/// Outcome of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceStatus {
    Ok {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weeks: Option<usize>,
    },
    Error {
        error: String,
    },
}

impl SourceStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SourceStatus::Error { .. })
    }
}

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub last_updated: String,
    pub sources: BTreeMap<SourceFamily, BTreeMap<String, SourceStatus>>,
}

impl Metadata {
    pub fn error_count(&self) -> usize {
        self.sources
            .values()
            .flat_map(BTreeMap::values)
            .filter(|s| s.is_error())
            .count()
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// The previously written dataset, if there is a readable one.
fn read_existing<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", path.display(), e);
            None
        }
    }
}

fn record(results: &mut BTreeMap<String, SourceStatus>, key: &str, outcome: Result<SourceStatus>) {
    let status = match outcome {
        Ok(status) => {
            info!("  {}: ok", key);
            status
        }
        Err(e) => {
            warn!("  {}: {}", key, e);
            SourceStatus::Error {
                error: e.to_string(),
            }
        }
    };
    results.insert(key.to_string(), status);
}

async fn fetch_wastewater_source<R: Retriever>(
    retriever: &R,
    source: &DataSource,
    dir: &Path,
) -> Result<SourceStatus> {
    let payload: serde_json::Value = retriever.fetch_json(&source.url).await?;
    let path = dir.join(format!("{}.json", source.key));
    write_json(&path, &payload)?;
    Ok(SourceStatus::Ok {
        file: Some(path.display().to_string()),
        rows: None,
        weeks: None,
    })
}

async fn fetch_wastewater<R: Retriever>(retriever: &R, output_dir: &Path) -> BTreeMap<String, SourceStatus> {
    let dir = output_dir.join("wastewater");
    let mut results = BTreeMap::new();
    for source in wastewater_sources() {
        info!("Fetching wastewater {}", source.key);
        let outcome = fetch_wastewater_source(retriever, &source, &dir).await;
        record(&mut results, &source.key, outcome);
    }
    results
}

async fn fetch_sari_source<R: Retriever>(
    retriever: &R,
    source: &DataSource,
    dir: &Path,
    fetched_at: &str,
) -> Result<SourceStatus> {
    let text = retriever.fetch_text(&source.url).await?;
    let table = parse_delimited(&text, &CsvSchema::SARI);
    if table.records.is_empty() {
        return Err(RvdError::EmptyFeed(source.url.clone()));
    }
    let description = format!("SARI {} data", source.key);
    let document = SariDocument::from_table(&source.url, &description, fetched_at.to_string(), table);
    let rows = document.row_count;
    write_json(&dir.join(format!("{}.json", source.key)), &document)?;
    Ok(SourceStatus::Ok {
        file: None,
        rows: Some(rows),
        weeks: None,
    })
}

async fn fetch_sari<R: Retriever>(retriever: &R, output_dir: &Path, fetched_at: &str) -> BTreeMap<String, SourceStatus> {
    let dir = output_dir.join("sari");
    let mut results = BTreeMap::new();
    for source in sari_csv_sources() {
        info!("Fetching SARI {}", source.key);
        let outcome = fetch_sari_source(retriever, &source, &dir, fetched_at).await;
        record(&mut results, &source.key, outcome);
    }
    results
}

async fn fetch_sentinel_heatmap<R: Retriever>(retriever: &R, source: &DataSource, path: &Path) -> Result<SourceStatus> {
    let svg = retriever.fetch_text(&source.url).await?;
    let newer = SentinelHeatmap::from_svg(&svg, &source.url)?;
    info!("  heatmap: {} viruses, {} weeks extracted", newer.viruses.len(), newer.weeks.len());
    let merged = match read_existing::<SentinelHeatmap>(path) {
        Some(existing) => existing.merge(newer),
        None => SentinelHeatmap::default().merge(newer),
    };
    write_json(path, &merged)?;
    Ok(SourceStatus::Ok {
        file: None,
        rows: None,
        weeks: Some(merged.weeks.len()),
    })
}

async fn fetch_sentinel_bars<R: Retriever>(retriever: &R, source: &DataSource, path: &Path) -> Result<SourceStatus> {
    let svg = retriever.fetch_text(&source.url).await?;
    let newer = SentinelBarChart::from_svg(&svg, &source.url)?;
    info!("  bar chart: {} weeks, {} submission points extracted", newer.weeks.len(), newer.einsendungen.len());
    let merged = match read_existing::<SentinelBarChart>(path) {
        Some(existing) => existing.merge(newer),
        None => SentinelBarChart::default().merge(newer),
    };
    write_json(path, &merged)?;
    Ok(SourceStatus::Ok {
        file: None,
        rows: None,
        weeks: Some(merged.weeks.len()),
    })
}

async fn fetch_sentinel<R: Retriever>(retriever: &R, output_dir: &Path) -> BTreeMap<String, SourceStatus> {
    let dir = output_dir.join("sentinel");
    let mut results = BTreeMap::new();
    for source in sentinel_svg_sources() {
        info!("Fetching sentinel {}", source.key);
        let path = dir.join(format!("{}.json", source.key));
        let outcome = match source.format {
            SourceFormat::SentinelBarChartSvg => {
                fetch_sentinel_bars(retriever, &source, &path).await
            }
            _ => fetch_sentinel_heatmap(retriever, &source, &path).await,
        };
        record(&mut results, &source.key, outcome);
    }
    results
}

/// Run the pipeline and write `metadata.json`. Families run concurrently;
/// a failed source is recorded in the metadata, never aborts the others.
pub async fn run_fetch<R: Retriever>(retriever: &R, output_dir: &Path, options: &FetchOptions) -> Result<Metadata> {
    fs::create_dir_all(output_dir)?;
    let fetched_at = format_timestamp(&Local::now().naive_local());

    let (wastewater, sari, sentinel) = futures::join!(
        async {
            if options.skip_wastewater {
                None
            } else {
                Some(fetch_wastewater(retriever, output_dir).await)
            }
        },
        async {
            if options.skip_sari {
                None
            } else {
                Some(fetch_sari(retriever, output_dir, &fetched_at).await)
            }
        },
        async {
            if options.skip_sentinel {
                None
            } else {
                Some(fetch_sentinel(retriever, output_dir).await)
            }
        },
    );

    let mut sources = BTreeMap::new();
    for (family, results) in [
        (SourceFamily::Wastewater, wastewater),
        (SourceFamily::Sari, sari),
        (SourceFamily::Sentinel, sentinel),
    ] {
        if let Some(results) = results {
            sources.insert(family, results);
        }
    }
    let metadata = Metadata {
        last_updated: fetched_at,
        sources,
    };
    let path: PathBuf = output_dir.join("metadata.json");
    write_json(&path, &metadata)?;
    info!("Metadata saved: {}", path.display());
    Ok(metadata)
}
