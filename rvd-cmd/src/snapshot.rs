//! Concurrent loading of every dashboard source into one immutable snapshot.

use crate::retrieve::Retriever;
use futures::future::join_all;
use indexmap::IndexMap;
use log::{info, warn};
use rvd_core::{
    error::{Result, RvdError},
    sari::{parse_pre_aggregated, parse_sari_csv, SariRecord},
    sentinel::{SentinelBarChart, SentinelHeatmap},
    sources::{
        sari_csv_sources, sari_json_sources, sentinel_sources, wastewater_sources, DataSource,
        SourceFormat,
    },
    trace::PlotlyFigure,
};

/// SARI feed keyed by hospital region; carries the ward type.
pub const HOSPITAL_FEED: &str = "krankenanstalt";
/// SARI feed keyed by patient residence; carries age group, gender and population.
pub const PATIENT_FEED: &str = "patient";

/// The set of sources one load cycle fetches.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub sources: Vec<DataSource>,
}

impl Sources {
    /// All seven dashboard sources. SARI comes from the upstream CSV feeds,
    /// or from pre-aggregated JSON under `data_base` when `pre_aggregated`.
    pub fn dashboard(data_base: &str, pre_aggregated: bool) -> Self {
        let mut sources = wastewater_sources();
        if pre_aggregated {
            sources.extend(sari_json_sources(data_base));
        } else {
            sources.extend(sari_csv_sources());
        }
        sources.extend(sentinel_sources(data_base));
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Everything the dashboard renders from. Built once per load cycle and
/// only read afterwards; failed sources are simply absent.
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    /// Wastewater figures keyed by virus (`sarscov2`, `influenza`, `rsv`).
    pub wastewater: IndexMap<String, PlotlyFigure>,
    /// SARI records keyed by feed.
    pub sari: IndexMap<String, Vec<SariRecord>>,
    pub sentinel_heatmap: Option<SentinelHeatmap>,
    pub sentinel_bars: Option<SentinelBarChart>,
    /// Keys of the sources that failed to load.
    pub failed: Vec<String>,
}

impl DashboardSnapshot {
    pub fn sari_records(&self, feed: &str) -> &[SariRecord] {
        self.sari.get(feed).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of sources that loaded.
    pub fn loaded(&self) -> usize {
        self.wastewater.len()
            + self.sari.len()
            + usize::from(self.sentinel_heatmap.is_some())
            + usize::from(self.sentinel_bars.is_some())
    }
}

enum Payload {
    Figure(PlotlyFigure),
    Sari(Vec<SariRecord>),
    Heatmap(SentinelHeatmap),
    Bars(SentinelBarChart),
}

async fn load_source<R: Retriever>(retriever: &R, source: &DataSource) -> Result<Payload> {
    let payload = match source.format {
        SourceFormat::PlotlyJson => Payload::Figure(retriever.fetch_json(&source.url).await?),
        SourceFormat::SariCsv => {
            Payload::Sari(parse_sari_csv(&retriever.fetch_text(&source.url).await?))
        }
        SourceFormat::SariJson => {
            Payload::Sari(parse_pre_aggregated(&retriever.fetch_text(&source.url).await?)?)
        }
        SourceFormat::SentinelHeatmapJson => {
            Payload::Heatmap(retriever.fetch_json(&source.url).await?)
        }
        SourceFormat::SentinelBarChartJson => {
            Payload::Bars(retriever.fetch_json(&source.url).await?)
        }
        SourceFormat::SentinelHeatmapSvg => Payload::Heatmap(SentinelHeatmap::from_svg(
            &retriever.fetch_text(&source.url).await?,
            &source.url,
        )?),
        SourceFormat::SentinelBarChartSvg => Payload::Bars(SentinelBarChart::from_svg(
            &retriever.fetch_text(&source.url).await?,
            &source.url,
        )?),
    };
    Ok(payload)
}

/// Fetch every source concurrently and assemble the snapshot.
///
/// A failing source is logged and left out. Only when no source at all
/// loads is the cycle an error.
pub async fn load_snapshot<R: Retriever>(retriever: &R, sources: &Sources) -> Result<DashboardSnapshot> {
    let results = join_all(
        sources
            .sources
            .iter()
            .map(|source| async move { (source, load_source(retriever, source).await) }),
    )
    .await;

    let mut snapshot = DashboardSnapshot::default();
    for (source, result) in results {
        match result {
            Ok(payload) => {
                info!("Loaded {:?} source {}", source.family, source.key);
                match payload {
                    Payload::Figure(figure) => {
                        snapshot.wastewater.insert(source.key.clone(), figure);
                    }
                    Payload::Sari(records) => {
                        snapshot.sari.insert(source.key.clone(), records);
                    }
                    Payload::Heatmap(heatmap) => snapshot.sentinel_heatmap = Some(heatmap),
                    Payload::Bars(bars) => snapshot.sentinel_bars = Some(bars),
                }
            }
            Err(e) => {
                warn!("Failed to load {:?} source {}: {}", source.family, source.key, e);
                snapshot.failed.push(source.key.clone());
            }
        }
    }

    if snapshot.loaded() == 0 {
        return Err(RvdError::AllSourcesFailed {
            attempted: sources.len(),
        });
    }
    info!(
        "Snapshot loaded: {} of {} sources",
        snapshot.loaded(),
        sources.len()
    );
    Ok(snapshot)
}
