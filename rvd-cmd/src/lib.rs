//! Command implementations for RVD CLI.
//!
//! Provides subcommands for fetching the surveillance feeds to disk and for
//! rendering dashboard views from a freshly loaded snapshot.

use clap::Subcommand;
use log::info;
use rvd_core::{diagnosis::Diagnosis, sources::DEFAULT_DATA_BASE};
use std::path::PathBuf;

pub mod fetch;
pub mod retrieve;
pub mod snapshot;
pub mod view;

use fetch::{run_fetch, FetchOptions};
use retrieve::http_retriever;
use snapshot::{load_snapshot, Sources};
use view::{render_view, ViewKind, ViewOptions};

#[derive(Subcommand)]
pub enum Command {
    /// Fetch all sources, extract the sentinel charts, and write the derived
    /// datasets plus metadata.json
    Fetch {
        /// Directory to write into (created if missing)
        #[arg(short = 'o', long, default_value = "data")]
        output_dir: PathBuf,

        #[arg(long)]
        skip_wastewater: bool,

        #[arg(long)]
        skip_sari: bool,

        #[arg(long)]
        skip_sentinel: bool,

        /// Do not retry failed requests through the CORS relay
        #[arg(long)]
        no_proxy: bool,
    },

    /// Load every source and print one chart view as JSON
    View {
        #[arg(value_enum)]
        kind: ViewKind,

        /// Base URL of the sentinel and pre-aggregated SARI datasets
        #[arg(long, default_value = DEFAULT_DATA_BASE)]
        data_base: String,

        /// Read SARI from the pre-aggregated JSON instead of the upstream CSV
        #[arg(long)]
        pre_aggregated: bool,

        /// Region code, or ALL / AT for the whole country
        #[arg(short = 'r', long, default_value = "ALL")]
        region: String,

        /// Ward type (Normalstation, Intensivstation) or ALL
        #[arg(short = 'w', long, default_value = "ALL")]
        ward: String,

        /// Diagnosis to include (repeatable); all when omitted
        #[arg(short = 'd', long = "diagnosis")]
        diagnoses: Vec<Diagnosis>,

        /// Index of the first week of the time window
        #[arg(long)]
        from_week: Option<usize>,

        /// Index of the last week of the time window
        #[arg(long)]
        to_week: Option<usize>,

        /// Report rates per 100,000 inhabitants
        #[arg(long)]
        per_100k: bool,

        /// Treatment plant to show (repeatable); all when omitted
        #[arg(short = 'l', long = "location")]
        locations: Vec<String>,

        #[arg(long)]
        no_proxy: bool,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Fetch {
            output_dir,
            skip_wastewater,
            skip_sari,
            skip_sentinel,
            no_proxy,
        } => {
            let retriever = http_retriever(!no_proxy)?;
            let options = FetchOptions {
                skip_wastewater,
                skip_sari,
                skip_sentinel,
            };
            let metadata = run_fetch(&retriever, &output_dir, &options).await?;
            let errors = metadata.error_count();
            if errors > 0 {
                anyhow::bail!("{} source(s) failed, see {}/metadata.json", errors, output_dir.display());
            }
            info!("Fetch complete. Output: {}", output_dir.display());
            Ok(())
        }
        Command::View {
            kind,
            data_base,
            pre_aggregated,
            region,
            ward,
            diagnoses,
            from_week,
            to_week,
            per_100k,
            locations,
            no_proxy,
        } => {
            let retriever = http_retriever(!no_proxy)?;
            let sources = Sources::dashboard(&data_base, pre_aggregated);
            let snapshot = load_snapshot(&retriever, &sources).await?;
            let options = ViewOptions {
                region,
                ward,
                diagnoses,
                from_week,
                to_week,
                per_100k,
                locations,
            };
            let json = render_view(&snapshot, kind, &options)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }
    }
}
