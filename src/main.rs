mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;

use salud_dash::{DashboardConfig, DashboardState, Selection};

/// Print the patient dashboard (overview, summaries and map points) for a
/// patient records file.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Patient records (.csv, .json or .parquet); overrides the config
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Only map patients from this region
    #[arg(short, long)]
    region: Option<String>,

    /// Emit one JSON document instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load_from_file(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(data) = cli.data {
        config.data.path = data;
    }

    let handle = config.handle();
    let dataset = handle
        .get()
        .with_context(|| format!("loading {}", config.data.path.display()))?;

    let mut state = DashboardState::new(dataset, config.projector());
    if let Some(region) = cli.region {
        let selection = Selection::only(region);
        if !state.options().contains(&selection) {
            warn!("no patients in region '{selection}'");
        }
        state.select(selection);
    }

    if cli.json {
        let doc = report::JsonReport::new(&state, &config);
        println!(
            "{}",
            serde_json::to_string_pretty(&doc).context("serializing report")?
        );
    } else {
        print!("{}", report::render(&state, &config)?);
    }
    Ok(())
}
