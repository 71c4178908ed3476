//! Point Map - headless driver for the point-map engine
//!
//! Loads a dataset (JSON or synthetic), replays a scripted interactive session tick by
//! tick, and logs what the engine did.

mod error;
mod logging;
mod session;
mod settings;

use crate::error::Result;
use crate::session::Session;
use crate::settings::Settings;
use clap::Parser;
use point_map_lib::Dataset;
use point_map_lib::records;
use point_map_lib::synthetic::SyntheticDataset;
use std::sync::Arc;

fn main() {
    let settings = Settings::parse();
    logging::setup_logging();

    if let Err(e) = run(settings) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(settings: Settings) -> Result<()> {
    settings.validate()?;
    let config = settings.engine_config()?;

    let started = instant::Instant::now();
    let dataset = load_dataset(&settings)?;
    tracing::info!(
        points = dataset.len(),
        clusters = dataset.clusters().len(),
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "Dataset loaded"
    );

    if let Some(dir) = &settings.export {
        std::fs::create_dir_all(dir)?;
        let points_path = dir.join("packages.json");
        let clusters_path = dir.join("clusters.json");
        records::save_dataset(&dataset, &points_path, &clusters_path)?;
        tracing::info!(dir = %dir.display(), "Dataset exported");
        return Ok(());
    }

    let json = settings.json;
    let summary = Session::new(dataset, config, settings)?.run();

    tracing::info!(
        ticks = summary.ticks,
        cull_updates = summary.cull_updates,
        cull_throttled = summary.cull_throttled,
        picks = summary.picks,
        picks_throttled = summary.picks_throttled,
        attribute_writes = summary.attribute_writes,
        animations_finished = summary.animations_finished,
        mean_tick_us = summary.mean_tick_us(),
        max_tick_us = summary.max_tick_us as u64,
        "Session finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&summary.to_json())?);
    }
    Ok(())
}

fn load_dataset(settings: &Settings) -> Result<Arc<Dataset>> {
    match &settings.points {
        Some(points) => Ok(records::load_dataset(points, settings.clusters.as_deref())?),
        None => {
            tracing::debug!(
                points = settings.synthetic_points,
                clusters = settings.synthetic_clusters,
                seed = settings.seed,
                "Generating synthetic dataset"
            );
            Ok(SyntheticDataset::new(settings.seed)
                .with_points(settings.synthetic_points)
                .with_clusters(settings.synthetic_clusters)
                .generate()?)
        }
    }
}
