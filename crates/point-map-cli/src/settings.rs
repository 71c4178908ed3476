use crate::error::{CliError, Result};
use clap::Parser;
use point_map_lib::{CellSizePolicy, EngineConfig};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Point Map - Replays an interactive session against the point-map engine, headless
pub struct Settings {
    /// Points file (packages.json). A synthetic dataset is generated when omitted
    #[clap(short, long, value_name = "FILE")]
    pub points: Option<PathBuf>,

    /// Clusters file (clusters.json). Derived from the points when omitted
    #[clap(short, long, value_name = "FILE", requires = "points")]
    pub clusters: Option<PathBuf>,

    /// Number of synthetic points
    #[clap(long, default_value = "10000")]
    pub synthetic_points: usize,

    /// Number of synthetic clusters
    #[clap(long, default_value = "24")]
    pub synthetic_clusters: usize,

    /// Seed for the synthetic dataset and the scripted pointer path
    #[clap(long, default_value = "42")]
    pub seed: u64,

    /// Write the dataset as packages.json + clusters.json into this directory and exit
    #[clap(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Ticks to simulate
    #[clap(short, long, default_value = "600")]
    pub ticks: u32,

    /// Simulated time between ticks in milliseconds
    #[clap(long, default_value = "16.0")]
    pub tick_ms: f64,

    /// Ticks before the camera becomes available
    #[clap(long, default_value = "3")]
    pub camera_delay_ticks: u32,

    /// Viewport width in pixels
    #[clap(long, default_value = "1280")]
    pub width: u32,

    /// Viewport height in pixels
    #[clap(long, default_value = "720")]
    pub height: u32,

    /// Fixed grid cell size in world units (overrides --cell-resolution)
    #[clap(long)]
    pub cell_size: Option<f64>,

    /// Grid cells along the longest dataset axis
    #[clap(long, default_value = "64")]
    pub cell_resolution: u32,

    /// Minimum interval between viewport updates in milliseconds
    #[clap(long, default_value = "100")]
    pub cull_throttle_ms: f64,

    /// Pick radius in pixels
    #[clap(long, default_value = "8")]
    pub pick_radius_px: f64,

    /// Highlight lifetime in milliseconds
    #[clap(long, default_value = "2000")]
    pub highlight_ms: f64,

    /// Default camera animation duration in milliseconds
    #[clap(long, default_value = "1000")]
    pub animation_ms: f64,

    /// Zoom from which individual point labels are shown
    #[clap(long, default_value = "4.0")]
    pub label_zoom: f64,

    /// Log a tick report every N ticks (0 disables)
    #[clap(long, default_value = "60")]
    pub report_every: u32,

    /// Print the session summary as JSON on stdout
    #[clap(long, default_value = "false")]
    pub json: bool,
}

impl Settings {
    /// Engine configuration derived from the command line
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::default();
        config.cell_size = match self.cell_size {
            Some(size) => CellSizePolicy::Fixed(size),
            None => CellSizePolicy::TargetResolution(self.cell_resolution),
        };
        config.culler.throttle_ms = self.cull_throttle_ms;
        config.picking.pixel_radius = self.pick_radius_px;
        config.highlight.duration_ms = self.highlight_ms;
        config.animation.default_duration_ms = self.animation_ms;
        config.lod.label_zoom_threshold = self.label_zoom;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CliError::InvalidArgs(
                "viewport width and height must be non-zero".to_string(),
            ));
        }
        if !(self.tick_ms.is_finite() && self.tick_ms > 0.0) {
            return Err(CliError::InvalidArgs(format!(
                "tick interval must be positive, got {}",
                self.tick_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_map_to_engine_defaults() {
        let settings = Settings::parse_from(["point-map"]);
        let config = settings.engine_config().unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::parse_from([
            "point-map",
            "--cell-size",
            "2.5",
            "--label-zoom",
            "6",
            "--cull-throttle-ms",
            "50",
        ]);
        let config = settings.engine_config().unwrap();
        assert_eq!(config.cell_size, CellSizePolicy::Fixed(2.5));
        assert_eq!(config.lod.label_zoom_threshold, 6.0);
        assert_eq!(config.culler.throttle_ms, 50.0);
    }

    #[test]
    fn test_invalid_values() {
        let settings = Settings::parse_from(["point-map", "--highlight-ms", "0"]);
        assert!(matches!(settings.engine_config(), Err(CliError::Engine(_))));

        let settings = Settings::parse_from(["point-map", "--width", "0"]);
        assert!(matches!(settings.validate(), Err(CliError::InvalidArgs(_))));
    }

    #[test]
    fn test_clusters_require_points() {
        assert!(Settings::try_parse_from(["point-map", "--clusters", "c.json"]).is_err());
    }
}
