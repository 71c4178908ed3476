//! Deterministic synthetic datasets
//!
//! Clustered points around centers laid out on a ring, plus a share of unclustered
//! noise points in cluster `-1`. The same seed always yields the same dataset, which
//! keeps benchmarks and the headless driver reproducible.

use crate::dataset::{ClusterId, Dataset, Point, PointId};
use crate::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::collections::HashMap;
use std::sync::Arc;

/// Cluster id used for points that belong to no cluster
pub const NOISE_CLUSTER: ClusterId = -1;

/// Builder for a synthetic dataset
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    seed: u64,
    points: usize,
    clusters: usize,
    spread: f64,
    noise_fraction: f64,
}

impl SyntheticDataset {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            points: 10_000,
            clusters: 24,
            spread: 50.0,
            noise_fraction: 0.05,
        }
    }

    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    pub fn with_clusters(mut self, clusters: usize) -> Self {
        self.clusters = clusters.max(1);
        self
    }

    /// Half-width of the square the dataset roughly occupies
    pub fn with_spread(mut self, spread: f64) -> Self {
        self.spread = spread;
        self
    }

    /// Share of points placed uniformly in cluster `-1`
    pub fn with_noise_fraction(mut self, fraction: f64) -> Self {
        self.noise_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Generate the points only
    pub fn generate_points(&self) -> Vec<Point> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let ring = self.spread * 0.6;
        let sigma = self.spread / (self.clusters as f64).sqrt() * 0.25;

        let centers: Vec<(f64, f64)> = (0..self.clusters)
            .map(|i| {
                let angle = i as f64 / self.clusters as f64 * std::f64::consts::TAU;
                let radius = ring * rng.gen_range(0.5..=1.0f64);
                (radius * angle.cos(), radius * angle.sin())
            })
            .collect();

        (0..self.points)
            .map(|i| {
                let id = i as PointId;
                // Skewed popularity: most points are light, a few are heavy
                let weight = (rng.gen_range(0.0..1.0f64).powi(4) * 1_000_000.0).round();

                let point = if rng.gen_range(0.0..1.0f64) < self.noise_fraction {
                    let x = rng.gen_range(-1.0..=1.0f64) * self.spread;
                    let y = rng.gen_range(-1.0..=1.0f64) * self.spread;
                    Point::new(id, x, y, NOISE_CLUSTER, weight)
                } else {
                    let cluster = rng.gen_range(0..self.clusters);
                    let (cx, cy) = centers[cluster];
                    let dx: f64 = rng.sample(StandardNormal);
                    let dy: f64 = rng.sample(StandardNormal);
                    Point::new(id, cx + dx * sigma, cy + dy * sigma, cluster as ClusterId, weight)
                };
                point.with_name(format!("package-{i}"))
            })
            .collect()
    }

    /// Generate points and derive their clusters
    pub fn generate(&self) -> Result<Arc<Dataset>> {
        let points = self.generate_points();
        let labels: HashMap<ClusterId, String> = (0..self.clusters)
            .map(|c| (c as ClusterId, format!("Cluster {c}")))
            .chain(std::iter::once((NOISE_CLUSTER, "Unclustered".to_string())))
            .collect();
        Dataset::with_derived_clusters(points, &labels)
    }
}
