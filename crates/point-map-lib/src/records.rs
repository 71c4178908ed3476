//! JSON dataset records
//!
//! The map pipeline writes two files: a package list with coordinates and cluster
//! assignment, and a cluster list with label, centroid and bounds. Both use camelCase
//! keys. Labels and download counts may be null for clusters the labeling step missed,
//! and a labeled cluster may lack centroid and bounds entirely; those are derived from
//! the cluster's points on load.

use crate::dataset::{Cluster, ClusterId, Dataset, Point, PointId};
use crate::Result;
use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// One entry of `packages.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointRecord {
    pub id: PointId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Weekly downloads, used as weight
    #[serde(default)]
    pub downloads: Option<f64>,
    pub x: f64,
    pub y: f64,
    pub cluster_id: ClusterId,
}

/// One entry of `clusters.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    pub cluster_id: ClusterId,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub centroid_x: Option<f64>,
    #[serde(default)]
    pub centroid_y: Option<f64>,
    #[serde(default)]
    pub downloads: Option<f64>,
    #[serde(default)]
    pub min_x: Option<f64>,
    #[serde(default)]
    pub max_x: Option<f64>,
    #[serde(default)]
    pub min_y: Option<f64>,
    #[serde(default)]
    pub max_y: Option<f64>,
}

impl From<PointRecord> for Point {
    fn from(record: PointRecord) -> Self {
        Self {
            id: record.id,
            x: record.x,
            y: record.y,
            cluster_id: record.cluster_id,
            weight: record.downloads.unwrap_or(0.0),
            name: record.name,
        }
    }
}

impl From<&Point> for PointRecord {
    fn from(point: &Point) -> Self {
        Self {
            id: point.id,
            name: point.name.clone(),
            summary: None,
            downloads: Some(point.weight),
            x: point.x,
            y: point.y,
            cluster_id: point.cluster_id,
        }
    }
}

impl ClusterRecord {
    /// Centroid and bounds, if every coordinate is present
    fn geometry(&self) -> Option<(Coord<f64>, Rect<f64>)> {
        let centroid = Coord {
            x: self.centroid_x?,
            y: self.centroid_y?,
        };
        let bounds = Rect::new(
            Coord {
                x: self.min_x?,
                y: self.min_y?,
            },
            Coord {
                x: self.max_x?,
                y: self.max_y?,
            },
        );
        Some((centroid, bounds))
    }

    /// Convert into a [`Cluster`], deriving missing geometry from `members`
    ///
    /// Returns `None` when the geometry is incomplete and there are no members to
    /// derive it from.
    pub fn into_cluster<'a>(
        self,
        members: impl IntoIterator<Item = &'a Point>,
    ) -> Option<Cluster> {
        let label = self
            .label
            .clone()
            .unwrap_or_else(|| self.cluster_id.to_string());
        match self.geometry() {
            Some((centroid, bounds)) => Some(Cluster {
                id: self.cluster_id,
                label,
                centroid,
                weight: self.downloads.unwrap_or(0.0),
                bounds,
            }),
            None => {
                let mut cluster = Cluster::derive_from_members(self.cluster_id, label, members)?;
                if let Some(downloads) = self.downloads {
                    cluster.weight = downloads;
                }
                Some(cluster)
            }
        }
    }
}

impl From<&Cluster> for ClusterRecord {
    fn from(cluster: &Cluster) -> Self {
        Self {
            cluster_id: cluster.id,
            label: Some(cluster.label.clone()),
            centroid_x: Some(cluster.centroid.x),
            centroid_y: Some(cluster.centroid.y),
            downloads: Some(cluster.weight),
            min_x: Some(cluster.bounds.min().x),
            max_x: Some(cluster.bounds.max().x),
            min_y: Some(cluster.bounds.min().y),
            max_y: Some(cluster.bounds.max().y),
        }
    }
}

pub fn read_points(reader: impl Read) -> Result<Vec<Point>> {
    let records: Vec<PointRecord> = serde_json::from_reader(reader)?;
    Ok(records.into_iter().map(Point::from).collect())
}

/// Read `clusters.json`, completing partial rows from the member `points`
///
/// Rows with neither geometry nor members are skipped.
pub fn read_clusters(reader: impl Read, points: &[Point]) -> Result<Vec<Cluster>> {
    let records: Vec<ClusterRecord> = serde_json::from_reader(reader)?;

    let mut members: HashMap<ClusterId, Vec<&Point>> = HashMap::new();
    for point in points {
        members.entry(point.cluster_id).or_default().push(point);
    }

    Ok(records
        .into_iter()
        .filter_map(|record| {
            let id = record.cluster_id;
            let cluster = record.into_cluster(members.get(&id).into_iter().flatten().copied());
            if cluster.is_none() {
                tracing::warn!(cluster_id = id, "Cluster has neither geometry nor members, skipped");
            }
            cluster
        })
        .collect())
}

pub fn write_points(writer: impl Write, points: &[Point]) -> Result<()> {
    let records: Vec<PointRecord> = points.iter().map(PointRecord::from).collect();
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

pub fn write_clusters(writer: impl Write, clusters: &[Cluster]) -> Result<()> {
    let records: Vec<ClusterRecord> = clusters.iter().map(ClusterRecord::from).collect();
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

/// Load a dataset from `packages.json` and, if given, `clusters.json`
///
/// Without a cluster file, cluster metadata is derived from the points.
pub fn load_dataset(points_path: &Path, clusters_path: Option<&Path>) -> Result<Arc<Dataset>> {
    #[cfg(feature = "profiling")]
    profiling::scope!("records::load_dataset");

    let points = read_points(BufReader::new(std::fs::File::open(points_path)?))?;
    tracing::debug!(path = %points_path.display(), points = points.len(), "Read points");

    match clusters_path {
        Some(path) => {
            let clusters = read_clusters(BufReader::new(std::fs::File::open(path)?), &points)?;
            tracing::debug!(path = %path.display(), clusters = clusters.len(), "Read clusters");
            Dataset::new(points, clusters)
        }
        None => Dataset::with_derived_clusters(points, &Default::default()),
    }
}

/// Write both files of a dataset
pub fn save_dataset(dataset: &Dataset, points_path: &Path, clusters_path: &Path) -> Result<()> {
    let mut points_out = BufWriter::new(std::fs::File::create(points_path)?);
    write_points(&mut points_out, dataset.points())?;
    points_out.flush()?;

    let mut clusters_out = BufWriter::new(std::fs::File::create(clusters_path)?);
    write_clusters(&mut clusters_out, dataset.clusters())?;
    clusters_out.flush()?;
    Ok(())
}
