//! Dataset storage module
//!
//! This module provides the immutable [`Point`] and [`Cluster`] arrays together with
//! the lookups derived from them at load time (id to index, cluster membership).

use crate::{EngineError, Result};
use geo::{Coord, Rect};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Stable, unique identifier of a point
pub type PointId = u32;

/// Stable, unique identifier of a cluster (`-1` is the noise cluster)
pub type ClusterId = i32;

/// A single visualized entity
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub id: PointId,
    pub x: f64,
    pub y: f64,
    pub cluster_id: ClusterId,
    /// Popularity, used to rank label candidates
    pub weight: f64,
    /// Display name, if the loader provided one
    pub name: Option<String>,
}

/// A labeled group of points
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    pub label: String,
    pub centroid: Coord<f64>,
    pub weight: f64,
    /// Axis-aligned bounds over all member points
    pub bounds: Rect<f64>,
}

impl Point {
    /// Create a point without a display name
    pub fn new(id: PointId, x: f64, y: f64, cluster_id: ClusterId, weight: f64) -> Self {
        Self {
            id,
            x,
            y,
            cluster_id,
            weight,
            name: None,
        }
    }

    /// Attach a display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

impl Cluster {
    /// Derive cluster metadata from its members
    ///
    /// The centroid is the mean member position, the weight is the summed member
    /// weight and the bounds cover every member. Returns `None` for an empty slice.
    pub fn derive_from_members<'a>(
        id: ClusterId,
        label: impl Into<String>,
        members: impl IntoIterator<Item = &'a Point>,
    ) -> Option<Self> {
        let mut count = 0usize;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut weight = 0.0;
        let mut min = Coord {
            x: f64::INFINITY,
            y: f64::INFINITY,
        };
        let mut max = Coord {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        };

        for point in members {
            count += 1;
            sum_x += point.x;
            sum_y += point.y;
            weight += point.weight;
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }

        if count == 0 {
            return None;
        }

        Some(Self {
            id,
            label: label.into(),
            centroid: Coord {
                x: sum_x / count as f64,
                y: sum_y / count as f64,
            },
            weight,
            bounds: Rect::new(min, max),
        })
    }
}

/// The full point and cluster set, loaded atomically and immutable afterwards
#[derive(Debug, Clone)]
pub struct Dataset {
    points: Vec<Point>,
    clusters: Vec<Cluster>,
    /// Cluster id -> position in `clusters`
    cluster_lookup: HashMap<ClusterId, usize>,
    /// Point id -> position in `points`
    point_lookup: HashMap<PointId, usize>,
    /// Cluster id -> indices of member points, ascending
    members: HashMap<ClusterId, Vec<usize>>,
    /// Bounds over all points (None if empty)
    bounds: Option<Rect<f64>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Dataset {
    /// Build a dataset from loader output
    ///
    /// Point and cluster ids must be unique. Every point must reference an existing
    /// cluster; this is the loader's guarantee and is only checked in debug builds.
    pub fn new(points: Vec<Point>, clusters: Vec<Cluster>) -> Result<Arc<Self>> {
        #[cfg(feature = "profiling")]
        profiling::scope!("dataset::new");

        let mut cluster_lookup = HashMap::with_capacity(clusters.len());
        for (i, cluster) in clusters.iter().enumerate() {
            if cluster_lookup.insert(cluster.id, i).is_some() {
                return Err(EngineError::DuplicateClusterId(cluster.id));
            }
        }

        let mut point_lookup = HashMap::with_capacity(points.len());
        let mut members: HashMap<ClusterId, Vec<usize>> = HashMap::new();
        let mut bounds: Option<Rect<f64>> = None;

        for (i, point) in points.iter().enumerate() {
            if point_lookup.insert(point.id, i).is_some() {
                return Err(EngineError::DuplicatePointId(point.id));
            }
            debug_assert!(
                cluster_lookup.contains_key(&point.cluster_id),
                "point {} references unknown cluster {}",
                point.id,
                point.cluster_id
            );
            members.entry(point.cluster_id).or_default().push(i);

            bounds = Some(match bounds {
                Some(b) => Rect::new(
                    Coord {
                        x: b.min().x.min(point.x),
                        y: b.min().y.min(point.y),
                    },
                    Coord {
                        x: b.max().x.max(point.x),
                        y: b.max().y.max(point.y),
                    },
                ),
                None => Rect::new(point.coord(), point.coord()),
            });
        }

        tracing::debug!(
            points = points.len(),
            clusters = clusters.len(),
            "Dataset loaded"
        );

        Ok(Arc::new(Self {
            points,
            clusters,
            cluster_lookup,
            point_lookup,
            members,
            bounds,
        }))
    }

    /// Build a dataset whose clusters are derived from the points themselves
    ///
    /// `labels` supplies cluster labels; clusters without an entry are labeled with
    /// their id. Clusters are ordered by id.
    pub fn with_derived_clusters(
        points: Vec<Point>,
        labels: &HashMap<ClusterId, String>,
    ) -> Result<Arc<Self>> {
        let mut grouped: BTreeMap<ClusterId, Vec<&Point>> = BTreeMap::new();
        for point in &points {
            grouped.entry(point.cluster_id).or_default().push(point);
        }

        let clusters: Vec<Cluster> = grouped
            .into_iter()
            .filter_map(|(id, members)| {
                let label = labels.get(&id).cloned().unwrap_or_else(|| id.to_string());
                Cluster::derive_from_members(id, label, members)
            })
            .collect();

        Self::new(points, clusters)
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    #[inline]
    pub fn point(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    /// Index of the point with the given id
    #[inline]
    pub fn point_index(&self, id: PointId) -> Option<usize> {
        self.point_lookup.get(&id).copied()
    }

    #[inline]
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.cluster_lookup.get(&id).map(|&i| &self.clusters[i])
    }

    /// Indices of the points belonging to a cluster (empty if unknown)
    #[inline]
    pub fn members_of(&self, id: ClusterId) -> &[usize] {
        self.members.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bounds over all points, `None` for an empty dataset
    #[inline]
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterator over all cluster ids, in cluster array order
    pub fn cluster_ids(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.clusters.iter().map(|c| c.id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two clusters of three points each, side by side
    pub(crate) fn two_cluster_dataset() -> Arc<Dataset> {
        let points = vec![
            Point::new(10, 0.0, 0.0, 1, 5.0),
            Point::new(11, 1.0, 0.0, 1, 3.0),
            Point::new(12, 0.0, 1.0, 1, 1.0),
            Point::new(20, 10.0, 10.0, 2, 7.0),
            Point::new(21, 11.0, 10.0, 2, 2.0),
            Point::new(22, 10.0, 11.0, 2, 4.0),
        ];
        Dataset::with_derived_clusters(points, &HashMap::new()).unwrap()
    }

    #[test]
    fn test_derive_cluster_metadata() {
        let points = [
            Point::new(0, 0.0, 0.0, 3, 1.0),
            Point::new(1, 2.0, 4.0, 3, 2.0),
        ];
        let cluster = Cluster::derive_from_members(3, "web", points.iter()).unwrap();
        assert_eq!(cluster.centroid, Coord { x: 1.0, y: 2.0 });
        assert_eq!(cluster.weight, 3.0);
        assert_eq!(cluster.bounds.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(cluster.bounds.max(), Coord { x: 2.0, y: 4.0 });
    }

    #[test]
    fn test_derive_cluster_empty() {
        assert!(Cluster::derive_from_members(1, "empty", std::iter::empty()).is_none());
    }

    #[test]
    fn test_membership_index() {
        let dataset = two_cluster_dataset();
        assert_eq!(dataset.members_of(1), &[0, 1, 2]);
        assert_eq!(dataset.members_of(2), &[3, 4, 5]);
        assert!(dataset.members_of(99).is_empty());
    }

    #[test]
    fn test_point_lookup() {
        let dataset = two_cluster_dataset();
        assert_eq!(dataset.point_index(21), Some(4));
        assert_eq!(dataset.point_index(99), None);
        assert_eq!(dataset.point(4).map(|p| p.id), Some(21));
    }

    #[test]
    fn test_duplicate_point_id() {
        let points = vec![Point::new(1, 0.0, 0.0, 0, 1.0), Point::new(1, 1.0, 1.0, 0, 1.0)];
        let result = Dataset::with_derived_clusters(points, &HashMap::new());
        assert!(matches!(result, Err(EngineError::DuplicatePointId(1))));
    }

    #[test]
    fn test_duplicate_cluster_id() {
        let cluster = Cluster::derive_from_members(4, "a", [Point::new(1, 0.0, 0.0, 4, 1.0)].iter())
            .unwrap();
        let result = Dataset::new(Vec::new(), vec![cluster.clone(), cluster]);
        assert!(matches!(result, Err(EngineError::DuplicateClusterId(4))));
    }

    #[test]
    fn test_labels_and_noise_cluster() {
        let points = vec![
            Point::new(0, 0.0, 0.0, -1, 1.0),
            Point::new(1, 1.0, 1.0, 5, 1.0),
        ];
        let labels = HashMap::from([(5, "Databases".to_string())]);
        let dataset = Dataset::with_derived_clusters(points, &labels).unwrap();
        assert_eq!(dataset.cluster(5).unwrap().label, "Databases");
        assert_eq!(dataset.cluster(-1).unwrap().label, "-1");
        assert_eq!(dataset.cluster_ids().collect::<Vec<_>>(), vec![-1, 5]);
    }

    #[test]
    fn test_bounds() {
        let dataset = two_cluster_dataset();
        let bounds = dataset.bounds().unwrap();
        assert_eq!(bounds.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(bounds.max(), Coord { x: 11.0, y: 11.0 });

        let empty = Dataset::new(Vec::new(), Vec::new()).unwrap();
        assert!(empty.bounds().is_none());
        assert!(empty.is_empty());
    }
}
