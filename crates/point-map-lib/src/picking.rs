//! Pointer picking
//!
//! Resolves a pointer position to the nearest point within a fixed pixel radius.
//! The radius is converted to world units for the current zoom, the grid supplies
//! candidates, and the exact distance decides.

use crate::config::PickingConfig;
use crate::dataset::{ClusterId, Dataset, PointId};
use crate::spatial::SpatialIndex;
use crate::viewport::OrthoCamera;
use geo::Coord;

/// The point found under the pointer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Index into the dataset's point array
    pub index: usize,
    pub id: PointId,
    pub cluster_id: ClusterId,
    /// Exact world distance from the pointer
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickOutcome {
    /// Skipped: the previous pointer-move pick is too recent
    Throttled,
    /// `None` when no pickable point lies within the radius
    Picked(Option<PickHit>),
}

#[derive(Debug, Clone)]
pub struct PickingEngine {
    config: PickingConfig,
    last_pick_ms: Option<f64>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PickingEngine {
    pub fn new(config: PickingConfig) -> Self {
        Self {
            config,
            last_pick_ms: None,
        }
    }

    /// Pick radius in world units for the given camera and viewport width
    #[inline]
    pub fn world_radius(&self, camera: &OrthoCamera, viewport_width_px: f64) -> f64 {
        self.config.pixel_radius * camera.world_units_per_pixel(viewport_width_px)
    }

    /// Nearest pickable point within `world_radius` of `pointer`
    ///
    /// `is_pickable` filters candidates by cluster. Among candidates at exactly the
    /// same minimal distance, the first one in grid order wins.
    pub fn nearest(
        index: &SpatialIndex,
        dataset: &Dataset,
        pointer: Coord<f64>,
        world_radius: f64,
        is_pickable: impl Fn(ClusterId) -> bool,
    ) -> Option<PickHit> {
        if !(world_radius.is_finite() && world_radius >= 0.0) {
            return None;
        }
        let radius_sq = world_radius * world_radius;

        let mut best: Option<(usize, f64)> = None;
        for candidate in index.query_radius(pointer.x, pointer.y, world_radius) {
            let Some(point) = dataset.point(candidate) else {
                continue;
            };
            if !is_pickable(point.cluster_id) {
                continue;
            }
            let dx = point.x - pointer.x;
            let dy = point.y - pointer.y;
            let dist_sq = dx * dx + dy * dy;
            if dist_sq <= radius_sq && best.is_none_or(|(_, d)| dist_sq < d) {
                best = Some((candidate, dist_sq));
            }
        }

        best.and_then(|(i, dist_sq)| {
            dataset.point(i).map(|p| PickHit {
                index: i,
                id: p.id,
                cluster_id: p.cluster_id,
                distance: dist_sq.sqrt(),
            })
        })
    }

    /// Pick for a click: never rate limited
    pub fn pick(
        &self,
        index: &SpatialIndex,
        dataset: &Dataset,
        camera: &OrthoCamera,
        pointer: Coord<f64>,
        viewport_width_px: f64,
        is_pickable: impl Fn(ClusterId) -> bool,
    ) -> Option<PickHit> {
        #[cfg(feature = "profiling")]
        profiling::scope!("picking::pick");

        let radius = self.world_radius(camera, viewport_width_px);
        Self::nearest(index, dataset, pointer, radius, is_pickable)
    }

    /// Pick for a pointer move, at most once per `min_interval_ms`
    #[allow(clippy::too_many_arguments)]
    pub fn pick_throttled(
        &mut self,
        now_ms: f64,
        index: &SpatialIndex,
        dataset: &Dataset,
        camera: &OrthoCamera,
        pointer: Coord<f64>,
        viewport_width_px: f64,
        is_pickable: impl Fn(ClusterId) -> bool,
    ) -> PickOutcome {
        if self
            .last_pick_ms
            .is_some_and(|last| now_ms - last < self.config.min_interval_ms)
        {
            tracing::trace!("Pointer pick throttled");
            return PickOutcome::Throttled;
        }
        self.last_pick_ms = Some(now_ms);
        PickOutcome::Picked(self.pick(
            index,
            dataset,
            camera,
            pointer,
            viewport_width_px,
            is_pickable,
        ))
    }
}
