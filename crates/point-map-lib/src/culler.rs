//! Viewport culling
//!
//! Derives the visible cluster and point sets from the camera rectangle. Work only
//! happens when the camera moved (or something invalidated the last result), and at
//! most once per throttle interval unless labels were just switched on.

use crate::config::CullerConfig;
use crate::dataset::{ClusterId, Dataset, PointId};
use crate::viewport::ViewportRect;
use std::collections::BTreeSet;

/// Per-tick culling input
#[derive(Debug, Clone, Copy)]
pub struct CullRequest<'a> {
    pub rect: ViewportRect,
    pub now_ms: f64,
    pub show_all_labels: bool,
    pub selected_clusters: &'a BTreeSet<ClusterId>,
}

/// The culler's current answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSets {
    pub clusters: BTreeSet<ClusterId>,
    /// Always empty while per-point labels are off
    pub points: BTreeSet<PointId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullOutcome {
    /// Camera still, nothing invalidated
    Skipped,
    /// Change pending but inside the throttle interval
    Throttled,
    /// Recomputed; flags tell which sets differ from the previous result
    Updated {
        clusters_changed: bool,
        points_changed: bool,
    },
}

impl CullOutcome {
    #[inline]
    pub fn changed(&self) -> bool {
        matches!(
            self,
            Self::Updated { clusters_changed, points_changed } if *clusters_changed || *points_changed
        )
    }
}

#[derive(Debug, Clone)]
pub struct ViewportCuller {
    config: CullerConfig,
    last_rect: Option<ViewportRect>,
    last_accepted_ms: Option<f64>,
    last_show_labels: bool,
    dirty: bool,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ViewportCuller {
    pub fn new(config: CullerConfig) -> Self {
        Self {
            config,
            last_rect: None,
            last_accepted_ms: None,
            last_show_labels: false,
            dirty: true,
        }
    }

    /// Force the next passing tick to recompute, e.g. after the selected clusters changed
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Recompute `visible` in place if the camera moved and the throttle allows
    ///
    /// Sets that come out equal to the previous answer are left untouched.
    pub fn update(
        &mut self,
        request: &CullRequest<'_>,
        dataset: &Dataset,
        visible: &mut VisibleSets,
    ) -> CullOutcome {
        let moved = self
            .last_rect
            .is_none_or(|last| request.rect.moved_beyond(&last, self.config.epsilon));
        let policy_flipped = request.show_all_labels != self.last_show_labels;
        let labels_switched_on = request.show_all_labels && !self.last_show_labels;

        if !moved && !policy_flipped && !self.dirty {
            return CullOutcome::Skipped;
        }

        let within_throttle = self
            .last_accepted_ms
            .is_some_and(|last| request.now_ms - last < self.config.throttle_ms);
        if within_throttle && !labels_switched_on {
            tracing::trace!("Viewport update throttled");
            return CullOutcome::Throttled;
        }

        #[cfg(feature = "profiling")]
        profiling::scope!("culler::recompute");

        let padded = request.rect.padded(self.config.padding_fraction);

        let clusters: BTreeSet<ClusterId> = dataset
            .clusters()
            .iter()
            .filter(|c| padded.intersects(&c.bounds))
            .map(|c| c.id)
            .collect();

        let points: BTreeSet<PointId> = if request.show_all_labels {
            clusters
                .intersection(request.selected_clusters)
                .flat_map(|&cid| dataset.members_of(cid))
                .filter_map(|&i| dataset.point(i))
                .filter(|p| padded.contains(p.x, p.y))
                .map(|p| p.id)
                .collect()
        } else {
            BTreeSet::new()
        };

        let clusters_changed = clusters != visible.clusters;
        let points_changed = points != visible.points;
        if clusters_changed {
            visible.clusters = clusters;
        }
        if points_changed {
            visible.points = points;
        }

        self.last_rect = Some(request.rect);
        self.last_accepted_ms = Some(request.now_ms);
        self.last_show_labels = request.show_all_labels;
        self.dirty = false;

        tracing::debug!(
            clusters = visible.clusters.len(),
            points = visible.points.len(),
            clusters_changed,
            points_changed,
            "Viewport update accepted"
        );

        CullOutcome::Updated {
            clusters_changed,
            points_changed,
        }
    }
}
