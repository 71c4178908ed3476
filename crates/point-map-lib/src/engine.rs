//! Engine - Per-tick orchestration over the store
//!
//! The host calls [`Engine::tick`] once per rendered frame and forwards pointer
//! events and UI intents through the other methods. All work is synchronous and
//! bounded; nothing blocks or waits.

use crate::attributes::{AttributeSink, AttributeSyncer, SyncInput, SyncStats};
use crate::camera::{AnimationStep, CameraAnimationController, CameraAnimationRequest};
use crate::config::EngineConfig;
use crate::culler::{CullOutcome, CullRequest, ViewportCuller};
use crate::dataset::{ClusterId, Dataset, PointId};
use crate::lod::{LabelCandidate, LabelTarget, LodDecision, ZoomLodPolicy, top_k_by_weight};
use crate::picking::{PickHit, PickOutcome, PickingEngine};
use crate::store::EngineStore;
use crate::viewport::OrthoCamera;
use crate::Result;
use std::sync::Arc;

/// Per-tick input from the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Monotonic host time at the start of the tick
    pub now_ms: f64,
    /// Time since the previous tick
    pub delta_ms: f64,
    pub viewport_width_px: f64,
    pub viewport_height_px: f64,
}

/// A pointer position in screen pixels (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub screen_x: f64,
    pub screen_y: f64,
    pub now_ms: f64,
}

/// What changed during one tick
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub now_ms: f64,
    pub animation: AnimationStep,
    pub lod: LodDecision,
    /// `None` while no camera has been seen yet
    pub cull: Option<CullOutcome>,
    /// Set on the tick a highlight ran out
    pub highlight_expired: Option<ClusterId>,
    /// Progress of the active highlight in [0, 1]
    pub highlight_progress: Option<f64>,
    pub sync: SyncStats,
}

/// Dataset and state summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineInfo {
    pub point_count: usize,
    pub cluster_count: usize,
    pub grid_dimensions: (usize, usize),
    pub cell_size: f64,
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: EngineStore,
    culler: ViewportCuller,
    picker: PickingEngine,
    syncer: AttributeSyncer,
    animation: CameraAnimationController,
    lod: ZoomLodPolicy,
    viewport_px: (f64, f64),
    last_label_budget: Option<usize>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Engine {
    /// Validate the configuration and build the index for `dataset`
    pub fn new(dataset: Arc<Dataset>, config: EngineConfig) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("engine::new");

        config.validate()?;
        let store = EngineStore::new(dataset, config.cell_size);
        let (cols, rows) = store.index().dimensions();
        tracing::debug!(
            points = store.dataset().len(),
            cols,
            rows,
            cell_size = store.index().cell_size(),
            "Engine ready"
        );

        Ok(Self {
            culler: ViewportCuller::new(config.culler.clone()),
            picker: PickingEngine::new(config.picking.clone()),
            syncer: AttributeSyncer::new(),
            animation: CameraAnimationController::new(
                config.animation.easing,
                config.animation.default_duration_ms,
            ),
            lod: ZoomLodPolicy::new(config.lod.clone()),
            viewport_px: (0.0, 0.0),
            last_label_budget: None,
            store,
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &EngineStore {
        &self.store
    }

    #[inline]
    pub fn dataset(&self) -> &Arc<Dataset> {
        self.store.dataset()
    }

    #[inline]
    pub fn labels(&self) -> &[LabelCandidate] {
        self.store.labels()
    }

    #[inline]
    pub fn is_animating(&self) -> bool {
        self.animation.is_animating()
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            point_count: self.store.dataset().len(),
            cluster_count: self.store.dataset().clusters().len(),
            grid_dimensions: self.store.index().dimensions(),
            cell_size: self.store.index().cell_size(),
        }
    }

    /// Run one frame
    ///
    /// `camera` is `None` until the host camera exists. The animation controller may
    /// move it; the viewport, LOD and culling then read the moved camera, and the
    /// attribute sink receives the writes for whatever changed.
    pub fn tick(
        &mut self,
        input: FrameInput,
        mut camera: Option<&mut OrthoCamera>,
        sink: &mut impl AttributeSink,
    ) -> FrameReport {
        #[cfg(feature = "profiling")]
        profiling::scope!("engine::tick");

        self.viewport_px = (input.viewport_width_px, input.viewport_height_px);

        let animation =
            self.animation
                .tick(self.store.requests_mut(), camera.as_deref_mut(), input.delta_ms);

        if let Some(cam) = camera {
            self.store.set_camera(*cam);
        }

        let lod = self.lod.evaluate(self.store.zoom());
        self.store.set_should_show_labels(lod.show_all_labels);

        let cull = self.store.viewport().map(|rect| {
            let (dataset, selected_clusters, visible) = self.store.cull_parts_mut();
            let request = CullRequest {
                rect,
                now_ms: input.now_ms,
                show_all_labels: lod.show_all_labels,
                selected_clusters,
            };
            self.culler.update(&request, dataset, visible)
        });

        if let Some(CullOutcome::Updated {
            clusters_changed,
            points_changed,
        }) = cull
        {
            let budget_changed = self.last_label_budget != Some(lod.max_rendered_labels);
            if clusters_changed || points_changed || budget_changed {
                self.refresh_labels(&lod);
            }
        }

        let highlight_expired = self
            .store
            .expire_highlight(input.now_ms)
            .map(|h| h.cluster_id);
        let highlight_progress = self
            .store
            .selection()
            .highlight
            .map(|h| h.progress(input.now_ms));

        let sync = self.sync(sink);

        FrameReport {
            now_ms: input.now_ms,
            animation,
            lod,
            cull,
            highlight_expired,
            highlight_progress,
            sync,
        }
    }

    /// Pointer moved: update hover, at most once per picking interval
    pub fn pointer_move(&mut self, pointer: PointerInput) -> PickOutcome {
        let Some(camera) = self.store.camera().copied() else {
            tracing::trace!("Pointer move before the camera is known");
            return PickOutcome::Picked(None);
        };
        let world = self.pointer_world(&camera, &pointer);
        let store = &self.store;
        let outcome = self.picker.pick_throttled(
            pointer.now_ms,
            store.index(),
            store.dataset(),
            &camera,
            world,
            self.viewport_px.0,
            |cluster| store.is_cluster_selected(cluster),
        );
        if let PickOutcome::Picked(hit) = outcome {
            self.store.set_hovered(hit.map(|h| h.index));
        }
        outcome
    }

    /// Pointer clicked: select the point under it, or clear the selection
    pub fn click(&mut self, pointer: PointerInput) -> Option<PickHit> {
        let camera = self.store.camera().copied()?;
        let world = self.pointer_world(&camera, &pointer);
        let store = &self.store;
        let hit = self.picker.pick(
            store.index(),
            store.dataset(),
            &camera,
            world,
            self.viewport_px.0,
            |cluster| store.is_cluster_selected(cluster),
        );
        self.store.set_selected(hit.map(|h| h.id));
        if let Some(hit) = hit {
            tracing::debug!(id = hit.id, cluster_id = hit.cluster_id, "Point selected");
        }
        hit
    }

    /// Pointer left the map
    pub fn pointer_leave(&mut self) {
        self.store.set_hovered(None);
    }

    /// Select a point by id (e.g. from search); `None` clears the selection
    ///
    /// Returns false for unknown ids.
    pub fn select_point(&mut self, id: Option<PointId>) -> bool {
        if let Some(id) = id {
            if self.store.dataset().point_index(id).is_none() {
                return false;
            }
        }
        self.store.set_selected(id);
        true
    }

    /// Select a point and animate the camera onto it
    pub fn focus_point(&mut self, id: PointId, zoom: f64, screen_anchor: Option<f64>) -> bool {
        let Some(point) = self
            .store
            .dataset()
            .point_index(id)
            .and_then(|i| self.store.dataset().point(i))
        else {
            return false;
        };
        let mut request = CameraAnimationRequest::new(point.x, point.y, zoom);
        request.screen_anchor = screen_anchor;
        self.store.set_selected(Some(id));
        self.store.request_camera(request);
        true
    }

    /// Flash a cluster for the configured highlight duration
    pub fn highlight_cluster(&mut self, cluster_id: ClusterId, now_ms: f64) -> bool {
        if self.store.dataset().cluster(cluster_id).is_none() {
            return false;
        }
        self.store
            .start_highlight(cluster_id, now_ms, self.config.highlight.duration_ms);
        true
    }

    /// Animate the camera onto a cluster's centroid
    pub fn focus_cluster(&mut self, cluster_id: ClusterId, zoom: f64) -> bool {
        let Some(cluster) = self.store.dataset().cluster(cluster_id) else {
            return false;
        };
        let request = CameraAnimationRequest::new(cluster.centroid.x, cluster.centroid.y, zoom);
        self.store.request_camera(request);
        true
    }

    /// Queue a camera animation; a newer request replaces an unconsumed one
    pub fn request_camera(&mut self, request: CameraAnimationRequest) {
        self.store.request_camera(request);
    }

    /// Flip a cluster on or off; returns its new state
    pub fn toggle_cluster(&mut self, cluster_id: ClusterId) -> bool {
        let selected = self.store.toggle_cluster(cluster_id);
        self.culler.invalidate();
        self.drop_unpickable_hover();
        selected
    }

    /// Replace the set of switched-on clusters
    pub fn set_selected_clusters(&mut self, ids: impl IntoIterator<Item = ClusterId>) {
        if self.store.set_selected_clusters(ids) {
            self.culler.invalidate();
            self.drop_unpickable_hover();
        }
    }

    pub fn select_all_clusters(&mut self) {
        if self.store.select_all_clusters() {
            self.culler.invalidate();
        }
    }

    /// A point of a switched-off cluster can't stay hovered
    fn drop_unpickable_hover(&mut self) {
        let hovered_cluster = self
            .store
            .selection()
            .hovered
            .and_then(|i| self.store.dataset().point(i))
            .map(|p| p.cluster_id);
        if let Some(cluster) = hovered_cluster {
            if !self.store.is_cluster_selected(cluster) {
                tracing::trace!(cluster, "Hovered point's cluster switched off");
                self.store.set_hovered(None);
            }
        }
    }

    fn pointer_world(&self, camera: &OrthoCamera, pointer: &PointerInput) -> geo::Coord<f64> {
        camera.screen_to_world(
            pointer.screen_x,
            pointer.screen_y,
            self.viewport_px.0,
            self.viewport_px.1,
        )
    }

    fn refresh_labels(&mut self, lod: &LodDecision) {
        let dataset = self.store.dataset();
        let candidates: Vec<LabelCandidate> = if lod.show_all_labels {
            self.store
                .visible_point_ids()
                .iter()
                .filter_map(|&id| dataset.point_index(id).and_then(|i| dataset.point(i)))
                .map(|p| LabelCandidate {
                    target: LabelTarget::Point(p.id),
                    text: p.name.clone().unwrap_or_else(|| p.id.to_string()),
                    weight: p.weight,
                })
                .collect()
        } else {
            self.store
                .visible_cluster_ids()
                .iter()
                .filter(|&&id| self.store.is_cluster_selected(id))
                .filter_map(|&id| dataset.cluster(id))
                .map(|c| LabelCandidate {
                    target: LabelTarget::Cluster(c.id),
                    text: c.label.clone(),
                    weight: c.weight,
                })
                .collect()
        };
        let labels = top_k_by_weight(candidates, lod.max_rendered_labels);
        self.last_label_budget = Some(lod.max_rendered_labels);
        self.store.set_labels(labels);
    }

    fn sync(&mut self, sink: &mut impl AttributeSink) -> SyncStats {
        let selection = self.store.selection();
        let input = SyncInput {
            hovered: selection.hovered,
            selected: selection.selected,
            highlighted: selection.highlighted_cluster(),
            selected_clusters: self.store.selected_clusters(),
        };
        self.syncer.sync(
            self.store.dataset(),
            &input,
            &self.config.visibility,
            sink,
        )
    }
}
