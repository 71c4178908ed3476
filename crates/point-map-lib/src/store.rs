//! Single owner of the engine's shared mutable state
//!
//! Components read a snapshot at the start of a tick and write back through the named
//! methods below; nothing else holds mutable references into this state.

use crate::camera::{CameraAnimationRequest, RequestSlot};
use crate::config::CellSizePolicy;
use crate::culler::VisibleSets;
use crate::dataset::{ClusterId, Dataset, PointId};
use crate::lod::LabelCandidate;
use crate::selection::{Highlight, SelectionState};
use crate::spatial::SpatialIndex;
use crate::viewport::{OrthoCamera, ViewportRect};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug)]
pub struct EngineStore {
    dataset: Arc<Dataset>,
    index: SpatialIndex,
    selection: SelectionState,
    /// Clusters the user has switched on; all of them initially
    selected_clusters: BTreeSet<ClusterId>,
    /// Camera as read at the last tick that had one
    camera: Option<OrthoCamera>,
    viewport: Option<ViewportRect>,
    zoom: f64,
    should_show_labels: bool,
    visible: VisibleSets,
    labels: Vec<LabelCandidate>,
    requests: RequestSlot,
}

impl EngineStore {
    /// Build the spatial index and initial state for a freshly loaded dataset
    pub fn new(dataset: Arc<Dataset>, cell_size: CellSizePolicy) -> Self {
        let index = SpatialIndex::build(dataset.points(), cell_size);
        let selected_clusters = dataset.cluster_ids().collect();
        Self {
            dataset,
            index,
            selection: SelectionState::default(),
            selected_clusters,
            camera: None,
            viewport: None,
            zoom: 1.0,
            should_show_labels: false,
            visible: VisibleSets::default(),
            labels: Vec::new(),
            requests: RequestSlot::default(),
        }
    }

    #[inline]
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    #[inline]
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    #[inline]
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn set_hovered(&mut self, hovered: Option<usize>) -> bool {
        self.selection.set_hovered(hovered)
    }

    pub fn set_selected(&mut self, selected: Option<PointId>) -> bool {
        self.selection.set_selected(selected)
    }

    pub fn start_highlight(&mut self, cluster_id: ClusterId, now_ms: f64, duration_ms: f64) {
        self.selection.start_highlight(cluster_id, now_ms, duration_ms);
    }

    pub fn expire_highlight(&mut self, now_ms: f64) -> Option<Highlight> {
        self.selection.expire_highlight(now_ms)
    }

    #[inline]
    pub fn selected_clusters(&self) -> &BTreeSet<ClusterId> {
        &self.selected_clusters
    }

    #[inline]
    pub fn is_cluster_selected(&self, id: ClusterId) -> bool {
        self.selected_clusters.contains(&id)
    }

    /// Switch a cluster on or off; returns whether the set changed
    ///
    /// Unknown cluster ids are ignored.
    pub fn set_cluster_selected(&mut self, id: ClusterId, selected: bool) -> bool {
        if self.dataset.cluster(id).is_none() {
            return false;
        }
        if selected {
            self.selected_clusters.insert(id)
        } else {
            self.selected_clusters.remove(&id)
        }
    }

    /// Flip a cluster; returns its new state
    pub fn toggle_cluster(&mut self, id: ClusterId) -> bool {
        let now_selected = !self.is_cluster_selected(id);
        self.set_cluster_selected(id, now_selected);
        self.is_cluster_selected(id)
    }

    /// Replace the selected set; returns whether it changed
    pub fn set_selected_clusters(&mut self, ids: impl IntoIterator<Item = ClusterId>) -> bool {
        let next: BTreeSet<ClusterId> = ids
            .into_iter()
            .filter(|&id| self.dataset.cluster(id).is_some())
            .collect();
        if next == self.selected_clusters {
            return false;
        }
        self.selected_clusters = next;
        true
    }

    pub fn select_all_clusters(&mut self) -> bool {
        let all: Vec<ClusterId> = self.dataset.cluster_ids().collect();
        self.set_selected_clusters(all)
    }

    #[inline]
    pub fn camera(&self) -> Option<&OrthoCamera> {
        self.camera.as_ref()
    }

    /// Record the camera read this tick and the viewport derived from it
    pub fn set_camera(&mut self, camera: OrthoCamera) {
        self.viewport = Some(camera.viewport_rect());
        self.zoom = camera.zoom;
        self.camera = Some(camera);
    }

    #[inline]
    pub fn viewport(&self) -> Option<ViewportRect> {
        self.viewport
    }

    #[inline]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[inline]
    pub fn should_show_labels(&self) -> bool {
        self.should_show_labels
    }

    pub fn set_should_show_labels(&mut self, show: bool) {
        self.should_show_labels = show;
    }

    #[inline]
    pub fn visible(&self) -> &VisibleSets {
        &self.visible
    }

    #[inline]
    pub fn visible_cluster_ids(&self) -> &BTreeSet<ClusterId> {
        &self.visible.clusters
    }

    #[inline]
    pub fn visible_point_ids(&self) -> &BTreeSet<PointId> {
        &self.visible.points
    }

    /// Inputs of a culling pass plus the visible sets it updates in place
    pub(crate) fn cull_parts_mut(
        &mut self,
    ) -> (&Dataset, &BTreeSet<ClusterId>, &mut VisibleSets) {
        (&*self.dataset, &self.selected_clusters, &mut self.visible)
    }

    #[inline]
    pub fn labels(&self) -> &[LabelCandidate] {
        &self.labels
    }

    pub fn set_labels(&mut self, labels: Vec<LabelCandidate>) {
        self.labels = labels;
    }

    /// Queue a camera animation, replacing any unconsumed request
    pub fn request_camera(&mut self, request: CameraAnimationRequest) {
        self.requests.submit(request);
    }

    #[inline]
    pub fn pending_camera_request(&self) -> Option<&CameraAnimationRequest> {
        self.requests.peek()
    }

    pub(crate) fn requests_mut(&mut self) -> &mut RequestSlot {
        &mut self.requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::two_cluster_dataset;
    use geo::Coord;

    fn store() -> EngineStore {
        EngineStore::new(two_cluster_dataset(), CellSizePolicy::default())
    }

    #[test]
    fn test_initial_state() {
        let store = store();
        assert_eq!(store.selected_clusters(), &BTreeSet::from([1, 2]));
        assert!(store.viewport().is_none());
        assert!(store.visible_cluster_ids().is_empty());
        assert_eq!(store.index().len(), 6);
    }

    #[test]
    fn test_cluster_toggles() {
        let mut store = store();
        assert!(!store.toggle_cluster(1));
        assert!(store.toggle_cluster(1));
        assert!(!store.set_cluster_selected(1, true));
        assert!(!store.set_cluster_selected(42, true));
        assert!(store.set_selected_clusters([2]));
        assert!(!store.set_selected_clusters([2, 42]));
        assert!(store.select_all_clusters());
    }

    #[test]
    fn test_culling_writes_visible_sets_in_place() {
        let mut store = store();
        let (_, selected, visible) = store.cull_parts_mut();
        assert_eq!(selected.len(), 2);
        visible.clusters.insert(2);
        visible.points.insert(21);
        assert_eq!(store.visible_cluster_ids(), &BTreeSet::from([2]));
        assert_eq!(store.visible_point_ids(), &BTreeSet::from([21]));
    }

    #[test]
    fn test_set_camera_updates_viewport() {
        let mut store = store();
        let camera = OrthoCamera::for_viewport(Coord { x: 0.0, y: 0.0 }, 2.0, 100.0, 100.0);
        store.set_camera(camera);
        assert_eq!(store.zoom(), 2.0);
        assert_eq!(store.viewport(), Some(ViewportRect::new(-25.0, 25.0, -25.0, 25.0)));
    }

    #[test]
    fn test_camera_request_slot() {
        let mut store = store();
        store.request_camera(CameraAnimationRequest::new(1.0, 2.0, 3.0));
        store.request_camera(CameraAnimationRequest::new(4.0, 5.0, 6.0));
        assert_eq!(store.pending_camera_request().map(|r| r.zoom), Some(6.0));
    }
}
