//! Render attribute synchronization
//!
//! The render backend owns per-point attribute buffers. [`AttributeSyncer`] remembers
//! what it last wrote and, each tick, writes only the difference to the latest state:
//! two writes for a hover or selection change, the members of two clusters for a
//! highlight change. Visibility gets a full pass only when the selected cluster set
//! itself changed.

use crate::config::VisibilityStyle;
use crate::dataset::{ClusterId, Dataset, Point, PointId};
use std::collections::BTreeSet;

/// Per-point attribute writes understood by the render backend
pub trait AttributeSink {
    fn set_hovered(&mut self, index: usize, on: bool);
    fn set_selected(&mut self, index: usize, on: bool);
    fn set_highlighted(&mut self, index: usize, on: bool);
    fn set_visibility(&mut self, index: usize, size: f32, opacity: f32);
}

/// In-memory attribute buffers that count every write
#[derive(Debug, Clone, Default)]
pub struct AttributeBuffer {
    hovered: Vec<bool>,
    selected: Vec<bool>,
    highlighted: Vec<bool>,
    size: Vec<f32>,
    opacity: Vec<f32>,
    writes: usize,
}

impl AttributeBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            hovered: vec![false; len],
            selected: vec![false; len],
            highlighted: vec![false; len],
            size: vec![1.0; len],
            opacity: vec![1.0; len],
            writes: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hovered.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hovered.is_empty()
    }

    /// Total writes since creation or the last [`Self::reset_writes`]
    #[inline]
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn reset_writes(&mut self) {
        self.writes = 0;
    }

    pub fn is_hovered(&self, index: usize) -> bool {
        self.hovered.get(index).copied().unwrap_or(false)
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    pub fn is_highlighted(&self, index: usize) -> bool {
        self.highlighted.get(index).copied().unwrap_or(false)
    }

    /// `(size, opacity)` of a point
    pub fn visibility(&self, index: usize) -> Option<(f32, f32)> {
        Some((*self.size.get(index)?, *self.opacity.get(index)?))
    }

    pub fn hovered_count(&self) -> usize {
        self.hovered.iter().filter(|&&h| h).count()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|&&s| s).count()
    }

    pub fn highlighted_count(&self) -> usize {
        self.highlighted.iter().filter(|&&h| h).count()
    }
}

impl AttributeSink for AttributeBuffer {
    fn set_hovered(&mut self, index: usize, on: bool) {
        if let Some(slot) = self.hovered.get_mut(index) {
            *slot = on;
            self.writes += 1;
        }
    }

    fn set_selected(&mut self, index: usize, on: bool) {
        if let Some(slot) = self.selected.get_mut(index) {
            *slot = on;
            self.writes += 1;
        }
    }

    fn set_highlighted(&mut self, index: usize, on: bool) {
        if let Some(slot) = self.highlighted.get_mut(index) {
            *slot = on;
            self.writes += 1;
        }
    }

    fn set_visibility(&mut self, index: usize, size: f32, opacity: f32) {
        if let (Some(s), Some(o)) = (self.size.get_mut(index), self.opacity.get_mut(index)) {
            *s = size;
            *o = opacity;
            self.writes += 1;
        }
    }
}

/// Latest values to bring the sink up to date with
#[derive(Debug, Clone, Copy)]
pub struct SyncInput<'a> {
    pub hovered: Option<usize>,
    pub selected: Option<PointId>,
    pub highlighted: Option<ClusterId>,
    pub selected_clusters: &'a BTreeSet<ClusterId>,
}

/// What one sync wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub hover_writes: usize,
    pub selection_writes: usize,
    pub highlight_writes: usize,
    pub visibility_writes: usize,
}

impl SyncStats {
    #[inline]
    pub fn total(&self) -> usize {
        self.hover_writes + self.selection_writes + self.highlight_writes + self.visibility_writes
    }
}

/// Last values written to the sink
#[derive(Debug, Clone, Default)]
pub struct AttributeSyncer {
    hovered: Option<usize>,
    selected: Option<usize>,
    highlighted: Option<ClusterId>,
    /// `None` until the first visibility pass
    selected_clusters: Option<BTreeSet<ClusterId>>,
    /// Normalized popularity per point, filled on the first visibility pass
    popularity: Vec<f32>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl AttributeSyncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring `sink` in line with `input`, writing only what differs from the last sync
    pub fn sync(
        &mut self,
        dataset: &Dataset,
        input: &SyncInput<'_>,
        style: &VisibilityStyle,
        sink: &mut impl AttributeSink,
    ) -> SyncStats {
        #[cfg(feature = "profiling")]
        profiling::scope!("attributes::sync");

        let mut stats = SyncStats::default();

        let hovered = input.hovered.filter(|&i| i < dataset.len());
        if hovered != self.hovered {
            if let Some(prev) = self.hovered {
                sink.set_hovered(prev, false);
                stats.hover_writes += 1;
            }
            if let Some(next) = hovered {
                sink.set_hovered(next, true);
                stats.hover_writes += 1;
            }
            self.hovered = hovered;
        }

        let selected = input.selected.and_then(|id| dataset.point_index(id));
        if selected != self.selected {
            if let Some(prev) = self.selected {
                sink.set_selected(prev, false);
                stats.selection_writes += 1;
            }
            if let Some(next) = selected {
                sink.set_selected(next, true);
                stats.selection_writes += 1;
            }
            self.selected = selected;
        }

        if input.highlighted != self.highlighted {
            if let Some(prev) = self.highlighted {
                for &i in dataset.members_of(prev) {
                    sink.set_highlighted(i, false);
                    stats.highlight_writes += 1;
                }
            }
            if let Some(next) = input.highlighted {
                for &i in dataset.members_of(next) {
                    sink.set_highlighted(i, true);
                    stats.highlight_writes += 1;
                }
            }
            self.highlighted = input.highlighted;
        }

        if self.selected_clusters.as_ref() != Some(input.selected_clusters) {
            if self.popularity.len() != dataset.len() {
                self.popularity = popularity(dataset.points());
            }
            for (i, point) in dataset.points().iter().enumerate() {
                let size = style.size_at(self.popularity[i]);
                if input.selected_clusters.contains(&point.cluster_id) {
                    sink.set_visibility(i, size, style.selected_opacity);
                } else {
                    sink.set_visibility(
                        i,
                        size * style.deselected_size_scale,
                        style.deselected_opacity,
                    );
                }
            }
            stats.visibility_writes = dataset.len();
            self.selected_clusters = Some(input.selected_clusters.clone());
            tracing::debug!(
                selected = input.selected_clusters.len(),
                "Visibility attributes rewritten"
            );
        }

        stats
    }
}

/// `log10(weight + 1)` of every point, scaled to [0, 1] over the slice
///
/// All points get 0 when every weight is equal. Negative and NaN weights count as 0.
pub fn popularity(points: &[Point]) -> Vec<f32> {
    let log_weights: Vec<f64> = points
        .iter()
        .map(|p| (p.weight.max(0.0) + 1.0).log10())
        .collect();
    let min = log_weights.iter().copied().fold(f64::INFINITY, f64::min);
    let max = log_weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max > min { max - min } else { 1.0 };
    log_weights
        .into_iter()
        .map(|w| ((w - min) / range).clamp(0.0, 1.0) as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::two_cluster_dataset;

    fn input(
        hovered: Option<usize>,
        selected: Option<PointId>,
        highlighted: Option<ClusterId>,
        clusters: &BTreeSet<ClusterId>,
    ) -> SyncInput<'_> {
        SyncInput {
            hovered,
            selected,
            highlighted,
            selected_clusters: clusters,
        }
    }

    #[test]
    fn test_first_sync_writes_visibility_once() {
        let dataset = two_cluster_dataset();
        let clusters: BTreeSet<_> = dataset.cluster_ids().collect();
        let mut buffer = AttributeBuffer::new(dataset.len());
        let mut syncer = AttributeSyncer::new();
        let style = VisibilityStyle::default();

        let stats = syncer.sync(&dataset, &input(None, None, None, &clusters), &style, &mut buffer);
        assert_eq!(stats.visibility_writes, 6);

        let stats = syncer.sync(&dataset, &input(None, None, None, &clusters), &style, &mut buffer);
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_hover_changes_touch_two_entries() {
        let dataset = two_cluster_dataset();
        let clusters: BTreeSet<_> = dataset.cluster_ids().collect();
        let mut buffer = AttributeBuffer::new(dataset.len());
        let mut syncer = AttributeSyncer::new();
        let style = VisibilityStyle::default();
        syncer.sync(&dataset, &input(None, None, None, &clusters), &style, &mut buffer);
        buffer.reset_writes();

        syncer.sync(&dataset, &input(Some(1), None, None, &clusters), &style, &mut buffer);
        assert_eq!(buffer.writes(), 1);

        let stats = syncer.sync(&dataset, &input(Some(4), None, None, &clusters), &style, &mut buffer);
        assert_eq!(stats.hover_writes, 2);
        assert!(buffer.is_hovered(4));
        assert!(!buffer.is_hovered(1));
    }

    #[test]
    fn test_only_latest_hover_is_set() {
        let dataset = two_cluster_dataset();
        let clusters: BTreeSet<_> = dataset.cluster_ids().collect();
        let mut buffer = AttributeBuffer::new(dataset.len());
        let mut syncer = AttributeSyncer::new();
        let style = VisibilityStyle::default();

        // Hover changes arrive faster than syncs; intermediate values are never synced
        let sequence = [Some(0), Some(3), None, Some(5), Some(2), Some(2), None, Some(1)];
        for (step, hovered) in sequence.iter().enumerate() {
            if step % 3 == 0 {
                continue;
            }
            syncer.sync(&dataset, &input(*hovered, None, None, &clusters), &style, &mut buffer);
            assert_eq!(buffer.hovered_count(), usize::from(hovered.is_some()));
            if let Some(h) = hovered {
                assert!(buffer.is_hovered(*h));
            }
        }
    }

    #[test]
    fn test_selection_uses_point_ids() {
        let dataset = two_cluster_dataset();
        let clusters: BTreeSet<_> = dataset.cluster_ids().collect();
        let mut buffer = AttributeBuffer::new(dataset.len());
        let mut syncer = AttributeSyncer::new();
        let style = VisibilityStyle::default();

        syncer.sync(&dataset, &input(None, Some(21), None, &clusters), &style, &mut buffer);
        assert!(buffer.is_selected(4));

        // Unknown ids clear the selection attribute
        syncer.sync(&dataset, &input(None, Some(999), None, &clusters), &style, &mut buffer);
        assert_eq!(buffer.selected_count(), 0);
    }

    #[test]
    fn test_highlight_touches_only_members() {
        let dataset = two_cluster_dataset();
        let clusters: BTreeSet<_> = dataset.cluster_ids().collect();
        let mut buffer = AttributeBuffer::new(dataset.len());
        let mut syncer = AttributeSyncer::new();
        let style = VisibilityStyle::default();
        syncer.sync(&dataset, &input(None, None, None, &clusters), &style, &mut buffer);

        let stats = syncer.sync(&dataset, &input(None, None, Some(1), &clusters), &style, &mut buffer);
        assert_eq!(stats.highlight_writes, 3);
        assert_eq!(buffer.highlighted_count(), 3);

        let stats = syncer.sync(&dataset, &input(None, None, Some(2), &clusters), &style, &mut buffer);
        assert_eq!(stats.highlight_writes, 6);
        assert!(buffer.is_highlighted(3) && !buffer.is_highlighted(0));

        syncer.sync(&dataset, &input(None, None, None, &clusters), &style, &mut buffer);
        assert_eq!(buffer.highlighted_count(), 0);
    }

    #[test]
    fn test_visibility_follows_selected_clusters() {
        let dataset = two_cluster_dataset();
        let mut clusters: BTreeSet<_> = dataset.cluster_ids().collect();
        let mut buffer = AttributeBuffer::new(dataset.len());
        let mut syncer = AttributeSyncer::new();
        let style = VisibilityStyle::default();
        syncer.sync(&dataset, &input(None, None, None, &clusters), &style, &mut buffer);

        clusters.remove(&2);
        let stats = syncer.sync(&dataset, &input(None, None, None, &clusters), &style, &mut buffer);
        assert_eq!(stats.visibility_writes, 6);
        // Index 2 is the lightest point, index 3 the heaviest
        assert_eq!(buffer.visibility(2), Some((16.0, 1.0)));
        assert_eq!(buffer.visibility(3), Some((32.0, 0.1)));
    }

    #[test]
    fn test_heavier_points_are_larger() {
        let dataset = two_cluster_dataset();
        let clusters: BTreeSet<_> = dataset.cluster_ids().collect();
        let mut buffer = AttributeBuffer::new(dataset.len());
        let mut syncer = AttributeSyncer::new();
        let style = VisibilityStyle::default();
        syncer.sync(&dataset, &input(None, None, None, &clusters), &style, &mut buffer);

        let mut by_weight: Vec<usize> = (0..dataset.len()).collect();
        by_weight.sort_by(|&a, &b| dataset.points()[a].weight.total_cmp(&dataset.points()[b].weight));
        let sizes: Vec<f32> = by_weight
            .iter()
            .map(|&i| buffer.visibility(i).map_or(0.0, |(size, _)| size))
            .collect();
        assert!(sizes.windows(2).all(|w| w[0] < w[1]), "{sizes:?}");
        assert_eq!(sizes[0], 16.0);
        assert_eq!(sizes[sizes.len() - 1], 64.0);
    }

    #[test]
    fn test_popularity_of_equal_weights() {
        let points = vec![Point::new(0, 0.0, 0.0, 0, 5.0), Point::new(1, 1.0, 0.0, 0, 5.0)];
        assert_eq!(popularity(&points), vec![0.0, 0.0]);
        assert!(popularity(&[]).is_empty());
    }
}
