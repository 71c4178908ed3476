//! Hover, selection and timed cluster highlight

use crate::dataset::{ClusterId, PointId};

/// A cluster flashed on screen for a fixed duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Highlight {
    pub cluster_id: ClusterId,
    pub started_ms: f64,
    pub duration_ms: f64,
}

impl Highlight {
    /// Elapsed fraction of the lifetime, clamped to [0, 1]
    pub fn progress(&self, now_ms: f64) -> f64 {
        ((now_ms - self.started_ms) / self.duration_ms).clamp(0.0, 1.0)
    }

    #[inline]
    pub fn is_expired(&self, now_ms: f64) -> bool {
        now_ms >= self.started_ms + self.duration_ms
    }
}

/// Interaction state owned by the store
///
/// `hovered` is a point index into the dataset; `selected` is a point id so it stays
/// meaningful to the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub hovered: Option<usize>,
    pub selected: Option<PointId>,
    pub highlight: Option<Highlight>,
}

impl SelectionState {
    /// Replace the hovered point, returning whether it changed
    pub fn set_hovered(&mut self, hovered: Option<usize>) -> bool {
        let changed = self.hovered != hovered;
        self.hovered = hovered;
        changed
    }

    /// Replace the selected point, returning whether it changed
    pub fn set_selected(&mut self, selected: Option<PointId>) -> bool {
        let changed = self.selected != selected;
        self.selected = selected;
        changed
    }

    /// Start (or restart) a highlight on `cluster_id`
    pub fn start_highlight(&mut self, cluster_id: ClusterId, now_ms: f64, duration_ms: f64) {
        tracing::debug!(cluster_id, "Highlight started");
        self.highlight = Some(Highlight {
            cluster_id,
            started_ms: now_ms,
            duration_ms,
        });
    }

    /// Clear the highlight once its lifetime has elapsed
    ///
    /// Returns the cleared highlight, if any.
    pub fn expire_highlight(&mut self, now_ms: f64) -> Option<Highlight> {
        let expired = self.highlight.filter(|h| h.is_expired(now_ms))?;
        tracing::debug!(cluster_id = expired.cluster_id, "Highlight expired");
        self.highlight = None;
        Some(expired)
    }

    #[inline]
    pub fn highlighted_cluster(&self) -> Option<ClusterId> {
        self.highlight.map(|h| h.cluster_id)
    }
}
