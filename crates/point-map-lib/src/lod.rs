//! Zoom-driven level of detail
//!
//! Zoom decides whether per-point labels are shown at all, how many of them are worth
//! rendering, and how fast pointer input should move the camera.

use crate::dataset::{ClusterId, PointId};
use crate::{EngineError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One zoom band and what it allows
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LodTier {
    /// Tier applies from this zoom upward, until the next tier's `min_zoom`
    pub min_zoom: f64,
    /// Label budget for the tier
    pub max_labels: usize,
    /// Multiplier applied to pan/zoom input speed
    pub input_speed_scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LodConfig {
    /// Per-point labels become visible from this zoom upward. Default: 4.0
    pub label_zoom_threshold: f64,
    /// Sorted by ascending `min_zoom`
    pub tiers: Vec<LodTier>,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            label_zoom_threshold: 4.0,
            tiers: vec![
                LodTier {
                    min_zoom: 0.0,
                    max_labels: 12,
                    input_speed_scale: 1.0,
                },
                LodTier {
                    min_zoom: 4.0,
                    max_labels: 64,
                    input_speed_scale: 0.6,
                },
                LodTier {
                    min_zoom: 16.0,
                    max_labels: 256,
                    input_speed_scale: 0.3,
                },
            ],
        }
    }
}

impl LodConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.label_zoom_threshold.is_finite() {
            return Err(EngineError::InvalidConfig(format!(
                "lod.label_zoom_threshold must be finite, got {}",
                self.label_zoom_threshold
            )));
        }
        if self.tiers.is_empty() {
            return Err(EngineError::InvalidConfig(
                "lod.tiers must not be empty".to_string(),
            ));
        }
        for pair in self.tiers.windows(2) {
            if pair[1].min_zoom <= pair[0].min_zoom {
                return Err(EngineError::InvalidConfig(format!(
                    "lod.tiers must be sorted by ascending min_zoom ({} then {})",
                    pair[0].min_zoom, pair[1].min_zoom
                )));
            }
        }
        if let Some(tier) = self
            .tiers
            .iter()
            .find(|t| !(t.input_speed_scale.is_finite() && t.input_speed_scale > 0.0))
        {
            return Err(EngineError::InvalidConfig(format!(
                "lod tier input_speed_scale must be positive, got {}",
                tier.input_speed_scale
            )));
        }
        Ok(())
    }
}

/// Result of evaluating the policy for one zoom value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodDecision {
    pub show_all_labels: bool,
    pub max_rendered_labels: usize,
    pub input_speed_scale: f64,
}

/// Pure mapping from zoom to [`LodDecision`]
#[derive(Debug, Clone)]
pub struct ZoomLodPolicy {
    config: LodConfig,
}

impl ZoomLodPolicy {
    pub fn new(config: LodConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    /// At or above the threshold; NaN never shows labels
    #[inline]
    pub fn show_all_labels(&self, zoom: f64) -> bool {
        zoom >= self.config.label_zoom_threshold
    }

    pub fn evaluate(&self, zoom: f64) -> LodDecision {
        // Highest tier whose min_zoom has been reached, else the lowest tier
        let tier = self
            .config
            .tiers
            .iter()
            .rev()
            .find(|t| zoom >= t.min_zoom)
            .or_else(|| self.config.tiers.first());

        let (max_rendered_labels, input_speed_scale) = tier
            .map(|t| (t.max_labels, t.input_speed_scale))
            .unwrap_or((0, 1.0));

        LodDecision {
            show_all_labels: self.show_all_labels(zoom),
            max_rendered_labels,
            input_speed_scale,
        }
    }
}

/// What a label is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelTarget {
    Cluster(ClusterId),
    Point(PointId),
}

/// Something that can be labeled on screen, ranked by weight
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCandidate {
    pub target: LabelTarget,
    pub text: String,
    pub weight: f64,
}

/// Keep the `k` heaviest candidates, heaviest first
///
/// Ties keep their input order. NaN weights sort last.
pub fn top_k_by_weight(mut candidates: Vec<LabelCandidate>, k: usize) -> Vec<LabelCandidate> {
    candidates.sort_by(|a, b| match (a.weight.is_nan(), b.weight.is_nan()) {
        (false, false) => b.weight.total_cmp(&a.weight),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    });
    candidates.truncate(k);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_threshold_is_inclusive() {
        let policy = ZoomLodPolicy::new(LodConfig::default());
        assert!(policy.evaluate(4.0).show_all_labels);
        assert!(!policy.evaluate(3.9999).show_all_labels);
        assert!(policy.evaluate(4.0001).show_all_labels);
        assert!(!policy.evaluate(1.0).show_all_labels);
        assert!(!policy.evaluate(f64::NAN).show_all_labels);
    }

    #[test]
    fn test_tier_selection() {
        let policy = ZoomLodPolicy::new(LodConfig::default());
        assert_eq!(policy.evaluate(1.0).max_rendered_labels, 12);
        assert_eq!(policy.evaluate(4.0).max_rendered_labels, 64);
        assert_eq!(policy.evaluate(100.0).max_rendered_labels, 256);
        assert_eq!(policy.evaluate(100.0).input_speed_scale, 0.3);
        // Below the lowest tier falls back to the lowest tier
        assert_eq!(policy.evaluate(-1.0).max_rendered_labels, 12);
    }

    #[test]
    fn test_validate() {
        assert!(LodConfig::default().validate().is_ok());

        let mut unsorted = LodConfig::default();
        unsorted.tiers.swap(0, 1);
        assert!(unsorted.validate().is_err());

        let empty = LodConfig {
            tiers: Vec::new(),
            ..LodConfig::default()
        };
        assert!(empty.validate().is_err());
    }

    fn candidate(id: PointId, weight: f64) -> LabelCandidate {
        LabelCandidate {
            target: LabelTarget::Point(id),
            text: format!("p{id}"),
            weight,
        }
    }

    #[test]
    fn test_top_k_by_weight() {
        let candidates = vec![
            candidate(0, 1.0),
            candidate(1, f64::NAN),
            candidate(2, 9.0),
            candidate(3, 5.0),
            candidate(4, 5.0),
        ];
        let top: Vec<LabelTarget> = top_k_by_weight(candidates.clone(), 3)
            .into_iter()
            .map(|c| c.target)
            .collect();
        assert_eq!(
            top,
            vec![LabelTarget::Point(2), LabelTarget::Point(3), LabelTarget::Point(4)]
        );

        let all = top_k_by_weight(candidates, 10);
        assert_eq!(all.last().map(|c| c.target), Some(LabelTarget::Point(1)));
        assert!(top_k_by_weight(Vec::new(), 5).is_empty());
    }
}
