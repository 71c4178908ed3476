//! Engine configuration
//!
//! All tunables live here so the host can build one [`EngineConfig`], validate it once,
//! and hand it to [`crate::Engine::new`].

use crate::camera::Easing;
use crate::lod::LodConfig;
use crate::{EngineError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the spatial grid picks its cell size
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CellSizePolicy {
    /// Use this exact cell size in world units
    Fixed(f64),
    /// `max(extent_x, extent_y) / resolution`, clamped above zero
    TargetResolution(u32),
}

impl Default for CellSizePolicy {
    fn default() -> Self {
        Self::TargetResolution(64)
    }
}

/// Viewport culling throttle and padding
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CullerConfig {
    /// Minimum time between two accepted updates, in milliseconds.
    /// Default: 100
    pub throttle_ms: f64,
    /// Camera rectangle movement (world units, per edge) below which the camera
    /// is considered still. Default: 1e-6
    pub epsilon: f64,
    /// The culling rectangle is grown by this fraction of its own size on each side.
    /// Default: 0.1
    pub padding_fraction: f64,
}

impl Default for CullerConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 100.0,
            epsilon: 1e-6,
            padding_fraction: 0.1,
        }
    }
}

/// Pointer picking threshold and rate limit
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PickingConfig {
    /// Pick radius in screen pixels. Default: 8
    pub pixel_radius: f64,
    /// Minimum time between two pointer-move picks, in milliseconds. Default: 32
    pub min_interval_ms: f64,
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self {
            pixel_radius: 8.0,
            min_interval_ms: 32.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HighlightConfig {
    /// Total highlight lifetime in milliseconds. Default: 2000
    pub duration_ms: f64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnimationConfig {
    /// Duration used when a request does not carry one. Default: 1000
    pub default_duration_ms: f64,
    /// Default: cubic ease-in-out
    pub easing: Easing,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: 1000.0,
            easing: Easing::CubicInOut,
        }
    }
}

/// Size and opacity written for points of selected vs. deselected clusters
///
/// Point size grows with popularity: `log10(weight + 1)` normalized over the dataset,
/// raised to `size_gamma` and mapped into `min_size..=max_size`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VisibilityStyle {
    /// Size of the least popular point. Default: 16
    pub min_size: f32,
    /// Size of the most popular point. Default: 64
    pub max_size: f32,
    /// Above 1 stretches the heavy end, below 1 the light end. Default: 2
    pub size_gamma: f32,
    pub selected_opacity: f32,
    /// Size multiplier for points of deselected clusters. Default: 0.5
    pub deselected_size_scale: f32,
    pub deselected_opacity: f32,
}

impl VisibilityStyle {
    /// Size for a normalized popularity in [0, 1]
    pub fn size_at(&self, popularity: f32) -> f32 {
        let t = popularity.clamp(0.0, 1.0).powf(self.size_gamma);
        (self.min_size + (self.max_size - self.min_size) * t).clamp(self.min_size, self.max_size)
    }
}

impl Default for VisibilityStyle {
    fn default() -> Self {
        Self {
            min_size: 16.0,
            max_size: 64.0,
            size_gamma: 2.0,
            selected_opacity: 1.0,
            deselected_size_scale: 0.5,
            deselected_opacity: 0.1,
        }
    }
}

/// Configuration for the whole engine
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    pub cell_size: CellSizePolicy,
    pub culler: CullerConfig,
    pub picking: PickingConfig,
    pub highlight: HighlightConfig,
    pub animation: AnimationConfig,
    pub lod: LodConfig,
    pub visibility: VisibilityStyle,
}

impl EngineConfig {
    /// Check every tunable once, so per-frame code can rely on sane values
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )))
            }
        }

        match self.cell_size {
            CellSizePolicy::Fixed(size) => positive("cell_size", size)?,
            CellSizePolicy::TargetResolution(0) => {
                return Err(EngineError::InvalidConfig(
                    "cell size resolution must be at least 1".to_string(),
                ));
            }
            CellSizePolicy::TargetResolution(_) => {}
        }

        positive("culler.throttle_ms", self.culler.throttle_ms)?;
        positive("culler.epsilon", self.culler.epsilon)?;
        if !(self.culler.padding_fraction.is_finite() && self.culler.padding_fraction >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "culler.padding_fraction must be non-negative, got {}",
                self.culler.padding_fraction
            )));
        }
        positive("picking.pixel_radius", self.picking.pixel_radius)?;
        if !(self.picking.min_interval_ms.is_finite() && self.picking.min_interval_ms >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "picking.min_interval_ms must be non-negative, got {}",
                self.picking.min_interval_ms
            )));
        }
        positive("highlight.duration_ms", self.highlight.duration_ms)?;
        positive(
            "animation.default_duration_ms",
            self.animation.default_duration_ms,
        )?;

        let style = &self.visibility;
        if !(style.min_size.is_finite() && style.min_size > 0.0 && style.max_size >= style.min_size)
        {
            return Err(EngineError::InvalidConfig(format!(
                "visibility sizes must satisfy 0 < min_size <= max_size, got {}..{}",
                style.min_size, style.max_size
            )));
        }
        positive("visibility.size_gamma", f64::from(style.size_gamma))?;
        let unit = |v: f32| (0.0..=1.0).contains(&v);
        if !(unit(style.selected_opacity)
            && unit(style.deselected_opacity)
            && unit(style.deselected_size_scale))
        {
            return Err(EngineError::InvalidConfig(
                "visibility opacities and deselected_size_scale must lie in [0, 1]".to_string(),
            ));
        }

        self.lod.validate()
    }
}
