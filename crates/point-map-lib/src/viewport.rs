//! Orthographic camera and the world-space viewport rectangle derived from it

use geo::{Coord, Intersects, Rect};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest zoom the camera math accepts; lower values are clamped
const MIN_ZOOM: f64 = 1e-6;

/// Narrow view of the host camera, read once per tick
///
/// Extents are the orthographic frustum planes at zoom 1, relative to the target.
/// The visible world region is `target + extent / zoom` on each side.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrthoCamera {
    pub target: Coord<f64>,
    pub zoom: f64,
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl OrthoCamera {
    /// Camera centered on `target` whose frustum matches a pixel viewport at zoom 1
    pub fn for_viewport(target: Coord<f64>, zoom: f64, width_px: f64, height_px: f64) -> Self {
        Self {
            target,
            zoom,
            left: -width_px / 2.0,
            right: width_px / 2.0,
            top: height_px / 2.0,
            bottom: -height_px / 2.0,
        }
    }

    /// Zoom clamped to a usable positive value
    #[inline]
    pub fn effective_zoom(&self) -> f64 {
        if self.zoom.is_finite() && self.zoom > MIN_ZOOM {
            self.zoom
        } else {
            MIN_ZOOM
        }
    }

    /// Visible world width at the current zoom
    #[inline]
    pub fn visible_world_width(&self) -> f64 {
        (self.right - self.left) / self.effective_zoom()
    }

    /// Visible world height at the current zoom
    #[inline]
    pub fn visible_world_height(&self) -> f64 {
        (self.top - self.bottom) / self.effective_zoom()
    }

    /// Visible world height if the camera were at `zoom`
    #[inline]
    pub fn visible_world_height_at(&self, zoom: f64) -> f64 {
        Self { zoom, ..*self }.visible_world_height()
    }

    /// World units covered by one screen pixel horizontally
    #[inline]
    pub fn world_units_per_pixel(&self, viewport_width_px: f64) -> f64 {
        self.visible_world_width() / viewport_width_px.max(1.0)
    }

    /// The axis-aligned world region currently visible
    pub fn viewport_rect(&self) -> ViewportRect {
        let zoom = self.effective_zoom();
        ViewportRect::new(
            self.target.x + self.left / zoom,
            self.target.x + self.right / zoom,
            self.target.y + self.bottom / zoom,
            self.target.y + self.top / zoom,
        )
    }

    /// Convert a screen pixel position (origin top-left, y down) to world coordinates
    pub fn screen_to_world(
        &self,
        screen_x: f64,
        screen_y: f64,
        viewport_width_px: f64,
        viewport_height_px: f64,
    ) -> Coord<f64> {
        let rect = self.viewport_rect();
        let u = screen_x / viewport_width_px.max(1.0);
        let v = screen_y / viewport_height_px.max(1.0);
        Coord {
            x: rect.min_x() + u * rect.width(),
            y: rect.max_y() - v * rect.height(),
        }
    }
}

/// World-space rectangle currently on screen
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ViewportRect(Rect<f64>);

impl ViewportRect {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self(Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        ))
    }

    #[inline]
    pub fn min_x(&self) -> f64 {
        self.0.min().x
    }

    #[inline]
    pub fn max_x(&self) -> f64 {
        self.0.max().x
    }

    #[inline]
    pub fn min_y(&self) -> f64 {
        self.0.min().y
    }

    #[inline]
    pub fn max_y(&self) -> f64 {
        self.0.max().y
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.0.width()
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.0.height()
    }

    #[inline]
    pub fn as_rect(&self) -> Rect<f64> {
        self.0
    }

    /// Grow by `fraction` of the rectangle's own width/height on every side
    pub fn padded(&self, fraction: f64) -> Self {
        let pad_x = self.width() * fraction;
        let pad_y = self.height() * fraction;
        Self::new(
            self.min_x() - pad_x,
            self.max_x() + pad_x,
            self.min_y() - pad_y,
            self.max_y() + pad_y,
        )
    }

    /// Whether any edge differs from `other` by more than `epsilon`
    pub fn moved_beyond(&self, other: &Self, epsilon: f64) -> bool {
        (self.min_x() - other.min_x()).abs() > epsilon
            || (self.max_x() - other.max_x()).abs() > epsilon
            || (self.min_y() - other.min_y()).abs() > epsilon
            || (self.max_y() - other.max_y()).abs() > epsilon
    }

    /// Boundary-inclusive point test
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x() && x <= self.max_x() && y >= self.min_y() && y <= self.max_y()
    }

    /// Boundary-inclusive rectangle overlap test
    #[inline]
    pub fn intersects(&self, bounds: &Rect<f64>) -> bool {
        self.0.intersects(bounds)
    }
}

impl From<Rect<f64>> for ViewportRect {
    fn from(rect: Rect<f64>) -> Self {
        Self(rect)
    }
}
