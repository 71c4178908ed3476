//! Camera animation
//!
//! A depth-1 request slot written by UI intent, and a two-state controller that drains
//! it once per tick and eases the camera toward the requested target and zoom.

use crate::viewport::OrthoCamera;
use geo::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maps linear progress in [0, 1] to eased progress in [0, 1]
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Easing {
    Linear,
    #[default]
    CubicInOut,
    QuadInOut,
    SineInOut,
    Smoothstep,
    /// Caller-supplied curve; must map 0 to 0 and 1 to 1
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(fn(f64) -> f64),
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let x = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => x,
            Self::CubicInOut => {
                if x < 0.5 {
                    4.0 * x * x * x
                } else {
                    1.0 - (-2.0 * x + 2.0).powi(3) / 2.0
                }
            }
            Self::QuadInOut => {
                if x < 0.5 {
                    2.0 * x * x
                } else {
                    1.0 - (-2.0 * x + 2.0).powi(2) / 2.0
                }
            }
            Self::SineInOut => 0.5 - 0.5 * (std::f64::consts::PI * x).cos(),
            Self::Smoothstep => x * x * (3.0 - 2.0 * x),
            Self::Custom(f) => f(x),
        }
    }
}

impl PartialEq for Easing {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

/// Where the UI wants the camera to go
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraAnimationRequest {
    pub target: Coord<f64>,
    pub zoom: f64,
    /// Normalized vertical screen position (0 = top, 1 = bottom) where the target
    /// should land. `None` centers it.
    pub screen_anchor: Option<f64>,
    /// Overrides the configured default duration
    pub duration_ms: Option<f64>,
}

impl CameraAnimationRequest {
    pub fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self {
            target: Coord { x, y },
            zoom,
            screen_anchor: None,
            duration_ms: None,
        }
    }

    pub fn with_screen_anchor(mut self, anchor: f64) -> Self {
        self.screen_anchor = Some(anchor);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Depth-1 queue of animation requests
///
/// A new request replaces an unconsumed one. The slot is only drained by the
/// controller once a camera is available, so a request made before the camera
/// mounts waits here.
#[derive(Debug, Clone, Default)]
pub struct RequestSlot {
    pending: Option<CameraAnimationRequest>,
}

impl RequestSlot {
    /// Store a request, returning the unconsumed one it replaced
    pub fn submit(&mut self, request: CameraAnimationRequest) -> Option<CameraAnimationRequest> {
        let replaced = self.pending.replace(request);
        if replaced.is_some() {
            tracing::trace!("Replacing unconsumed camera animation request");
        }
        replaced
    }

    #[inline]
    pub fn take(&mut self) -> Option<CameraAnimationRequest> {
        self.pending.take()
    }

    #[inline]
    pub fn peek(&self) -> Option<&CameraAnimationRequest> {
        self.pending.as_ref()
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// An animation in flight: snapshots taken when it started plus elapsed time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveAnimation {
    pub start_target: Coord<f64>,
    pub start_zoom: f64,
    pub end_target: Coord<f64>,
    pub end_zoom: f64,
    pub elapsed_ms: f64,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl ActiveAnimation {
    /// Linear progress in [0, 1]
    #[inline]
    pub fn progress(&self) -> f64 {
        (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Camera target and zoom after `elapsed_ms`
    ///
    /// Returns the start values exactly at 0 and the end values exactly once the
    /// duration is reached.
    pub fn sample(&self, elapsed_ms: f64) -> (Coord<f64>, f64) {
        if elapsed_ms >= self.duration_ms {
            return (self.end_target, self.end_zoom);
        }
        let t = self.easing.apply(elapsed_ms / self.duration_ms);
        let target = Coord {
            x: lerp(self.start_target.x, self.end_target.x, t),
            y: lerp(self.start_target.y, self.end_target.y, t),
        };
        (target, lerp(self.start_zoom, self.end_zoom, t))
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AnimationState {
    #[default]
    Idle,
    Animating(ActiveAnimation),
}

/// What one controller tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationStep {
    /// Nothing requested, nothing running
    Idle,
    /// A request (or a running animation) is waiting for the camera to become available
    WaitingForCamera,
    /// A request was accepted; the camera still shows the start values
    Started,
    /// Camera moved; carries linear progress
    Stepped(f64),
    /// Camera snapped to the requested end values
    Finished,
}

/// Eases the camera toward requested targets, one tick at a time
#[derive(Debug, Clone)]
pub struct CameraAnimationController {
    state: AnimationState,
    easing: Easing,
    default_duration_ms: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl CameraAnimationController {
    pub fn new(easing: Easing, default_duration_ms: f64) -> Self {
        Self {
            state: AnimationState::Idle,
            easing,
            default_duration_ms,
        }
    }

    #[inline]
    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    #[inline]
    pub fn is_animating(&self) -> bool {
        matches!(self.state, AnimationState::Animating(_))
    }

    /// Advance by one tick
    ///
    /// With no camera, a pending request stays in `slot` and a running animation is
    /// paused; both resume on the first tick that supplies a camera. A request taken
    /// from the slot starts from the camera's current values, so a request arriving
    /// mid-animation continues from the interpolated position.
    pub fn tick(
        &mut self,
        slot: &mut RequestSlot,
        camera: Option<&mut OrthoCamera>,
        delta_ms: f64,
    ) -> AnimationStep {
        let Some(camera) = camera else {
            if slot.is_pending() || self.is_animating() {
                tracing::trace!("Camera not ready, deferring animation");
                return AnimationStep::WaitingForCamera;
            }
            return AnimationStep::Idle;
        };

        if let Some(request) = slot.take() {
            return self.start(request, camera);
        }

        let AnimationState::Animating(anim) = &mut self.state else {
            return AnimationStep::Idle;
        };

        anim.elapsed_ms += delta_ms.max(0.0);
        let (target, zoom) = anim.sample(anim.elapsed_ms);
        camera.target = target;
        camera.zoom = zoom;

        if anim.elapsed_ms >= anim.duration_ms {
            tracing::debug!(x = target.x, y = target.y, zoom, "Camera animation finished");
            self.state = AnimationState::Idle;
            AnimationStep::Finished
        } else {
            AnimationStep::Stepped(anim.progress())
        }
    }

    fn start(&mut self, request: CameraAnimationRequest, camera: &mut OrthoCamera) -> AnimationStep {
        let mut end_target = request.target;
        if let Some(anchor) = request.screen_anchor {
            end_target.y +=
                (anchor.clamp(0.0, 1.0) - 0.5) * camera.visible_world_height_at(request.zoom);
        }

        let duration_ms = request.duration_ms.unwrap_or(self.default_duration_ms);
        if !(duration_ms.is_finite() && duration_ms > 0.0) {
            camera.target = end_target;
            camera.zoom = request.zoom;
            self.state = AnimationState::Idle;
            tracing::debug!("Camera animation with zero duration applied immediately");
            return AnimationStep::Finished;
        }

        tracing::debug!(
            from_x = camera.target.x,
            from_y = camera.target.y,
            to_x = end_target.x,
            to_y = end_target.y,
            zoom = request.zoom,
            duration_ms,
            "Camera animation started"
        );

        self.state = AnimationState::Animating(ActiveAnimation {
            start_target: camera.target,
            start_zoom: camera.zoom,
            end_target,
            end_zoom: request.zoom,
            elapsed_ms: 0.0,
            duration_ms,
            easing: self.easing,
        });
        AnimationStep::Started
    }
}

impl Default for CameraAnimationController {
    fn default() -> Self {
        Self::new(Easing::CubicInOut, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrthoCamera {
        OrthoCamera::for_viewport(Coord { x: 0.0, y: 0.0 }, 1.0, 800.0, 600.0)
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::CubicInOut,
            Easing::QuadInOut,
            Easing::SineInOut,
            Easing::Smoothstep,
        ] {
            assert_eq!(easing.apply(0.0), 0.0, "{easing:?}");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-12, "{easing:?}");
            assert!((easing.apply(0.5) - 0.5).abs() < 1e-12, "{easing:?}");
            assert!(easing.apply(0.25) <= easing.apply(0.75));
        }
        assert_eq!(Easing::CubicInOut.apply(-3.0), 0.0);
    }

    #[test]
    fn test_custom_easing() {
        fn square(t: f64) -> f64 {
            t * t
        }
        let easing = Easing::Custom(square);
        assert_eq!(easing.apply(0.5), 0.25);
        assert_eq!(easing, Easing::Custom(square));
        assert_ne!(easing, Easing::Linear);
    }

    #[test]
    fn test_sample_endpoints_exact() {
        let anim = ActiveAnimation {
            start_target: Coord { x: 0.1, y: -3.7 },
            start_zoom: 1.3,
            end_target: Coord { x: 5.0, y: 5.0 },
            end_zoom: 10.0,
            elapsed_ms: 0.0,
            duration_ms: 1000.0,
            easing: Easing::CubicInOut,
        };
        assert_eq!(anim.sample(0.0), (Coord { x: 0.1, y: -3.7 }, 1.3));
        assert_eq!(anim.sample(1000.0), (Coord { x: 5.0, y: 5.0 }, 10.0));
        assert_eq!(anim.sample(1500.0), (Coord { x: 5.0, y: 5.0 }, 10.0));
    }

    #[test]
    fn test_waits_for_camera_then_reaches_target() {
        let mut controller = CameraAnimationController::default();
        let mut slot = RequestSlot::default();
        slot.submit(CameraAnimationRequest::new(5.0, 5.0, 10.0).with_duration_ms(1000.0));

        // Ticks 1..=3: no camera handle yet
        for _ in 0..3 {
            assert_eq!(
                controller.tick(&mut slot, None, 16.0),
                AnimationStep::WaitingForCamera
            );
            assert!(slot.is_pending());
        }

        // Tick 4: camera mounts, easing starts from its current values
        let mut cam = camera();
        assert_eq!(
            controller.tick(&mut slot, Some(&mut cam), 16.0),
            AnimationStep::Started
        );
        assert_eq!(cam.target, Coord { x: 0.0, y: 0.0 });
        assert_eq!(cam.zoom, 1.0);

        // 1000 ms after the start tick the camera sits exactly on the target
        let mut last = AnimationStep::Idle;
        for _ in 0..10 {
            last = controller.tick(&mut slot, Some(&mut cam), 100.0);
        }
        assert_eq!(last, AnimationStep::Finished);
        assert_eq!(cam.target, Coord { x: 5.0, y: 5.0 });
        assert_eq!(cam.zoom, 10.0);
        assert!(!controller.is_animating());
    }

    #[test]
    fn test_not_finished_before_duration() {
        let mut controller = CameraAnimationController::default();
        let mut slot = RequestSlot::default();
        let mut cam = camera();
        slot.submit(CameraAnimationRequest::new(10.0, 0.0, 1.0).with_duration_ms(1000.0));
        controller.tick(&mut slot, Some(&mut cam), 16.0);

        let step = controller.tick(&mut slot, Some(&mut cam), 500.0);
        assert_eq!(step, AnimationStep::Stepped(0.5));
        // Cubic ease-in-out is symmetric around the midpoint
        assert!((cam.target.x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_new_request_restarts_from_current_position() {
        let mut controller = CameraAnimationController::default();
        let mut slot = RequestSlot::default();
        let mut cam = camera();

        slot.submit(CameraAnimationRequest::new(100.0, 0.0, 1.0).with_duration_ms(1000.0));
        controller.tick(&mut slot, Some(&mut cam), 0.0);
        controller.tick(&mut slot, Some(&mut cam), 500.0);
        let midway = cam.target;

        slot.submit(CameraAnimationRequest::new(-50.0, 20.0, 2.0).with_duration_ms(400.0));
        assert_eq!(
            controller.tick(&mut slot, Some(&mut cam), 16.0),
            AnimationStep::Started
        );
        let AnimationState::Animating(anim) = controller.state() else {
            panic!("expected an animation in flight");
        };
        assert_eq!(anim.start_target, midway);
        assert_eq!(anim.end_target, Coord { x: -50.0, y: 20.0 });

        controller.tick(&mut slot, Some(&mut cam), 400.0);
        assert_eq!(cam.target, Coord { x: -50.0, y: 20.0 });
        assert_eq!(cam.zoom, 2.0);
    }

    #[test]
    fn test_screen_anchor_offsets_target() {
        let mut controller = CameraAnimationController::default();
        let mut slot = RequestSlot::default();
        let mut cam = camera();

        slot.submit(
            CameraAnimationRequest::new(0.0, 0.0, 2.0)
                .with_screen_anchor(0.25)
                .with_duration_ms(100.0),
        );
        controller.tick(&mut slot, Some(&mut cam), 0.0);
        controller.tick(&mut slot, Some(&mut cam), 100.0);

        // Visible height at zoom 2 is 300; (0.25 - 0.5) * 300 = -75
        assert_eq!(cam.target, Coord { x: 0.0, y: -75.0 });
        let rect = cam.viewport_rect();
        let from_top = (rect.max_y() - 0.0) / rect.height();
        assert!((from_top - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_zero_duration_snaps() {
        let mut controller = CameraAnimationController::default();
        let mut slot = RequestSlot::default();
        let mut cam = camera();
        slot.submit(CameraAnimationRequest::new(3.0, 4.0, 5.0).with_duration_ms(0.0));
        assert_eq!(
            controller.tick(&mut slot, Some(&mut cam), 16.0),
            AnimationStep::Finished
        );
        assert_eq!(cam.target, Coord { x: 3.0, y: 4.0 });
        assert_eq!(cam.zoom, 5.0);
    }

    #[test]
    fn test_paused_animation_resumes() {
        let mut controller = CameraAnimationController::default();
        let mut slot = RequestSlot::default();
        let mut cam = camera();
        slot.submit(CameraAnimationRequest::new(10.0, 0.0, 1.0).with_duration_ms(200.0));
        controller.tick(&mut slot, Some(&mut cam), 0.0);
        controller.tick(&mut slot, Some(&mut cam), 100.0);

        assert_eq!(
            controller.tick(&mut slot, None, 5000.0),
            AnimationStep::WaitingForCamera
        );
        assert!(controller.is_animating());

        assert_eq!(
            controller.tick(&mut slot, Some(&mut cam), 100.0),
            AnimationStep::Finished
        );
        assert_eq!(cam.target.x, 10.0);
    }

    #[test]
    fn test_slot_overwrites() {
        let mut slot = RequestSlot::default();
        assert!(slot.submit(CameraAnimationRequest::new(1.0, 1.0, 1.0)).is_none());
        let replaced = slot.submit(CameraAnimationRequest::new(2.0, 2.0, 2.0));
        assert_eq!(replaced.map(|r| r.zoom), Some(1.0));
        assert_eq!(slot.peek().map(|r| r.zoom), Some(2.0));
        assert!(slot.take().is_some());
        assert!(!slot.is_pending());
    }
}
