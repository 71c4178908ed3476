//! Point Map Library - Real-time spatial queries for clustered point maps
//!
//! This library is the per-frame engine behind an interactive map of ~10,000 points
//! grouped into clusters. It answers which point is under the cursor, which clusters
//! and points intersect the viewport, and moves the camera smoothly toward a target,
//! while keeping per-frame cost independent of the total point count.
//!
//! # Architecture
//!
//! - **[`Dataset`]**: Immutable points, clusters and membership lookups
//! - **[`SpatialIndex`]**: Uniform grid answering radius/rectangle candidate queries
//! - **[`ViewportCuller`]**: Throttled, change-detected visible cluster/point sets
//! - **[`PickingEngine`]**: Pointer to nearest point within a pixel threshold
//! - **[`AttributeSyncer`]**: Minimal hover/selection/highlight attribute writes
//! - **[`CameraAnimationController`]**: Interruptible eased camera moves
//! - **[`ZoomLodPolicy`]**: Zoom to label/render/input behavior thresholds
//! - **[`Engine`]**: Per-tick orchestration over a single owned [`EngineStore`]
//!
//! # Performance Characteristics
//!
//! - **Build Time**: O(N) for the grid and membership index
//! - **Pick Time**: O((r/cell + 1)^2 + K) cells and candidates, independent of N
//! - **Cull Time**: O(C) clusters plus members of visible selected clusters, and only
//!   when the camera moved and the throttle interval elapsed

mod attributes;
mod camera;
mod config;
mod culler;
mod dataset;
mod engine;
mod lod;
mod picking;
mod selection;
mod spatial;
mod store;
pub mod synthetic;
mod viewport;

#[cfg(feature = "serde")]
pub mod records;

// Public API exports
pub use attributes::{
    AttributeBuffer, AttributeSink, AttributeSyncer, SyncInput, SyncStats, popularity,
};
pub use camera::{
    ActiveAnimation, AnimationState, AnimationStep, CameraAnimationController,
    CameraAnimationRequest, Easing, RequestSlot,
};
pub use config::{
    AnimationConfig, CellSizePolicy, CullerConfig, EngineConfig, HighlightConfig, PickingConfig,
    VisibilityStyle,
};
pub use culler::{CullOutcome, CullRequest, ViewportCuller, VisibleSets};
pub use dataset::{Cluster, ClusterId, Dataset, Point, PointId};
pub use engine::{Engine, EngineInfo, FrameInput, FrameReport, PointerInput};
pub use lod::{
    LabelCandidate, LabelTarget, LodConfig, LodDecision, LodTier, ZoomLodPolicy, top_k_by_weight,
};
pub use picking::{PickHit, PickOutcome, PickingEngine};
pub use selection::{Highlight, SelectionState};
pub use spatial::{Candidates, SpatialIndex};
pub use store::EngineStore;
pub use viewport::{OrthoCamera, ViewportRect};

/// Error types for the engine
///
/// Only construction can fail; per-frame operations degrade to empty results instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Duplicate point id: {0}")]
    DuplicatePointId(PointId),

    #[error("Duplicate cluster id: {0}")]
    DuplicateClusterId(ClusterId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
