//! Seam to the device-tracking subsystem.
//!
//! The core never talks to a tracking SDK directly: everything it consumes
//! per frame arrives through [`TrackingSession`], owned by the
//! [`TrackingBackend`] resource. [`crate::simulated_session::SimulatedSession`]
//! is the in-tree implementation used by the desktop build and the tests.

use std::fmt;

use bevy::prelude::*;

use crate::pose::Pose;
use crate::surface::{SurfaceId, TrackedSurface, TrackingState};

/// Handle to a persistent spatial anchor created by the tracking subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorId(pub u64);

/// What a hit-test ray struck. Only the horizontal-upward case is ever
/// eligible for placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trackable {
    HorizontalUpwardSurface(SurfaceId),
    OtherSurface(SurfaceId),
    FeaturePoint,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub trackable: Trackable,
    pub pose: Pose,
    pub distance: f32,
}

/// Pinhole intrinsics of the tracked camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    /// Vertical field of view in radians.
    pub vertical_fov: f32,
    pub aspect_ratio: f32,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self {
            vertical_fov: 60f32.to_radians(),
            aspect_ratio: 9.0 / 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub pose: Pose,
    pub tracking: TrackingState,
    pub intrinsics: CameraIntrinsics,
}

impl CameraFrame {
    pub fn view_matrix(&self) -> Mat4 {
        self.pose.inverse().to_matrix()
    }

    /// OpenGL-convention projection (clip z in [-1, 1]).
    pub fn projection_matrix(&self, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.intrinsics.vertical_fov,
            self.intrinsics.aspect_ratio,
            near,
            far,
        )
    }
}

/// Everything the tracking subsystem reports for one frame.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub sequence: u64,
    pub camera: CameraFrame,
    pub surfaces: Vec<TrackedSurface>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingError {
    /// The session produced no new frame (not started, paused by the OS, ...).
    NoFrame,
    /// The session cannot create anchors at all.
    AnchorsUnsupported,
    /// Anchor creation was refused for this surface.
    AnchorRejected(SurfaceId),
    UnknownSurface(SurfaceId),
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::NoFrame => write!(f, "no tracking frame available"),
            TrackingError::AnchorsUnsupported => {
                write!(f, "tracking session does not support anchors")
            }
            TrackingError::AnchorRejected(id) => write!(f, "anchor rejected on {id}"),
            TrackingError::UnknownSurface(id) => write!(f, "unknown surface {id}"),
        }
    }
}

impl std::error::Error for TrackingError {}

/// The device-tracking subsystem as seen by the core.
pub trait TrackingSession: Send + Sync + 'static {
    /// Advance the session and return the latest frame.
    fn update(&mut self) -> Result<FrameSnapshot, TrackingError>;

    /// Inform the session of the viewport size in pixels.
    fn set_display_geometry(&mut self, width: f32, height: f32);

    /// Hit-test the most recent frame at a screen position (pixels, origin
    /// top-left). Results are in the subsystem's own order.
    fn hit_test(&self, screen: Vec2) -> Vec<HitResult>;

    fn supports_anchors(&self) -> bool;

    fn create_anchor(&mut self, surface: SurfaceId, pose: Pose) -> Result<AnchorId, TrackingError>;

    fn detach_anchor(&mut self, anchor: AnchorId);

    /// Current pose of an anchor, `None` once detached or unknown.
    fn anchor_pose(&self, anchor: AnchorId) -> Option<Pose>;
}

/// Owns the active tracking session.
#[derive(Resource)]
pub struct TrackingBackend(pub Box<dyn TrackingSession>);

impl TrackingBackend {
    pub fn new(session: impl TrackingSession) -> Self {
        Self(Box::new(session))
    }

    pub fn session(&self) -> &dyn TrackingSession {
        self.0.as_ref()
    }

    pub fn session_mut(&mut self) -> &mut dyn TrackingSession {
        self.0.as_mut()
    }
}

/// Viewport size reported by the host. Forwarded to the session when it changes.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    pub width: f32,
    pub height: f32,
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self {
            width: 1080.0,
            height: 1920.0,
        }
    }
}
