//! Planar surfaces reported by the tracking subsystem.

use std::fmt;

use bevy::prelude::*;

use crate::pose::Pose;

/// Stable identity of a tracked surface, assigned by the tracking subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOrientation {
    HorizontalUpward,
    HorizontalDownward,
    Vertical,
}

/// Tracking status shared by the camera and by surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingState {
    Tracking,
    #[default]
    Paused,
    Stopped,
}

impl TrackingState {
    pub fn is_tracking(self) -> bool {
        self == TrackingState::Tracking
    }

    pub fn label(self) -> &'static str {
        match self {
            TrackingState::Tracking => "tracking",
            TrackingState::Paused => "paused",
            TrackingState::Stopped => "stopped",
        }
    }
}

/// Snapshot of one detected planar region.
///
/// `polygon` and `extent` live in the surface's local X/Z plane, centred on
/// `center_pose`; `extent` is the full width (X) and depth (Z) of the
/// bounding rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSurface {
    pub id: SurfaceId,
    pub orientation: SurfaceOrientation,
    pub tracking: TrackingState,
    pub center_pose: Pose,
    pub polygon: Vec<Vec2>,
    pub extent: Vec2,
}

impl TrackedSurface {
    /// A tracking, horizontal-upward surface whose polygon is its full extent rectangle.
    pub fn rectangle(id: SurfaceId, center: Vec3, extent: Vec2) -> Self {
        let h = extent * 0.5;
        Self {
            id,
            orientation: SurfaceOrientation::HorizontalUpward,
            tracking: TrackingState::Tracking,
            center_pose: Pose::from_translation(center),
            polygon: vec![
                Vec2::new(-h.x, -h.y),
                Vec2::new(h.x, -h.y),
                Vec2::new(h.x, h.y),
                Vec2::new(-h.x, h.y),
            ],
            extent,
        }
    }

    pub fn with_polygon(mut self, polygon: Vec<Vec2>) -> Self {
        self.polygon = polygon;
        self
    }

    pub fn with_orientation(mut self, orientation: SurfaceOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_tracking(mut self, tracking: TrackingState) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.center_pose.rotation = rotation;
        self
    }

    pub fn is_horizontal_upward(&self) -> bool {
        self.orientation == SurfaceOrientation::HorizontalUpward
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking.is_tracking()
    }

    /// Surface normal in world space (local +Y of the centre pose).
    pub fn normal(&self) -> Vec3 {
        self.center_pose.up()
    }

    /// Point-in-polygon test in surface-local X/Z coordinates.
    pub fn contains_local(&self, point: Vec2) -> bool {
        point_in_polygon(point, &self.polygon)
    }

    /// Whether a world-space pose projects inside the polygon. The pose is
    /// mapped into the surface frame and its height above the plane ignored.
    pub fn contains_pose(&self, pose: &Pose) -> bool {
        let local = self.center_pose.inverse().transform_point(pose.translation);
        self.contains_local(Vec2::new(local.x, local.z))
    }

    /// Polygon vertices in world space, for outline drawing.
    pub fn world_polygon(&self) -> Vec<Vec3> {
        self.polygon
            .iter()
            .map(|v| self.center_pose.transform_point(Vec3::new(v.x, 0.0, v.y)))
            .collect()
    }
}

/// Even-odd ray crossing test. The polygon is implicitly closed.
pub fn point_in_polygon(point: Vec2, vertices: &[Vec2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (vertices[i], vertices[j]);
        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
