//! Per-cycle frame snapshot and tap events.

use bevy::prelude::*;

use crate::surface::{SurfaceId, TrackedSurface, TrackingState};
use crate::tracking::FrameSnapshot;

/// A screen tap in pixels (origin top-left) with the viewport it was made in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub position: Vec2,
    pub viewport: Vec2,
}

impl Tap {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            viewport: Vec2::new(width, height),
        }
    }

    /// Normalised device coordinates of the tap (y up).
    pub fn ndc(&self) -> Vec2 {
        Vec2::new(
            2.0 * self.position.x / self.viewport.x - 1.0,
            1.0 - 2.0 * self.position.y / self.viewport.y,
        )
    }
}

/// Everything one cycle works from. Rebuilt every cycle, never persisted.
#[derive(Debug, Clone)]
pub struct Frame {
    pub sequence: u64,
    pub camera_tracking: TrackingState,
    pub view: Mat4,
    pub projection: Mat4,
    pub surfaces: Vec<TrackedSurface>,
}

impl Frame {
    pub fn from_snapshot(snapshot: FrameSnapshot, near: f32, far: f32) -> Self {
        Self {
            sequence: snapshot.sequence,
            camera_tracking: snapshot.camera.tracking,
            view: snapshot.camera.view_matrix(),
            projection: snapshot.camera.projection_matrix(near, far),
            surfaces: snapshot.surfaces,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.camera_tracking.is_tracking()
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&TrackedSurface> {
        self.surfaces.iter().find(|s| s.id == id)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// The frame acquired this cycle, `None` when the session had no frame.
#[derive(Resource, Debug, Default)]
pub struct CurrentFrame(pub Option<Frame>);

impl CurrentFrame {
    pub fn tracking(&self) -> Option<&Frame> {
        self.0.as_ref().filter(|f| f.is_tracking())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndc_corners_and_centre() {
        assert_eq!(Tap::new(540.0, 960.0, 1080.0, 1920.0).ndc(), Vec2::ZERO);
        assert_eq!(Tap::new(0.0, 0.0, 1080.0, 1920.0).ndc(), Vec2::new(-1.0, 1.0));
        assert_eq!(
            Tap::new(1080.0, 1920.0, 1080.0, 1920.0).ndc(),
            Vec2::new(1.0, -1.0)
        );
    }
}
