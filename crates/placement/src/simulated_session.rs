//! In-process tracking session.
//!
//! Stands in for the device SDK on desktop and in tests. State lives behind a
//! shared [`SessionHandle`] so a driver (the demo scene, the test harness)
//! can move the camera, reveal surfaces and inject failures while the
//! session itself is owned by [`crate::tracking::TrackingBackend`].

use std::sync::Arc;

use bevy::prelude::*;
use parking_lot::Mutex;

use crate::pose::Pose;
use crate::surface::{SurfaceId, TrackedSurface, TrackingState};
use crate::tracking::{
    AnchorId, CameraFrame, CameraIntrinsics, FrameSnapshot, HitResult, Trackable, TrackingError,
    TrackingSession,
};

#[derive(Debug, Clone)]
struct AnchorRecord {
    id: AnchorId,
    surface: SurfaceId,
    /// Pose relative to the surface centre at creation time.
    local: Pose,
}

#[derive(Debug)]
struct SimState {
    sequence: u64,
    frames_available: bool,
    camera: CameraFrame,
    viewport: Vec2,
    surfaces: Vec<TrackedSurface>,
    anchors: Vec<AnchorRecord>,
    next_anchor: u64,
    anchors_supported: bool,
    /// Remaining anchor creations before every request is rejected.
    anchor_budget: Option<usize>,
    scripted_hits: Option<Vec<HitResult>>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            sequence: 0,
            frames_available: true,
            camera: CameraFrame {
                pose: Pose::IDENTITY,
                tracking: TrackingState::Tracking,
                intrinsics: CameraIntrinsics::default(),
            },
            viewport: Vec2::new(1080.0, 1920.0),
            surfaces: Vec::new(),
            anchors: Vec::new(),
            next_anchor: 1,
            anchors_supported: true,
            anchor_budget: None,
            scripted_hits: None,
        }
    }
}

pub struct SimulatedSession {
    state: Arc<Mutex<SimState>>,
}

/// Driver-side handle onto a [`SimulatedSession`].
#[derive(Resource, Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedSession {
    pub fn new() -> (Self, SessionHandle) {
        let state = Arc::new(Mutex::new(SimState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            SessionHandle { state },
        )
    }
}

impl SessionHandle {
    pub fn set_camera_pose(&self, pose: Pose) {
        self.state.lock().camera.pose = pose;
    }

    pub fn camera_pose(&self) -> Pose {
        self.state.lock().camera.pose
    }

    pub fn set_camera_tracking(&self, tracking: TrackingState) {
        self.state.lock().camera.tracking = tracking;
    }

    pub fn camera_tracking(&self) -> TrackingState {
        self.state.lock().camera.tracking
    }

    pub fn set_intrinsics(&self, intrinsics: CameraIntrinsics) {
        self.state.lock().camera.intrinsics = intrinsics;
    }

    pub fn set_frames_available(&self, available: bool) {
        self.state.lock().frames_available = available;
    }

    /// Add a surface, replacing any existing surface with the same id.
    pub fn add_surface(&self, surface: TrackedSurface) {
        let mut state = self.state.lock();
        match state.surfaces.iter_mut().find(|s| s.id == surface.id) {
            Some(existing) => *existing = surface,
            None => state.surfaces.push(surface),
        }
    }

    pub fn surface(&self, id: SurfaceId) -> Option<TrackedSurface> {
        self.state.lock().surfaces.iter().find(|s| s.id == id).cloned()
    }

    pub fn surface_count(&self) -> usize {
        self.state.lock().surfaces.len()
    }

    pub fn set_surface_tracking(&self, id: SurfaceId, tracking: TrackingState) {
        if let Some(s) = self.state.lock().surfaces.iter_mut().find(|s| s.id == id) {
            s.tracking = tracking;
        }
    }

    /// Move a surface's centre, as the device SDK does when it refines a plane.
    pub fn set_surface_pose(&self, id: SurfaceId, pose: Pose) {
        if let Some(s) = self.state.lock().surfaces.iter_mut().find(|s| s.id == id) {
            s.center_pose = pose;
        }
    }

    pub fn set_anchor_support(&self, supported: bool) {
        self.state.lock().anchors_supported = supported;
    }

    /// Accept `n` more anchors, then reject every further request.
    pub fn fail_anchors_after(&self, n: usize) {
        self.state.lock().anchor_budget = Some(n);
    }

    pub fn clear_anchor_failures(&self) {
        self.state.lock().anchor_budget = None;
    }

    pub fn live_anchor_count(&self) -> usize {
        self.state.lock().anchors.len()
    }

    /// Override hit-test results; `None` restores geometric hit-testing.
    pub fn set_scripted_hits(&self, hits: Option<Vec<HitResult>>) {
        self.state.lock().scripted_hits = hits;
    }
}

impl SimState {
    /// Geometric hit test against every tracking surface's true plane and polygon.
    fn cast(&self, screen: Vec2) -> Vec<HitResult> {
        let ndc = Vec2::new(
            2.0 * screen.x / self.viewport.x - 1.0,
            1.0 - 2.0 * screen.y / self.viewport.y,
        );
        let half_h = (self.camera.intrinsics.vertical_fov * 0.5).tan();
        let half_w = half_h * self.camera.intrinsics.aspect_ratio;
        let local_dir = Vec3::new(ndc.x * half_w, ndc.y * half_h, -1.0).normalize();
        let origin = self.camera.pose.translation;
        let dir = self.camera.pose.rotation * local_dir;

        let mut hits: Vec<HitResult> = self
            .surfaces
            .iter()
            .filter(|s| s.is_tracking())
            .filter_map(|s| {
                let normal = s.normal();
                let denom = normal.dot(dir);
                if denom.abs() <= f32::EPSILON {
                    return None;
                }
                let t = normal.dot(s.center_pose.translation - origin) / denom;
                if t <= 0.0 {
                    return None;
                }
                let pose = Pose::new(origin + dir * t, s.center_pose.rotation);
                if !s.contains_pose(&pose) {
                    return None;
                }
                let trackable = if s.is_horizontal_upward() {
                    Trackable::HorizontalUpwardSurface(s.id)
                } else {
                    Trackable::OtherSurface(s.id)
                };
                Some(HitResult {
                    trackable,
                    pose,
                    distance: t,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

impl TrackingSession for SimulatedSession {
    fn update(&mut self) -> Result<FrameSnapshot, TrackingError> {
        let mut state = self.state.lock();
        if !state.frames_available {
            return Err(TrackingError::NoFrame);
        }
        state.sequence += 1;
        Ok(FrameSnapshot {
            sequence: state.sequence,
            camera: state.camera,
            surfaces: state.surfaces.clone(),
        })
    }

    fn set_display_geometry(&mut self, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let mut state = self.state.lock();
        state.viewport = Vec2::new(width, height);
        state.camera.intrinsics.aspect_ratio = width / height;
    }

    fn hit_test(&self, screen: Vec2) -> Vec<HitResult> {
        let state = self.state.lock();
        match &state.scripted_hits {
            Some(hits) => hits.clone(),
            None => state.cast(screen),
        }
    }

    fn supports_anchors(&self) -> bool {
        self.state.lock().anchors_supported
    }

    fn create_anchor(&mut self, surface: SurfaceId, pose: Pose) -> Result<AnchorId, TrackingError> {
        let mut state = self.state.lock();
        if !state.anchors_supported {
            return Err(TrackingError::AnchorsUnsupported);
        }
        if let Some(budget) = state.anchor_budget.as_mut() {
            if *budget == 0 {
                return Err(TrackingError::AnchorRejected(surface));
            }
            *budget -= 1;
        }
        let center = state
            .surfaces
            .iter()
            .find(|s| s.id == surface)
            .map(|s| s.center_pose)
            .ok_or(TrackingError::UnknownSurface(surface))?;
        let id = AnchorId(state.next_anchor);
        state.next_anchor += 1;
        state.anchors.push(AnchorRecord {
            id,
            surface,
            local: center.inverse().compose(&pose),
        });
        Ok(id)
    }

    fn detach_anchor(&mut self, anchor: AnchorId) {
        self.state.lock().anchors.retain(|a| a.id != anchor);
    }

    fn anchor_pose(&self, anchor: AnchorId) -> Option<Pose> {
        let state = self.state.lock();
        let record = state.anchors.iter().find(|a| a.id == anchor)?;
        let surface = state.surfaces.iter().find(|s| s.id == record.surface)?;
        Some(surface.center_pose.compose(&record.local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor() -> TrackedSurface {
        TrackedSurface::rectangle(SurfaceId(1), Vec3::ZERO, Vec2::splat(2.0))
    }

    #[test]
    fn test_update_reports_surfaces_and_sequence() {
        let (mut session, handle) = SimulatedSession::new();
        handle.add_surface(floor());
        let a = session.update().unwrap();
        let b = session.update().unwrap();
        assert_eq!(a.surfaces.len(), 1);
        assert_eq!(b.sequence, a.sequence + 1);
    }

    #[test]
    fn test_no_frame_when_unavailable() {
        let (mut session, handle) = SimulatedSession::new();
        handle.set_frames_available(false);
        assert_eq!(session.update().unwrap_err(), TrackingError::NoFrame);
    }

    #[test]
    fn test_geometric_hit_at_screen_centre() {
        let (mut session, handle) = SimulatedSession::new();
        handle.add_surface(floor());
        handle.set_camera_pose(Pose::looking_at(Vec3::new(0.0, 1.0, 1.0), Vec3::ZERO, Vec3::Y));
        session.set_display_geometry(1080.0, 1920.0);
        let hits = session.hit_test(Vec2::new(540.0, 960.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].trackable, Trackable::HorizontalUpwardSurface(SurfaceId(1)));
        assert!(hits[0].pose.translation.length() < 1e-4);
    }

    #[test]
    fn test_hit_outside_polygon_is_dropped() {
        let (session, handle) = SimulatedSession::new();
        handle.add_surface(TrackedSurface::rectangle(
            SurfaceId(1),
            Vec3::new(5.0, 0.0, 0.0),
            Vec2::splat(0.5),
        ));
        handle.set_camera_pose(Pose::looking_at(Vec3::new(0.0, 1.0, 1.0), Vec3::ZERO, Vec3::Y));
        assert!(session.hit_test(Vec2::new(540.0, 960.0)).is_empty());
    }

    #[test]
    fn test_anchor_follows_surface_drift() {
        let (mut session, handle) = SimulatedSession::new();
        handle.add_surface(floor());
        let anchor = session
            .create_anchor(SurfaceId(1), Pose::from_translation(Vec3::new(0.2, 0.0, 0.0)))
            .unwrap();
        handle.set_surface_pose(SurfaceId(1), Pose::from_translation(Vec3::new(0.0, 0.1, 0.0)));
        let pose = session.anchor_pose(anchor).unwrap();
        assert!((pose.translation - Vec3::new(0.2, 0.1, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_anchor_budget_and_detach() {
        let (mut session, handle) = SimulatedSession::new();
        handle.add_surface(floor());
        handle.fail_anchors_after(1);
        let a = session.create_anchor(SurfaceId(1), Pose::IDENTITY).unwrap();
        assert_eq!(
            session.create_anchor(SurfaceId(1), Pose::IDENTITY),
            Err(TrackingError::AnchorRejected(SurfaceId(1)))
        );
        session.detach_anchor(a);
        assert_eq!(handle.live_anchor_count(), 0);
        assert!(session.anchor_pose(a).is_none());
    }

    #[test]
    fn test_anchor_on_unknown_surface() {
        let (mut session, _handle) = SimulatedSession::new();
        assert_eq!(
            session.create_anchor(SurfaceId(9), Pose::IDENTITY),
            Err(TrackingError::UnknownSurface(SurfaceId(9)))
        );
    }
}
