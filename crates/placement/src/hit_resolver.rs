//! Turns a screen tap into a world pose for a new vehicle.
//!
//! Two tiers, first success wins:
//!
//! 1. **Native hit-test.** Ask the tracking session, then take the first hit
//!    (session order, no re-ranking) on the primary horizontal-upward surface
//!    whose pose lies inside that surface's polygon.
//! 2. **Manual ray-cast.** Unproject the tap through the inverse of
//!    projection × view and intersect the ray with the planes of processed,
//!    still-tracking surfaces.
//!
//! Tier 2 only needs an owned [`RaycastRequest`], so the frame coordinator
//! can ship it to the async compute pool and apply the result later.

use bevy::prelude::*;

use crate::config::PARALLEL_EPSILON;
use crate::frame::{Frame, Tap};
use crate::placement_error::GeometryFailure;
use crate::placement_params::FallbackStrategy;
use crate::pose::Pose;
use crate::surface::SurfaceId;
use crate::surface_registry::SurfaceRegistry;
use crate::tracking::{HitResult, Trackable, TrackingSession};

/// Which tier produced a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    Native,
    Fallback,
}

/// Tier 1: pick the first native hit on the primary surface, inside its polygon.
pub fn resolve_native(
    frame: &Frame,
    hits: &[HitResult],
    primary: Option<SurfaceId>,
) -> Option<Pose> {
    let primary = primary?;
    hits.iter()
        .find(|hit| match hit.trackable {
            Trackable::HorizontalUpwardSurface(id) => {
                id == primary
                    && frame
                        .surface(id)
                        .is_some_and(|surface| surface.contains_pose(&hit.pose))
            }
            Trackable::OtherSurface(_) | Trackable::FeaturePoint => false,
        })
        .map(|hit| hit.pose)
}

/// A plane the fallback ray is tested against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneCandidate {
    pub surface: SurfaceId,
    pub center: Vec3,
    pub normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackHit {
    pub surface: SurfaceId,
    pub pose: Pose,
    pub distance: f32,
}

/// Owned input for a tier-2 ray-cast; `Send` so it can run off the frame loop.
#[derive(Debug, Clone)]
pub struct RaycastRequest {
    pub view_projection: Mat4,
    pub tap: Tap,
    pub candidates: Vec<PlaneCandidate>,
    pub strategy: FallbackStrategy,
}

impl RaycastRequest {
    /// Snapshot the processed surfaces that are still tracking, in registry order.
    pub fn from_frame(
        frame: &Frame,
        registry: &SurfaceRegistry,
        tap: Tap,
        strategy: FallbackStrategy,
    ) -> Self {
        let candidates = registry
            .processed()
            .filter_map(|id| frame.surface(id))
            .filter(|surface| surface.is_tracking())
            .map(|surface| PlaneCandidate {
                surface: surface.id,
                center: surface.center_pose.translation,
                normal: match strategy {
                    FallbackStrategy::FirstProcessed => Vec3::Y,
                    FallbackStrategy::NearestSurface => surface.normal(),
                },
            })
            .collect();
        Self {
            view_projection: frame.view_projection(),
            tap,
            candidates,
            strategy,
        }
    }

    pub fn cast(&self) -> Result<FallbackHit, GeometryFailure> {
        let ray = screen_ray(self.view_projection, &self.tap)?;
        let mut hits = self.candidates.iter().filter_map(|plane| {
            intersect_plane(&ray, plane.center, plane.normal).map(|t| FallbackHit {
                surface: plane.surface,
                pose: Pose::from_translation(ray.get_point(t)),
                distance: t,
            })
        });
        let hit = match self.strategy {
            FallbackStrategy::FirstProcessed => hits.next(),
            FallbackStrategy::NearestSurface => {
                hits.min_by(|a, b| a.distance.total_cmp(&b.distance))
            }
        };
        hit.ok_or(GeometryFailure::NoIntersection)
    }
}

/// World-space ray through a tap, from the near plane towards the far plane.
pub fn screen_ray(view_projection: Mat4, tap: &Tap) -> Result<Ray3d, GeometryFailure> {
    let det = view_projection.determinant();
    if det == 0.0 || !det.is_finite() {
        return Err(GeometryFailure::SingularViewProjection);
    }
    let inverse = view_projection.inverse();
    if !inverse.is_finite() {
        return Err(GeometryFailure::SingularViewProjection);
    }

    let ndc = tap.ndc();
    let near = unproject(inverse, ndc.extend(-1.0))?;
    let far = unproject(inverse, ndc.extend(1.0))?;
    let direction = Dir3::new(far - near).map_err(|_| GeometryFailure::DegenerateRay)?;
    Ok(Ray3d {
        origin: near,
        direction,
    })
}

fn unproject(inverse: Mat4, clip: Vec3) -> Result<Vec3, GeometryFailure> {
    let world = inverse * clip.extend(1.0);
    if world.w == 0.0 || !world.is_finite() {
        return Err(GeometryFailure::DegenerateRay);
    }
    Ok(world.truncate() / world.w)
}

/// Distance along `ray` to the infinite plane through `center` with `normal`.
/// `None` when the ray is (near-)parallel or the plane is behind the origin.
pub fn intersect_plane(ray: &Ray3d, center: Vec3, normal: Vec3) -> Option<f32> {
    let denom = normal.dot(*ray.direction);
    if denom.abs() <= PARALLEL_EPSILON {
        return None;
    }
    let t = normal.dot(center - ray.origin) / denom;
    (t.is_finite() && t >= 0.0).then_some(t)
}

/// Outcome of the native tier: a pose, or the ray-cast to run instead.
#[derive(Debug, Clone)]
pub enum TapResolution {
    Native(Pose),
    Fallback(RaycastRequest),
}

/// Run the native tier and, on a miss, snapshot the fallback request.
pub fn begin_resolution(
    frame: &Frame,
    registry: &SurfaceRegistry,
    session: &dyn TrackingSession,
    tap: Tap,
    strategy: FallbackStrategy,
) -> TapResolution {
    let hits = session.hit_test(tap.position);
    if let Some(pose) = resolve_native(frame, &hits, registry.primary()) {
        return TapResolution::Native(pose);
    }
    debug!(
        "native hit-test missed ({} hits), falling back to ray-cast",
        hits.len()
    );
    TapResolution::Fallback(RaycastRequest::from_frame(frame, registry, tap, strategy))
}

/// Synchronous two-tier resolution.
pub fn resolve(
    frame: &Frame,
    registry: &SurfaceRegistry,
    session: &dyn TrackingSession,
    tap: Tap,
    strategy: FallbackStrategy,
) -> Option<(Pose, ResolutionTier)> {
    match begin_resolution(frame, registry, session, tap, strategy) {
        TapResolution::Native(pose) => Some((pose, ResolutionTier::Native)),
        TapResolution::Fallback(request) => match request.cast() {
            Ok(hit) => Some((hit.pose, ResolutionTier::Fallback)),
            Err(failure) => {
                debug!("tap at {:?} unresolved: {}", tap.position, failure);
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{TrackedSurface, TrackingState};
    use crate::tracking::{CameraFrame, CameraIntrinsics, FrameSnapshot};

    const W: f32 = 1080.0;
    const H: f32 = 1920.0;

    fn frame_with(eye: Vec3, target: Vec3, surfaces: Vec<TrackedSurface>) -> Frame {
        let snapshot = FrameSnapshot {
            sequence: 1,
            camera: CameraFrame {
                pose: Pose::looking_at(eye, target, Vec3::Y),
                tracking: TrackingState::Tracking,
                intrinsics: CameraIntrinsics {
                    vertical_fov: 60f32.to_radians(),
                    aspect_ratio: W / H,
                },
            },
            surfaces,
        };
        Frame::from_snapshot(snapshot, 0.1, 100.0)
    }

    fn processed(ids: &[u64]) -> SurfaceRegistry {
        let mut reg = SurfaceRegistry::default();
        for id in ids {
            reg.mark_processed(SurfaceId(*id));
        }
        reg
    }

    fn centre_tap() -> Tap {
        Tap::new(W / 2.0, H / 2.0, W, H)
    }

    #[test]
    fn test_centre_tap_hits_surface_in_front_of_camera() {
        // Raised eye: a level eye on the plane is the parallel case below.
        let surface =
            TrackedSurface::rectangle(SurfaceId(1), Vec3::new(0.0, 0.0, -2.0), Vec2::ONE);
        let frame = frame_with(Vec3::new(0.0, 1.5, 0.0), Vec3::new(0.0, 0.0, -2.0), vec![surface]);
        let req = RaycastRequest::from_frame(
            &frame,
            &processed(&[1]),
            centre_tap(),
            FallbackStrategy::FirstProcessed,
        );
        let hit = req.cast().expect("ray hits the plane");
        let p = hit.pose.translation;
        assert!(p.x.abs() < 1e-3, "x = {}", p.x);
        assert!(p.y.abs() < 1e-3, "y = {}", p.y);
        assert!((p.z + 2.0).abs() < 1e-3, "z = {}", p.z);
        assert_eq!(hit.pose.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_level_camera_ray_parallel_to_plane_is_skipped() {
        // Eye on the plane itself, looking straight down -Z: the ray lies in
        // the plane and the near-parallel guard rejects it.
        let surface =
            TrackedSurface::rectangle(SurfaceId(1), Vec3::new(0.0, 0.0, -2.0), Vec2::ONE);
        let frame = frame_with(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0), vec![surface]);
        let req = RaycastRequest::from_frame(
            &frame,
            &processed(&[1]),
            centre_tap(),
            FallbackStrategy::FirstProcessed,
        );
        assert_eq!(req.cast(), Err(GeometryFailure::NoIntersection));
    }

    #[test]
    fn test_singular_view_projection_fails_without_panic() {
        let surface = TrackedSurface::rectangle(SurfaceId(1), Vec3::ZERO, Vec2::ONE);
        let mut frame = frame_with(Vec3::new(0.0, 1.0, 1.0), Vec3::ZERO, vec![surface]);
        frame.view = Mat4::ZERO;
        let req = RaycastRequest::from_frame(
            &frame,
            &processed(&[1]),
            centre_tap(),
            FallbackStrategy::FirstProcessed,
        );
        assert_eq!(req.cast(), Err(GeometryFailure::SingularViewProjection));
    }

    #[test]
    fn test_portrait_viewport_centre_and_corner() {
        let surface = TrackedSurface::rectangle(SurfaceId(1), Vec3::ZERO, Vec2::ONE);
        let reg = processed(&[1]);

        let looking_down = frame_with(Vec3::new(0.0, 1.5, 1.5), Vec3::ZERO, vec![surface.clone()]);
        let hit = RaycastRequest::from_frame(
            &looking_down,
            &reg,
            Tap::new(540.0, 960.0, W, H),
            FallbackStrategy::FirstProcessed,
        )
        .cast()
        .expect("centre tap resolves");
        assert!(hit.pose.translation.length() < 1e-3);

        // Facing the sky: the plane is behind every ray.
        let looking_up = frame_with(Vec3::new(0.0, 1.5, 0.0), Vec3::new(0.0, 5.0, -1.0), vec![surface]);
        let miss = RaycastRequest::from_frame(
            &looking_up,
            &reg,
            Tap::new(0.0, 0.0, W, H),
            FallbackStrategy::FirstProcessed,
        )
        .cast();
        assert_eq!(miss, Err(GeometryFailure::NoIntersection));
    }

    #[test]
    fn test_unprocessed_and_lost_surfaces_are_not_candidates() {
        let a = TrackedSurface::rectangle(SurfaceId(1), Vec3::ZERO, Vec2::ONE);
        let b = TrackedSurface::rectangle(SurfaceId(2), Vec3::ZERO, Vec2::ONE)
            .with_tracking(TrackingState::Paused);
        let c = TrackedSurface::rectangle(SurfaceId(3), Vec3::ZERO, Vec2::ONE);
        let frame = frame_with(Vec3::new(0.0, 1.0, 1.0), Vec3::ZERO, vec![a, b, c]);
        let req = RaycastRequest::from_frame(
            &frame,
            &processed(&[2, 1]),
            centre_tap(),
            FallbackStrategy::FirstProcessed,
        );
        let ids: Vec<SurfaceId> = req.candidates.iter().map(|c| c.surface).collect();
        assert_eq!(ids, vec![SurfaceId(1)]);
    }

    #[test]
    fn test_first_processed_ignores_distance_nearest_does_not() {
        let low = TrackedSurface::rectangle(SurfaceId(1), Vec3::new(0.0, -1.0, 0.0), Vec2::ONE);
        let high = TrackedSurface::rectangle(SurfaceId(2), Vec3::new(0.0, 0.0, 0.0), Vec2::ONE);
        let frame = frame_with(Vec3::new(0.0, 1.0, 1.0), Vec3::ZERO, vec![low, high]);
        let reg = processed(&[1, 2]);

        let first = RaycastRequest::from_frame(&frame, &reg, centre_tap(), FallbackStrategy::FirstProcessed)
            .cast()
            .unwrap();
        assert_eq!(first.surface, SurfaceId(1));

        let nearest = RaycastRequest::from_frame(&frame, &reg, centre_tap(), FallbackStrategy::NearestSurface)
            .cast()
            .unwrap();
        assert_eq!(nearest.surface, SurfaceId(2));
    }

    #[test]
    fn test_first_processed_uses_world_up_even_for_tilted_surface() {
        // Tilted 90 degrees: its true normal is +Z, yet the legacy strategy
        // intersects the horizontal plane through its centre.
        let tilted = TrackedSurface::rectangle(SurfaceId(1), Vec3::ZERO, Vec2::ONE)
            .with_rotation(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2));
        let frame = frame_with(Vec3::new(0.0, 1.0, 1.0), Vec3::ZERO, vec![tilted]);
        let req = RaycastRequest::from_frame(
            &frame,
            &processed(&[1]),
            centre_tap(),
            FallbackStrategy::FirstProcessed,
        );
        assert_eq!(req.candidates[0].normal, Vec3::Y);
        let nearest = RaycastRequest::from_frame(
            &frame,
            &processed(&[1]),
            centre_tap(),
            FallbackStrategy::NearestSurface,
        );
        assert!((nearest.candidates[0].normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_native_tier_requires_primary_and_polygon() {
        let primary = TrackedSurface::rectangle(SurfaceId(1), Vec3::ZERO, Vec2::ONE);
        let other = TrackedSurface::rectangle(SurfaceId(2), Vec3::new(3.0, 0.0, 0.0), Vec2::ONE);
        let frame = frame_with(Vec3::new(0.0, 1.0, 1.0), Vec3::ZERO, vec![primary, other]);

        let outside = HitResult {
            trackable: Trackable::HorizontalUpwardSurface(SurfaceId(1)),
            pose: Pose::from_translation(Vec3::new(2.0, 0.0, 0.0)),
            distance: 1.0,
        };
        let on_other = HitResult {
            trackable: Trackable::HorizontalUpwardSurface(SurfaceId(2)),
            pose: Pose::from_translation(Vec3::new(3.0, 0.0, 0.0)),
            distance: 1.5,
        };
        let point = HitResult {
            trackable: Trackable::FeaturePoint,
            pose: Pose::IDENTITY,
            distance: 0.5,
        };
        let good = HitResult {
            trackable: Trackable::HorizontalUpwardSurface(SurfaceId(1)),
            pose: Pose::from_translation(Vec3::new(0.1, 0.0, 0.1)),
            distance: 2.0,
        };
        let hits = [point, outside, on_other, good];
        assert_eq!(
            resolve_native(&frame, &hits, Some(SurfaceId(1))),
            Some(good.pose)
        );
        assert_eq!(resolve_native(&frame, &hits, None), None);
        assert_eq!(resolve_native(&frame, &hits[..3], Some(SurfaceId(1))), None);
    }

    #[test]
    fn test_native_tier_keeps_session_order() {
        let primary = TrackedSurface::rectangle(SurfaceId(1), Vec3::ZERO, Vec2::ONE);
        let frame = frame_with(Vec3::new(0.0, 1.0, 1.0), Vec3::ZERO, vec![primary]);
        let far = HitResult {
            trackable: Trackable::HorizontalUpwardSurface(SurfaceId(1)),
            pose: Pose::from_translation(Vec3::new(0.2, 0.0, 0.0)),
            distance: 5.0,
        };
        let near = HitResult {
            pose: Pose::from_translation(Vec3::new(-0.2, 0.0, 0.0)),
            distance: 1.0,
            ..far
        };
        assert_eq!(
            resolve_native(&frame, &[far, near], Some(SurfaceId(1))),
            Some(far.pose)
        );
    }

    #[test]
    fn test_resolve_falls_back_when_native_misses() {
        use crate::simulated_session::SimulatedSession;
        let surface = TrackedSurface::rectangle(SurfaceId(1), Vec3::ZERO, Vec2::ONE);
        let (session, handle) = SimulatedSession::new();
        handle.set_scripted_hits(Some(Vec::new()));
        let frame = frame_with(Vec3::new(0.0, 1.0, 1.0), Vec3::ZERO, vec![surface]);
        let mut reg = processed(&[1]);
        reg.observe_primary(&frame.surfaces);
        let (pose, tier) = resolve(
            &frame,
            &reg,
            &session,
            centre_tap(),
            FallbackStrategy::FirstProcessed,
        )
        .expect("fallback resolves");
        assert_eq!(tier, ResolutionTier::Fallback);
        assert!(pose.translation.length() < 1e-3);
    }

    #[test]
    fn test_begin_resolution_prefers_native_hit() {
        use crate::simulated_session::SimulatedSession;
        let surface = TrackedSurface::rectangle(SurfaceId(1), Vec3::ZERO, Vec2::ONE);
        let (session, handle) = SimulatedSession::new();
        let on_primary = HitResult {
            trackable: Trackable::HorizontalUpwardSurface(SurfaceId(1)),
            pose: Pose::from_translation(Vec3::new(0.1, 0.0, 0.0)),
            distance: 1.0,
        };
        handle.set_scripted_hits(Some(vec![on_primary]));
        let frame = frame_with(Vec3::new(0.0, 1.0, 1.0), Vec3::ZERO, vec![surface]);
        let mut reg = processed(&[1]);
        reg.observe_primary(&frame.surfaces);

        let native = begin_resolution(
            &frame,
            &reg,
            &session,
            centre_tap(),
            FallbackStrategy::FirstProcessed,
        );
        assert!(matches!(native, TapResolution::Native(pose) if pose == on_primary.pose));

        handle.set_scripted_hits(Some(Vec::new()));
        let fallback = begin_resolution(
            &frame,
            &reg,
            &session,
            centre_tap(),
            FallbackStrategy::FirstProcessed,
        );
        let TapResolution::Fallback(request) = fallback else {
            panic!("native miss should yield a ray-cast request");
        };
        assert_eq!(request.candidates.len(), 1);
    }
}
