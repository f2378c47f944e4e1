//! Procedural buildings: one batch per processed surface.
//!
//! Generation is split in two. [`BuildingGenerator::sample`] is pure: it
//! draws `buildings_per_surface` candidates inside the central
//! `sample_fraction` of the surface extent and keeps only those that also lie
//! inside the surface polygon. [`BuildingGenerator::generate`] then attaches
//! every accepted candidate, either as an anchor (when the session supports
//! them) or as a static pose copy. A failed anchor rolls the whole batch
//! back, so a surface never ends up with a partial set.

use std::collections::BTreeMap;

use bevy::prelude::*;
use rand::Rng;

use crate::placement_error::PlacementError;
use crate::placement_params::PlacementParams;
use crate::pose::Pose;
use crate::surface::{SurfaceId, TrackedSurface};
use crate::tracking::{AnchorId, TrackingSession};

/// How a building is held in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attachment {
    /// Follows the tracking subsystem's anchor, immune to surface pose drift.
    Anchor(AnchorId),
    /// World pose captured at generation time.
    Pose(Pose),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub surface: SurfaceId,
    /// Offset (x, z) from the surface centre, in the surface's local frame.
    pub offset: Vec2,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub color: LinearRgba,
    pub attachment: Attachment,
}

impl Building {
    /// World pose of the building base. `None` when its anchor is gone.
    pub fn world_pose(&self, session: &dyn TrackingSession) -> Option<Pose> {
        match self.attachment {
            Attachment::Anchor(anchor) => session.anchor_pose(anchor),
            Attachment::Pose(pose) => Some(pose),
        }
    }

    /// Model matrix for a unit footprint mesh spanning `y` in `[0, 1]`.
    pub fn model_matrix(&self, base: &Pose) -> Mat4 {
        base.to_matrix() * Mat4::from_scale(Vec3::new(self.width, self.height, self.depth))
    }
}

/// A validated candidate before it is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingDraft {
    pub offset: Vec2,
    pub height: f32,
    pub color: LinearRgba,
}

/// Outcome of sampling one surface.
#[derive(Debug, Clone, Default)]
pub struct SampleReport {
    pub accepted: Vec<BuildingDraft>,
    pub rejected: usize,
}

#[derive(Debug, Clone)]
pub struct BuildingGenerator {
    pub per_surface: usize,
    pub sample_fraction: f32,
    pub footprint: f32,
    pub height_min: f32,
    pub height_max: f32,
    pub use_anchors: bool,
}

impl Default for BuildingGenerator {
    fn default() -> Self {
        Self::from_params(&PlacementParams::default())
    }
}

impl BuildingGenerator {
    pub fn from_params(params: &PlacementParams) -> Self {
        Self {
            per_surface: params.buildings_per_surface,
            sample_fraction: params.sample_fraction,
            footprint: params.building_footprint,
            height_min: params.building_height_min,
            height_max: params.building_height_max,
            use_anchors: params.use_anchors,
        }
    }

    /// Draw candidates and validate them. Rejected candidates are dropped,
    /// not retried, so `accepted.len() <= per_surface`.
    pub fn sample(&self, surface: &TrackedSurface, rng: &mut impl Rng) -> SampleReport {
        let mut report = SampleReport::default();
        let span = surface.extent * self.sample_fraction;
        let half = span * 0.5;

        for _ in 0..self.per_surface {
            let offset = Vec2::new(
                (rng.gen::<f32>() - 0.5) * span.x,
                (rng.gen::<f32>() - 0.5) * span.y,
            );
            let height = rng.gen_range(self.height_min..self.height_max);
            let color = LinearRgba::new(rng.gen(), rng.gen(), rng.gen(), 1.0);

            let in_extent = offset.x.abs() <= half.x && offset.y.abs() <= half.y;
            if in_extent && surface.contains_local(offset) {
                report.accepted.push(BuildingDraft {
                    offset,
                    height,
                    color,
                });
            } else {
                report.rejected += 1;
            }
        }
        report
    }

    /// Sample and attach a full batch for `surface`.
    ///
    /// On anchor failure every anchor created for this batch is detached and
    /// the error returned; the caller must not mark the surface processed.
    pub fn generate(
        &self,
        surface: &TrackedSurface,
        rng: &mut impl Rng,
        session: &mut dyn TrackingSession,
    ) -> Result<Vec<Building>, PlacementError> {
        let report = self.sample(surface, rng);
        let anchored = self.use_anchors && session.supports_anchors();
        let mut created: Vec<AnchorId> = Vec::new();
        let mut buildings = Vec::with_capacity(report.accepted.len());

        for draft in report.accepted {
            let local = Pose::from_translation(Vec3::new(draft.offset.x, 0.0, draft.offset.y));
            let pose = surface.center_pose.compose(&local);

            let attachment = if anchored {
                match session.create_anchor(surface.id, pose) {
                    Ok(anchor) => {
                        created.push(anchor);
                        Attachment::Anchor(anchor)
                    }
                    Err(e) => {
                        for anchor in created {
                            session.detach_anchor(anchor);
                        }
                        return Err(e.into());
                    }
                }
            } else {
                Attachment::Pose(pose)
            };

            buildings.push(Building {
                surface: surface.id,
                offset: draft.offset,
                width: self.footprint,
                height: draft.height,
                depth: self.footprint,
                color: draft.color,
                attachment,
            });
        }

        debug!(
            "generated {} buildings on {} ({} candidates rejected, anchored={})",
            buildings.len(),
            surface.id,
            report.rejected,
            anchored
        );
        Ok(buildings)
    }
}

/// Buildings grouped by owning surface. A surface's batch is inserted once
/// and never modified.
#[derive(Resource, Debug, Default)]
pub struct BuildingStore {
    by_surface: BTreeMap<SurfaceId, Vec<Building>>,
}

impl BuildingStore {
    /// Commit a generated batch. Returns `false` (and drops the batch) if the
    /// surface already owns one.
    pub fn insert_batch(&mut self, surface: SurfaceId, buildings: Vec<Building>) -> bool {
        if self.by_surface.contains_key(&surface) {
            warn!("BuildingStore: {} already has buildings, ignoring batch", surface);
            return false;
        }
        self.by_surface.insert(surface, buildings);
        true
    }

    pub fn buildings_of(&self, surface: SurfaceId) -> &[Building] {
        self.by_surface
            .get(&surface)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn surfaces(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.by_surface.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Building> {
        self.by_surface.values().flatten()
    }

    pub fn total(&self) -> usize {
        self.by_surface.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement_rng::PlacementRng;
    use crate::simulated_session::SimulatedSession;

    fn table() -> TrackedSurface {
        TrackedSurface::rectangle(SurfaceId(1), Vec3::new(0.0, 0.0, -1.0), Vec2::new(1.0, 0.6))
    }

    #[test]
    fn test_sample_stays_within_80_percent_of_extent() {
        let generator = BuildingGenerator::default();
        let mut rng = PlacementRng::from_seed_u64(3);
        for _ in 0..20 {
            let report = generator.sample(&table(), &mut rng.0);
            for draft in &report.accepted {
                assert!(draft.offset.x.abs() <= 0.4 + 1e-6);
                assert!(draft.offset.y.abs() <= 0.24 + 1e-6);
                assert!((0.3..1.1).contains(&draft.height));
                assert_eq!(draft.color.alpha, 1.0);
            }
        }
    }

    #[test]
    fn test_rectangle_accepts_every_candidate() {
        let generator = BuildingGenerator::default();
        let mut rng = PlacementRng::from_seed_u64(11);
        let report = generator.sample(&table(), &mut rng.0);
        assert_eq!(report.accepted.len(), 10);
        assert_eq!(report.rejected, 0);
    }

    #[test]
    fn test_polygon_rejections_are_not_replaced() {
        // Only the +x/+z quadrant triangle is inside: many candidates miss.
        let surface = table().with_polygon(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.5, 0.0),
            Vec2::new(0.0, 0.3),
        ]);
        let generator = BuildingGenerator::default();
        let mut rng = PlacementRng::from_seed_u64(5);
        let report = generator.sample(&surface, &mut rng.0);
        assert_eq!(report.accepted.len() + report.rejected, 10);
        assert!(report.accepted.len() < 10);
        for draft in &report.accepted {
            assert!(surface.contains_local(draft.offset));
        }
    }

    #[test]
    fn test_tiny_surface_never_exceeds_target() {
        let surface = TrackedSurface::rectangle(SurfaceId(2), Vec3::ZERO, Vec2::splat(0.1));
        let generator = BuildingGenerator::default();
        let mut rng = PlacementRng::from_seed_u64(8);
        let report = generator.sample(&surface, &mut rng.0);
        assert!(report.accepted.len() <= 10);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let generator = BuildingGenerator::default();
        let a = generator.sample(&table(), &mut PlacementRng::from_seed_u64(99).0);
        let b = generator.sample(&table(), &mut PlacementRng::from_seed_u64(99).0);
        assert_eq!(a.accepted, b.accepted);
    }

    #[test]
    fn test_generate_uses_anchors_when_supported() {
        let (mut session, handle) = SimulatedSession::new();
        handle.add_surface(table());
        let generator = BuildingGenerator::default();
        let buildings = generator
            .generate(&table(), &mut PlacementRng::from_seed_u64(1).0, &mut session)
            .expect("generation succeeds");
        assert_eq!(buildings.len(), 10);
        assert!(buildings
            .iter()
            .all(|b| matches!(b.attachment, Attachment::Anchor(_))));
        assert_eq!(handle.live_anchor_count(), 10);
    }

    #[test]
    fn test_generate_static_pose_without_anchor_support() {
        let (mut session, handle) = SimulatedSession::new();
        handle.add_surface(table());
        handle.set_anchor_support(false);
        let generator = BuildingGenerator::default();
        let buildings = generator
            .generate(&table(), &mut PlacementRng::from_seed_u64(1).0, &mut session)
            .expect("generation succeeds");
        for b in &buildings {
            let Attachment::Pose(pose) = b.attachment else {
                panic!("expected static pose");
            };
            let expected = Vec3::new(b.offset.x, 0.0, -1.0 + b.offset.y);
            assert!((pose.translation - expected).length() < 1e-5);
        }
    }

    #[test]
    fn test_anchor_failure_rolls_back_whole_batch() {
        let (mut session, handle) = SimulatedSession::new();
        handle.add_surface(table());
        handle.fail_anchors_after(4);
        let generator = BuildingGenerator::default();
        let result = generator.generate(&table(), &mut PlacementRng::from_seed_u64(1).0, &mut session);
        assert!(matches!(result, Err(PlacementError::Tracking(_))));
        assert_eq!(handle.live_anchor_count(), 0);
    }

    #[test]
    fn test_store_rejects_second_batch_for_surface() {
        let mut store = BuildingStore::default();
        let generator = BuildingGenerator {
            use_anchors: false,
            ..BuildingGenerator::default()
        };
        let (mut session, _handle) = SimulatedSession::new();
        let mut rng = PlacementRng::from_seed_u64(2);
        let first = generator.generate(&table(), &mut rng.0, &mut session).unwrap();
        let second = generator.generate(&table(), &mut rng.0, &mut session).unwrap();
        assert!(store.insert_batch(SurfaceId(1), first));
        assert!(!store.insert_batch(SurfaceId(1), second));
        assert_eq!(store.buildings_of(SurfaceId(1)).len(), 10);
        assert_eq!(store.total(), 10);
    }

    #[test]
    fn test_model_matrix_scales_unit_footprint() {
        let b = Building {
            surface: SurfaceId(1),
            offset: Vec2::ZERO,
            width: 0.08,
            height: 0.5,
            depth: 0.08,
            color: LinearRgba::WHITE,
            attachment: Attachment::Pose(Pose::IDENTITY),
        };
        let top = b
            .model_matrix(&Pose::from_translation(Vec3::new(1.0, 0.0, 0.0)))
            .transform_point3(Vec3::new(0.5, 1.0, 0.5));
        assert!((top - Vec3::new(1.04, 0.5, 0.04)).length() < 1e-5);
    }
}
