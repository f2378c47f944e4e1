//! Surfaces already used for building generation.
//!
//! The processed set only grows: a surface is never reprocessed, even if it
//! stops tracking and is later re-detected, so buildings attached to it do
//! not jump. The registry also remembers the "primary" surface, the first
//! horizontal-upward surface ever observed, which gates native hit-tests.

use bevy::prelude::*;

use crate::config::MAX_SURFACES;
use crate::surface::{SurfaceId, TrackedSurface};

#[derive(Resource, Debug)]
pub struct SurfaceRegistry {
    /// Insertion order is preserved; the ray-cast fallback iterates it.
    processed: Vec<SurfaceId>,
    capacity: usize,
    primary: Option<SurfaceId>,
    cap_reported: bool,
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self::with_capacity(MAX_SURFACES)
    }
}

impl SurfaceRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            processed: Vec::with_capacity(capacity),
            capacity,
            primary: None,
            cap_reported: false,
        }
    }

    /// Horizontal-upward, tracking, and never processed before.
    pub fn is_eligible(&self, surface: &TrackedSurface) -> bool {
        surface.is_horizontal_upward() && surface.is_tracking() && !self.contains(surface.id)
    }

    /// Add a surface to the processed set. No-op (returns `false`) when the
    /// cap is reached or the surface is already present.
    pub fn mark_processed(&mut self, id: SurfaceId) -> bool {
        if !self.has_capacity() || self.contains(id) {
            return false;
        }
        self.processed.push(id);
        true
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.processed.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn has_capacity(&self) -> bool {
        self.processed.len() < self.capacity
    }

    pub fn processed(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.processed.iter().copied()
    }

    pub fn primary(&self) -> Option<SurfaceId> {
        self.primary
    }

    /// Select the primary surface on first sight of a horizontal-upward
    /// surface. Returns the id only on the call that selects it; never reassigned.
    pub fn observe_primary(&mut self, surfaces: &[TrackedSurface]) -> Option<SurfaceId> {
        if self.primary.is_some() {
            return None;
        }
        self.primary = surfaces
            .iter()
            .find(|s| s.is_horizontal_upward())
            .map(|s| s.id);
        self.primary
    }

    /// Latch for the one-shot "max surfaces reached" report. Returns `true`
    /// the first time it is called after the cap is hit.
    pub fn take_cap_report(&mut self) -> bool {
        if self.has_capacity() || self.cap_reported {
            return false;
        }
        self.cap_reported = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{SurfaceOrientation, TrackingState};

    fn surface(id: u64) -> TrackedSurface {
        TrackedSurface::rectangle(SurfaceId(id), Vec3::ZERO, Vec2::ONE)
    }

    #[test]
    fn test_eligible_requires_upward_tracking_unprocessed() {
        let mut reg = SurfaceRegistry::default();
        assert!(reg.is_eligible(&surface(1)));
        assert!(!reg.is_eligible(&surface(1).with_orientation(SurfaceOrientation::Vertical)));
        assert!(!reg.is_eligible(&surface(1).with_tracking(TrackingState::Paused)));
        reg.mark_processed(SurfaceId(1));
        assert!(!reg.is_eligible(&surface(1)));
    }

    #[test]
    fn test_processed_survives_tracking_loss_and_regain() {
        let mut reg = SurfaceRegistry::default();
        reg.mark_processed(SurfaceId(1));
        let lost = surface(1).with_tracking(TrackingState::Stopped);
        assert!(!reg.is_eligible(&lost));
        assert!(!reg.is_eligible(&surface(1)));
        assert!(reg.contains(SurfaceId(1)));
    }

    #[test]
    fn test_mark_processed_noop_at_cap() {
        let mut reg = SurfaceRegistry::with_capacity(2);
        assert!(reg.mark_processed(SurfaceId(1)));
        assert!(reg.mark_processed(SurfaceId(2)));
        assert!(!reg.mark_processed(SurfaceId(3)));
        assert_eq!(reg.len(), 2);
        assert!(!reg.contains(SurfaceId(3)));
    }

    #[test]
    fn test_mark_processed_twice_is_noop() {
        let mut reg = SurfaceRegistry::default();
        assert!(reg.mark_processed(SurfaceId(4)));
        assert!(!reg.mark_processed(SurfaceId(4)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_processed_iterates_in_insertion_order() {
        let mut reg = SurfaceRegistry::default();
        for id in [9, 3, 7] {
            reg.mark_processed(SurfaceId(id));
        }
        let order: Vec<u64> = reg.processed().map(|s| s.0).collect();
        assert_eq!(order, vec![9, 3, 7]);
    }

    #[test]
    fn test_primary_selected_once_and_never_reassigned() {
        let mut reg = SurfaceRegistry::default();
        let wall = surface(1).with_orientation(SurfaceOrientation::Vertical);
        assert_eq!(reg.observe_primary(&[wall.clone()]), None);
        assert_eq!(reg.observe_primary(&[wall.clone(), surface(2)]), Some(SurfaceId(2)));
        assert_eq!(reg.observe_primary(&[surface(3)]), None);
        assert_eq!(reg.primary(), Some(SurfaceId(2)));
    }

    #[test]
    fn test_primary_may_be_non_tracking() {
        let mut reg = SurfaceRegistry::default();
        let paused = surface(5).with_tracking(TrackingState::Paused);
        assert_eq!(reg.observe_primary(&[paused]), Some(SurfaceId(5)));
    }

    #[test]
    fn test_cap_report_fires_once() {
        let mut reg = SurfaceRegistry::with_capacity(1);
        assert!(!reg.take_cap_report());
        reg.mark_processed(SurfaceId(1));
        assert!(reg.take_cap_report());
        assert!(!reg.take_cap_report());
    }
}
