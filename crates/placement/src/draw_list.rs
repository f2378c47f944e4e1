//! Per-cycle draw commands handed to the rendering backend.
//!
//! The core never talks to the GPU. Each tracking cycle it rebuilds one
//! [`DrawCommand`] per visible entity and category; the renderer only has
//! to upload the matrices and colours.

use bevy::prelude::*;

use crate::buildings::BuildingStore;
use crate::frame::Frame;
use crate::placement_error::PlacementError;
use crate::tracking::TrackingSession;
use crate::vehicles::VehicleStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Building,
    Vehicle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub model: Mat4,
    /// projection × view × model
    pub mvp: Mat4,
    pub color: LinearRgba,
}

/// Draw commands from the latest tracking cycle. Left untouched while the
/// camera is not tracking, so the renderer keeps showing the last good frame.
#[derive(Resource, Debug, Default)]
pub struct DrawList {
    pub buildings: Vec<DrawCommand>,
    pub vehicles: Vec<DrawCommand>,
    /// Frame sequence the commands were built from.
    pub sequence: u64,
}

impl DrawList {
    pub fn commands(&self, kind: ContentKind) -> &[DrawCommand] {
        match kind {
            ContentKind::Building => &self.buildings,
            ContentKind::Vehicle => &self.vehicles,
        }
    }

    pub fn len(&self) -> usize {
        self.buildings.len() + self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty() && self.vehicles.is_empty()
    }
}

/// Buildings whose surface is tracking this frame. Buildings on lost
/// surfaces, or whose anchor the session no longer knows, are skipped.
pub fn draw_buildings(
    store: &BuildingStore,
    frame: &Frame,
    session: &dyn TrackingSession,
    out: &mut Vec<DrawCommand>,
) {
    let view_projection = frame.view_projection();
    for surface in store.surfaces() {
        if !frame.surface(surface).is_some_and(|s| s.is_tracking()) {
            trace!("skipping buildings: {}", PlacementError::SurfaceLost(surface));
            continue;
        }
        for building in store.buildings_of(surface) {
            let Some(base) = building.world_pose(session) else {
                continue;
            };
            let model = building.model_matrix(&base);
            out.push(DrawCommand {
                model,
                mvp: view_projection * model,
                color: building.color,
            });
        }
    }
}

pub fn draw_vehicles(
    store: &VehicleStore,
    vehicle_size: f32,
    view: Mat4,
    projection: Mat4,
    out: &mut Vec<DrawCommand>,
) {
    let view_projection = projection * view;
    out.extend(store.iter().map(|vehicle| {
        let model = vehicle.model_matrix(vehicle_size);
        DrawCommand {
            model,
            mvp: view_projection * model,
            color: vehicle.color,
        }
    }));
}
