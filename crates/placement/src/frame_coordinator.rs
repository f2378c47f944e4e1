//! Per-frame driver of the placement engine.
//!
//! Every cycle runs the stages of [`crate::PlacementSet`] in order:
//!
//! 1. `AwaitFrame`: pull a snapshot from the tracking session, push display
//!    geometry changes, count the cycle as completed or skipped.
//! 2. `UpdateTracking`: select the primary surface.
//! 3. `GenerateContent`: generate buildings for newly eligible surfaces.
//! 4. `ResolveTap`: apply finished ray-casts, then drain the tap mailbox.
//! 5. `Draw`: rebuild the [`DrawList`].
//!
//! Stages 2, 3, tap draining and 5 only run while the camera is tracking.
//! Completed fallback ray-casts are applied on every cycle, so a result
//! that lands while tracking is lost is not dropped.

use bevy::prelude::*;
use bevy::tasks::{block_on, AsyncComputeTaskPool, Task};

use crate::buildings::{BuildingGenerator, BuildingStore};
use crate::draw_list::{draw_buildings, draw_vehicles, DrawList};
use crate::frame::{CurrentFrame, Frame};
use crate::hit_resolver::{begin_resolution, FallbackHit, ResolutionTier, TapResolution};
use crate::placement_error::{CapacityKind, GeometryFailure, PlacementError};
use crate::placement_params::PlacementParams;
use crate::placement_rng::PlacementRng;
use crate::pose::Pose;
use crate::status::PlacementEvent;
use crate::surface_registry::SurfaceRegistry;
use crate::tap_mailbox::TapMailbox;
use crate::tracking::{DisplayGeometry, TrackingBackend};
use crate::vehicles::VehicleStore;

/// Cycle counters. `skipped` counts cycles without a tracking camera.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct FrameStats {
    pub cycles: u64,
    pub skipped: u64,
    pub last_sequence: u64,
}

/// Fallback ray-casts still running on the async compute pool.
#[derive(Resource, Default)]
pub struct PendingRaycasts {
    tasks: Vec<Task<Result<FallbackHit, GeometryFailure>>>,
}

impl PendingRaycasts {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Last observed camera tracking state, for lost/restored transitions.
#[derive(Resource, Debug, Default)]
pub(crate) struct TrackingWatch {
    was_tracking: Option<bool>,
}

/// Run condition: the current frame exists and its camera is tracking.
pub fn tracking_usable(current: Res<CurrentFrame>) -> bool {
    current.tracking().is_some()
}

pub(crate) fn acquire_frame(
    backend: Option<ResMut<TrackingBackend>>,
    geometry: Res<DisplayGeometry>,
    params: Res<PlacementParams>,
    mut current: ResMut<CurrentFrame>,
    mut stats: ResMut<FrameStats>,
    mut watch: ResMut<TrackingWatch>,
    mut events: EventWriter<PlacementEvent>,
) {
    #[cfg(feature = "trace")]
    let _span = bevy::log::info_span!("acquire_frame").entered();

    current.0 = None;
    if let Some(mut backend) = backend {
        if geometry.is_changed() {
            backend
                .session_mut()
                .set_display_geometry(geometry.width, geometry.height);
        }
        match backend.session_mut().update() {
            Ok(snapshot) => {
                current.0 = Some(Frame::from_snapshot(
                    snapshot,
                    params.near_plane,
                    params.far_plane,
                ));
            }
            Err(e) => debug!("no frame this cycle: {}", e),
        }
    }

    let tracking = match &current.0 {
        Some(frame) if frame.is_tracking() => {
            stats.last_sequence = frame.sequence;
            true
        }
        Some(frame) => {
            let skip = PlacementError::TrackingUnavailable(frame.camera_tracking);
            trace!("skipping cycle: {}", skip);
            false
        }
        None => false,
    };
    if tracking {
        stats.cycles += 1;
    } else {
        stats.skipped += 1;
    }

    match (watch.was_tracking, tracking) {
        (Some(true), false) => {
            info!("camera tracking lost");
            events.send(PlacementEvent::TrackingLost);
        }
        (Some(false), true) => {
            info!("camera tracking restored");
            events.send(PlacementEvent::TrackingRestored);
        }
        _ => {}
    }
    watch.was_tracking = Some(tracking);
}

pub(crate) fn observe_surfaces(
    current: Res<CurrentFrame>,
    mut registry: ResMut<SurfaceRegistry>,
    mut events: EventWriter<PlacementEvent>,
) {
    let Some(frame) = current.tracking() else {
        return;
    };
    if let Some(primary) = registry.observe_primary(&frame.surfaces) {
        info!("primary surface selected: {}", primary);
        events.send(PlacementEvent::SurfaceFound(primary));
    }
}

pub(crate) fn generate_buildings(
    current: Res<CurrentFrame>,
    params: Res<PlacementParams>,
    mut backend: ResMut<TrackingBackend>,
    mut registry: ResMut<SurfaceRegistry>,
    mut store: ResMut<BuildingStore>,
    mut rng: ResMut<PlacementRng>,
    mut events: EventWriter<PlacementEvent>,
) {
    #[cfg(feature = "trace")]
    let _span = bevy::log::info_span!("generate_buildings").entered();

    let Some(frame) = current.tracking() else {
        return;
    };
    let generator = BuildingGenerator::from_params(&params);

    for surface in &frame.surfaces {
        if !registry.is_eligible(surface) {
            continue;
        }
        if !registry.has_capacity() {
            if registry.take_cap_report() {
                let err = PlacementError::CapacityExceeded {
                    kind: CapacityKind::Surfaces,
                    limit: registry.capacity(),
                };
                warn!("{}, {} left without buildings", err, surface.id);
                events.send(PlacementEvent::CapacityExceeded(CapacityKind::Surfaces));
            }
            break;
        }

        match generator.generate(surface, &mut rng.0, backend.session_mut()) {
            Ok(buildings) => {
                let count = buildings.len();
                registry.mark_processed(surface.id);
                store.insert_batch(surface.id, buildings);
                info!("{} processed with {} buildings", surface.id, count);
                events.send(PlacementEvent::BuildingsGenerated {
                    surface: surface.id,
                    count,
                });
            }
            Err(e) => {
                warn!("generation on {} rolled back: {}", surface.id, e);
            }
        }
    }
}

pub(crate) fn apply_raycast_results(
    mut pending: ResMut<PendingRaycasts>,
    mut vehicles: ResMut<VehicleStore>,
    mut events: EventWriter<PlacementEvent>,
) {
    if pending.is_empty() {
        return;
    }
    let mut finished = Vec::new();
    pending.tasks.retain_mut(|task| {
        match block_on(futures_lite::future::poll_once(task)) {
            Some(result) => {
                finished.push(result);
                false
            }
            None => true,
        }
    });
    for result in finished {
        apply_fallback(result, &mut vehicles, &mut events);
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn drain_tap(
    current: Res<CurrentFrame>,
    params: Res<PlacementParams>,
    backend: Res<TrackingBackend>,
    registry: Res<SurfaceRegistry>,
    mailbox: Res<TapMailbox>,
    mut pending: ResMut<PendingRaycasts>,
    mut vehicles: ResMut<VehicleStore>,
    mut events: EventWriter<PlacementEvent>,
) {
    let Some(frame) = current.tracking() else {
        return;
    };
    let Some(tap) = mailbox.take() else {
        return;
    };

    let request = match begin_resolution(
        frame,
        &registry,
        backend.session(),
        tap,
        params.fallback_strategy,
    ) {
        TapResolution::Native(pose) => {
            place_vehicle(pose, ResolutionTier::Native, &mut vehicles, &mut events);
            return;
        }
        TapResolution::Fallback(request) => request,
    };

    // No worker threads on wasm.
    if cfg!(target_arch = "wasm32") {
        apply_fallback(request.cast(), &mut vehicles, &mut events);
        return;
    }
    let pool = AsyncComputeTaskPool::get();
    pending.tasks.push(pool.spawn(async move { request.cast() }));
}

pub(crate) fn build_draw_list(
    current: Res<CurrentFrame>,
    params: Res<PlacementParams>,
    backend: Res<TrackingBackend>,
    buildings: Res<BuildingStore>,
    vehicles: Res<VehicleStore>,
    mut draw_list: ResMut<DrawList>,
) {
    #[cfg(feature = "trace")]
    let _span = bevy::log::info_span!("build_draw_list").entered();

    let Some(frame) = current.tracking() else {
        return;
    };
    let list = &mut *draw_list;
    list.buildings.clear();
    list.vehicles.clear();
    draw_buildings(&buildings, frame, backend.session(), &mut list.buildings);
    draw_vehicles(
        &vehicles,
        params.vehicle_size,
        frame.view,
        frame.projection,
        &mut list.vehicles,
    );
    list.sequence = frame.sequence;
}

fn apply_fallback(
    result: Result<FallbackHit, GeometryFailure>,
    vehicles: &mut VehicleStore,
    events: &mut EventWriter<PlacementEvent>,
) {
    match result {
        Ok(hit) => {
            debug!("fallback hit {} at distance {:.3}", hit.surface, hit.distance);
            place_vehicle(hit.pose, ResolutionTier::Fallback, vehicles, events);
        }
        Err(failure) => {
            debug!("tap unresolved: {}", PlacementError::Geometry(failure));
            events.send(PlacementEvent::TapUnresolved);
        }
    }
}

fn place_vehicle(
    pose: Pose,
    tier: ResolutionTier,
    vehicles: &mut VehicleStore,
    events: &mut EventWriter<PlacementEvent>,
) {
    match vehicles.try_place(pose) {
        Ok(index) => {
            info!(
                "vehicle {} placed at {:?} ({:?})",
                index, pose.translation, tier
            );
            events.send(PlacementEvent::VehiclePlaced { index, tier });
        }
        Err(PlacementError::CapacityExceeded { kind, limit }) => {
            warn!("vehicle rejected, {} cap of {} reached", kind.label(), limit);
            events.send(PlacementEvent::CapacityExceeded(kind));
        }
        Err(e) => warn!("vehicle rejected: {}", e),
    }
}
