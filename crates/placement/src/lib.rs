//! Spatial placement engine for AR scenes.
//!
//! Watches the surfaces reported by a [`tracking::TrackingSession`], fills
//! each newly found horizontal surface with a batch of procedural buildings
//! (once, ever), and turns screen taps into placed vehicles through the
//! session's native hit-test or a manual ray-cast fallback.
//!
//! The host inserts a [`tracking::TrackingBackend`] and adds
//! [`PlacementPlugin`]; rendering and UI read [`draw_list::DrawList`],
//! [`status::StatusMessage`] and the stores.

pub mod buildings;
pub mod config;
pub mod draw_list;
pub mod frame;
pub mod frame_coordinator;
pub mod hit_resolver;
pub mod placement_error;
pub mod placement_params;
pub mod placement_rng;
pub mod placement_sets;
pub mod pose;
pub mod simulated_session;
pub mod status;
pub mod surface;
pub mod surface_registry;
pub mod tap_mailbox;
pub mod tracking;
pub mod vehicles;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

use bevy::prelude::*;

use buildings::BuildingStore;
use draw_list::DrawList;
use frame::CurrentFrame;
use frame_coordinator::{FrameStats, PendingRaycasts, TrackingWatch};
use placement_params::PlacementParams;
use placement_rng::PlacementRng;
use status::{PlacementEvent, StatusMessage};
use surface_registry::SurfaceRegistry;
use tap_mailbox::TapMailbox;
use tracking::{DisplayGeometry, TrackingBackend};
use vehicles::VehicleStore;

pub use placement_sets::PlacementSet;

pub struct PlacementPlugin;

impl Plugin for PlacementPlugin {
    fn build(&self, app: &mut App) {
        // Params inserted by the host win over defaults; everything sized by
        // them is created here so caps and the seed agree.
        let params = app
            .world()
            .get_resource::<PlacementParams>()
            .cloned()
            .unwrap_or_default();
        let params = match params.validate() {
            Ok(()) => params,
            Err(e) => {
                warn!("{}, continuing with defaults", e);
                PlacementParams::default()
            }
        };

        if !app.world().contains_resource::<TrackingBackend>() {
            warn!("PlacementPlugin added without a TrackingBackend; no frames will be acquired");
        }

        app.insert_resource(SurfaceRegistry::with_capacity(params.max_surfaces))
            .insert_resource(VehicleStore::with_capacity(params.max_vehicles))
            .insert_resource(PlacementRng::from_seed_u64(params.rng_seed))
            .insert_resource(StatusMessage {
                duration: params.status_duration_secs,
                ..default()
            })
            .insert_resource(params)
            .init_resource::<BuildingStore>()
            .init_resource::<CurrentFrame>()
            .init_resource::<DisplayGeometry>()
            .init_resource::<DrawList>()
            .init_resource::<FrameStats>()
            .init_resource::<PendingRaycasts>()
            .init_resource::<TapMailbox>()
            .init_resource::<TrackingWatch>()
            .add_event::<PlacementEvent>();

        app.configure_sets(
            Update,
            (
                PlacementSet::AwaitFrame,
                PlacementSet::UpdateTracking,
                PlacementSet::GenerateContent,
                PlacementSet::ResolveTap,
                PlacementSet::Draw,
            )
                .chain(),
        );

        app.add_systems(Startup, status::announce_startup)
            .add_systems(
                Update,
                (
                    frame_coordinator::acquire_frame.in_set(PlacementSet::AwaitFrame),
                    frame_coordinator::observe_surfaces
                        .in_set(PlacementSet::UpdateTracking)
                        .run_if(frame_coordinator::tracking_usable),
                    frame_coordinator::generate_buildings
                        .in_set(PlacementSet::GenerateContent)
                        .run_if(frame_coordinator::tracking_usable),
                    (
                        frame_coordinator::apply_raycast_results,
                        frame_coordinator::drain_tap.run_if(frame_coordinator::tracking_usable),
                    )
                        .chain()
                        .in_set(PlacementSet::ResolveTap),
                    frame_coordinator::build_draw_list
                        .in_set(PlacementSet::Draw)
                        .run_if(frame_coordinator::tracking_usable),
                ),
            )
            .add_systems(
                Update,
                (status::update_status_message, status::tick_status_message)
                    .chain()
                    .after(PlacementSet::Draw),
            );
    }
}
