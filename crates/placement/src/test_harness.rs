//! # TestScene — headless harness for the placement engine
//!
//! Wraps a `bevy::app::App` with `MinimalPlugins` + [`PlacementPlugin`] and a
//! [`SimulatedSession`] so integration tests (and benches) can script a
//! tracking session, tap the screen and inspect the stores without a window
//! or renderer.

use std::time::Duration;

use bevy::app::App;
use bevy::prelude::*;

use crate::buildings::BuildingStore;
use crate::draw_list::DrawList;
use crate::frame::Tap;
use crate::frame_coordinator::{FrameStats, PendingRaycasts};
use crate::placement_params::PlacementParams;
use crate::pose::Pose;
use crate::simulated_session::{SessionHandle, SimulatedSession};
use crate::status::{PlacementEvent, StatusMessage};
use crate::surface::{SurfaceId, TrackedSurface, TrackingState};
use crate::surface_registry::SurfaceRegistry;
use crate::tap_mailbox::TapMailbox;
use crate::tracking::{DisplayGeometry, HitResult, TrackingBackend};
use crate::vehicles::VehicleStore;
use crate::{PlacementPlugin, PlacementSet};

/// Upper bound on frames [`TestScene::settle_fallbacks`] waits for.
const SETTLE_MAX_FRAMES: u32 = 500;

/// Every [`PlacementEvent`] sent since the last [`TestScene::clear_events`].
#[derive(Resource, Default)]
pub struct RecordedEvents(pub Vec<PlacementEvent>);

fn record_events(mut reader: EventReader<PlacementEvent>, mut log: ResMut<RecordedEvents>) {
    log.0.extend(reader.read().copied());
}

/// A headless Bevy App wrapping `PlacementPlugin` for integration testing.
///
/// The camera starts 1.5 m up and 1.5 m back, looking at the world origin.
pub struct TestScene {
    app: App,
    handle: SessionHandle,
}

impl Default for TestScene {
    fn default() -> Self {
        Self::new()
    }
}

impl TestScene {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    pub fn new() -> Self {
        Self::with_params(PlacementParams::default())
    }

    pub fn with_params(params: PlacementParams) -> Self {
        let (session, handle) = SimulatedSession::new();
        handle.set_camera_pose(Pose::looking_at(
            Vec3::new(0.0, 1.5, 1.5),
            Vec3::ZERO,
            Vec3::Y,
        ));

        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        // Params and backend go in BEFORE the plugin so it sizes its stores from them.
        app.insert_resource(params);
        app.insert_resource(TrackingBackend::new(session));
        app.insert_resource(handle.clone());
        app.add_plugins(PlacementPlugin);
        app.init_resource::<RecordedEvents>();
        app.add_systems(Update, record_events.after(PlacementSet::Draw));

        Self { app, handle }
    }

    // -----------------------------------------------------------------------
    // Scene setup (builder pattern — consumes and returns Self)
    // -----------------------------------------------------------------------

    pub fn with_surface(self, surface: TrackedSurface) -> Self {
        self.handle.add_surface(surface);
        self
    }

    pub fn with_camera_looking_at(self, eye: Vec3, target: Vec3) -> Self {
        self.handle
            .set_camera_pose(Pose::looking_at(eye, target, Vec3::Y));
        self
    }

    pub fn with_viewport(mut self, width: f32, height: f32) -> Self {
        *self.app.world_mut().resource_mut::<DisplayGeometry>() = DisplayGeometry { width, height };
        self
    }

    pub fn with_anchor_support(self, supported: bool) -> Self {
        self.handle.set_anchor_support(supported);
        self
    }

    /// Replace geometric native hit-tests with a fixed list of hits.
    pub fn with_scripted_hits(self, hits: Vec<HitResult>) -> Self {
        self.handle.set_scripted_hits(Some(hits));
        self
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Direct access to the simulated session.
    pub fn session(&self) -> &SessionHandle {
        &self.handle
    }

    /// Run `n` frame cycles.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.update();
            std::thread::yield_now();
        }
    }

    /// Post a tap in the current viewport. Returns `true` if it overwrote an
    /// undrained tap.
    pub fn tap(&mut self, x: f32, y: f32) -> bool {
        let geometry = *self.resource::<DisplayGeometry>();
        self.resource::<TapMailbox>()
            .post(Tap::new(x, y, geometry.width, geometry.height))
    }

    pub fn tap_centre(&mut self) -> bool {
        let geometry = *self.resource::<DisplayGeometry>();
        self.tap(geometry.width / 2.0, geometry.height / 2.0)
    }

    /// Tick until no fallback ray-cast is in flight.
    pub fn settle_fallbacks(&mut self) {
        self.tick(1);
        for _ in 0..SETTLE_MAX_FRAMES {
            if self.resource::<PendingRaycasts>().is_empty() {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
            self.tick(1);
        }
        panic!("fallback ray-casts still pending after {SETTLE_MAX_FRAMES} frames");
    }

    pub fn lose_camera_tracking(&mut self) {
        self.handle.set_camera_tracking(TrackingState::Paused);
    }

    pub fn restore_camera_tracking(&mut self) {
        self.handle.set_camera_tracking(TrackingState::Tracking);
    }

    pub fn set_surface_tracking(&mut self, id: u64, tracking: TrackingState) {
        self.handle.set_surface_tracking(SurfaceId(id), tracking);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        self.resource::<SurfaceRegistry>()
    }

    pub fn buildings(&self) -> &BuildingStore {
        self.resource::<BuildingStore>()
    }

    pub fn building_count(&self, id: u64) -> usize {
        self.buildings().buildings_of(SurfaceId(id)).len()
    }

    pub fn vehicles(&self) -> &VehicleStore {
        self.resource::<VehicleStore>()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles().len()
    }

    pub fn draw_list(&self) -> &DrawList {
        self.resource::<DrawList>()
    }

    pub fn stats(&self) -> FrameStats {
        *self.resource::<FrameStats>()
    }

    pub fn status(&self) -> &StatusMessage {
        self.resource::<StatusMessage>()
    }

    pub fn events(&self) -> &[PlacementEvent] {
        &self.resource::<RecordedEvents>().0
    }

    pub fn clear_events(&mut self) {
        self.world_mut().resource_mut::<RecordedEvents>().0.clear();
    }
}
