use bevy::prelude::*;

use crate::config::STATUS_DURATION_SECS;
use crate::hit_resolver::ResolutionTier;
use crate::placement_error::CapacityKind;
use crate::surface::SurfaceId;

/// State transitions of the placement engine, for the host UI and for tests.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum PlacementEvent {
    /// The primary horizontal-upward surface was selected.
    SurfaceFound(SurfaceId),
    BuildingsGenerated { surface: SurfaceId, count: usize },
    VehiclePlaced { index: usize, tier: ResolutionTier },
    CapacityExceeded(CapacityKind),
    TrackingLost,
    TrackingRestored,
    TapUnresolved,
}

/// Latest user-visible message. `timer` counts down to zero.
#[derive(Resource, Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub timer: f32,
    pub is_error: bool,
    pub duration: f32,
}

impl Default for StatusMessage {
    fn default() -> Self {
        Self {
            text: String::new(),
            timer: 0.0,
            is_error: false,
            duration: STATUS_DURATION_SECS,
        }
    }
}

impl StatusMessage {
    pub fn set(&mut self, text: impl Into<String>, is_error: bool) {
        self.text = text.into();
        self.timer = self.duration;
        self.is_error = is_error;
    }

    pub fn active(&self) -> bool {
        self.timer > 0.0
    }
}

/// Text shown for an event, `None` for events that stay in the log only.
pub fn status_text(event: &PlacementEvent) -> Option<(&'static str, bool)> {
    match event {
        PlacementEvent::SurfaceFound(_) => Some(("Surface found", false)),
        PlacementEvent::VehiclePlaced { .. } => Some(("Vehicle placed", false)),
        PlacementEvent::CapacityExceeded(CapacityKind::Vehicles) => {
            Some(("Max vehicles reached", true))
        }
        PlacementEvent::CapacityExceeded(CapacityKind::Surfaces) => {
            Some(("Max surfaces reached", true))
        }
        PlacementEvent::TrackingLost => Some(("Tracking lost", true)),
        PlacementEvent::BuildingsGenerated { .. }
        | PlacementEvent::TrackingRestored
        | PlacementEvent::TapUnresolved => None,
    }
}

pub(crate) fn announce_startup(mut status: ResMut<StatusMessage>) {
    status.set("Scan a surface to find a plane", false);
}

pub(crate) fn update_status_message(
    mut events: EventReader<PlacementEvent>,
    mut status: ResMut<StatusMessage>,
) {
    for event in events.read() {
        if let Some((text, is_error)) = status_text(event) {
            status.set(text, is_error);
        }
    }
}

pub(crate) fn tick_status_message(time: Res<Time>, mut status: ResMut<StatusMessage>) {
    if status.active() {
        status.timer = (status.timer - time.delta_secs()).max(0.0);
    }
}
