//! Debug window with the tracking session and placement counters.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use placement::buildings::BuildingStore;
use placement::frame::CurrentFrame;
use placement::frame_coordinator::{FrameStats, PendingRaycasts};
use placement::placement_params::{FallbackStrategy, PlacementParams};
use placement::surface_registry::SurfaceRegistry;
use placement::vehicles::VehicleStore;

/// Session panel visibility. Toggled with `Tab`.
#[derive(Resource)]
pub struct SessionPanelVisible(pub bool);

impl Default for SessionPanelVisible {
    fn default() -> Self {
        Self(true)
    }
}

pub fn panel_keybinds(keys: Res<ButtonInput<KeyCode>>, mut visible: ResMut<SessionPanelVisible>) {
    if keys.just_pressed(KeyCode::Tab) {
        visible.0 = !visible.0;
    }
}

fn strategy_label(strategy: FallbackStrategy) -> &'static str {
    match strategy {
        FallbackStrategy::FirstProcessed => "first processed",
        FallbackStrategy::NearestSurface => "nearest surface",
    }
}

fn camera_label(current: &CurrentFrame) -> &'static str {
    match current.0.as_ref() {
        Some(frame) => frame.camera_tracking.label(),
        None => "no frame",
    }
}

#[allow(clippy::too_many_arguments)]
pub fn session_panel_ui(
    mut contexts: EguiContexts,
    mut visible: ResMut<SessionPanelVisible>,
    current: Res<CurrentFrame>,
    registry: Res<SurfaceRegistry>,
    buildings: Res<BuildingStore>,
    vehicles: Res<VehicleStore>,
    stats: Res<FrameStats>,
    pending: Res<PendingRaycasts>,
    params: Res<PlacementParams>,
) {
    if !visible.0 {
        return;
    }

    let mut open = true;
    egui::Window::new("AR Session")
        .open(&mut open)
        .resizable(false)
        .default_width(240.0)
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(8.0, 8.0))
        .show(contexts.ctx_mut(), |ui| {
            ui.spacing_mut().item_spacing.y = 4.0;

            egui::Grid::new("session_stats")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    ui.label("Camera");
                    ui.label(camera_label(&current));
                    ui.end_row();

                    ui.label("Surfaces");
                    ui.label(format!("{}/{}", registry.len(), registry.capacity()));
                    ui.end_row();

                    ui.label("Primary");
                    ui.label(
                        registry
                            .primary()
                            .map(|id| format!("#{}", id.0))
                            .unwrap_or_else(|| "-".to_string()),
                    );
                    ui.end_row();

                    ui.label("Buildings");
                    ui.label(buildings.total().to_string());
                    ui.end_row();

                    ui.label("Vehicles");
                    ui.label(format!("{}/{}", vehicles.len(), vehicles.capacity()));
                    ui.end_row();

                    ui.label("Cycles");
                    ui.label(format!("{} ({} skipped)", stats.cycles, stats.skipped));
                    ui.end_row();

                    ui.label("Ray-casts");
                    ui.label(format!("{} pending", pending.len()));
                    ui.end_row();

                    ui.label("Fallback");
                    ui.label(strategy_label(params.fallback_strategy));
                    ui.end_row();
                });

            ui.separator();
            ui.small("Click/tap: place vehicle");
            ui.small("Space: camera tracking  T: surface tracking");
            ui.small("G: outlines  Tab: this panel");
        });

    if !open {
        visible.0 = false;
    }
}
