use bevy::prelude::*;
use bevy_egui::EguiPlugin;

use placement::PlacementSet;

pub mod session_panel;
pub mod status_toast;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .init_resource::<session_panel::SessionPanelVisible>()
            .add_systems(
                Update,
                (
                    status_toast::status_toast_ui,
                    session_panel::session_panel_ui,
                    session_panel::panel_keybinds,
                )
                    .after(PlacementSet::Draw),
            );
    }
}
