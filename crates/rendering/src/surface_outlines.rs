use bevy::prelude::*;

use placement::frame::CurrentFrame;
use placement::surface::TrackedSurface;
use placement::surface_registry::SurfaceRegistry;

const PROCESSED_COLOR: Color = Color::srgb(0.3, 0.9, 0.4);
const ELIGIBLE_COLOR: Color = Color::srgb(0.95, 0.85, 0.3);
const OTHER_COLOR: Color = Color::srgb(0.4, 0.6, 0.95);
const LOST_COLOR: Color = Color::srgba(0.5, 0.5, 0.5, 0.5);

/// Whether surface polygons are outlined. Toggled with `G`.
#[derive(Resource)]
pub struct OutlineSettings {
    pub visible: bool,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self { visible: true }
    }
}

pub fn toggle_outlines(keys: Res<ButtonInput<KeyCode>>, mut settings: ResMut<OutlineSettings>) {
    if keys.just_pressed(KeyCode::KeyG) {
        settings.visible = !settings.visible;
    }
}

pub fn outline_color(surface: &TrackedSurface, registry: &SurfaceRegistry) -> Color {
    if !surface.is_tracking() {
        LOST_COLOR
    } else if registry.contains(surface.id) {
        PROCESSED_COLOR
    } else if surface.is_horizontal_upward() {
        ELIGIBLE_COLOR
    } else {
        OTHER_COLOR
    }
}

pub fn draw_surface_outlines(
    settings: Res<OutlineSettings>,
    current: Res<CurrentFrame>,
    registry: Res<SurfaceRegistry>,
    mut gizmos: Gizmos,
) {
    if !settings.visible {
        return;
    }
    let Some(frame) = current.0.as_ref() else {
        return;
    };
    for surface in &frame.surfaces {
        let outline = surface.world_polygon();
        let Some(first) = outline.first().copied() else {
            continue;
        };
        let color = outline_color(surface, &registry);
        gizmos.linestrip(outline.into_iter().chain(std::iter::once(first)), color);
    }
}
