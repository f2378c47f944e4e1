//! Host input: window size and taps.
//!
//! Mouse clicks and touch starts become [`Tap`]s in window coordinates
//! (logical pixels, origin top-left), which is also the viewport reported
//! through [`DisplayGeometry`].

use bevy::prelude::*;
use bevy_egui::EguiContexts;

use placement::frame::Tap;
use placement::tap_mailbox::TapMailbox;
use placement::tracking::DisplayGeometry;

/// `true` while egui owns the pointer, so clicks on panels do not place vehicles.
fn egui_wants_pointer(contexts: &mut EguiContexts) -> bool {
    let ctx = contexts.ctx_mut();
    ctx.wants_pointer_input() || ctx.is_pointer_over_area()
}

pub fn sync_display_geometry(windows: Query<&Window>, mut geometry: ResMut<DisplayGeometry>) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let (width, height) = (window.width(), window.height());
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    geometry.set_if_neq(DisplayGeometry { width, height });
}

pub fn post_taps(
    buttons: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    windows: Query<&Window>,
    geometry: Res<DisplayGeometry>,
    mailbox: Res<TapMailbox>,
    mut contexts: EguiContexts,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };

    let touch = touches.iter_just_pressed().last().map(|t| t.position());
    let click = buttons
        .just_pressed(MouseButton::Left)
        .then(|| window.cursor_position())
        .flatten();
    let Some(position) = touch.or(click) else {
        return;
    };
    if egui_wants_pointer(&mut contexts) {
        return;
    }

    let tap = Tap::new(position.x, position.y, geometry.width, geometry.height);
    if mailbox.post(tap) {
        debug!("tap at {:?} replaced an undrained tap", position);
    }
}
