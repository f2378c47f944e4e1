use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use placement::status::StatusMessage;

/// Seconds over which a toast fades out before it disappears.
const FADE_SECS: f32 = 0.5;

/// Opacity multiplier for a message with `timer` seconds left.
pub fn toast_alpha(timer: f32) -> f32 {
    (timer / FADE_SECS).clamp(0.0, 1.0)
}

fn toast_colors(is_error: bool, alpha: f32) -> (egui::Color32, egui::Color32) {
    let a = (alpha * 230.0) as u8;
    let text_a = (alpha * 255.0) as u8;
    if is_error {
        (
            egui::Color32::from_rgba_unmultiplied(120, 30, 30, a),
            egui::Color32::from_rgba_unmultiplied(255, 220, 220, text_a),
        )
    } else {
        (
            egui::Color32::from_rgba_unmultiplied(25, 28, 40, a),
            egui::Color32::from_rgba_unmultiplied(230, 235, 245, text_a),
        )
    }
}

/// Bottom-centre toast for the latest placement status.
pub fn status_toast_ui(mut contexts: EguiContexts, status: Res<StatusMessage>) {
    if !status.active() || status.text.is_empty() {
        return;
    }
    let (fill, text_color) = toast_colors(status.is_error, toast_alpha(status.timer));

    egui::Area::new(egui::Id::new("status_toast"))
        .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -48.0))
        .order(egui::Order::Foreground)
        .interactable(false)
        .show(contexts.ctx_mut(), |ui| {
            egui::Frame::new()
                .fill(fill)
                .corner_radius(egui::CornerRadius::same(8))
                .inner_margin(egui::Margin::symmetric(14, 8))
                .show(ui, |ui| {
                    ui.label(
                        egui::RichText::new(&status.text)
                            .size(16.0)
                            .color(text_color),
                    );
                });
        });
}
