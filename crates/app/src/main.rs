use std::path::PathBuf;

use bevy::prelude::*;
use bevy::render::view::screenshot::{save_to_disk, Screenshot};
use bevy::window::PresentMode;
use bevy::winit::{UpdateMode, WinitSettings};

use placement::placement_params::PlacementParams;
use placement::simulated_session::SimulatedSession;
use placement::tracking::TrackingBackend;

mod demo_scene;

/// Optional JSON file with [`PlacementParams`] overrides.
const PARAMS_ENV: &str = "ARCITY_PARAMS";
/// When set, saves a screenshot once the demo surfaces are populated and exits.
const SCREENSHOT_ENV: &str = "ARCITY_SCREENSHOT";

fn main() {
    let params = std::env::var(PARAMS_ENV)
        .map(|path| PlacementParams::load_or_default(&PathBuf::from(path)))
        .unwrap_or_default();
    let (session, handle) = SimulatedSession::new();

    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "AR City".to_string(),
            resolution: (1280.0, 720.0).into(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }),
        ..default()
    }))
    // The tracking session is polled every frame, so never sleep while focused.
    .insert_resource(WinitSettings {
        focused_mode: UpdateMode::Continuous,
        unfocused_mode: UpdateMode::reactive_low_power(std::time::Duration::from_millis(100)),
    })
    .insert_resource(params)
    .insert_resource(TrackingBackend::new(session))
    .insert_resource(handle)
    .add_plugins((
        placement::PlacementPlugin,
        rendering::RenderingPlugin,
        ui::UiPlugin,
        demo_scene::DemoScenePlugin,
    ));

    if let Ok(path) = std::env::var(SCREENSHOT_ENV) {
        app.insert_resource(ScreenshotRequest { frame: 0, path })
            .add_systems(Update, drive_screenshot);
    }

    app.run();
}

/// Frames to wait for every demo surface to be revealed and populated.
const SCREENSHOT_FRAME: u32 = 600;

#[derive(Resource)]
struct ScreenshotRequest {
    frame: u32,
    path: String,
}

fn drive_screenshot(
    mut commands: Commands,
    mut request: ResMut<ScreenshotRequest>,
    mut exit: EventWriter<AppExit>,
) {
    request.frame += 1;
    if request.frame == SCREENSHOT_FRAME {
        info!("saving screenshot to {}", request.path);
        commands
            .spawn(Screenshot::primary_window())
            .observe(save_to_disk(request.path.clone()));
    } else if request.frame > SCREENSHOT_FRAME + 20 {
        exit.send(AppExit::Success);
    }
}
