//! Scripted tracking session for the desktop build.
//!
//! Stands in for a device: an orbiting camera feeds poses into the
//! [`SimulatedSession`](placement::simulated_session::SimulatedSession) and
//! surfaces are "discovered" on a timer, the way a phone finds planes while
//! the user pans around a room.

use std::f32::consts::FRAC_PI_2;

use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::prelude::*;

use placement::pose::Pose;
use placement::simulated_session::SessionHandle;
use placement::surface::{SurfaceId, SurfaceOrientation, TrackedSurface, TrackingState};
use placement::PlacementSet;

const ORBIT_SPEED: f32 = 0.15;
const DRAG_SENSITIVITY: f32 = 0.005;
const MIN_PITCH: f32 = 0.15;
const MAX_PITCH: f32 = 1.4;

/// Surface whose tracking `T` toggles.
const FLOOR: SurfaceId = SurfaceId(1);

/// Orbit around a focus point, in the same spherical terms as a city-builder
/// camera: yaw about world up, pitch above the horizon.
#[derive(Resource, Debug, Clone)]
pub struct DemoRig {
    pub focus: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub auto_orbit: bool,
}

impl Default for DemoRig {
    fn default() -> Self {
        Self {
            focus: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.6,
            distance: 2.2,
            auto_orbit: true,
        }
    }
}

fn orbit_to_eye(rig: &DemoRig) -> Vec3 {
    let x = rig.distance * rig.pitch.cos() * rig.yaw.sin();
    let y = rig.distance * rig.pitch.sin();
    let z = rig.distance * rig.pitch.cos() * rig.yaw.cos();
    rig.focus + Vec3::new(x, y, z)
}

struct Reveal {
    at_secs: f32,
    surface: TrackedSurface,
}

/// Surfaces the simulated session reports once their reveal time has passed.
#[derive(Resource)]
pub struct DemoScript {
    elapsed: f32,
    pending: Vec<Reveal>,
}

impl Default for DemoScript {
    fn default() -> Self {
        let floor = TrackedSurface::rectangle(FLOOR, Vec3::ZERO, Vec2::new(1.2, 0.8));
        let table = TrackedSurface::rectangle(
            SurfaceId(2),
            Vec3::new(1.4, 0.7, -0.6),
            Vec2::new(0.5, 0.35),
        )
        .with_rotation(Quat::from_rotation_y(0.4));
        let wall = TrackedSurface::rectangle(SurfaceId(3), Vec3::new(0.0, 1.0, -1.5), Vec2::new(1.5, 1.0))
            .with_orientation(SurfaceOrientation::Vertical)
            .with_rotation(Quat::from_rotation_x(FRAC_PI_2));
        let rug = TrackedSurface::rectangle(SurfaceId(4), Vec3::new(-1.3, 0.0, 0.6), Vec2::ONE)
            .with_polygon(vec![
                Vec2::new(-0.4, -0.3),
                Vec2::new(0.5, -0.3),
                Vec2::new(0.0, 0.4),
            ]);

        Self {
            elapsed: 0.0,
            pending: vec![
                Reveal { at_secs: 1.0, surface: floor },
                Reveal { at_secs: 3.0, surface: table },
                Reveal { at_secs: 4.5, surface: wall },
                Reveal { at_secs: 6.0, surface: rug },
            ],
        }
    }
}

pub struct DemoScenePlugin;

impl Plugin for DemoScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DemoRig>()
            .init_resource::<DemoScript>()
            .add_systems(
                Update,
                (orbit_controls, drive_camera, reveal_surfaces, tracking_keybinds)
                    .chain()
                    .before(PlacementSet::AwaitFrame),
            );
    }
}

/// Right-drag orbits. `O` toggles the automatic orbit.
fn orbit_controls(
    keys: Res<ButtonInput<KeyCode>>,
    buttons: Res<ButtonInput<MouseButton>>,
    motion: Res<AccumulatedMouseMotion>,
    time: Res<Time>,
    mut rig: ResMut<DemoRig>,
) {
    if keys.just_pressed(KeyCode::KeyO) {
        rig.auto_orbit = !rig.auto_orbit;
    }
    if buttons.pressed(MouseButton::Right) && motion.delta != Vec2::ZERO {
        rig.auto_orbit = false;
        rig.yaw -= motion.delta.x * DRAG_SENSITIVITY;
        rig.pitch = (rig.pitch + motion.delta.y * DRAG_SENSITIVITY).clamp(MIN_PITCH, MAX_PITCH);
    } else if rig.auto_orbit {
        rig.yaw += ORBIT_SPEED * time.delta_secs();
    }
}

fn drive_camera(rig: Res<DemoRig>, handle: Res<SessionHandle>) {
    let eye = orbit_to_eye(&rig);
    handle.set_camera_pose(Pose::looking_at(eye, rig.focus, Vec3::Y));
}

fn reveal_surfaces(time: Res<Time>, mut script: ResMut<DemoScript>, handle: Res<SessionHandle>) {
    if script.pending.is_empty() {
        return;
    }
    script.elapsed += time.delta_secs();
    let elapsed = script.elapsed;
    let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut script.pending)
        .into_iter()
        .partition(|r| r.at_secs <= elapsed);
    script.pending = later;
    for reveal in due {
        info!(
            "demo: {} ({:?}) discovered",
            reveal.surface.id, reveal.surface.orientation
        );
        handle.add_surface(reveal.surface);
    }
}

/// `Space` pauses camera tracking, `T` pauses the floor surface.
fn tracking_keybinds(keys: Res<ButtonInput<KeyCode>>, handle: Res<SessionHandle>) {
    if keys.just_pressed(KeyCode::Space) {
        let next = toggled(handle.camera_tracking());
        handle.set_camera_tracking(next);
        info!("demo: camera tracking {}", next.label());
    }
    if keys.just_pressed(KeyCode::KeyT) {
        if let Some(floor) = handle.surface(FLOOR) {
            let next = toggled(floor.tracking);
            handle.set_surface_tracking(FLOOR, next);
            info!("demo: floor tracking {}", next.label());
        }
    }
}

fn toggled(state: TrackingState) -> TrackingState {
    if state.is_tracking() {
        TrackingState::Paused
    } else {
        TrackingState::Tracking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placement::simulated_session::SimulatedSession;

    #[test]
    fn test_orbit_eye_distance_and_height() {
        let rig = DemoRig::default();
        let eye = orbit_to_eye(&rig);
        assert!((eye.distance(rig.focus) - rig.distance).abs() < 1e-4);
        assert!(eye.y > 0.0);
    }

    #[test]
    fn test_surfaces_revealed_on_schedule() {
        let (_session, handle) = SimulatedSession::new();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(handle.clone());
        app.init_resource::<DemoScript>();
        app.add_systems(Update, reveal_surfaces);

        app.world_mut().resource_mut::<DemoScript>().elapsed = 3.5;
        app.update();
        assert_eq!(handle.surface_count(), 2);
        assert_eq!(app.world().resource::<DemoScript>().pending.len(), 2);
    }

    #[test]
    fn test_toggled_flips_tracking() {
        assert_eq!(toggled(TrackingState::Tracking), TrackingState::Paused);
        assert_eq!(toggled(TrackingState::Stopped), TrackingState::Tracking);
    }
}
