use bevy::prelude::*;

use placement::PlacementSet;

pub mod camera;
pub mod content_render;
pub mod input;
pub mod surface_outlines;

use content_render::ContentAssets;
use surface_outlines::OutlineSettings;

/// Draws the placement engine's output: mirrors the tracked camera, keeps a
/// pool of mesh entities in step with the draw list and outlines surfaces.
/// Also turns clicks and touches into taps.
pub struct RenderingPlugin;

impl Plugin for RenderingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OutlineSettings>()
            .insert_resource(ClearColor(Color::srgb(0.06, 0.07, 0.09)))
            .add_systems(
                Startup,
                (
                    camera::setup_camera,
                    setup_lighting,
                    content_render::setup_content_assets,
                ),
            )
            .add_systems(
                Update,
                (input::sync_display_geometry, input::post_taps)
                    .before(PlacementSet::AwaitFrame),
            )
            .add_systems(
                Update,
                (
                    camera::follow_tracked_camera,
                    content_render::sync_content_meshes
                        .run_if(resource_exists::<ContentAssets>)
                        .run_if(resource_changed::<placement::draw_list::DrawList>),
                    surface_outlines::toggle_outlines,
                    surface_outlines::draw_surface_outlines,
                )
                    .after(PlacementSet::Draw),
            );
    }
}

fn setup_lighting(mut commands: Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.9, 0.9, 1.0),
        brightness: 400.0,
    });

    // Key light from above, slightly behind the default viewpoint
    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::XYZ,
            -std::f32::consts::FRAC_PI_3,
            std::f32::consts::FRAC_PI_6,
            0.0,
        )),
    ));
}
