use bevy::prelude::*;

use placement::frame::CurrentFrame;
use placement::placement_params::PlacementParams;

/// Marker for the render camera that mirrors the tracking camera.
#[derive(Component)]
pub struct TrackedCamera;

pub fn setup_camera(mut commands: Commands, params: Res<PlacementParams>) {
    commands.spawn((
        TrackedCamera,
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: 60f32.to_radians(),
            near: params.near_plane,
            far: params.far_plane,
            ..default()
        }),
        Transform::from_xyz(0.0, 1.5, 1.5).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Vertical field of view encoded in a GL-style perspective matrix.
pub fn vertical_fov(projection: &Mat4) -> Option<f32> {
    let focal = projection.y_axis.y;
    (focal.is_finite() && focal > 0.0).then(|| 2.0 * (1.0 / focal).atan())
}

/// Copy the tracking camera's pose and field of view onto the render camera.
/// Keeps the last pose while tracking is lost.
pub fn follow_tracked_camera(
    current: Res<CurrentFrame>,
    mut query: Query<(&mut Transform, &mut Projection), With<TrackedCamera>>,
) {
    let Some(frame) = current.tracking() else {
        return;
    };
    let Ok((mut transform, mut projection)) = query.get_single_mut() else {
        return;
    };
    *transform = Transform::from_matrix(frame.view.inverse());
    let Some(fov) = vertical_fov(&frame.projection) else {
        return;
    };
    if let Projection::Perspective(perspective) = &*projection {
        if (perspective.fov - fov).abs() > 1e-4 {
            *projection = Projection::Perspective(PerspectiveProjection {
                fov,
                ..perspective.clone()
            });
        }
    }
}
