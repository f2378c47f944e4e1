//! Mesh entities for the placement draw list.
//!
//! Each content kind keeps a pool of entities, one per draw-command slot.
//! Slots are never despawned: when the list shrinks (a surface stopped
//! tracking) surplus slots are hidden and reused once it grows again.

use bevy::prelude::*;

use placement::draw_list::{ContentKind, DrawCommand, DrawList};

/// Shared unit meshes. Buildings span `y` in `[0, 1]`, vehicles are centred.
#[derive(Resource)]
pub struct ContentAssets {
    pub building_mesh: Handle<Mesh>,
    pub vehicle_mesh: Handle<Mesh>,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSlot {
    pub kind: ContentKind,
    pub index: usize,
}

pub fn setup_content_assets(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
    let building = Mesh::from(Cuboid::new(1.0, 1.0, 1.0)).translated_by(Vec3::Y * 0.5);
    let vehicle = Mesh::from(Cuboid::new(1.0, 1.0, 1.0));
    commands.insert_resource(ContentAssets {
        building_mesh: meshes.add(building),
        vehicle_mesh: meshes.add(vehicle),
    });
}

fn slot_material(color: LinearRgba) -> StandardMaterial {
    StandardMaterial {
        base_color: Color::LinearRgba(color),
        perceptual_roughness: 0.8,
        ..default()
    }
}

/// Bring the pooled entities in line with the latest draw list.
pub fn sync_content_meshes(
    mut commands: Commands,
    draw_list: Res<DrawList>,
    assets: Res<ContentAssets>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut slots: Query<(
        &ContentSlot,
        &mut Transform,
        &mut Visibility,
        &MeshMaterial3d<StandardMaterial>,
    )>,
) {
    let mut pooled = [0usize; 2];

    for (slot, mut transform, mut visibility, material) in &mut slots {
        pooled[pool_index(slot.kind)] = pooled[pool_index(slot.kind)].max(slot.index + 1);
        match draw_list.commands(slot.kind).get(slot.index) {
            Some(command) => {
                *transform = Transform::from_matrix(command.model);
                visibility.set_if_neq(Visibility::Visible);
                if let Some(mat) = materials.get_mut(&material.0) {
                    if mat.base_color != Color::LinearRgba(command.color) {
                        mat.base_color = Color::LinearRgba(command.color);
                    }
                }
            }
            None => {
                visibility.set_if_neq(Visibility::Hidden);
            }
        }
    }

    for kind in [ContentKind::Building, ContentKind::Vehicle] {
        let mesh = match kind {
            ContentKind::Building => assets.building_mesh.clone(),
            ContentKind::Vehicle => assets.vehicle_mesh.clone(),
        };
        let commands_for_kind: &[DrawCommand] = draw_list.commands(kind);
        for (index, command) in commands_for_kind
            .iter()
            .enumerate()
            .skip(pooled[pool_index(kind)])
        {
            commands.spawn((
                ContentSlot { kind, index },
                Mesh3d(mesh.clone()),
                MeshMaterial3d(materials.add(slot_material(command.color))),
                Transform::from_matrix(command.model),
                Visibility::Visible,
            ));
        }
    }
}

fn pool_index(kind: ContentKind) -> usize {
    match kind {
        ContentKind::Building => 0,
        ContentKind::Vehicle => 1,
    }
}
