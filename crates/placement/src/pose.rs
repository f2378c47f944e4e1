//! Rigid transform (position + orientation) used for cameras, surfaces,
//! anchors and placed content.

use bevy::prelude::*;

/// A 3D position plus orientation. Unlike `Transform` there is no scale:
/// poses come from the tracking subsystem and are always rigid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }

    /// Pose of an eye at `eye` facing `target` (-Z forward, like every camera here).
    pub fn looking_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let transform = Transform::from_translation(eye).looking_at(target, up);
        Self::new(transform.translation, transform.rotation)
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            translation: rotation * -self.translation,
            rotation,
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    /// `self ∘ local`: interprets `local` in this pose's frame.
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            translation: self.transform_point(local.translation),
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }

    /// The pose's local +Y axis in world space.
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

impl From<Pose> for Transform {
    fn from(pose: Pose) -> Self {
        Transform::from_translation(pose.translation).with_rotation(pose.rotation)
    }
}
