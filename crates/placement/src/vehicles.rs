use bevy::prelude::*;

use crate::config::MAX_VEHICLES;
use crate::placement_error::{CapacityKind, PlacementError};
use crate::pose::Pose;

/// Vehicle colours, assigned cyclically by placement index.
pub const VEHICLE_PALETTE: [LinearRgba; 3] = [
    LinearRgba::new(1.0, 0.0, 0.0, 1.0),
    LinearRgba::new(0.0, 1.0, 0.0, 1.0),
    LinearRgba::new(0.0, 0.0, 1.0, 1.0),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vehicle {
    pub pose: Pose,
    pub color: LinearRgba,
}

impl Vehicle {
    /// Model matrix for a unit cube centred on the pose.
    pub fn model_matrix(&self, size: f32) -> Mat4 {
        self.pose.to_matrix() * Mat4::from_scale(Vec3::splat(size))
    }
}

/// Bounded, append-only collection of user-placed vehicles.
#[derive(Resource, Debug)]
pub struct VehicleStore {
    vehicles: Vec<Vehicle>,
    capacity: usize,
}

impl Default for VehicleStore {
    fn default() -> Self {
        Self::with_capacity(MAX_VEHICLES)
    }
}

impl VehicleStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vehicles: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a vehicle at `pose`, returning its index. Rejected without any
    /// side effect once the store is full.
    pub fn try_place(&mut self, pose: Pose) -> Result<usize, PlacementError> {
        if self.vehicles.len() >= self.capacity {
            return Err(PlacementError::CapacityExceeded {
                kind: CapacityKind::Vehicles,
                limit: self.capacity,
            });
        }
        let index = self.vehicles.len();
        self.vehicles.push(Vehicle {
            pose,
            color: VEHICLE_PALETTE[index % VEHICLE_PALETTE.len()],
        });
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter()
    }
}
