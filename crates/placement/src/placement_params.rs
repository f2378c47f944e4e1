//! Data-driven placement parameters.
//!
//! Collects the engine's tunables into a single [`PlacementParams`] resource
//! so a deployment can override caps, sampling and fallback behaviour from a
//! JSON file without recompiling. Defaults mirror [`crate::config`].

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::placement_error::PlacementError;

/// How the manual ray-cast fallback picks a plane among processed surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FallbackStrategy {
    /// World-up plane through each surface centre; first processed surface
    /// (insertion order) with a forward hit wins.
    #[default]
    FirstProcessed,
    /// Each surface's own normal; nearest forward hit wins.
    NearestSurface,
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementParams {
    pub max_surfaces: usize,
    pub buildings_per_surface: usize,
    pub max_vehicles: usize,
    /// Fraction of each extent axis sampled around the surface centre.
    pub sample_fraction: f32,
    pub building_footprint: f32,
    pub building_height_min: f32,
    pub building_height_max: f32,
    pub vehicle_size: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub fallback_strategy: FallbackStrategy,
    /// Register buildings as anchors when the session supports it.
    pub use_anchors: bool,
    pub rng_seed: u64,
    pub status_duration_secs: f32,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            max_surfaces: config::MAX_SURFACES,
            buildings_per_surface: config::BUILDINGS_PER_SURFACE,
            max_vehicles: config::MAX_VEHICLES,
            sample_fraction: config::SAMPLE_FRACTION,
            building_footprint: config::BUILDING_FOOTPRINT,
            building_height_min: config::BUILDING_HEIGHT_MIN,
            building_height_max: config::BUILDING_HEIGHT_MAX,
            vehicle_size: config::VEHICLE_SIZE,
            near_plane: config::NEAR_PLANE,
            far_plane: config::FAR_PLANE,
            fallback_strategy: FallbackStrategy::default(),
            use_anchors: true,
            rng_seed: config::DEFAULT_SEED,
            status_duration_secs: config::STATUS_DURATION_SECS,
        }
    }
}

impl PlacementParams {
    /// Parse and validate params from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, PlacementError> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| PlacementError::InvalidParams(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Load params from a JSON file, logging a warning and falling back to
    /// defaults when the file is unreadable or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                warn!(
                    "PlacementParams: cannot read {}: {}, using defaults",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };
        match Self::from_json(&json) {
            Ok(params) => {
                info!("PlacementParams: loaded overrides from {}", path.display());
                params
            }
            Err(e) => {
                warn!("PlacementParams: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), PlacementError> {
        let invalid = |msg: String| Err(PlacementError::InvalidParams(msg));
        if self.max_surfaces == 0 || self.max_vehicles == 0 {
            return invalid("surface and vehicle caps must be at least 1".into());
        }
        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return invalid(format!(
                "sample_fraction {} outside (0, 1]",
                self.sample_fraction
            ));
        }
        if !(self.building_height_min > 0.0 && self.building_height_min < self.building_height_max)
        {
            return invalid(format!(
                "building height range [{}, {}) is empty",
                self.building_height_min, self.building_height_max
            ));
        }
        if self.building_footprint <= 0.0 || self.vehicle_size <= 0.0 {
            return invalid("footprint and vehicle size must be positive".into());
        }
        if !(self.near_plane > 0.0 && self.near_plane < self.far_plane) {
            return invalid(format!(
                "clip planes near={} far={} are invalid",
                self.near_plane, self.far_plane
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
