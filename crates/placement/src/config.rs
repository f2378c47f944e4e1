/// Maximum number of surfaces that ever receive procedural buildings.
pub const MAX_SURFACES: usize = 5;
/// Candidate buildings sampled per surface. Rejected candidates are not replaced.
pub const BUILDINGS_PER_SURFACE: usize = 10;
/// Maximum number of user-placed vehicles.
pub const MAX_VEHICLES: usize = 20;

/// Fraction of a surface's full extent used for candidate sampling (±40% per axis).
pub const SAMPLE_FRACTION: f32 = 0.8;

/// Building footprint (width and depth) in metres.
pub const BUILDING_FOOTPRINT: f32 = 0.08;
/// Building heights are sampled uniformly in `[MIN, MAX)` metres.
pub const BUILDING_HEIGHT_MIN: f32 = 0.3;
pub const BUILDING_HEIGHT_MAX: f32 = 1.1;

/// Edge length of the vehicle cube in metres.
pub const VEHICLE_SIZE: f32 = 0.06;

/// Clip planes used for every projection matrix requested from the tracking camera.
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;

/// `|dot(normal, dir)|` at or below this is treated as a ray parallel to the plane.
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// Seconds a status message stays visible.
pub const STATUS_DURATION_SECS: f32 = 3.0;

/// Default seed for [`crate::placement_rng::PlacementRng`].
pub const DEFAULT_SEED: u64 = 42;
