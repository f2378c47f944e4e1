// ---------------------------------------------------------------------------
// PlacementError: failure taxonomy for the placement engine
// ---------------------------------------------------------------------------

use std::fmt;

use crate::surface::{SurfaceId, TrackingState};
use crate::tracking::TrackingError;

/// Which bounded collection refused an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityKind {
    Surfaces,
    Vehicles,
}

impl CapacityKind {
    pub fn label(self) -> &'static str {
        match self {
            CapacityKind::Surfaces => "surfaces",
            CapacityKind::Vehicles => "vehicles",
        }
    }
}

/// Why a tap could not be turned into a world pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryFailure {
    /// projection × view has no inverse.
    SingularViewProjection,
    /// Unprojected near/far points were at infinity or coincident.
    DegenerateRay,
    /// The ray met no eligible plane in front of the camera.
    NoIntersection,
}

impl fmt::Display for GeometryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryFailure::SingularViewProjection => {
                write!(f, "view-projection matrix is not invertible")
            }
            GeometryFailure::DegenerateRay => write!(f, "unprojected tap ray is degenerate"),
            GeometryFailure::NoIntersection => write!(f, "tap ray intersects no processed surface"),
        }
    }
}

/// Every failure the engine can report. None of them is fatal: frame
/// systems log them, optionally surface a status message, and move on.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementError {
    /// Camera tracking is not usable this cycle.
    TrackingUnavailable(TrackingState),
    /// A surface or vehicle cap is reached; nothing was mutated.
    CapacityExceeded { kind: CapacityKind, limit: usize },
    Geometry(GeometryFailure),
    /// A surface that owns content is no longer tracking.
    SurfaceLost(SurfaceId),
    Tracking(TrackingError),
    InvalidParams(String),
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::TrackingUnavailable(state) => {
                write!(f, "camera tracking unavailable ({})", state.label())
            }
            PlacementError::CapacityExceeded { kind, limit } => {
                write!(f, "capacity exceeded: at most {limit} {}", kind.label())
            }
            PlacementError::Geometry(g) => write!(f, "geometry failure: {g}"),
            PlacementError::SurfaceLost(id) => write!(f, "{id} is no longer tracking"),
            PlacementError::Tracking(e) => write!(f, "tracking error: {e}"),
            PlacementError::InvalidParams(msg) => write!(f, "invalid placement params: {msg}"),
        }
    }
}

impl std::error::Error for PlacementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlacementError::Tracking(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TrackingError> for PlacementError {
    fn from(e: TrackingError) -> Self {
        PlacementError::Tracking(e)
    }
}

impl From<GeometryFailure> for PlacementError {
    fn from(g: GeometryFailure) -> Self {
        PlacementError::Geometry(g)
    }
}
