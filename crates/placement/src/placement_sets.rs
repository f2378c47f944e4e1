//! Per-frame ordering of the placement engine.
//!
//! ```text
//! AwaitFrame  →  UpdateTracking  →  GenerateContent  →  ResolveTap  →  Draw
//! ```
//!
//! * **AwaitFrame** – Pull the tracking snapshot into `CurrentFrame`. Always runs.
//! * **UpdateTracking** – Primary surface selection.
//! * **GenerateContent** – Building generation for newly eligible surfaces.
//! * **ResolveTap** – Finished fallback ray-casts are applied unconditionally;
//!   the tap mailbox is drained only on tracking cycles.
//! * **Draw** – Rebuild the `DrawList`.
//!
//! Host crates that consume the draw list (rendering, UI) should order their
//! systems `.after(PlacementSet::Draw)`.

use bevy::prelude::*;

/// Chained phases of one placement cycle in the `Update` schedule.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlacementSet {
    AwaitFrame,
    UpdateTracking,
    GenerateContent,
    ResolveTap,
    Draw,
}
