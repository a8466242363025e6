//! Tectonic plate simulation core.
//!
//! One [`Plate`] holds a window of crust embedded in the toroidal world and
//! exposes the per-tick operations the world simulator drives:
//! - drift along a rigid-body trajectory with impulse collision response
//! - continent segmentation with per-segment collision bookkeeping
//! - crust transfer through collision, aggregation, and subduction
//! - hydraulic erosion of the plate's height map

mod mass;
mod movement;
mod plate;
mod segment;

pub use mass::{Mass, MassBuilder};
pub use movement::Movement;
pub use plate::{Plate, PlateError};
pub use segment::{ContinentId, SegmentData, Segments, NO_CONTINENT};
