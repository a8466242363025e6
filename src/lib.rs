//! 2D plate-tectonics terrain simulation core.
//!
//! A world is a toroidal rectangular grid of elevation samples. Each
//! [`Plate`] is a smaller, movable window of crust embedded in that world:
//! it drifts, collides with other plates, aggregates continents, subducts
//! crust, and erodes through simulated river flow. The output per plate is
//! a dense elevation field plus a matching crust-age field, suitable for
//! rendering or further processing.
//!
//! This crate is the per-plate core only: a world simulator owns the
//! plates, schedules ticks, and routes the pairwise collision calls.

mod erosion;

pub mod geometry;
pub mod tectonics;
pub mod terrain;

pub use geometry::{Bounds, WorldDimension};
pub use tectonics::{
    ContinentId, Mass, MassBuilder, Movement, Plate, PlateError, SegmentData, Segments,
    NO_CONTINENT,
};
pub use terrain::{AgeMap, Grid, HeightMap};
