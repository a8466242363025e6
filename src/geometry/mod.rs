//! World-space geometry: toroidal dimensions and plate rectangles.

mod bounds;
mod world;

pub use bounds::Bounds;
pub use world::WorldDimension;
