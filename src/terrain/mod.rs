//! Per-cell terrain storage.

mod grid;

pub use grid::{AgeMap, Grid, HeightMap};
