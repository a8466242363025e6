//! Crust mass bookkeeping.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::terrain::HeightMap;

/// Cached crust total and center of mass of a plate.
///
/// The center is in local plate coordinates. Single-cell edits adjust the
/// total incrementally through [`Mass::inc`]; whole-map rewrites rebuild it
/// with a [`MassBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mass {
    amount: f32,
    center: Vec2,
}

impl Mass {
    pub fn zero() -> Self {
        Self { amount: 0.0, center: Vec2::ZERO }
    }

    /// Total crust on the plate.
    pub fn amount(&self) -> f32 {
        self.amount
    }

    /// Center of mass in local plate coordinates.
    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn is_null(&self) -> bool {
        self.amount <= 0.0
    }

    /// Adjusts the total after a single-cell change. The center is left
    /// as-is; it is refreshed on the next full rebuild.
    pub fn inc(&mut self, delta: f32) {
        self.amount += delta;
        if self.amount < 0.0 {
            self.amount = 0.0;
        }
    }
}

/// Accumulates crust totals and first moments, then builds a [`Mass`].
#[derive(Debug, Default)]
pub struct MassBuilder {
    amount: f32,
    moment: Vec2,
}

impl MassBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweeps a full height map.
    pub fn from_map(map: &HeightMap) -> Self {
        let mut builder = Self::new();
        for y in 0..map.height() {
            for x in 0..map.width() {
                builder.add_point(x, y, *map.get(x, y));
            }
        }
        builder
    }

    pub fn add_point(&mut self, x: u32, y: u32, crust: f32) {
        debug_assert!(crust >= 0.0, "crust cannot be negative");
        self.amount += crust;
        self.moment += Vec2::new(x as f32, y as f32) * crust;
    }

    pub fn build(self) -> Mass {
        let center = if self.amount > 0.0 {
            self.moment / self.amount
        } else {
            Vec2::ZERO
        };
        Mass { amount: self.amount, center }
    }
}
