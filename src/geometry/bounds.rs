//! The plate's rectangle in world space.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::WorldDimension;

/// A plate's axis-aligned rectangle embedded in the toroidal world.
///
/// The top-left origin is kept as float world coordinates (the integer part
/// is what indexing uses, the fraction accumulates sub-cell drift between
/// ticks). Width and height are cell counts and never exceed the world
/// sides. Because the world wraps, the rectangle may straddle a world edge;
/// all lookups here account for that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    world: WorldDimension,
    position: Vec2,
    width: u32,
    height: u32,
}

impl Bounds {
    /// Creates plate bounds at `position` (world coordinates, already within
    /// the world) with the given cell dimensions.
    pub fn new(world: WorldDimension, position: Vec2, width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "plate sides must be nonzero");
        assert!(
            width <= world.width() && height <= world.height(),
            "plate cannot exceed the world"
        );
        assert!(
            position.x >= 0.0
                && position.y >= 0.0
                && position.x < world.width() as f32
                && position.y < world.height() as f32,
            "plate origin must lie within the world"
        );
        Self { world, position, width, height }
    }

    pub fn world(&self) -> WorldDimension {
        self.world
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells in the rectangle.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// World x coordinate of the left edge (float, unwrapped).
    pub fn left(&self) -> f32 {
        self.position.x
    }

    /// World y coordinate of the top edge (float, unwrapped).
    pub fn top(&self) -> f32 {
        self.position.y
    }

    pub fn left_u32(&self) -> u32 {
        self.position.x as u32
    }

    pub fn top_u32(&self) -> u32 {
        self.position.y as u32
    }

    /// One past the right edge. Not wrapped, so this may exceed the world
    /// width when the rectangle straddles the seam.
    pub fn right_exclusive(&self) -> u32 {
        self.left_u32() + self.width
    }

    /// One past the bottom edge, unwrapped like [`Self::right_exclusive`].
    pub fn bottom_exclusive(&self) -> u32 {
        self.top_u32() + self.height
    }

    /// Flat index of a local cell.
    pub fn index(&self, lx: u32, ly: u32) -> usize {
        debug_assert!(lx < self.width && ly < self.height);
        (ly * self.width + lx) as usize
    }

    /// Whether float local coordinates fall inside the rectangle.
    pub fn is_in_limits(&self, fx: f32, fy: f32) -> bool {
        fx >= 0.0 && fy >= 0.0 && (fx as u32) < self.width && (fy as u32) < self.height
    }

    /// Flat index for float local coordinates (truncating).
    pub fn index_of_floats(&self, fx: f32, fy: f32) -> usize {
        debug_assert!(self.is_in_limits(fx, fy));
        self.index(fx as u32, fy as u32)
    }

    /// Translates world coordinates into this rectangle.
    ///
    /// Returns the flat index plus the local cell coordinates, or `None`
    /// when the (wrapped) point lies outside the rectangle.
    pub fn map_index(&self, wx: u32, wy: u32) -> Option<(usize, u32, u32)> {
        let ww = self.world.width();
        let wh = self.world.height();
        let x = wx % ww;
        let y = wy % wh;

        let ilft = self.left_u32();
        let itop = self.top_u32();
        let irgt = self.right_exclusive();
        let ibtm = self.bottom_exclusive();

        // The rectangle's right/bottom edges are unwrapped, so a point can
        // fall inside either directly or after adding one world period.
        let x_ok = (x >= ilft && x < irgt) || (x + ww >= ilft && x + ww < irgt);
        let y_ok = (y >= itop && y < ibtm) || (y + wh >= itop && y + wh < ibtm);
        if !x_ok || !y_ok {
            return None;
        }

        let lx = if x < ilft { x + ww } else { x } - ilft;
        let ly = if y < itop { y + wh } else { y } - itop;
        Some((self.index(lx, ly), lx, ly))
    }

    /// Like [`Self::map_index`] but panics when the point is outside; used
    /// where the caller has already established containment.
    pub fn valid_map_index(&self, wx: u32, wy: u32) -> (usize, u32, u32) {
        self.map_index(wx, wy)
            .expect("world coordinates must lie inside the plate")
    }

    /// Moves the origin, wrapping each axis back into the world.
    pub fn shift(&mut self, dx: f32, dy: f32) {
        self.position.x = (self.position.x + dx).rem_euclid(self.world.width() as f32);
        self.position.y = (self.position.y + dy).rem_euclid(self.world.height() as f32);
    }

    /// Widens the rectangle. The result must still fit the world.
    pub fn grow(&mut self, dw: u32, dh: u32) {
        self.width += dw;
        self.height += dh;
        assert!(
            self.width <= self.world.width() && self.height <= self.world.height(),
            "plate cannot outgrow the world"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(x: f32, y: f32, w: u32, h: u32) -> Bounds {
        Bounds::new(WorldDimension::new(10, 10), Vec2::new(x, y), w, h)
    }

    #[test]
    fn map_index_inside_and_outside() {
        let b = bounds(2.0, 2.0, 3, 3);
        assert_eq!(b.map_index(3, 3), Some((4, 1, 1)));
        assert_eq!(b.map_index(2, 2), Some((0, 0, 0)));
        assert_eq!(b.map_index(4, 4), Some((8, 2, 2)));
        assert_eq!(b.map_index(5, 3), None);
        assert_eq!(b.map_index(0, 0), None);
    }

    #[test]
    fn map_index_wraps_world_seam() {
        let b = bounds(8.0, 8.0, 4, 4);
        // (1, 1) sits across the seam at local (3, 3).
        assert_eq!(b.map_index(1, 1), Some((15, 3, 3)));
        assert_eq!(b.map_index(8, 8), Some((0, 0, 0)));
        assert_eq!(b.map_index(4, 4), None);
    }

    #[test]
    fn map_index_accepts_unnormalized_coordinates() {
        let b = bounds(2.0, 2.0, 3, 3);
        assert_eq!(b.map_index(13, 13), Some((4, 1, 1)));
    }

    #[test]
    fn shift_wraps_origin() {
        let mut b = bounds(9.5, 0.5, 3, 3);
        b.shift(1.0, -1.0);
        assert!((b.left() - 0.5).abs() < 1e-6);
        assert!((b.top() - 9.5).abs() < 1e-6);
    }

    #[test]
    fn grow_extends_dimensions() {
        let mut b = bounds(2.0, 2.0, 3, 3);
        b.grow(4, 2);
        assert_eq!(b.width(), 7);
        assert_eq!(b.height(), 5);
        assert_eq!(b.area(), 35);
    }

    #[test]
    #[should_panic]
    fn grow_past_world_panics() {
        let mut b = bounds(2.0, 2.0, 3, 3);
        b.grow(8, 0);
    }

    #[test]
    fn float_limit_checks() {
        let b = bounds(2.0, 2.0, 3, 3);
        assert!(b.is_in_limits(0.0, 0.0));
        assert!(b.is_in_limits(2.9, 2.9));
        assert!(!b.is_in_limits(-0.1, 1.0));
        assert!(!b.is_in_limits(3.0, 1.0));
        assert_eq!(b.index_of_floats(2.9, 1.1), 5);
    }
}
