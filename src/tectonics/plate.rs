//! A single lithospheric plate and the operations the world simulator
//! invokes on it each tick.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use super::mass::{Mass, MassBuilder};
use super::movement::Movement;
use super::segment::{ContinentId, Segments, NO_CONTINENT};
use crate::erosion::{find_river_sources, flow_rivers, redistribute};
use crate::geometry::{Bounds, WorldDimension};
use crate::terrain::{AgeMap, Grid, HeightMap};

/// Reframe growth quantum: new rows/columns are allocated in multiples of
/// this many cells so repeated out-of-bounds writes don't reallocate every
/// time.
const GROWTH_ALIGNMENT: u32 = 8;

/// Errors from [`Plate`] construction.
#[derive(Error, Debug)]
pub enum PlateError {
    #[error("plate dimensions must be greater than zero")]
    ZeroDimension,
    #[error("height buffer holds {len} cells but the plate is {width}x{height}")]
    HeightmapSizeMismatch { len: usize, width: u32, height: u32 },
}

/// A rectangular window of crust embedded in the toroidal world.
///
/// Owns the elevation and age grids, the continent segmentation, the
/// cached mass, and the trajectory. The world simulator drives one tick as
/// `step` -> pairwise collision calls -> `erode` -> `reset_segments`; see
/// the individual methods for their contracts. A plate is not thread-safe
/// and every operation runs to completion.
pub struct Plate {
    rng: ChaCha8Rng,
    map: HeightMap,
    age_map: AgeMap,
    mass: Mass,
    bounds: Bounds,
    world: WorldDimension,
    movement: Movement,
    segments: Segments,
}

impl Plate {
    /// Builds a plate from an initial `width x height` height buffer whose
    /// top-left corner sits at world cell `(x, y)`.
    ///
    /// Cells holding crust are stamped with `plate_age`; empty cells keep
    /// age zero. The RNG stream, and through it the plate's initial
    /// heading, is deterministic in `seed`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seed: u64,
        heights: &[f32],
        width: u32,
        height: u32,
        x: u32,
        y: u32,
        plate_age: u32,
        world: WorldDimension,
    ) -> Result<Self, PlateError> {
        if width == 0 || height == 0 {
            return Err(PlateError::ZeroDimension);
        }
        if heights.len() != width as usize * height as usize {
            return Err(PlateError::HeightmapSizeMismatch { len: heights.len(), width, height });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let map = HeightMap::from_vec(width, height, heights.to_vec());
        let mut age_map = AgeMap::new(width, height);
        for (i, &crust) in heights.iter().enumerate() {
            if crust > 0.0 {
                age_map[i] = plate_age;
            }
        }

        let (x, y) = world.normalize(x, y);
        let bounds = Bounds::new(world, Vec2::new(x as f32, y as f32), width, height);
        let mass = MassBuilder::from_map(&map).build();
        let movement = Movement::new(&mut rng, world);
        let segments = Segments::new(map.len());

        Ok(Self { rng, map, age_map, mass, bounds, world, movement, segments })
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Total crust currently on the plate.
    pub fn mass(&self) -> f32 {
        self.mass.amount()
    }

    pub fn momentum(&self) -> f32 {
        self.mass.amount() * self.movement.velocity()
    }

    pub fn velocity(&self) -> f32 {
        self.movement.velocity()
    }

    pub fn velocity_on_x(&self) -> f32 {
        self.movement.velocity_on_x()
    }

    pub fn velocity_on_y(&self) -> f32 {
        self.movement.velocity_on_y()
    }

    /// Crust at a world cell; zero when the cell is off the plate.
    pub fn get_crust(&self, x: u32, y: u32) -> f32 {
        self.bounds
            .map_index(x, y)
            .map(|(i, _, _)| self.map[i])
            .unwrap_or(0.0)
    }

    /// Formation timestamp at a world cell; zero when off the plate.
    pub fn get_crust_timestamp(&self, x: u32, y: u32) -> u32 {
        self.bounds
            .map_index(x, y)
            .map(|(i, _, _)| self.age_map[i])
            .unwrap_or(0)
    }

    /// Raw views of the elevation and age buffers, row-major in local
    /// coordinates. Any mutator that reframes the plate invalidates these
    /// borrows, which the borrow checker enforces.
    pub fn maps(&self) -> (&[f32], &[u32]) {
        (self.map.as_slice(), self.age_map.as_slice())
    }

    /// Registers a collision at a world cell and returns the area of the
    /// continent there (creating its segment on demand).
    pub fn add_collision(&mut self, wx: u32, wy: u32) -> u32 {
        let seg = self.continent_at(wx, wy);
        let data = &mut self.segments[seg];
        data.inc_coll_count();
        data.area()
    }

    /// Collision counter and count/area ratio of the continent at a world
    /// cell, creating its segment on demand; a cell nothing has collided at
    /// yet reports a zero counter.
    pub fn get_collision_info(&mut self, wx: u32, wy: u32) -> (u32, f32) {
        let seg = self.continent_at(wx, wy);
        let data = &self.segments[seg];
        // +1 avoids dividing by zero on drained segments.
        let ratio = data.coll_count() as f32 / (1 + data.area()) as f32;
        (data.coll_count(), ratio)
    }

    /// Area of the continent at a world cell; the segment must already
    /// exist.
    pub fn get_continent_area(&self, wx: u32, wy: u32) -> u32 {
        let (index, _, _) = self.bounds.valid_map_index(wx, wy);
        let seg = self.segments.id(index);
        assert!(
            (seg as usize) < self.segments.len(),
            "no continent registered at ({wx}, {wy})"
        );
        self.segments[seg].area()
    }

    /// Continent id at a world cell on this plate, for use as the
    /// destination of an aggregation.
    pub fn select_collision_segment(&mut self, wx: u32, wy: u32) -> ContinentId {
        self.continent_at(wx, wy)
    }

    /// Sets the crust at a world cell to `max(z, 0)`, growing the plate
    /// rectangle when the cell lies outside it.
    ///
    /// This replaces rather than adds: callers that deposit crust first
    /// read [`Self::get_crust`] and pass the sum. The timestamp becomes the
    /// mass-weighted average of old and new when both carry crust, `t` when
    /// the cell was empty, and stays untouched when `z` is zero.
    pub fn set_crust(&mut self, x: u32, y: u32, z: f32, t: u32) {
        let z = z.max(0.0);

        let index = match self.bounds.map_index(x, y) {
            Some((index, _, _)) => index,
            None => {
                // Growing the plate for nothing is a caller bug.
                assert!(z > 0.0, "reframe requested for zero crust");
                self.reframe_to_include(x, y)
            }
        };

        let old = self.map[index];
        if old > 0.0 && z > 0.0 {
            let blended = (old * self.age_map[index] as f32 + z * t as f32) / (old + z);
            self.age_map[index] = blended as u32;
        } else if z > 0.0 {
            self.age_map[index] = t;
        }

        self.mass.inc(z - old);
        self.map[index] = z;
    }

    /// Deposits colliding crust at a world cell (growing the plate when
    /// needed) and files the cell under `active_continent`.
    pub fn add_crust_by_collision(
        &mut self,
        x: u32,
        y: u32,
        z: f32,
        time: u32,
        active_continent: ContinentId,
    ) {
        self.set_crust(x, y, self.get_crust(x, y) + z, time);

        let (index, lx, ly) = self.bounds.valid_map_index(x, y);
        self.segments.set_id(index, active_continent);
        let data = &mut self.segments[active_continent];
        data.inc_area();
        data.enlarge_to_contain(lx, ly);
    }

    /// Deposits subducting crust inland of a world cell on this plate.
    ///
    /// The incoming velocity `(dx, dy)` is made relative by subtracting
    /// this plate's own velocity, scaled up, and jittered by one shared
    /// random offset on both axes (the shared scalar biases the push along
    /// the diagonal on purpose). Deposition lands only where the plate
    /// already has crust; anything falling over ocean or off the plate is
    /// dropped without effect.
    pub fn add_crust_by_subduction(
        &mut self,
        x: u32,
        y: u32,
        z: f32,
        time: u32,
        mut dx: f32,
        mut dy: f32,
    ) {
        let (_, lx, ly) = self.bounds.valid_map_index(x, y);

        dx -= self.movement.velocity_on_x();
        dy -= self.movement.velocity_on_y();

        let magnitude = self.rng.random::<f64>() as f32;
        let sign = if self.rng.random::<u32>() % 2 == 1 { 1.0 } else { -1.0 };
        let offset = sign * magnitude.powi(4);
        dx = 10.0 * dx + 3.0 * offset;
        dy = 10.0 * dy + 3.0 * offset;

        let fx = lx as f32 + dx;
        let fy = ly as f32 + dy;
        if !self.bounds.is_in_limits(fx, fy) {
            return;
        }

        let index = self.bounds.index_of_floats(fx, fy);
        if self.map[index] > 0.0 && z > 0.0 {
            let blended = (self.map[index] * self.age_map[index] as f32 + z * time as f32)
                / (self.map[index] + z);
            self.age_map[index] = blended as u32;

            self.map[index] += z;
            self.mass.inc(z);
        }
    }

    /// Transfers the whole continent at a world cell onto `other` and
    /// returns how much crust moved.
    ///
    /// Continents usually collide at several cells in one tick; only the
    /// first aggregation moves crust, later ones find the segment drained
    /// and return zero. The per-cell ids are deliberately left in place so
    /// those later calls can still resolve the segment.
    pub fn aggregate_crust(&mut self, other: &mut Plate, wx: u32, wy: u32) -> f32 {
        let (index, lx, ly) = self.bounds.valid_map_index(wx, wy);
        let seg_id = self.segments.id(index);
        assert!(
            (seg_id as usize) < self.segments.len(),
            "no continent registered at ({wx}, {wy})"
        );

        if self.segments[seg_id].is_empty() {
            return 0.0;
        }

        let active_continent = other.select_collision_segment(wx, wy);

        // Offset by one world period so the coordinate transfer below never
        // underflows.
        let wx = wx + self.world.width();
        let wy = wy + self.world.height();

        let old_mass = self.mass.amount();
        let (left, right) = (self.segments[seg_id].left(), self.segments[seg_id].right());
        let (top, bottom) = (self.segments[seg_id].top(), self.segments[seg_id].bottom());

        for y in top..=bottom {
            for x in left..=right {
                let i = self.bounds.index(x, y);
                if self.segments.id(i) == seg_id && self.map[i] > 0.0 {
                    other.add_crust_by_collision(
                        wx + x - lx,
                        wy + y - ly,
                        self.map[i],
                        self.age_map[i],
                        active_continent,
                    );
                    self.mass.inc(-self.map[i]);
                    self.map[i] = 0.0;
                }
            }
        }

        self.segments[seg_id].mark_non_existent();
        old_mass - self.mass.amount()
    }

    /// Momentum-exchange response to a collision with `other` at a world
    /// cell, weighted by the colliding crust mass.
    pub fn collide(&mut self, other: &mut Plate, wx: u32, wy: u32, coll_mass: f32) {
        let (_, alx, aly) = self.bounds.valid_map_index(wx, wy);
        let (_, blx, bly) = other.bounds.valid_map_index(wx, wy);
        self.movement.collide(
            self.mass,
            Vec2::new(alx as f32, aly as f32),
            &mut other.movement,
            other.mass,
            Vec2::new(blx as f32, bly as f32),
            coll_mass,
        );
    }

    /// Slows the plate for the crust mass deformed during this tick's
    /// collisions.
    pub fn apply_friction(&mut self, deformed_mass: f32) {
        if !self.mass.is_null() {
            self.movement.apply_friction(deformed_mass, self.mass.amount());
        }
    }

    /// Advances the trajectory one tick and drifts the rectangle along it.
    pub fn step(&mut self) {
        self.movement.step();
        self.bounds
            .shift(self.movement.velocity_on_x(), self.movement.velocity_on_y());
    }

    /// Clears per-tick segmentation so continents are recomputed on demand.
    pub fn reset_segments(&mut self) {
        assert_eq!(
            self.segments.cell_count(),
            self.bounds.area(),
            "segment buffer out of sync with plate area"
        );
        self.segments.reset();
    }

    /// Runs the flood fill from a local cell; see
    /// [`Segments::create_segment`].
    pub fn create_segment(&mut self, lx: u32, ly: u32) -> ContinentId {
        self.segments.create_segment(lx, ly, &self.map, &self.bounds)
    }

    /// One tick of hydraulic erosion: carve rivers from the peaks, add a
    /// +-10 % noise band, then redistribute slopes onto lower neighbours.
    pub fn erode(&mut self, lower_bound: f32) {
        let mut tmp = self.map.clone();
        let sources = find_river_sources(&self.map, &self.bounds, lower_bound);
        flow_rivers(&self.map, &self.bounds, lower_bound, sources, &mut tmp);

        // Multiplicative noise with zero expected perturbation; keeps the
        // slope pass from settling into a fixed point.
        for i in 0..tmp.len() {
            let alpha = 0.2 * self.rng.random::<f64>() as f32;
            tmp[i] += 0.1 * tmp[i] - alpha * tmp[i];
        }
        self.map = tmp;

        let (map, mass) = redistribute(&self.map, &self.bounds, lower_bound);
        self.map = map;
        self.mass = mass;
    }

    fn continent_at(&mut self, wx: u32, wy: u32) -> ContinentId {
        self.segments.continent_at(wx, wy, &self.map, &self.bounds)
    }

    /// Grows the rectangle so a world cell outside it fits, returning the
    /// cell's new flat index.
    ///
    /// Growth goes toward whichever edge is nearer (ties toward
    /// right/bottom), padded to [`GROWTH_ALIGNMENT`] and capped so the
    /// plate never exceeds the world. Grid content keeps its world
    /// position; segment bounding boxes shift with it.
    fn reframe_to_include(&mut self, x: u32, y: u32) -> usize {
        let (x, y) = self.world.normalize(x, y);

        let ww = i64::from(self.world.width());
        let wh = i64::from(self.world.height());
        let ilft = i64::from(self.bounds.left_u32());
        let itop = i64::from(self.bounds.top_u32());
        let irgt = i64::from(self.bounds.right_exclusive());
        let ibtm = i64::from(self.bounds.bottom_exclusive());

        // Distance from the cell to each edge. Westward/northward only
        // counts without wrapping; eastward/southward wraps when the cell
        // sits west/north of the rectangle. A negative raw distance means
        // the cell is past that edge in the other direction.
        let valid = |raw: i64| if raw >= 0 { raw } else { i64::MAX };
        let lft = valid(ilft - i64::from(x));
        let rgt = valid(if i64::from(x) < ilft { ww } else { 0 } + i64::from(x) - irgt);
        let top = valid(itop - i64::from(y));
        let btm = valid(if i64::from(y) < itop { wh } else { 0 } + i64::from(y) - ibtm);

        // Keep the nearer side per axis, ties toward right/bottom; a valid
        // distance is always shorter than the world side.
        let mut d_lft = if lft < rgt && lft < ww { lft as u32 } else { 0 };
        let mut d_rgt = if rgt <= lft && rgt < ww { rgt as u32 } else { 0 };
        let mut d_top = if top < btm && top < wh { top as u32 } else { 0 };
        let mut d_btm = if btm <= top && btm < wh { btm as u32 } else { 0 };

        // Pad each nonzero growth to the alignment quantum.
        let pad = |d: u32| ((d > 0) as u32 + (d / GROWTH_ALIGNMENT)) * GROWTH_ALIGNMENT;
        d_lft = pad(d_lft);
        d_rgt = pad(d_rgt);
        d_top = pad(d_top);
        d_btm = pad(d_btm);

        // Never outgrow the world; snap to fill the axis instead.
        if self.bounds.width() + d_lft + d_rgt > self.world.width() {
            d_lft = 0;
            d_rgt = self.world.width() - self.bounds.width();
        }
        if self.bounds.height() + d_top + d_btm > self.world.height() {
            d_top = 0;
            d_btm = self.world.height() - self.bounds.height();
        }

        assert!(
            d_lft + d_rgt + d_top + d_btm > 0,
            "cell out of bounds with nowhere to grow"
        );

        let old_map = std::mem::replace(&mut self.map, Grid::new(1, 1));
        let old_age = std::mem::replace(&mut self.age_map, Grid::new(1, 1));
        let old_height = self.bounds.height();

        self.bounds.shift(-(d_lft as f32), -(d_top as f32));
        self.bounds.grow(d_lft + d_rgt, d_top + d_btm);

        let mut map = HeightMap::new(self.bounds.width(), self.bounds.height());
        let mut age_map = AgeMap::new(self.bounds.width(), self.bounds.height());
        let mut ids = vec![NO_CONTINENT; self.bounds.area()];

        for j in 0..old_height {
            map.copy_row_from(&old_map, j, d_lft, d_top + j);
            age_map.copy_row_from(&old_age, j, d_lft, d_top + j);

            let dst = self.bounds.index(d_lft, d_top + j);
            let src = (j * old_map.width()) as usize;
            let n = old_map.width() as usize;
            for k in 0..n {
                ids[dst + k] = self.segments.id(src + k);
            }
        }

        self.map = map;
        self.age_map = age_map;
        self.segments.reassign(ids);
        self.segments.shift(d_lft, d_top);

        let (index, _, _) = self.bounds.valid_map_index(x, y);
        index
    }
}
