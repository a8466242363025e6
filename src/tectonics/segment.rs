//! Continent segmentation: per-cell ids and per-segment bookkeeping.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;
use crate::terrain::HeightMap;

/// Identifier of a continent (segment) within one plate.
pub type ContinentId = u32;

/// Sentinel id for cells not yet assigned to any continent.
pub const NO_CONTINENT: ContinentId = u32::MAX;

/// Bookkeeping for one continent: bounding box (local coordinates,
/// inclusive), cell count, and collision statistics for the current tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentData {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
    area: u32,
    coll_count: u32,
    exists: bool,
}

impl SegmentData {
    /// A fresh zero-area segment anchored at one cell.
    pub fn at(x: u32, y: u32) -> Self {
        Self {
            left: x,
            top: y,
            right: x,
            bottom: y,
            area: 0,
            coll_count: 0,
            exists: true,
        }
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    pub fn top(&self) -> u32 {
        self.top
    }

    pub fn right(&self) -> u32 {
        self.right
    }

    pub fn bottom(&self) -> u32 {
        self.bottom
    }

    pub fn area(&self) -> u32 {
        self.area
    }

    pub fn coll_count(&self) -> u32 {
        self.coll_count
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// A drained segment; aggregation skips these.
    pub fn is_empty(&self) -> bool {
        self.area == 0
    }

    pub fn inc_area(&mut self) {
        self.area += 1;
    }

    pub fn inc_coll_count(&mut self) {
        self.coll_count += 1;
    }

    /// Expands the bounding box to cover a cell.
    pub fn enlarge_to_contain(&mut self, x: u32, y: u32) {
        self.left = self.left.min(x);
        self.right = self.right.max(x);
        self.top = self.top.min(y);
        self.bottom = self.bottom.max(y);
    }

    /// Translates the bounding box after a plate reframe.
    pub fn shift(&mut self, dx: u32, dy: u32) {
        self.left += dx;
        self.right += dx;
        self.top += dy;
        self.bottom += dy;
    }

    /// Marks the continent as fully transferred away.
    pub fn mark_non_existent(&mut self) {
        self.area = 0;
        self.exists = false;
    }
}

/// The plate's continent map: one id per cell plus the segment records.
///
/// Ids are created lazily: a cell keeps [`NO_CONTINENT`] until something
/// asks which continent it belongs to, at which point a 4-connected flood
/// fill over land cells claims the whole component. The fill borrows the
/// height map and bounds at the call site instead of holding references
/// back into the plate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segments {
    ids: Vec<ContinentId>,
    data: Vec<SegmentData>,
}

impl Segments {
    pub fn new(cell_count: usize) -> Self {
        Self {
            ids: vec![NO_CONTINENT; cell_count],
            data: Vec::new(),
        }
    }

    /// Number of cells covered by the id map.
    pub fn cell_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of segments created so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn id(&self, i: usize) -> ContinentId {
        self.ids[i]
    }

    pub fn set_id(&mut self, i: usize, id: ContinentId) {
        self.ids[i] = id;
    }

    /// Clears all per-tick bookkeeping: every cell unassigned, no records.
    pub fn reset(&mut self) {
        self.ids.fill(NO_CONTINENT);
        self.data.clear();
    }

    /// Replaces the id buffer after a plate reframe.
    pub fn reassign(&mut self, ids: Vec<ContinentId>) {
        self.ids = ids;
    }

    /// Translates every bounding box after a plate reframe.
    pub fn shift(&mut self, dx: u32, dy: u32) {
        for data in &mut self.data {
            data.shift(dx, dy);
        }
    }

    /// Continent id at a world cell, creating the segment on demand.
    pub fn continent_at(
        &mut self,
        wx: u32,
        wy: u32,
        map: &HeightMap,
        bounds: &Bounds,
    ) -> ContinentId {
        let (index, lx, ly) = bounds.valid_map_index(wx, wy);
        let id = self.ids[index];
        if (id as usize) < self.data.len() {
            id
        } else {
            self.create_segment(lx, ly, map, bounds)
        }
    }

    /// Runs the flood fill from a local cell and returns the continent id.
    ///
    /// The origin cell is claimed unconditionally, so querying an ocean
    /// cell yields a one-cell segment (collision destinations rely on
    /// this). Expansion only enters land cells (`crust > 0`), wrapping in
    /// an axis exactly when the plate spans the full world in that axis.
    pub fn create_segment(
        &mut self,
        x: u32,
        y: u32,
        map: &HeightMap,
        bounds: &Bounds,
    ) -> ContinentId {
        let origin = bounds.index(x, y);
        let id = self.data.len() as ContinentId;

        if (self.ids[origin] as usize) < self.data.len() {
            return self.ids[origin];
        }

        // A lone new cell bordering an existing continent joins it instead
        // of founding a new one.
        if let Some(adopted) = self.adjacent_segment(x, y, origin, map, bounds) {
            self.ids[origin] = adopted;
            let data = &mut self.data[adopted as usize];
            data.inc_area();
            data.enlarge_to_contain(x, y);
            return adopted;
        }

        let width = bounds.width();
        let height = bounds.height();
        let wrap_x = width == bounds.world().width();
        let wrap_y = height == bounds.world().height();

        let mut data = SegmentData::at(x, y);
        let mut stack = vec![(x, y)];
        self.ids[origin] = id;
        data.inc_area();

        while let Some((cx, cy)) = stack.pop() {
            let neighbors = [
                if cx > 0 {
                    Some((cx - 1, cy))
                } else if wrap_x {
                    Some((width - 1, cy))
                } else {
                    None
                },
                if cx < width - 1 {
                    Some((cx + 1, cy))
                } else if wrap_x {
                    Some((0, cy))
                } else {
                    None
                },
                if cy > 0 {
                    Some((cx, cy - 1))
                } else if wrap_y {
                    Some((cx, height - 1))
                } else {
                    None
                },
                if cy < height - 1 {
                    Some((cx, cy + 1))
                } else if wrap_y {
                    Some((cx, 0))
                } else {
                    None
                },
            ];

            for (nx, ny) in neighbors.into_iter().flatten() {
                let ni = bounds.index(nx, ny);
                if self.ids[ni] > id && map[ni] > 0.0 {
                    self.ids[ni] = id;
                    data.inc_area();
                    data.enlarge_to_contain(nx, ny);
                    stack.push((nx, ny));
                }
            }
        }

        self.data.push(data);
        id
    }

    fn adjacent_segment(
        &self,
        x: u32,
        y: u32,
        origin: usize,
        map: &HeightMap,
        bounds: &Bounds,
    ) -> Option<ContinentId> {
        let width = bounds.width() as usize;
        let assigned = |i: usize| {
            let id = self.ids[i];
            ((id as usize) < self.data.len() && map[i] > 0.0).then_some(id)
        };

        if x > 0 {
            if let Some(id) = assigned(origin - 1) {
                return Some(id);
            }
        }
        if x < bounds.width() - 1 {
            if let Some(id) = assigned(origin + 1) {
                return Some(id);
            }
        }
        if y > 0 {
            if let Some(id) = assigned(origin - width) {
                return Some(id);
            }
        }
        if y < bounds.height() - 1 {
            if let Some(id) = assigned(origin + width) {
                return Some(id);
            }
        }
        None
    }
}

impl Index<ContinentId> for Segments {
    type Output = SegmentData;

    fn index(&self, id: ContinentId) -> &SegmentData {
        &self.data[id as usize]
    }
}

impl IndexMut<ContinentId> for Segments {
    fn index_mut(&mut self, id: ContinentId) -> &mut SegmentData {
        &mut self.data[id as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WorldDimension;
    use glam::Vec2;

    fn bounds(w: u32, h: u32, world_w: u32, world_h: u32) -> Bounds {
        Bounds::new(
            WorldDimension::new(world_w, world_h),
            Vec2::ZERO,
            w,
            h,
        )
    }

    fn map_from(w: u32, h: u32, land: &[(u32, u32)]) -> HeightMap {
        let mut map = HeightMap::new(w, h);
        for &(x, y) in land {
            map.set(x, y, 1.0);
        }
        map
    }

    #[test]
    fn flood_fill_claims_connected_component() {
        let bounds = bounds(5, 5, 20, 20);
        // Plus-shaped continent centered at (2, 2).
        let map = map_from(5, 5, &[(2, 1), (1, 2), (2, 2), (3, 2), (2, 3)]);
        let mut segments = Segments::new(25);

        let id = segments.create_segment(2, 2, &map, &bounds);
        assert_eq!(id, 0);
        let data = &segments[id];
        assert_eq!(data.area(), 5);
        assert_eq!((data.left(), data.right()), (1, 3));
        assert_eq!((data.top(), data.bottom()), (1, 3));
        for &(x, y) in &[(2, 1), (1, 2), (2, 2), (3, 2), (2, 3)] {
            assert_eq!(segments.id(bounds.index(x, y)), id);
        }
        assert_eq!(segments.id(bounds.index(0, 0)), NO_CONTINENT);
    }

    #[test]
    fn separate_components_get_separate_ids() {
        let bounds = bounds(5, 5, 20, 20);
        let map = map_from(5, 5, &[(0, 0), (4, 4)]);
        let mut segments = Segments::new(25);

        let a = segments.create_segment(0, 0, &map, &bounds);
        let b = segments.create_segment(4, 4, &map, &bounds);
        assert_ne!(a, b);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[a].area(), 1);
        assert_eq!(segments[b].area(), 1);
    }

    #[test]
    fn querying_same_cell_twice_reuses_segment() {
        let bounds = bounds(5, 5, 20, 20);
        let map = map_from(5, 5, &[(2, 2), (3, 2)]);
        let mut segments = Segments::new(25);

        let a = segments.create_segment(2, 2, &map, &bounds);
        let b = segments.create_segment(3, 2, &map, &bounds);
        assert_eq!(a, b);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn ocean_origin_yields_one_cell_segment() {
        let bounds = bounds(3, 3, 10, 10);
        let map = HeightMap::new(3, 3);
        let mut segments = Segments::new(9);

        let id = segments.create_segment(1, 1, &map, &bounds);
        assert_eq!(segments[id].area(), 1);
        assert_eq!(segments.id(bounds.index(1, 1)), id);
        assert_eq!(segments.id(bounds.index(0, 1)), NO_CONTINENT);
    }

    #[test]
    fn new_cell_adopts_adjacent_segment() {
        let bounds = bounds(5, 5, 20, 20);
        let mut map = map_from(5, 5, &[(1, 1)]);
        let mut segments = Segments::new(25);
        let id = segments.create_segment(1, 1, &map, &bounds);
        assert_eq!(segments[id].area(), 1);

        // Crust lands next to the existing continent after the fill ran.
        map.set(2, 1, 1.0);
        let adopted = segments.create_segment(2, 1, &map, &bounds);
        assert_eq!(adopted, id);
        assert_eq!(segments[id].area(), 2);
        assert_eq!(segments[id].right(), 2);
    }

    #[test]
    fn fill_wraps_when_plate_spans_world() {
        let bounds = bounds(4, 4, 4, 4);
        let map = map_from(4, 4, &[(0, 1), (3, 1)]);
        let mut segments = Segments::new(16);

        let id = segments.create_segment(0, 1, &map, &bounds);
        assert_eq!(segments[id].area(), 2);
        assert_eq!(segments.id(bounds.index(3, 1)), id);
    }

    #[test]
    fn reset_clears_ids_and_records() {
        let bounds = bounds(3, 3, 10, 10);
        let map = map_from(3, 3, &[(1, 1)]);
        let mut segments = Segments::new(9);
        segments.create_segment(1, 1, &map, &bounds);

        segments.reset();
        assert_eq!(segments.len(), 0);
        assert!(segments.is_empty());
        assert!((0..9).all(|i| segments.id(i) == NO_CONTINENT));
    }

    #[test]
    fn continent_at_translates_world_coordinates() {
        let world = WorldDimension::new(10, 10);
        let bounds = Bounds::new(world, Vec2::new(2.0, 2.0), 3, 3);
        let map = map_from(3, 3, &[(1, 1)]);
        let mut segments = Segments::new(9);

        let id = segments.continent_at(3, 3, &map, &bounds);
        assert_eq!(segments[id].area(), 1);
        // Same lookup again resolves without creating another segment.
        assert_eq!(segments.continent_at(3, 3, &map, &bounds), id);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn mark_non_existent_empties_segment() {
        let mut data = SegmentData::at(2, 2);
        data.inc_area();
        assert!(!data.is_empty());
        data.mark_non_existent();
        assert!(data.is_empty());
        assert!(!data.exists());
    }
}
