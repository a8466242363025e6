//! Hydraulic erosion over one plate's height map.
//!
//! Two passes: steepest-descent river carving from local peaks, then a
//! slope-redistribution sweep that moves crust from each cell onto its
//! lower neighbours. Both operate on plain `(map, bounds)` views so the
//! plate can hand out borrows instead of back references.

use crate::geometry::Bounds;
use crate::tectonics::{Mass, MassBuilder};
use crate::terrain::HeightMap;

/// Fraction of the height above the water line a cell loses each time a
/// river passes through it.
const RIVER_EROSION_RATE: f32 = 0.2;

/// Direction slots in fixed W, E, N, S order; ties in that order are won by
/// the earliest direction.
const DIRECTIONS: usize = 4;

/// The four von Neumann neighbours of a cell.
///
/// A direction that leaves the plate reports zero crust, keeps the cell's
/// own index, and is flagged as not existing. The plate wraps in an axis
/// exactly when it spans the full world in that axis.
pub(crate) struct Neighborhood {
    pub crust: [f32; DIRECTIONS],
    pub index: [usize; DIRECTIONS],
    pub exists: [bool; DIRECTIONS],
}

impl Neighborhood {
    pub fn any_exists(&self) -> bool {
        self.exists.iter().any(|&e| e)
    }
}

pub(crate) fn neighborhood(x: u32, y: u32, index: usize, map: &HeightMap, bounds: &Bounds) -> Neighborhood {
    let width = bounds.width() as usize;
    let height = bounds.height() as usize;
    let wrap_x = bounds.width() == bounds.world().width();
    let wrap_y = bounds.height() == bounds.world().height();
    let x = x as usize;
    let y = y as usize;

    let mut nb = Neighborhood {
        crust: [0.0; DIRECTIONS],
        index: [index; DIRECTIONS],
        exists: [false; DIRECTIONS],
    };

    if x > 0 {
        nb.index[0] = index - 1;
        nb.exists[0] = true;
    } else if wrap_x {
        nb.index[0] = index + width - 1;
        nb.exists[0] = true;
    }

    if x < width - 1 {
        nb.index[1] = index + 1;
        nb.exists[1] = true;
    } else if wrap_x {
        nb.index[1] = index + 1 - width;
        nb.exists[1] = true;
    }

    if y > 0 {
        nb.index[2] = index - width;
        nb.exists[2] = true;
    } else if wrap_y {
        nb.index[2] = index + (height - 1) * width;
        nb.exists[2] = true;
    }

    if y < height - 1 {
        nb.index[3] = index + width;
        nb.exists[3] = true;
    } else if wrap_y {
        nb.index[3] = index - (height - 1) * width;
        nb.exists[3] = true;
    }

    for k in 0..DIRECTIONS {
        if nb.exists[k] {
            nb.crust[k] = map[nb.index[k]];
        }
    }

    nb
}

/// Finds river sources: cells at or above the water line strictly taller
/// than all four of their neighbours.
pub(crate) fn find_river_sources(map: &HeightMap, bounds: &Bounds, lower_bound: f32) -> Vec<usize> {
    let mut sources = Vec::new();
    for y in 0..bounds.height() {
        for x in 0..bounds.width() {
            let index = bounds.index(x, y);
            if map[index] < lower_bound {
                continue;
            }
            let nb = neighborhood(x, y, index, map, bounds);
            if nb.crust.iter().all(|&c| c < map[index]) {
                sources.push(index);
            }
        }
    }
    sources
}

/// Routes water from each source along the steepest slope, eroding every
/// visited cell into `tmp`.
///
/// Frontiers swap between sources and sinks until no new cell is reached;
/// each cell is enqueued at most once per pass.
pub(crate) fn flow_rivers(
    map: &HeightMap,
    bounds: &Bounds,
    lower_bound: f32,
    mut sources: Vec<usize>,
    tmp: &mut HeightMap,
) {
    let width = bounds.width() as usize;
    let mut sinks: Vec<usize> = Vec::new();
    let mut is_done = vec![false; bounds.area()];

    while !sources.is_empty() {
        while let Some(index) = sources.pop() {
            if map[index] < lower_bound {
                continue;
            }

            let x = (index % width) as u32;
            let y = (index / width) as u32;
            let nb = neighborhood(x, y, index, map, bounds);

            // Lowest point of its neighbourhood; the river ends here.
            if nb.crust.iter().sum::<f32>() == 0.0 {
                continue;
            }

            // An off-plate or ocean direction must never beat a real lower
            // neighbour, so it stands in at the cell's own height.
            let here = map[index];
            let mut lowest = f32::MAX;
            let mut dest = index;
            for k in 0..DIRECTIONS {
                let crust = if nb.crust[k] == 0.0 { here } else { nb.crust[k] };
                if crust < lowest {
                    lowest = crust;
                    dest = nb.index[k];
                }
            }

            if dest != index && !is_done[dest] {
                is_done[dest] = true;
                sinks.push(dest);
            }

            tmp[index] -= (tmp[index] - lower_bound) * RIVER_EROSION_RATE;
        }

        std::mem::swap(&mut sources, &mut sinks);
    }
}

/// The slope-redistribution pass.
///
/// Every cell above the water line sheds the height drop to its tallest
/// lower neighbour: either the lower neighbours absorb it proportionally,
/// or (when they cannot) cell and neighbours are levelled and the residual
/// is split evenly. Only neighbours actually on the plate participate; an
/// ocean neighbour at zero height is a valid (very low) recipient. Returns
/// the new map and its rebuilt mass.
pub(crate) fn redistribute(map: &HeightMap, bounds: &Bounds, lower_bound: f32) -> (HeightMap, Mass) {
    let mut tmp = HeightMap::new(bounds.width(), bounds.height());
    let mut builder = MassBuilder::new();

    for y in 0..bounds.height() {
        for x in 0..bounds.width() {
            let index = bounds.index(x, y);
            let here = map[index];
            builder.add_point(x, y, here);
            // Additive: earlier cells may already have shed crust here.
            tmp[index] += here;

            if here < lower_bound {
                continue;
            }

            let nb = neighborhood(x, y, index, map, bounds);
            if !nb.any_exists() {
                continue;
            }

            // Height drops to the existing lower neighbours.
            let mut diffs = [0.0f32; DIRECTIONS];
            let mut lower = [false; DIRECTIONS];
            let mut lower_count = 0u32;
            let mut min_diff = f32::MAX;
            for k in 0..DIRECTIONS {
                if !nb.exists[k] {
                    continue;
                }
                let diff = here - nb.crust[k];
                if diff > 0.0 {
                    diffs[k] = diff;
                    lower[k] = true;
                    lower_count += 1;
                    min_diff = min_diff.min(diff);
                }
            }
            if lower_count == 0 {
                continue;
            }

            let mut diff_sum = 0.0;
            for k in 0..DIRECTIONS {
                if lower[k] {
                    diff_sum += diffs[k] - min_diff;
                }
            }
            debug_assert!(diff_sum >= 0.0);

            if diff_sum < min_diff {
                // The neighbours cannot absorb enough to level this cell
                // with its tallest lower neighbour: level them all, then
                // split the remainder evenly across cell and neighbours.
                for k in 0..DIRECTIONS {
                    if lower[k] {
                        tmp[nb.index[k]] += diffs[k] - min_diff;
                    }
                }
                tmp[index] -= min_diff;

                let share = (min_diff - diff_sum) / (1 + lower_count) as f32;
                for k in 0..DIRECTIONS {
                    if lower[k] {
                        tmp[nb.index[k]] += share;
                    }
                }
                tmp[index] += share;
            } else {
                let unit = min_diff / diff_sum;
                tmp[index] -= min_diff;
                for k in 0..DIRECTIONS {
                    if lower[k] {
                        tmp[nb.index[k]] += unit * (diffs[k] - min_diff);
                    }
                }
            }
        }
    }

    (tmp, builder.build())
}
