//! Hydraulic erosion over plate height maps.

mod hydraulic;

pub(crate) use hydraulic::{find_river_sources, flow_rivers, redistribute};
