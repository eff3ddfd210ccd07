pub mod resource;
pub mod view;

pub use resource::ResourceGrid;
pub use view::GridView;

use crate::net::NetView;
use gr_common::geom::interval::Interval;
use gr_common::geom::point::Point;
use std::collections::HashMap;

/// Read-only cost model the topology builder routes against.
pub trait RoutingGrid: Sync + Send {
    fn num_layers(&self) -> usize;
    /// Number of grid lines along `dimension` (0 = x, 1 = y).
    fn size(&self, dimension: usize) -> usize;
    /// 0 for horizontal layers, 1 for vertical.
    fn layer_direction(&self, layer: usize) -> usize;
    fn min_routing_layer(&self) -> usize;

    fn edge_length(&self, direction: usize, index: i32) -> i64;
    fn capacity(&self, layer: usize, x: i32, y: i32) -> f64;

    /// Cost of a same-layer run between two colinear cells.
    fn wire_cost(&self, layer: usize, u: Point<i32>, v: Point<i32>) -> f64;
    /// Cost of a single via from `layer` to `layer + 1`.
    fn via_cost(&self, layer: usize, at: Point<i32>) -> f64;

    /// Picks one access point per pin, preferring spare capacity and then
    /// closeness to the net's bounding-box centre, and merges pins landing
    /// on the same cell.
    fn select_access_points(&self, net: &NetView) -> AccessPoints {
        let bbox = net.bounding_box();
        let center = Point::new(bbox.cx(), bbox.cy());
        let mut selected = AccessPoints::default();

        for candidates in net.pin_access_points() {
            let mut best: Option<usize> = None;
            let mut best_score = (0, i32::MAX);
            for (i, point) in candidates.iter().enumerate() {
                let accessibility = if point.z >= self.min_routing_layer() {
                    self.capacity(point.z, point.x, point.y) as i32
                } else {
                    1
                };
                let distance = point.planar().manhattan(&center);
                if accessibility > best_score.0
                    || (accessibility == best_score.0 && distance < best_score.1)
                {
                    best = Some(i);
                    best_score = (accessibility, distance);
                }
            }
            let Some(best) = best else {
                continue;
            };

            let chosen = candidates[best];
            let entry = selected.entry(chosen.planar(), chosen.z);
            for point in candidates.iter().filter(|p| p.same_cell(&chosen)) {
                entry.fixed_layers.update(point.z);
            }
        }

        if let [only] = selected.entries.as_mut_slice() {
            only.fixed_layers.high = (only.fixed_layers.high + 1).min(self.num_layers() - 1);
        }
        selected
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectedAccess {
    pub point: Point<i32>,
    /// Layer of the candidate that won the selection.
    pub layer: usize,
    pub fixed_layers: Interval<usize>,
}

/// Selected access points of one net, one per distinct cell, in pin order.
#[derive(Clone, Debug, Default)]
pub struct AccessPoints {
    entries: Vec<SelectedAccess>,
    index: HashMap<Point<i32>, usize>,
}

impl AccessPoints {
    fn entry(&mut self, point: Point<i32>, layer: usize) -> &mut SelectedAccess {
        let next = self.entries.len();
        let idx = *self.index.entry(point).or_insert(next);
        if idx == next {
            self.entries.push(SelectedAccess {
                point,
                layer,
                fixed_layers: Interval::point(layer),
            });
        }
        &mut self.entries[idx]
    }

    pub fn get(&self, point: Point<i32>) -> Option<&SelectedAccess> {
        self.index.get(&point).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedAccess> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
