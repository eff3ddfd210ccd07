use super::view::GridView;
use super::RoutingGrid;
use crate::error::RouteError;
use crate::tree::RouteTree;
use gr_common::db::core::DesignDB;
use gr_common::geom::coord::GridCoord;
use gr_common::geom::point::Point;
use gr_common::util::config::GlobalRoutingConfig;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

const ZERO_CAPACITY: f64 = 1e-4;

/// Capacity and demand of every routing edge, shared by all routing workers.
///
/// Edge `(l, x, y)` on a horizontal layer joins cells `(x, y)` and `(x+1, y)`;
/// on a vertical layer it joins `(x, y)` and `(x, y+1)`. Demand cells are
/// atomics holding `f64` bits so commits from concurrent buckets never lose
/// an update.
pub struct ResourceGrid {
    n_layers: usize,
    x_size: usize,
    y_size: usize,
    directions: Vec<usize>,
    /// Routable layers (at or above the minimum routing layer) per direction.
    direction_layers: [Vec<usize>; 2],
    h_edges: Vec<i64>,
    v_edges: Vec<i64>,
    layer_names: Vec<String>,

    unit_length_wire_cost: f64,
    unit_via_cost: f64,
    overflow_weights: Vec<f64>,
    min_routing_layer: usize,
    slope_steep: f64,
    slope: f64,
    unit_via_demand: f64,

    capacity: Vec<f64>,
    demand: Vec<AtomicU64>,
    total_length: AtomicI64,
    total_vias: AtomicI64,
}

impl ResourceGrid {
    pub fn new(db: &DesignDB, config: &GlobalRoutingConfig) -> Result<Self, RouteError> {
        let dim = &db.dimension;
        if config.min_routing_layer >= dim.n_layers {
            return Err(RouteError::InvalidConfig(format!(
                "min_routing_layer {} is not below the layer count {}",
                config.min_routing_layer, dim.n_layers
            )));
        }

        let size = dim.n_layers * dim.x_size * dim.y_size;
        let mut capacity = vec![0.0; size];
        let mut directions = Vec::with_capacity(dim.n_layers);
        let mut direction_layers = [Vec::new(), Vec::new()];
        for (l, layer) in db.layers.iter().enumerate() {
            let direction = layer.direction.index();
            directions.push(direction);
            if l >= config.min_routing_layer {
                direction_layers[direction].push(l);
            }
            for y in 0..dim.y_size {
                for x in 0..dim.x_size {
                    let value = layer.capacity[y * dim.x_size + x];
                    if value < 0.0 {
                        return Err(RouteError::NegativeCapacity {
                            layer: l,
                            x: x as i32,
                            y: y as i32,
                            capacity: value,
                        });
                    }
                    capacity[(l * dim.x_size + x) * dim.y_size + y] = value;
                }
            }
        }

        for (direction, name) in ["horizontal", "vertical"].into_iter().enumerate() {
            if direction_layers[direction].is_empty() {
                return Err(RouteError::InvalidConfig(format!(
                    "no {} layer at or above min_routing_layer {}",
                    name, config.min_routing_layer
                )));
            }
        }

        let mut overflow_weights = db.metrics.overflow_weights.clone();
        overflow_weights.resize(dim.n_layers, 1.0);

        log::info!(
            "Resource grid: {} layers, {} x {} cells, routing from layer {}",
            dim.n_layers,
            dim.x_size,
            dim.y_size,
            config.min_routing_layer
        );

        Ok(Self {
            n_layers: dim.n_layers,
            x_size: dim.x_size,
            y_size: dim.y_size,
            directions,
            direction_layers,
            h_edges: dim.h_edges.clone(),
            v_edges: dim.v_edges.clone(),
            layer_names: db.layers.iter().map(|l| l.name.clone()).collect(),
            unit_length_wire_cost: db.metrics.unit_length_wire_cost,
            unit_via_cost: db.metrics.unit_via_cost,
            overflow_weights,
            min_routing_layer: config.min_routing_layer,
            slope_steep: config.cost_logistic_slope_steep,
            slope: config.cost_logistic_slope,
            unit_via_demand: config.unit_via_demand,
            capacity,
            demand: (0..size).map(|_| AtomicU64::new(0f64.to_bits())).collect(),
            total_length: AtomicI64::new(0),
            total_vias: AtomicI64::new(0),
        })
    }

    #[inline(always)]
    fn index(&self, layer: usize, x: i32, y: i32) -> usize {
        (layer * self.x_size + x as usize) * self.y_size + y as usize
    }

    pub fn layer_name(&self, layer: usize) -> &str {
        &self.layer_names[layer]
    }

    pub fn edge_lengths(&self, direction: usize) -> &[i64] {
        if direction == 0 {
            &self.h_edges
        } else {
            &self.v_edges
        }
    }

    pub fn demand(&self, layer: usize, x: i32, y: i32) -> f64 {
        f64::from_bits(self.demand[self.index(layer, x, y)].load(Ordering::Acquire))
    }

    pub fn resource(&self, layer: usize, x: i32, y: i32) -> f64 {
        self.capacity(layer, x, y) - self.demand(layer, x, y)
    }

    pub fn total_length(&self) -> i64 {
        self.total_length.load(Ordering::Relaxed)
    }

    pub fn total_vias(&self) -> i64 {
        self.total_vias.load(Ordering::Relaxed)
    }

    #[inline]
    fn logistic(&self, resource: f64, steep: bool) -> f64 {
        let slope = if steep { self.slope_steep } else { self.slope };
        (-resource * slope).exp()
    }

    fn congestion_penalty(&self, layer: usize, x: i32, y: i32) -> f64 {
        let capacity = self.capacity(layer, x, y);
        self.logistic(capacity - self.demand(layer, x, y), capacity < ZERO_CAPACITY)
            * self.overflow_weights[layer]
    }

    /// Cost of routing `demand` tracks over the single edge at `lower`.
    pub fn edge_wire_cost(&self, layer: usize, lower: Point<i32>, demand: f64) -> f64 {
        let direction = self.directions[layer];
        let length = self.edge_length(direction, lower.get(direction)) as f64;
        let penalty = self.congestion_penalty(layer, lower.x, lower.y);
        demand * (length * self.unit_length_wire_cost + penalty)
    }

    fn add_demand(&self, layer: usize, x: i32, y: i32, delta: f64) -> Result<(), RouteError> {
        let cell = &self.demand[self.index(layer, x, y)];
        let (Ok(previous) | Err(previous)) =
            cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            });
        let demand = f64::from_bits(previous) + delta;
        if demand <= -1.0 {
            return Err(RouteError::NegativeDemand { layer, x, y, demand });
        }
        Ok(())
    }

    fn commit_wire(&self, layer: usize, lower: Point<i32>, reverse: bool) -> Result<(), RouteError> {
        let direction = self.directions[layer];
        let length = self.edge_length(direction, lower.get(direction));
        let (delta, sign) = if reverse { (-1.0, -1) } else { (1.0, 1) };
        self.add_demand(layer, lower.x, lower.y, delta)?;
        self.total_length.fetch_add(sign * length, Ordering::Relaxed);
        Ok(())
    }

    /// Via from `layer` to `layer + 1`. Only the interior layers of a stacked
    /// via consume track resource, on the edges on either side of the cell.
    fn commit_via(
        &self,
        layer: usize,
        at: Point<i32>,
        reverse: bool,
        stacked: bool,
    ) -> Result<(), RouteError> {
        if stacked {
            let delta = if reverse {
                -self.unit_via_demand
            } else {
                self.unit_via_demand
            };
            for l in layer..=layer + 1 {
                let direction = self.directions[l];
                let pos = at.get(direction);
                if pos > 0 {
                    let mut lower = at;
                    *lower.get_mut(direction) -= 1;
                    self.add_demand(l, lower.x, lower.y, delta)?;
                }
                if (pos as usize) < self.size(direction) - 1 {
                    self.add_demand(l, at.x, at.y, delta)?;
                }
            }
        }
        let delta = if reverse { -1 } else { 1 };
        self.total_vias
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                (count + delta >= 0).then_some(count + delta)
            })
            .map_err(|_| RouteError::NegativeViaCount { x: at.x, y: at.y })?;
        Ok(())
    }

    /// Adds (or with `reverse`, releases) the demand of every wire and via in
    /// `tree`. A net must be released before it is rerouted.
    pub fn commit_tree(&self, tree: &RouteTree, reverse: bool) -> Result<(), RouteError> {
        for (a, b) in tree.edges() {
            if a.z == b.z {
                let direction = self.directions[a.z];
                let (lo, hi) = self.run_bounds(a, b)?;
                for c in lo..hi {
                    let mut lower = a.planar();
                    *lower.get_mut(direction) = c;
                    self.commit_wire(a.z, lower, reverse)?;
                }
            } else {
                if !a.same_cell(&b) {
                    return Err(RouteError::MalformedTree { from: a, to: b });
                }
                let lo = a.z.min(b.z);
                let hi = a.z.max(b.z);
                for l in lo..hi {
                    let stacked = l != lo && l != hi - 1;
                    self.commit_via(l, a.planar(), reverse, stacked)?;
                }
            }
        }
        Ok(())
    }

    fn run_bounds(&self, a: GridCoord, b: GridCoord) -> Result<(i32, i32), RouteError> {
        let direction = self.directions[a.z];
        if a.planar().get(1 - direction) != b.planar().get(1 - direction) {
            return Err(RouteError::MalformedTree { from: a, to: b });
        }
        let (pa, pb) = (a.planar().get(direction), b.planar().get(direction));
        Ok((pa.min(pb), pa.max(pb)))
    }

    pub fn check_overflow_edge(&self, layer: usize, x: i32, y: i32, threshold: f64) -> bool {
        self.resource(layer, x, y) < -threshold
    }

    /// Number of overflowing edges along a same-layer run.
    pub fn check_overflow_run(
        &self,
        layer: usize,
        u: Point<i32>,
        v: Point<i32>,
        threshold: f64,
    ) -> usize {
        let direction = self.directions[layer];
        let lo = u.get(direction).min(v.get(direction));
        let hi = u.get(direction).max(v.get(direction));
        (lo..hi)
            .filter(|&c| {
                let mut p = u;
                *p.get_mut(direction) = c;
                self.check_overflow_edge(layer, p.x, p.y, threshold)
            })
            .count()
    }

    /// Overflowing edges under `tree`: its wires and the interior layers of
    /// its stacked vias.
    pub fn check_overflow_tree(&self, tree: &RouteTree, threshold: f64) -> usize {
        let mut count = 0;
        for (a, b) in tree.edges() {
            if a.z == b.z {
                count += self.check_overflow_run(a.z, a.planar(), b.planar(), threshold);
            } else {
                let lo = a.z.min(b.z);
                let hi = a.z.max(b.z);
                count += (lo + 1..hi)
                    .filter(|&l| self.check_overflow_edge(l, a.x, a.y, threshold))
                    .count();
            }
        }
        count
    }

    fn congested(&self, direction: usize, x: i32, y: i32) -> bool {
        self.direction_layers[direction]
            .iter()
            .any(|&l| self.check_overflow_edge(l, x, y, 0.0))
    }

    /// Edge cost of one direction with all its routable layers merged into a
    /// single track bundle.
    fn merged_wire_cost(&self, direction: usize, x: i32, y: i32) -> f64 {
        let layers = &self.direction_layers[direction];
        let edge_index = if direction == 0 { x } else { y };
        if layers.is_empty() || edge_index as usize >= self.size(direction) - 1 {
            return f64::INFINITY;
        }
        let mut capacity = 0.0;
        let mut demand = 0.0;
        let mut weight = 0.0;
        for &l in layers {
            capacity += self.capacity(l, x, y);
            demand += self.demand(l, x, y);
            weight += self.overflow_weights[l];
        }
        weight /= layers.len() as f64;
        let length = self.edge_length(direction, edge_index) as f64;
        length * self.unit_length_wire_cost
            + self.logistic(capacity - demand, capacity < ZERO_CAPACITY) * weight
    }

    fn extract_view<T: Copy>(&self, fill: T, value: impl Fn(usize, i32, i32) -> T) -> GridView<T> {
        let mut view = GridView::new(self.x_size, self.y_size, fill);
        for direction in 0..2 {
            for x in 0..self.x_size as i32 {
                for y in 0..self.y_size as i32 {
                    view.set(direction, x, y, value(direction, x, y));
                }
            }
        }
        view
    }

    /// Cells whose demand a commit of `tree` may have changed, as
    /// `(direction, x, y)`.
    fn touched_edges(&self, tree: &RouteTree) -> Vec<(usize, i32, i32)> {
        let mut touched = Vec::new();
        for (a, b) in tree.edges() {
            if a.z == b.z {
                let direction = self.directions[a.z];
                let lo = a.planar().get(direction).min(b.planar().get(direction));
                let hi = a.planar().get(direction).max(b.planar().get(direction));
                for c in lo..hi {
                    let mut p = a.planar();
                    *p.get_mut(direction) = c;
                    touched.push((direction, p.x, p.y));
                }
            } else {
                for l in a.z.min(b.z)..=a.z.max(b.z) {
                    let direction = self.directions[l];
                    touched.push((direction, a.x, a.y));
                    if a.planar().get(direction) > 0 {
                        let mut p = a.planar();
                        *p.get_mut(direction) -= 1;
                        touched.push((direction, p.x, p.y));
                    }
                }
            }
        }
        touched
    }

    /// Flags every cell where some routable layer of that direction overflows.
    pub fn extract_congestion_view(&self) -> GridView<bool> {
        self.extract_view(false, |d, x, y| self.congested(d, x, y))
    }

    pub fn update_congestion_view(&self, view: &mut GridView<bool>, tree: &RouteTree) {
        for (d, x, y) in self.touched_edges(tree) {
            view.set(d, x, y, self.congested(d, x, y));
        }
    }

    pub fn extract_wire_cost_view(&self) -> GridView<f64> {
        self.extract_view(f64::INFINITY, |d, x, y| self.merged_wire_cost(d, x, y))
    }

    pub fn update_wire_cost_view(&self, view: &mut GridView<f64>, tree: &RouteTree) {
        for (d, x, y) in self.touched_edges(tree) {
            view.set(d, x, y, self.merged_wire_cost(d, x, y));
        }
    }

    /// Lowest resource over the routable layers of each cell, row-major
    /// `[y * x_size + x]`.
    pub fn min_resource_map(&self) -> Vec<f64> {
        let mut map = vec![f64::INFINITY; self.x_size * self.y_size];
        for l in self.min_routing_layer..self.n_layers {
            for y in 0..self.y_size {
                for x in 0..self.x_size {
                    let cell = &mut map[y * self.x_size + x];
                    *cell = cell.min(self.resource(l, x as i32, y as i32));
                }
            }
        }
        map
    }

    fn write_layers(&self, path: &str, value: impl Fn(usize, i32, i32) -> f64) -> Result<(), RouteError> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{} {} {} ", self.n_layers, self.x_size, self.y_size)?;
        for l in 0..self.n_layers {
            writeln!(out, "{}", l)?;
            for y in 0..self.y_size as i32 {
                let row: Vec<String> = (0..self.x_size as i32)
                    .map(|x| value(l, x, y).to_string())
                    .collect();
                writeln!(out, "{}", row.join(" "))?;
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Dumps the remaining resource of every edge.
    pub fn write_heatmap(&self, path: &str) -> Result<(), RouteError> {
        log::info!("Writing heatmap to {}", path);
        self.write_layers(path, |l, x, y| self.resource(l, x, y))
    }

    pub fn write_capacity(&self, path: &str) -> Result<(), RouteError> {
        log::info!("Writing capacity map to {}", path);
        self.write_layers(path, |l, x, y| self.capacity(l, x, y))
    }
}

impl RoutingGrid for ResourceGrid {
    fn num_layers(&self) -> usize {
        self.n_layers
    }

    fn size(&self, dimension: usize) -> usize {
        if dimension == 0 { self.x_size } else { self.y_size }
    }

    fn layer_direction(&self, layer: usize) -> usize {
        self.directions[layer]
    }

    fn min_routing_layer(&self) -> usize {
        self.min_routing_layer
    }

    fn edge_length(&self, direction: usize, index: i32) -> i64 {
        if index < 0 {
            return 0;
        }
        self.edge_lengths(direction)
            .get(index as usize)
            .copied()
            .unwrap_or(0)
    }

    #[inline]
    fn capacity(&self, layer: usize, x: i32, y: i32) -> f64 {
        self.capacity[self.index(layer, x, y)]
    }

    fn wire_cost(&self, layer: usize, u: Point<i32>, v: Point<i32>) -> f64 {
        let direction = self.directions[layer];
        debug_assert_eq!(u.get(1 - direction), v.get(1 - direction));
        let lo = u.get(direction).min(v.get(direction));
        let hi = u.get(direction).max(v.get(direction));
        (lo..hi)
            .map(|c| {
                let mut p = u;
                *p.get_mut(direction) = c;
                self.edge_wire_cost(layer, p, 1.0)
            })
            .sum()
    }

    fn via_cost(&self, layer: usize, at: Point<i32>) -> f64 {
        debug_assert!(layer + 1 < self.n_layers);
        let mut cost = self.unit_via_cost;
        for l in layer..=layer + 1 {
            cost += self.unit_via_demand * self.congestion_penalty(l, at.x, at.y);
        }
        cost
    }
}
