use crate::db::indices::*;
use crate::geom::coord::GridCoord;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerDirection {
    Horizontal,
    Vertical,
}

impl LayerDirection {
    /// 0 for horizontal, 1 for vertical. Matches the direction token of the
    /// capacity file and the axis index of `Point`.
    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            LayerDirection::Horizontal => 0,
            LayerDirection::Vertical => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(LayerDirection::Horizontal),
            1 => Some(LayerDirection::Vertical),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LayerData {
    pub name: String,
    pub index: usize,
    pub direction: LayerDirection,
    pub min_length: f64,
    /// Row-major capacity, `capacity[y * x_size + x]`.
    pub capacity: Vec<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct Dimension {
    pub n_layers: usize,
    pub x_size: usize,
    pub y_size: usize,
    /// Length between adjacent columns, `x_size - 1` entries.
    pub h_edges: Vec<i64>,
    /// Length between adjacent rows, `y_size - 1` entries.
    pub v_edges: Vec<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct Metrics {
    pub unit_length_wire_cost: f64,
    pub unit_via_cost: f64,
    pub overflow_weights: Vec<f64>,
}

#[derive(Clone, Copy, Debug)]
pub struct PointData {
    pub layer: usize,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug)]
pub struct PinData {
    pub name: String,
    pub net: NetId,
    pub slack: f64,
    pub points: Vec<PointId>,
}

/// One routed piece in grid coordinates: a same-layer run or a via stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteSegment {
    pub p1: GridCoord,
    pub p2: GridCoord,
}

impl RouteSegment {
    pub fn is_via(&self) -> bool {
        self.p1.same_cell(&self.p2)
    }
}

#[derive(Clone, Debug)]
pub struct NetData {
    pub name: String,
    pub pins: Vec<PinId>,
    pub route_segments: Vec<RouteSegment>,
}

pub struct DesignDB {
    pub layers: Vec<LayerData>,
    pub dimension: Dimension,
    pub metrics: Metrics,

    pub nets: Vec<NetData>,
    pub pins: Vec<PinData>,
    pub points: Vec<PointData>,

    pub net_name_map: HashMap<String, NetId>,
    pub layer_name_map: HashMap<String, usize>,
}

impl Default for DesignDB {
    fn default() -> Self {
        Self::new()
    }
}

impl DesignDB {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            dimension: Dimension::default(),
            metrics: Metrics::default(),
            nets: Vec::with_capacity(1000),
            pins: Vec::with_capacity(5000),
            points: Vec::with_capacity(5000),
            net_name_map: HashMap::new(),
            layer_name_map: HashMap::new(),
        }
    }

    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }
    pub fn num_pins(&self) -> usize {
        self.pins.len()
    }
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn set_dimension(
        &mut self,
        n_layers: usize,
        x_size: usize,
        y_size: usize,
        h_edges: Vec<i64>,
        v_edges: Vec<i64>,
    ) {
        self.dimension = Dimension {
            n_layers,
            x_size,
            y_size,
            h_edges,
            v_edges,
        };
    }

    pub fn set_metrics(&mut self, unit_length_wire_cost: f64, unit_via_cost: f64, weights: Vec<f64>) {
        self.metrics = Metrics {
            unit_length_wire_cost,
            unit_via_cost,
            overflow_weights: weights,
        };
    }

    pub fn add_layer(
        &mut self,
        name: String,
        direction: LayerDirection,
        min_length: f64,
        capacity: Vec<f64>,
    ) -> usize {
        let idx = self.layers.len();
        self.layer_name_map.insert(name.clone(), idx);
        self.layers.push(LayerData {
            name,
            index: idx,
            direction,
            min_length,
            capacity,
        });
        idx
    }

    #[inline]
    pub fn layer_capacity(&self, layer: usize, x: usize, y: usize) -> f64 {
        self.layers[layer].capacity[y * self.dimension.x_size + x]
    }

    pub fn add_net(&mut self, name: String) -> NetId {
        if let Some(&id) = self.net_name_map.get(&name) {
            return id;
        }
        let id = NetId::new(self.nets.len());
        self.nets.push(NetData {
            name: name.clone(),
            pins: Vec::new(),
            route_segments: Vec::new(),
        });
        self.net_name_map.insert(name, id);
        id
    }

    pub fn add_pin(&mut self, net: NetId, name: String, slack: f64) -> PinId {
        let id = PinId::new(self.pins.len());
        self.pins.push(PinData {
            name,
            net,
            slack,
            points: Vec::new(),
        });
        self.nets[net.index()].pins.push(id);
        id
    }

    pub fn add_point(&mut self, pin: PinId, layer: usize, x: i32, y: i32) -> PointId {
        let id = PointId::new(self.points.len());
        self.points.push(PointData { layer, x, y });
        self.pins[pin.index()].points.push(id);
        id
    }

    /// Candidate access points of `pin` in input order.
    pub fn pin_points(&self, pin: PinId) -> impl Iterator<Item = &PointData> + '_ {
        self.pins[pin.index()]
            .points
            .iter()
            .map(move |p| &self.points[p.index()])
    }
}
