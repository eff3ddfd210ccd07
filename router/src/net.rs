use crate::error::RouteError;
use crate::tree::RouteTree;
use gr_common::db::core::DesignDB;
use gr_common::db::indices::NetId;
use gr_common::geom::coord::GridCoord;
use gr_common::geom::rect::GridRect;

/// Routing-side view of one net: candidate access points grouped by pin, the
/// bounding box over all of them, and the committed result once routed.
#[derive(Clone, Debug)]
pub struct NetView {
    id: NetId,
    name: String,
    pin_access_points: Vec<Vec<GridCoord>>,
    bounding_box: GridRect,
    routing_tree: Option<RouteTree>,
}

impl NetView {
    pub fn new(db: &DesignDB, id: NetId) -> Result<Self, RouteError> {
        let net = &db.nets[id.index()];
        let dim = &db.dimension;
        let mut pins = Vec::with_capacity(net.pins.len());
        for &pin in &net.pins {
            let mut points = Vec::new();
            for p in db.pin_points(pin) {
                let coord = GridCoord::new(p.x, p.y, p.layer);
                if p.x < 0
                    || p.y < 0
                    || p.x as usize >= dim.x_size
                    || p.y as usize >= dim.y_size
                    || p.layer >= dim.n_layers
                {
                    return Err(RouteError::AccessPointOutOfGrid {
                        net: net.name.clone(),
                        point: coord,
                    });
                }
                points.push(coord);
            }
            pins.push(points);
        }
        Ok(Self::from_access_points(id, net.name.clone(), pins))
    }

    pub fn from_access_points(id: NetId, name: String, pins: Vec<Vec<GridCoord>>) -> Self {
        let bounding_box =
            GridRect::from_points(pins.iter().flatten().map(|c| c.planar())).unwrap_or_default();
        Self {
            id,
            name,
            pin_access_points: pins,
            bounding_box,
            routing_tree: None,
        }
    }

    pub fn id(&self) -> NetId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn num_pins(&self) -> usize {
        self.pin_access_points.len()
    }
    pub fn pin_access_points(&self) -> &[Vec<GridCoord>] {
        &self.pin_access_points
    }
    pub fn all_access_points(&self) -> impl Iterator<Item = &GridCoord> + '_ {
        self.pin_access_points.iter().flatten()
    }
    pub fn bounding_box(&self) -> &GridRect {
        &self.bounding_box
    }

    pub fn routing_tree(&self) -> Option<&RouteTree> {
        self.routing_tree.as_ref()
    }
    pub fn set_routing_tree(&mut self, tree: Option<RouteTree>) {
        self.routing_tree = tree;
    }
}
