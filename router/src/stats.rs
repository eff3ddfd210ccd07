use crate::grid::{ResourceGrid, RoutingGrid};
use crate::tree::RouteTree;
use gr_common::geom::coord::GridCoord;

/// Summary of a finished routing run.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteStatistics {
    /// Sum of the absolute edge lengths covered by same-layer runs.
    pub wire_length: u64,
    pub via_count: usize,
    /// Wire usage above capacity, summed over routable layers.
    pub overflow: f64,
    pub min_resource: f64,
    pub bottleneck: Option<GridCoord>,
}

impl RouteStatistics {
    pub fn compute<'t>(grid: &ResourceGrid, trees: impl IntoIterator<Item = &'t RouteTree>) -> Self {
        let x_size = grid.size(0);
        let y_size = grid.size(1);
        let index = |l: usize, x: i32, y: i32| (l * x_size + x as usize) * y_size + y as usize;
        let mut usage = vec![0u32; grid.num_layers() * x_size * y_size];
        let mut wire_length = 0u64;
        let mut via_count = 0usize;

        for tree in trees {
            for (a, b) in tree.edges() {
                if a.z != b.z {
                    via_count += a.z.abs_diff(b.z);
                    continue;
                }
                let direction = grid.layer_direction(a.z);
                let (pa, pb) = (a.planar(), b.planar());
                let lo = pa.get(direction).min(pb.get(direction));
                let hi = pa.get(direction).max(pb.get(direction));
                for c in lo..hi {
                    wire_length += grid.edge_length(direction, c).max(0) as u64;
                    let mut p = pa;
                    *p.get_mut(direction) = c;
                    usage[index(a.z, p.x, p.y)] += 1;
                }
            }
        }

        let mut overflow = 0.0;
        let mut min_resource = f64::INFINITY;
        let mut bottleneck = None;
        for l in grid.min_routing_layer()..grid.num_layers() {
            let direction = grid.layer_direction(l);
            let x_end = if direction == 0 { x_size - 1 } else { x_size };
            let y_end = if direction == 0 { y_size } else { y_size - 1 };
            for x in 0..x_end as i32 {
                for y in 0..y_end as i32 {
                    let resource = grid.resource(l, x, y);
                    if resource < min_resource {
                        min_resource = resource;
                        bottleneck = Some(GridCoord::new(x, y, l));
                    }
                    let used = usage[index(l, x, y)] as f64;
                    let capacity = grid.capacity(l, x, y).max(0.0);
                    if used > capacity {
                        overflow += used - capacity;
                    }
                }
            }
        }

        Self {
            wire_length,
            via_count,
            overflow,
            min_resource,
            bottleneck,
        }
    }

    pub fn log(&self) {
        log::info!("Routing statistics");
        log::info!("  wire length (metric): {}", self.wire_length);
        log::info!("  total via count:      {}", self.via_count);
        log::info!("  total wire overflow:  {}", self.overflow as i64);
        log::info!("  min resource:         {}", self.min_resource);
        match self.bottleneck {
            Some(at) => log::info!("  bottleneck:           {}", at),
            None => log::info!("  bottleneck:           none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gr_common::db::core::{DesignDB, LayerDirection};
    use gr_common::util::config::GlobalRoutingConfig;

    fn grid() -> ResourceGrid {
        let mut db = DesignDB::new();
        db.set_dimension(3, 4, 4, vec![10; 3], vec![20; 3]);
        db.set_metrics(0.5, 4.0, vec![1.0; 3]);
        db.add_layer("M1".into(), LayerDirection::Horizontal, 0.0, vec![0.0; 16]);
        db.add_layer("M2".into(), LayerDirection::Horizontal, 0.0, vec![1.0; 16]);
        db.add_layer("M3".into(), LayerDirection::Vertical, 0.0, vec![2.0; 16]);
        ResourceGrid::new(&db, &GlobalRoutingConfig::default()).unwrap()
    }

    #[test]
    fn counts_length_vias_and_overflow() {
        let grid = grid();
        let mut tree = RouteTree::new(GridCoord::new(0, 0, 0));
        let up = tree.add_child(RouteTree::ROOT, GridCoord::new(0, 0, 2));
        let north = tree.add_child(up, GridCoord::new(0, 2, 2));
        let down = tree.add_child(north, GridCoord::new(0, 2, 1));
        tree.add_child(down, GridCoord::new(3, 2, 1));

        let second = tree.clone();
        grid.commit_tree(&tree, false).unwrap();
        grid.commit_tree(&second, false).unwrap();
        let stats = RouteStatistics::compute(&grid, [&tree, &second]);

        assert_eq!(stats.wire_length, 2 * (2 * 20 + 3 * 10));
        assert_eq!(stats.via_count, 2 * 3);
        // Three M2 edges carry two wires over capacity one.
        assert_eq!(stats.overflow, 3.0);
        assert!(stats.min_resource < 0.0);
        assert_eq!(stats.bottleneck.map(|c| c.z), Some(1));
    }

    #[test]
    fn idle_grid_has_no_overflow() {
        let grid = grid();
        let stats = RouteStatistics::compute(&grid, std::iter::empty());
        assert_eq!(stats.wire_length, 0);
        assert_eq!(stats.overflow, 0.0);
        assert_eq!(stats.min_resource, 1.0);
        assert_eq!(stats.bottleneck, Some(GridCoord::new(0, 0, 1)));
    }
}
