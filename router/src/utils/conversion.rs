use crate::grid::ResourceGrid;
use crate::tree::RouteTree;
use gr_common::util::config::{GuideUnits, OutputConfig};
use std::fmt::Write;

/// Maps grid indices and layers to the coordinates written into guides.
pub struct GridConverter {
    units: GuideUnits,
    pitch: i64,
    offset: i64,
    layer_prefix: String,
    positions: [Vec<i64>; 2],
}

impl GridConverter {
    pub fn new(grid: &ResourceGrid, output: &OutputConfig) -> Self {
        let prefix_sums = |lengths: &[i64]| {
            let mut positions = Vec::with_capacity(lengths.len() + 1);
            let mut acc = 0;
            positions.push(acc);
            for &l in lengths {
                acc += l;
                positions.push(acc);
            }
            positions
        };
        Self {
            units: output.guide_units,
            pitch: output.guide_pitch,
            offset: output.guide_offset,
            layer_prefix: output.layer_prefix.clone(),
            positions: [prefix_sums(grid.edge_lengths(0)), prefix_sums(grid.edge_lengths(1))],
        }
    }

    /// Coordinate of grid line `index` along `dimension` (0 = x, 1 = y).
    pub fn to_world(&self, dimension: usize, index: i32) -> i64 {
        match self.units {
            GuideUnits::Grid => index as i64,
            GuideUnits::Pitch => index as i64 * self.pitch + self.offset,
            GuideUnits::Absolute => self.positions[dimension]
                .get(index.max(0) as usize)
                .copied()
                .unwrap_or_default(),
        }
    }

    pub fn layer_label(&self, layer: i32) -> String {
        format!("{}{}", self.layer_prefix, layer + 1)
    }

    /// `name`, `(`, one line per unique guide box, `)`. Unrouted nets produce
    /// nothing.
    pub fn net_guide(&self, name: &str, tree: Option<&RouteTree>) -> String {
        let Some(tree) = tree else {
            return String::new();
        };
        let mut out = String::new();
        let _ = writeln!(out, "{}\n(", name);
        for [xl, yl, zl, xh, yh, zh] in tree.guide_segments() {
            let _ = writeln!(
                out,
                "{} {} {} {} {} {}",
                self.to_world(0, xl),
                self.to_world(1, yl),
                self.layer_label(zl),
                self.to_world(0, xh),
                self.to_world(1, yh),
                self.layer_label(zh)
            );
        }
        out.push_str(")\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gr_common::db::core::{DesignDB, LayerDirection};
    use gr_common::geom::coord::GridCoord;
    use gr_common::util::config::GlobalRoutingConfig;

    fn grid() -> ResourceGrid {
        let mut db = DesignDB::new();
        db.set_dimension(2, 3, 3, vec![100, 300], vec![50, 50]);
        db.set_metrics(1.0, 1.0, vec![1.0; 2]);
        db.add_layer("M1".into(), LayerDirection::Horizontal, 0.0, vec![1.0; 9]);
        db.add_layer("M2".into(), LayerDirection::Vertical, 0.0, vec![1.0; 9]);
        let config = GlobalRoutingConfig {
            min_routing_layer: 0,
            ..GlobalRoutingConfig::default()
        };
        ResourceGrid::new(&db, &config).unwrap()
    }

    #[test]
    fn coordinate_units() {
        let grid = grid();
        let mut output = OutputConfig::default();
        assert_eq!(GridConverter::new(&grid, &output).to_world(0, 2), 2 * 4200 + 2100);

        output.guide_units = GuideUnits::Absolute;
        let absolute = GridConverter::new(&grid, &output);
        assert_eq!(absolute.to_world(0, 2), 400);
        assert_eq!(absolute.to_world(1, 1), 50);

        output.guide_units = GuideUnits::Grid;
        output.layer_prefix = "M".into();
        let raw = GridConverter::new(&grid, &output);
        assert_eq!(raw.to_world(1, 2), 2);
        assert_eq!(raw.layer_label(0), "M1");
    }

    #[test]
    fn guide_text_lists_unique_boxes() {
        let grid = grid();
        let output = OutputConfig {
            guide_units: GuideUnits::Grid,
            ..OutputConfig::default()
        };
        let converter = GridConverter::new(&grid, &output);
        let mut tree = RouteTree::new(GridCoord::new(0, 0, 0));
        let east = tree.add_child(RouteTree::ROOT, GridCoord::new(2, 0, 0));
        let up = tree.add_child(east, GridCoord::new(2, 0, 1));
        tree.add_child(up, GridCoord::new(2, 2, 1));

        let text = converter.net_guide("n1", Some(&tree));
        assert_eq!(
            text,
            "n1\n(\n0 0 metal1 2 0 metal1\n2 0 metal1 2 0 metal2\n2 0 metal2 2 2 metal2\n)\n"
        );
        assert!(converter.net_guide("n2", None).is_empty());
    }
}
