use gr_common::db::core::RouteSegment;
use gr_common::geom::coord::GridCoord;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteNode {
    pub coord: GridCoord,
    pub children: Vec<usize>,
}

/// Routed geometry of one net, stored as an arena rooted at index 0. Every
/// edge is either a same-layer run or a same-cell layer change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTree {
    nodes: Vec<RouteNode>,
}

impl RouteTree {
    pub const ROOT: usize = 0;

    pub fn new(root: GridCoord) -> Self {
        Self {
            nodes: vec![RouteNode {
                coord: root,
                children: Vec::new(),
            }],
        }
    }

    pub fn add_child(&mut self, parent: usize, coord: GridCoord) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(RouteNode {
            coord,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        idx
    }

    #[inline]
    pub fn node(&self, idx: usize) -> &RouteNode {
        &self.nodes[idx]
    }
    #[inline]
    pub fn coord(&self, idx: usize) -> GridCoord {
        self.nodes[idx].coord
    }
    pub fn root(&self) -> GridCoord {
        self.nodes[Self::ROOT].coord
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node indices reachable from the root, parents before children.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.nodes[idx].children.iter().rev());
        }
        order
    }

    /// Parent/child coordinate pairs in preorder.
    pub fn edges(&self) -> Vec<(GridCoord, GridCoord)> {
        let mut edges = Vec::with_capacity(self.nodes.len().saturating_sub(1));
        for idx in self.preorder() {
            let node = &self.nodes[idx];
            for &child in &node.children {
                edges.push((node.coord, self.nodes[child].coord));
            }
        }
        edges
    }

    /// Segments as `[x_lo, y_lo, z_lo, x_hi, y_hi, z_hi]`, multi-layer vias
    /// split into unit steps, zero-length edges dropped, duplicates removed
    /// keeping the first occurrence.
    pub fn guide_segments(&self) -> Vec<[i32; 6]> {
        let mut segments = Vec::new();
        for (a, b) in self.edges() {
            let zl = a.z.min(b.z);
            let zh = a.z.max(b.z);
            if a.same_cell(&b) {
                for z in zl..zh {
                    segments.push([a.x, a.y, z as i32, a.x, a.y, z as i32 + 1]);
                }
            } else {
                segments.push([
                    a.x.min(b.x),
                    a.y.min(b.y),
                    zl as i32,
                    a.x.max(b.x),
                    a.y.max(b.y),
                    zh as i32,
                ]);
            }
        }
        let mut seen = std::collections::HashSet::with_capacity(segments.len());
        segments.retain(|s| seen.insert(*s));
        segments
    }

    pub fn route_segments(&self) -> Vec<RouteSegment> {
        self.edges()
            .into_iter()
            .filter(|(a, b)| a != b)
            .map(|(p1, p2)| RouteSegment { p1, p2 })
            .collect()
    }

    /// Removes dangling branches that do not end on an access point and merges
    /// children that repeat their parent's location. A leaf sitting on the cell
    /// of some access point but on another layer is moved to the highest
    /// access layer at that cell. The root always survives.
    pub fn prune(&mut self, access_points: &[GridCoord]) {
        let mut cell_top: HashMap<(i32, i32), usize> = HashMap::new();
        for ap in access_points {
            let top = cell_top.entry((ap.x, ap.y)).or_insert(ap.z);
            *top = (*top).max(ap.z);
        }

        let order = self.preorder();
        let mut removed = vec![false; self.nodes.len()];
        for &idx in order.iter().rev() {
            if self.nodes[idx].children.is_empty() {
                let coord = self.nodes[idx].coord;
                if access_points.contains(&coord) {
                    continue;
                }
                match cell_top.get(&(coord.x, coord.y)) {
                    Some(&top) => self.nodes[idx].coord.z = top,
                    None if idx != Self::ROOT => removed[idx] = true,
                    None => {}
                }
                continue;
            }

            let coord = self.nodes[idx].coord;
            let mut children = std::mem::take(&mut self.nodes[idx].children);
            let mut appended = Vec::new();
            for i in (0..children.len()).rev() {
                let child = children[i];
                if removed[child] {
                    children.remove(i);
                } else if self.nodes[child].coord == coord {
                    appended.extend(self.nodes[child].children.iter().copied());
                    children.remove(i);
                }
            }
            children.extend(appended);
            self.nodes[idx].children = children;
        }
        self.compact();
    }

    /// Drops nodes no longer reachable from the root and renumbers the rest in
    /// preorder.
    pub fn compact(&mut self) {
        let order = self.preorder();
        if order.len() == self.nodes.len() {
            return;
        }
        let mut remap = vec![usize::MAX; self.nodes.len()];
        for (new_idx, &old_idx) in order.iter().enumerate() {
            remap[old_idx] = new_idx;
        }
        let nodes = order
            .iter()
            .map(|&old| RouteNode {
                coord: self.nodes[old].coord,
                children: self.nodes[old].children.iter().map(|&c| remap[c]).collect(),
            })
            .collect();
        self.nodes = nodes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32, z: usize) -> GridCoord {
        GridCoord::new(x, y, z)
    }

    #[test]
    fn guide_splits_stacked_vias_and_dedups() {
        let mut tree = RouteTree::new(c(0, 0, 0));
        let top = tree.add_child(RouteTree::ROOT, c(0, 0, 3));
        tree.add_child(top, c(2, 0, 3));
        tree.add_child(top, c(0, 0, 3));
        tree.add_child(RouteTree::ROOT, c(0, 0, 1));

        let segments = tree.guide_segments();
        assert_eq!(
            segments,
            vec![
                [0, 0, 0, 0, 0, 1],
                [0, 0, 1, 0, 0, 2],
                [0, 0, 2, 0, 0, 3],
                [0, 0, 3, 2, 0, 3],
            ]
        );
        let mut unique = segments.clone();
        unique.dedup();
        assert_eq!(unique.len(), segments.len());
    }

    #[test]
    fn prune_removes_dangling_and_merges_duplicates() {
        let aps = [c(0, 0, 0), c(3, 0, 1)];
        let mut tree = RouteTree::new(c(0, 0, 0));
        let up = tree.add_child(RouteTree::ROOT, c(0, 0, 1));
        let end = tree.add_child(up, c(3, 0, 1));
        tree.add_child(end, c(3, 0, 1));
        let dangling = tree.add_child(up, c(0, 2, 1));
        let _ = dangling;

        tree.prune(&aps);
        assert_eq!(tree.len(), 3);
        let coords: Vec<GridCoord> = tree.preorder().iter().map(|&i| tree.coord(i)).collect();
        assert_eq!(coords, vec![c(0, 0, 0), c(0, 0, 1), c(3, 0, 1)]);
    }

    #[test]
    fn prune_relayers_leaf_to_top_access_layer() {
        let aps = [c(0, 0, 0), c(2, 0, 0), c(2, 0, 1)];
        let mut tree = RouteTree::new(c(0, 0, 0));
        let up = tree.add_child(RouteTree::ROOT, c(0, 0, 2));
        let run = tree.add_child(up, c(2, 0, 2));
        tree.add_child(run, c(2, 0, 3));
        tree.prune(&aps);
        let coords: Vec<GridCoord> = tree.preorder().iter().map(|&i| tree.coord(i)).collect();
        assert_eq!(coords, vec![c(0, 0, 0), c(0, 0, 2), c(2, 0, 2), c(2, 0, 1)]);
    }

    #[test]
    fn single_node_root_is_kept() {
        let mut tree = RouteTree::new(c(1, 1, 2));
        tree.prune(&[c(5, 5, 0)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), c(1, 1, 2));
    }
}
