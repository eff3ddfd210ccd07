use crate::algo::rsmt::Branch;
use crate::grid::AccessPoints;
use gr_common::geom::interval::Interval;
use gr_common::geom::point::Point;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SteinerNode {
    pub point: Point<i32>,
    /// Layers a pin requires at this cell, `None` for pure Steiner points.
    pub fixed_layers: Option<Interval<usize>>,
    pub children: Vec<usize>,
}

/// Planar net topology rooted at index 0.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SteinerTree {
    nodes: Vec<SteinerNode>,
}

impl SteinerTree {
    pub const ROOT: usize = 0;

    pub fn single(point: Point<i32>, fixed_layers: Option<Interval<usize>>) -> Self {
        let mut tree = Self::default();
        tree.add_node(None, point, fixed_layers);
        tree
    }

    pub fn add_node(
        &mut self,
        parent: Option<usize>,
        point: Point<i32>,
        fixed_layers: Option<Interval<usize>>,
    ) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(SteinerNode {
            point,
            fixed_layers,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(idx);
        }
        idx
    }

    pub fn node(&self, idx: usize) -> &SteinerNode {
        &self.nodes[idx]
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return order;
        }
        let mut stack = vec![Self::ROOT];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.nodes[idx].children.iter().rev());
        }
        order
    }

    /// Roots the branch list at a true leaf and folds coincident branch points
    /// into one node. Cells holding a selected access point carry its fixed
    /// layers.
    pub fn from_branches(branches: &[Branch], access: &AccessPoints) -> Self {
        let mut tree = Self::default();
        if branches.is_empty() {
            return tree;
        }
        let point = |i: usize| Point::new(branches[i].x, branches[i].y);
        let mut adjacency = vec![Vec::new(); branches.len()];
        for (i, branch) in branches.iter().enumerate() {
            if branch.n != i {
                adjacency[i].push(branch.n);
                adjacency[branch.n].push(i);
            }
        }

        // A leaf whose neighbour sits on another cell, so the root has a
        // real first edge.
        let root = (0..branches.len())
            .find(|&i| matches!(adjacency[i].as_slice(), [only] if point(*only) != point(i)))
            .unwrap_or(0);

        let fixed = |p: Point<i32>| access.get(p).map(|a| a.fixed_layers);
        // (tree parent, previous branch, current branch)
        let mut stack = vec![(None::<usize>, usize::MAX, root)];
        while let Some((parent, prev, cur)) = stack.pop() {
            let p = point(cur);
            let owner = match parent {
                Some(parent) if tree.nodes[parent].point == p => parent,
                _ => tree.add_node(parent, p, fixed(p)),
            };
            for &next in adjacency[cur].iter().rev() {
                if next != prev {
                    stack.push((Some(owner), cur, next));
                }
            }
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::rsmt::SteinerEngine;

    fn b(x: i32, y: i32, n: usize) -> Branch {
        Branch { x, y, n }
    }

    #[test]
    fn coincident_points_fold_into_one_node() {
        // 0:(0,0) 1:(4,0) 2:(2,3) 3:(2,0) 4:(2,0), Steiner points 3 and 4 coincide.
        let branches = [b(0, 0, 3), b(4, 0, 4), b(2, 3, 4), b(2, 0, 3), b(2, 0, 3)];
        let tree = SteinerTree::from_branches(&branches, &AccessPoints::default());
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.node(SteinerTree::ROOT).point, Point::new(0, 0));
        let junction = tree.node(SteinerTree::ROOT).children[0];
        assert_eq!(tree.node(junction).point, Point::new(2, 0));
        let leaves: Vec<Point<i32>> = tree
            .node(junction)
            .children
            .iter()
            .map(|&c| tree.node(c).point)
            .collect();
        assert_eq!(leaves, vec![Point::new(4, 0), Point::new(2, 3)]);
    }

    #[test]
    fn root_skips_leaves_on_a_shared_cell() {
        // Branch 0 is a leaf whose only neighbour sits on the same cell.
        let branches = [b(1, 1, 1), b(1, 1, 2), b(1, 5, 2)];
        let tree = SteinerTree::from_branches(&branches, &AccessPoints::default());
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.node(SteinerTree::ROOT).point, Point::new(1, 5));
        let child = tree.node(SteinerTree::ROOT).children[0];
        assert_eq!(tree.node(child).point, Point::new(1, 1));
    }

    #[test]
    fn every_terminal_is_reached() {
        let terminals = [
            Point::new(0, 0),
            Point::new(6, 1),
            Point::new(3, 5),
            Point::new(6, 6),
            Point::new(1, 4),
        ];
        let branches = SteinerEngine::new().build(&terminals);
        let tree = SteinerTree::from_branches(&branches, &AccessPoints::default());
        let points: Vec<Point<i32>> = tree.preorder().iter().map(|&i| tree.node(i).point).collect();
        assert_eq!(points.len(), tree.len());
        for t in &terminals {
            assert!(points.contains(t));
        }
    }
}
