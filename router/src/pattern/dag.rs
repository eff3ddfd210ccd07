use super::steiner::SteinerTree;
use gr_common::geom::interval::Interval;
use gr_common::geom::point::Point;

#[derive(Clone, Debug)]
pub struct DagNode {
    pub point: Point<i32>,
    pub fixed_layers: Option<Interval<usize>>,
    /// Bend points that only exist to offer a path.
    pub optional: bool,
    /// Steiner children of a tree node; empty for bends and shifted copies.
    pub children: Vec<usize>,
    /// Child slot -> alternative first hops towards that child.
    pub paths: Vec<Vec<usize>>,
    /// Layer -> cheapest cost of the subtree when entered on that layer.
    pub costs: Vec<f64>,
    /// Layer -> child slot -> (chosen alternative, layer it is entered on).
    pub best_paths: Vec<Vec<Option<(usize, usize)>>>,
}

impl DagNode {
    fn new(point: Point<i32>, fixed_layers: Option<Interval<usize>>, optional: bool) -> Self {
        Self {
            point,
            fixed_layers,
            optional,
            children: Vec::new(),
            paths: Vec::new(),
            costs: Vec::new(),
            best_paths: Vec::new(),
        }
    }
}

/// Layer-assignment graph over one Steiner topology. Each tree edge owns a
/// slot of competing alternatives (straight, L, Z and detours) that may share
/// their end nodes.
#[derive(Clone, Debug)]
pub struct RoutingDag {
    nodes: Vec<DagNode>,
}

impl RoutingDag {
    pub const ROOT: usize = 0;

    pub fn from_steiner(tree: &SteinerTree) -> Self {
        let mut dag = Self { nodes: Vec::new() };
        let order = tree.preorder();
        let mut index = vec![0; tree.len()];
        for &s in &order {
            let node = tree.node(s);
            index[s] = dag.add_node(node.point, node.fixed_layers);
        }
        for &s in &order {
            let parent = index[s];
            for &child in &tree.node(s).children {
                dag.nodes[parent].children.push(index[child]);
                dag.construct_paths(parent, index[child], None);
            }
        }
        dag
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node(&self, idx: usize) -> &DagNode {
        &self.nodes[idx]
    }
    #[inline]
    pub fn node_mut(&mut self, idx: usize) -> &mut DagNode {
        &mut self.nodes[idx]
    }

    pub fn add_node(&mut self, point: Point<i32>, fixed_layers: Option<Interval<usize>>) -> usize {
        self.nodes.push(DagNode::new(point, fixed_layers, false));
        self.nodes.len() - 1
    }

    fn add_bend(&mut self, point: Point<i32>, next: usize) -> usize {
        let mut node = DagNode::new(point, None, true);
        node.paths.push(vec![next]);
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Adds the pattern alternatives from `start` to `end` into `slot`, or
    /// into a new slot when `slot` is `None`. Colinear ends get the direct
    /// path; others get the L bending at `(end.x, start.y)` and both Z shapes.
    pub fn construct_paths(&mut self, start: usize, end: usize, slot: Option<usize>) {
        let slot = match slot {
            Some(slot) => slot,
            None => {
                self.nodes[start].paths.push(Vec::new());
                self.nodes[start].paths.len() - 1
            }
        };
        let s = self.nodes[start].point;
        let e = self.nodes[end].point;
        if s.x == e.x || s.y == e.y {
            self.nodes[start].paths[slot].push(end);
            return;
        }

        let mut alternatives = Vec::with_capacity(3);
        alternatives.push(self.add_bend(Point::new(e.x, s.y), end));
        let mx = (s.x + e.x) / 2;
        let my = (s.y + e.y) / 2;
        for (first, second) in [
            (Point::new(mx, s.y), Point::new(mx, e.y)),
            (Point::new(s.x, my), Point::new(e.x, my)),
        ] {
            let second = self.add_bend(second, end);
            alternatives.push(self.add_bend(first, second));
        }
        self.nodes[start].paths[slot].extend(alternatives);
    }

    /// Nodes reachable through paths from the root, every node after all of
    /// its path targets.
    pub fn postorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return order;
        }
        let mut visited = vec![false; self.nodes.len()];
        // (node, whether its targets are already pushed)
        let mut stack = vec![(Self::ROOT, false)];
        while let Some((idx, expanded)) = stack.pop() {
            if expanded {
                order.push(idx);
                continue;
            }
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            stack.push((idx, true));
            for &target in self.nodes[idx].paths.iter().flatten().rev() {
                if !visited[target] {
                    stack.push((target, false));
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pin(a: Point<i32>, b: Point<i32>) -> RoutingDag {
        let mut tree = SteinerTree::single(a, Some(Interval::point(0)));
        tree.add_node(Some(SteinerTree::ROOT), b, Some(Interval::point(1)));
        RoutingDag::from_steiner(&tree)
    }

    #[test]
    fn colinear_edge_has_only_the_direct_path() {
        let dag = two_pin(Point::new(0, 2), Point::new(5, 2));
        assert_eq!(dag.len(), 2);
        assert_eq!(dag.node(RoutingDag::ROOT).paths, vec![vec![1]]);
    }

    #[test]
    fn bent_edge_gets_one_l_and_two_z() {
        let dag = two_pin(Point::new(0, 0), Point::new(4, 4));
        let slot = &dag.node(RoutingDag::ROOT).paths[0];
        assert_eq!(slot.len(), 3);

        let l = dag.node(slot[0]);
        assert!(l.optional);
        assert_eq!(l.point, Point::new(4, 0));
        assert_eq!(l.paths, vec![vec![1]]);

        let z1 = dag.node(slot[1]);
        assert_eq!(z1.point, Point::new(2, 0));
        assert_eq!(dag.node(z1.paths[0][0]).point, Point::new(2, 4));
        let z2 = dag.node(slot[2]);
        assert_eq!(z2.point, Point::new(0, 2));
        assert_eq!(dag.node(z2.paths[0][0]).point, Point::new(4, 2));
    }

    #[test]
    fn postorder_visits_targets_first() {
        let dag = two_pin(Point::new(0, 0), Point::new(3, 5));
        let order = dag.postorder();
        assert_eq!(order.len(), dag.len());
        assert_eq!(*order.last().unwrap(), RoutingDag::ROOT);
        let position = |i: usize| order.iter().position(|&o| o == i).unwrap();
        for idx in 0..dag.len() {
            for &target in dag.node(idx).paths.iter().flatten() {
                assert!(position(target) < position(idx));
            }
        }
    }
}
