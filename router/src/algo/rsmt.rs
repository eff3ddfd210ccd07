use gr_common::geom::point::Point;

/// One entry of a Steiner tree branch list: the point and the index of the
/// branch it connects to. The root points at itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Branch {
    pub x: i32,
    pub y: i32,
    pub n: usize,
}

/// Rectilinear Steiner tree heuristic: a Prim spanning tree over the
/// terminals, improved by inserting median Steiner points wherever two edges
/// meeting at a node can share a common run.
///
/// The engine keeps its work tables between calls, so one instance serves a
/// whole routing stage and is shared behind a lock.
#[derive(Default)]
pub struct SteinerEngine {
    points: Vec<Point<i32>>,
    adjacency: Vec<Vec<usize>>,
    dist: Vec<i32>,
    parent: Vec<usize>,
    in_tree: Vec<bool>,
}

impl SteinerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminals occupy the first `terminals.len()` branches, Steiner points
    /// follow.
    pub fn build(&mut self, terminals: &[Point<i32>]) -> Vec<Branch> {
        match terminals {
            [] => return Vec::new(),
            [only] => {
                return vec![Branch {
                    x: only.x,
                    y: only.y,
                    n: 0,
                }];
            }
            _ => {}
        }

        self.points.clear();
        self.points.extend_from_slice(terminals);
        self.spanning_tree();
        while self.insert_steiner_points() {}
        self.orient()
    }

    fn spanning_tree(&mut self) {
        let n = self.points.len();
        self.adjacency.iter_mut().for_each(Vec::clear);
        self.adjacency.resize(n, Vec::new());
        self.dist.clear();
        self.dist.resize(n, i32::MAX);
        self.parent.clear();
        self.parent.resize(n, 0);
        self.in_tree.clear();
        self.in_tree.resize(n, false);

        self.dist[0] = 0;
        for _ in 0..n {
            let mut next = usize::MAX;
            for v in 0..n {
                if !self.in_tree[v] && (next == usize::MAX || self.dist[v] < self.dist[next]) {
                    next = v;
                }
            }
            self.in_tree[next] = true;
            if next != 0 {
                self.link(self.parent[next], next);
            }
            for v in 0..n {
                let d = self.points[next].manhattan(&self.points[v]);
                if !self.in_tree[v] && d < self.dist[v] {
                    self.dist[v] = d;
                    self.parent[v] = next;
                }
            }
        }
    }

    /// One improvement pass. Returns whether the tree got shorter.
    fn insert_steiner_points(&mut self) -> bool {
        let mut improved = false;
        let mut v = 0;
        while v < self.points.len() {
            if let Some((a, b, median)) = self.best_median(v) {
                if median == self.points[a] {
                    self.reconnect(v, b, a);
                } else if median == self.points[b] {
                    self.reconnect(v, a, b);
                } else {
                    let s = self.points.len();
                    self.points.push(median);
                    self.adjacency.push(Vec::with_capacity(3));
                    self.reconnect(v, a, s);
                    self.reconnect(v, b, s);
                    self.link(v, s);
                }
                improved = true;
            }
            v += 1;
        }
        improved
    }

    /// Moves `node` from hanging off `from` to hanging off `onto`.
    fn reconnect(&mut self, from: usize, node: usize, onto: usize) {
        self.adjacency[from].retain(|&x| x != node);
        self.adjacency[node].retain(|&x| x != from);
        self.link(node, onto);
    }

    fn link(&mut self, a: usize, b: usize) {
        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
    }

    /// The pair of neighbours of `v` whose three-point median saves the most
    /// wire, if any saves some.
    fn best_median(&self, v: usize) -> Option<(usize, usize, Point<i32>)> {
        let neighbours = &self.adjacency[v];
        let pv = self.points[v];
        let mut best = None;
        let mut best_gain = 0;
        for (i, &a) in neighbours.iter().enumerate() {
            for &b in &neighbours[i + 1..] {
                let (pa, pb) = (self.points[a], self.points[b]);
                let median = Point::new(median3(pv.x, pa.x, pb.x), median3(pv.y, pa.y, pb.y));
                if median == pv {
                    continue;
                }
                let gain = pv.manhattan(&pa) + pv.manhattan(&pb)
                    - pv.manhattan(&median)
                    - median.manhattan(&pa)
                    - median.manhattan(&pb);
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((a, b, median));
                }
            }
        }
        best
    }

    fn orient(&mut self) -> Vec<Branch> {
        let n = self.points.len();
        self.parent.clear();
        self.parent.resize(n, usize::MAX);
        self.parent[0] = 0;
        let mut stack = vec![0];
        while let Some(u) = stack.pop() {
            for &v in &self.adjacency[u] {
                if self.parent[v] == usize::MAX {
                    self.parent[v] = u;
                    stack.push(v);
                }
            }
        }
        self.points
            .iter()
            .zip(&self.parent)
            .map(|(p, &n)| Branch { x: p.x, y: p.y, n })
            .collect()
    }
}

fn median3(a: i32, b: i32, c: i32) -> i32 {
    a.max(b).min(a.min(b).max(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wirelength(branches: &[Branch]) -> i32 {
        branches
            .iter()
            .map(|b| {
                let p = &branches[b.n];
                (b.x - p.x).abs() + (b.y - p.y).abs()
            })
            .sum()
    }

    fn is_tree(branches: &[Branch]) -> bool {
        (0..branches.len()).all(|start| {
            let mut cur = start;
            for _ in 0..=branches.len() {
                if branches[cur].n == cur {
                    return true;
                }
                cur = branches[cur].n;
            }
            false
        })
    }

    #[test]
    fn median_of_three() {
        assert_eq!(median3(1, 5, 3), 3);
        assert_eq!(median3(7, 2, 2), 2);
        assert_eq!(median3(-1, 0, 9), 0);
    }

    #[test]
    fn plus_shape_gets_a_center_point() {
        let terminals = [
            Point::new(0, 2),
            Point::new(4, 2),
            Point::new(2, 0),
            Point::new(2, 4),
        ];
        let mut engine = SteinerEngine::new();
        let branches = engine.build(&terminals);
        assert!(is_tree(&branches));
        assert_eq!(wirelength(&branches), 8);
        assert!(branches.iter().any(|b| (b.x, b.y) == (2, 2)));
        for (b, t) in branches.iter().zip(&terminals) {
            assert_eq!((b.x, b.y), (t.x, t.y));
        }
    }

    #[test]
    fn engine_is_reusable() {
        let mut engine = SteinerEngine::new();
        let three = engine.build(&[Point::new(0, 0), Point::new(4, 4), Point::new(4, 0)]);
        assert!(is_tree(&three));
        assert_eq!(wirelength(&three), 8);

        let two = engine.build(&[Point::new(1, 1), Point::new(1, 6)]);
        assert_eq!(two.len(), 2);
        assert_eq!(wirelength(&two), 5);

        assert_eq!(engine.build(&[Point::new(3, 3)]), vec![Branch { x: 3, y: 3, n: 0 }]);
        assert!(engine.build(&[]).is_empty());
    }
}
