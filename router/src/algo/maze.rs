use crate::error::RouteError;
use crate::grid::{AccessPoints, GridView};
use crate::net::NetView;
use crate::pattern::steiner::SteinerTree;
use gr_common::geom::point::Point;
use priority_queue::PriorityQueue;
use std::cmp::{Ordering, Reverse};

/// Router used for nets pattern routing could not clear. Produces a planar
/// topology; layer assignment is left to the pattern solver.
pub trait FallbackRouter {
    fn route(
        &mut self,
        net: &NetView,
        access: &AccessPoints,
        costs: &GridView<f64>,
    ) -> Result<SteinerTree, RouteError>;

    /// Moves on to the next net.
    fn step(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Cost(f64);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Every `interval`-th grid line with phase `offset`.
#[derive(Clone, Copy, Debug)]
pub struct SparseGrid {
    pub interval: i32,
    pub offset: i32,
}

impl SparseGrid {
    pub fn new(interval: i32) -> Self {
        Self {
            interval: interval.max(1),
            offset: 0,
        }
    }

    pub fn step(&mut self) {
        self.offset = (self.offset + 1) % self.interval;
    }

    /// Sorted lines in `[lo, hi]`: the periodic ones, the bounds, and
    /// `required`.
    fn lines(&self, lo: i32, hi: i32, required: impl Iterator<Item = i32>) -> Vec<i32> {
        let mut lines: Vec<i32> = (lo..=hi)
            .filter(|v| (v - self.offset).rem_euclid(self.interval) == 0)
            .chain([lo, hi])
            .chain(required)
            .collect();
        lines.sort_unstable();
        lines.dedup();
        lines
    }
}

/// Maze search on a sparse 2D lattice, grown one pin at a time from the first
/// access point. Search tables are reused across nets.
pub struct SparseMazeRouter {
    grid: SparseGrid,
    queue: PriorityQueue<usize, Reverse<Cost>>,
    dist: Vec<f64>,
    parent: Vec<usize>,
    visited_tag: Vec<u32>,
    settled_tag: Vec<u32>,
    current_tag: u32,
}

impl SparseMazeRouter {
    pub fn new(interval: i32) -> Self {
        Self {
            grid: SparseGrid::new(interval),
            queue: PriorityQueue::new(),
            dist: Vec::new(),
            parent: Vec::new(),
            visited_tag: Vec::new(),
            settled_tag: Vec::new(),
            current_tag: 0,
        }
    }

    fn ensure_capacity(&mut self, size: usize) {
        if size > self.dist.len() {
            self.dist.resize(size, f64::INFINITY);
            self.parent.resize(size, usize::MAX);
            self.visited_tag.resize(size, 0);
            self.settled_tag.resize(size, 0);
        }
    }

    fn reset_search(&mut self) {
        self.queue.clear();
        self.current_tag = self.current_tag.wrapping_add(1);
        if self.current_tag == 0 {
            self.visited_tag.fill(0);
            self.settled_tag.fill(0);
            self.current_tag = 1;
        }
    }

    fn relax(&mut self, v: usize, d: f64, from: usize) {
        if self.settled_tag[v] == self.current_tag {
            return;
        }
        if self.visited_tag[v] != self.current_tag || d < self.dist[v] {
            self.visited_tag[v] = self.current_tag;
            self.dist[v] = d;
            self.parent[v] = from;
            self.queue.push_increase(v, Reverse(Cost(d)));
        }
    }
}

struct Lattice {
    xs: Vec<i32>,
    ys: Vec<i32>,
}

impl Lattice {
    fn len(&self) -> usize {
        self.xs.len() * self.ys.len()
    }
    fn id(&self, i: usize, j: usize) -> usize {
        i * self.ys.len() + j
    }
    fn point(&self, id: usize) -> Point<i32> {
        Point::new(self.xs[id / self.ys.len()], self.ys[id % self.ys.len()])
    }
    fn locate(&self, p: Point<i32>) -> Option<usize> {
        let i = self.xs.binary_search(&p.x).ok()?;
        let j = self.ys.binary_search(&p.y).ok()?;
        Some(self.id(i, j))
    }

    fn neighbours(&self, id: usize) -> impl Iterator<Item = usize> + '_ {
        let (i, j) = (id / self.ys.len(), id % self.ys.len());
        let mut out = [None; 4];
        if i > 0 {
            out[0] = Some(self.id(i - 1, j));
        }
        if i + 1 < self.xs.len() {
            out[1] = Some(self.id(i + 1, j));
        }
        if j > 0 {
            out[2] = Some(self.id(i, j - 1));
        }
        if j + 1 < self.ys.len() {
            out[3] = Some(self.id(i, j + 1));
        }
        out.into_iter().flatten()
    }
}

impl FallbackRouter for SparseMazeRouter {
    fn route(
        &mut self,
        net: &NetView,
        access: &AccessPoints,
        costs: &GridView<f64>,
    ) -> Result<SteinerTree, RouteError> {
        let points: Vec<Point<i32>> = access.iter().map(|a| a.point).collect();
        let Some(&source) = points.first() else {
            return Ok(SteinerTree::default());
        };
        if points.len() == 1 {
            return Ok(SteinerTree::single(source, access.get(source).map(|a| a.fixed_layers)));
        }

        let margin = 2 * self.grid.interval;
        let window = net
            .bounding_box()
            .expanded(margin, costs.x_size() as i32 - 1, costs.y_size() as i32 - 1);
        let lattice = Lattice {
            xs: self.grid.lines(window.min.x, window.max.x, points.iter().map(|p| p.x)),
            ys: self.grid.lines(window.min.y, window.max.y, points.iter().map(|p| p.y)),
        };
        self.ensure_capacity(lattice.len());

        let mut tree_parent: Vec<Option<usize>> = vec![None; lattice.len()];
        let mut in_tree = vec![false; lattice.len()];
        // Access points lie on required lines, so they are always found.
        let terminals: Vec<usize> = points.iter().filter_map(|p| lattice.locate(*p)).collect();
        let Some(&root) = terminals.first() else {
            return Ok(SteinerTree::single(source, access.get(source).map(|a| a.fixed_layers)));
        };
        in_tree[root] = true;

        loop {
            let pending: Vec<usize> = terminals.iter().copied().filter(|&t| !in_tree[t]).collect();
            if pending.is_empty() {
                break;
            }
            self.reset_search();
            for v in 0..lattice.len() {
                if in_tree[v] {
                    self.relax(v, 0.0, usize::MAX);
                }
            }

            let mut reached = None;
            while let Some((u, Reverse(Cost(d)))) = self.queue.pop() {
                self.settled_tag[u] = self.current_tag;
                if !in_tree[u] && pending.contains(&u) {
                    reached = Some(u);
                    break;
                }
                let pu = lattice.point(u);
                for v in lattice.neighbours(u) {
                    let edge = costs.sum(pu, lattice.point(v));
                    if edge.is_finite() {
                        self.relax(v, d + edge, u);
                    }
                }
            }

            let Some(mut v) = reached else {
                let stuck = lattice.point(pending[0]);
                return Err(RouteError::MazeUnreachable {
                    net: net.name().to_string(),
                    x: stuck.x,
                    y: stuck.y,
                });
            };
            while !in_tree[v] {
                in_tree[v] = true;
                let from = self.parent[v];
                tree_parent[v] = Some(from);
                v = from;
            }
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); lattice.len()];
        for (v, parent) in tree_parent.iter().enumerate() {
            if let Some(p) = parent {
                children[*p].push(v);
            }
        }

        let is_terminal = |v: usize| access.get(lattice.point(v)).is_some();
        let fixed = |v: usize| access.get(lattice.point(v)).map(|a| a.fixed_layers);
        let mut tree = SteinerTree::single(lattice.point(root), fixed(root));
        let mut stack = vec![(SteinerTree::ROOT, root)];
        while let Some((node, v)) = stack.pop() {
            for &child in &children[v] {
                let mut end = child;
                loop {
                    if is_terminal(end) || children[end].len() != 1 {
                        break;
                    }
                    let next = children[end][0];
                    let (a, b, c) = (lattice.point(v), lattice.point(end), lattice.point(next));
                    let straight = (a.x == b.x && b.x == c.x) || (a.y == b.y && b.y == c.y);
                    if !straight {
                        break;
                    }
                    end = next;
                }
                let id = tree.add_node(Some(node), lattice.point(end), fixed(end));
                stack.push((id, end));
            }
        }
        Ok(tree)
    }

    fn step(&mut self) {
        self.grid.step();
    }
}
