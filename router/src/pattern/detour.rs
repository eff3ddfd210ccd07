use super::dag::RoutingDag;
use crate::grid::{GridView, RoutingGrid};
use gr_common::geom::interval::Interval;
use gr_common::geom::point::Point;

/// A chain of DAG tree nodes joined by congested straight runs of one
/// direction. A top-level scaffold has exactly one child: the start of the
/// trunk, hanging off `node` (or off nothing when the trunk starts at the
/// root).
struct Scaffold {
    node: Option<usize>,
    children: Vec<usize>,
}

struct Scaffolds {
    arena: Vec<Scaffold>,
    /// direction -> DAG node -> scaffold still waiting for a parent
    open: [Vec<Option<usize>>; 2],
    /// direction -> top-level scaffolds
    tops: [Vec<usize>; 2],
}

impl Scaffolds {
    fn new(dag_len: usize) -> Self {
        Self {
            arena: Vec::new(),
            open: [vec![None; dag_len], vec![None; dag_len]],
            tops: [Vec::new(), Vec::new()],
        }
    }

    fn add(&mut self, node: Option<usize>) -> usize {
        self.arena.push(Scaffold {
            node,
            children: Vec::new(),
        });
        self.arena.len() - 1
    }

    fn open_at(&mut self, direction: usize, node: usize) -> usize {
        match self.open[direction][node] {
            Some(id) => id,
            None => {
                let id = self.add(Some(node));
                self.open[direction][node] = Some(id);
                id
            }
        }
    }

    fn lift(&mut self, direction: usize, parent: Option<usize>, id: usize) {
        let top = self.add(parent);
        self.arena[top].children.push(id);
        self.tops[direction].push(top);
    }

    fn node(&self, id: usize) -> usize {
        self.arena[id].node.unwrap_or(RoutingDag::ROOT)
    }

    fn child_for(&self, id: usize, dag_node: usize) -> Option<usize> {
        self.arena[id]
            .children
            .iter()
            .copied()
            .find(|&c| self.arena[c].node == Some(dag_node))
    }
}

fn run_direction(from: Point<i32>, to: Point<i32>) -> usize {
    if from.y == to.y { 0 } else { 1 }
}

fn build_scaffolds(dag: &RoutingDag, view: &GridView<bool>) -> Scaffolds {
    let mut scaffolds = Scaffolds::new(dag.len());
    for idx in dag.postorder() {
        let node = dag.node(idx);
        if node.optional {
            let target = node.paths[0][0];
            let to = dag.node(target).point;
            let direction = run_direction(node.point, to);
            if scaffolds.open[direction][target].is_none() && view.check(node.point, to) {
                scaffolds.open_at(direction, target);
            }
            continue;
        }

        for &target in node.paths.iter().flatten() {
            let to = dag.node(target);
            let direction = run_direction(node.point, to.point);
            if !view.check(node.point, to.point) {
                continue;
            }
            if to.optional {
                scaffolds.open_at(direction, idx);
            } else {
                let parent = scaffolds.open_at(direction, idx);
                let child = match scaffolds.open[direction][target].take() {
                    Some(existing) => existing,
                    None => scaffolds.add(Some(target)),
                };
                scaffolds.arena[parent].children.push(child);
            }
        }
        for &child in &node.children {
            for direction in 0..2 {
                if let Some(id) = scaffolds.open[direction][child].take() {
                    scaffolds.lift(direction, Some(idx), id);
                }
            }
        }
    }
    for direction in 0..2 {
        if let Some(id) = scaffolds.open[direction][RoutingDag::ROOT].take() {
            scaffolds.lift(direction, None, id);
        }
    }
    scaffolds
}

/// Extent of the trunk along `direction` and the cross positions of the
/// stems hanging off it.
fn trunk_and_stems(
    dag: &RoutingDag,
    scaffolds: &Scaffolds,
    top: usize,
    direction: usize,
) -> (Option<Interval<i32>>, Vec<i32>) {
    let cross = 1 - direction;
    let mut trunk = None;
    let mut stems = Vec::new();
    if let Some(node) = scaffolds.arena[top].node {
        let p = dag.node(node).point;
        stems.push(p.get(cross));
        Interval::include(&mut trunk, p.get(direction));
    }

    let mut stack = scaffolds.arena[top].children.clone();
    while let Some(id) = stack.pop() {
        let node = dag.node(scaffolds.node(id));
        Interval::include(&mut trunk, node.point.get(direction));
        if node.fixed_layers.is_some() {
            stems.push(node.point.get(cross));
        }
        for &child in &node.children {
            match scaffolds.child_for(id, child) {
                Some(sub) => stack.push(sub),
                None => {
                    let p = dag.node(child).point;
                    stems.push(p.get(cross));
                    Interval::include(&mut trunk, p.get(direction));
                }
            }
        }
    }
    stems.sort_unstable();
    (trunk, stems)
}

fn total_stem_length(stems: &[i32], pos: i32) -> i32 {
    stems.iter().map(|s| (s - pos).abs()).sum()
}

fn shifted(point: Point<i32>, cross: usize, shift: i32) -> Point<i32> {
    let mut p = point;
    *p.get_mut(cross) += shift;
    p
}

/// Copies the trunk under scaffold `start` shifted by `shift` across
/// `direction` and returns the copy of its first node. Fixed nodes keep an
/// unshifted duplicate reached from their copy.
fn build_detour(
    dag: &mut RoutingDag,
    scaffolds: &Scaffolds,
    start: usize,
    direction: usize,
    shift: i32,
) -> usize {
    let cross = 1 - direction;
    // (scaffold, shifted copy, fixed duplicate)
    let mut copies: Vec<(usize, usize, Option<usize>)> = Vec::new();
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        let original = scaffolds.node(id);
        let node = dag.node(original);
        let (point, fixed) = (node.point, node.fixed_layers);
        let duplicate = fixed.map(|fixed| dag.add_node(point, Some(fixed)));
        let copy = dag.add_node(shifted(point, cross, shift), None);
        copies.push((id, copy, duplicate));
        stack.extend(scaffolds.arena[id].children.iter().rev());
    }

    let copy_of = |id: usize| copies.iter().find(|c| c.0 == id).map(|c| c.1);
    for &(id, copy, duplicate) in &copies {
        if let Some(duplicate) = duplicate {
            dag.construct_paths(copy, duplicate, None);
        }
        let children = dag.node(scaffolds.node(id)).children.clone();
        for child in children {
            let end = scaffolds
                .child_for(id, child)
                .and_then(copy_of)
                .unwrap_or(child);
            dag.construct_paths(copy, end, None);
        }
    }
    copies[0].1
}

/// Adds shifted copies of congested trunks as extra alternatives of the DAG
/// edges they hang off. Existing alternatives are left untouched.
pub fn construct_detours<G: RoutingGrid + ?Sized>(
    dag: &mut RoutingDag,
    grid: &G,
    view: &GridView<bool>,
    max_detour_ratio: f64,
    target_detour_count: i32,
) {
    debug_assert!(target_detour_count >= 1);
    let scaffolds = build_scaffolds(dag, view);
    for direction in 0..2 {
        let cross = 1 - direction;
        let cross_size = grid.size(cross) as i32;
        for &top in &scaffolds.tops[direction] {
            let first = scaffolds.arena[top].children[0];
            let (Some(trunk), stems) = trunk_and_stems(dag, &scaffolds, top, direction) else {
                continue;
            };

            let trunk_pos = dag.node(scaffolds.node(first)).point.get(cross);
            let original_length = total_stem_length(&stems, trunk_pos);
            let max_increase = (trunk.range() as f64 * max_detour_ratio) as i32;
            let mut low = trunk_pos;
            let mut high = trunk_pos;
            while low - 1 >= 0 && total_stem_length(&stems, low - 1) - original_length <= max_increase {
                low -= 1;
            }
            while high + 1 < cross_size
                && total_stem_length(&stems, high + 1) - original_length <= max_increase
            {
                high += 1;
            }
            let mut step = 1;
            while (trunk_pos - low) / (step + 1) + (high - trunk_pos) / (step + 1) >= target_detour_count {
                step += 1;
            }
            low = trunk_pos - (trunk_pos - low) / step * step;
            high = trunk_pos + (high - trunk_pos) / step * step;

            let mut pos = low;
            while pos <= high {
                let shift = pos - trunk_pos;
                pos += step;
                if shift == 0 {
                    continue;
                }
                let moved = trunk_pos + shift;
                if moved < 0 || moved >= cross_size {
                    continue;
                }
                match scaffolds.arena[top].node {
                    Some(parent) => {
                        let target = scaffolds.node(first);
                        let slots: Vec<usize> = dag
                            .node(parent)
                            .children
                            .iter()
                            .enumerate()
                            .filter(|&(_, &c)| c == target)
                            .map(|(slot, _)| slot)
                            .collect();
                        for slot in slots {
                            let copy = build_detour(dag, &scaffolds, first, direction, shift);
                            dag.construct_paths(parent, copy, Some(slot));
                        }
                    }
                    None => {
                        let root = scaffolds.node(first);
                        let children = dag.node(root).children.clone();
                        if children.len() != 1 {
                            log::debug!("Skipping root detour: root has {} children", children.len());
                            continue;
                        }
                        let copy = dag.add_node(shifted(dag.node(root).point, cross, shift), None);
                        dag.construct_paths(root, copy, Some(0));
                        for child in children {
                            let end = match scaffolds.child_for(first, child) {
                                Some(sub) => build_detour(dag, &scaffolds, sub, direction, shift),
                                None => child,
                            };
                            dag.construct_paths(copy, end, None);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::steiner::SteinerTree;

    struct FlatGrid(usize);

    impl RoutingGrid for FlatGrid {
        fn num_layers(&self) -> usize {
            2
        }
        fn size(&self, _dimension: usize) -> usize {
            self.0
        }
        fn layer_direction(&self, layer: usize) -> usize {
            layer % 2
        }
        fn min_routing_layer(&self) -> usize {
            0
        }
        fn edge_length(&self, _direction: usize, _index: i32) -> i64 {
            1
        }
        fn capacity(&self, _layer: usize, _x: i32, _y: i32) -> f64 {
            1.0
        }
        fn wire_cost(&self, _layer: usize, u: Point<i32>, v: Point<i32>) -> f64 {
            u.manhattan(&v) as f64
        }
        fn via_cost(&self, _layer: usize, _at: Point<i32>) -> f64 {
            1.0
        }
    }

    fn congested_row(size: usize, y: i32) -> GridView<bool> {
        let mut view = GridView::new(size, size, false);
        for x in 0..size as i32 - 1 {
            view.set(0, x, y, true);
        }
        view
    }

    fn slot_snapshot(dag: &RoutingDag) -> Vec<Vec<Vec<usize>>> {
        (0..dag.len()).map(|i| dag.node(i).paths.clone()).collect()
    }

    #[test]
    fn detours_only_add_alternatives() {
        // Horizontal trunk along y = 4 with a stem up to (5, 8).
        let mut tree = SteinerTree::single(Point::new(0, 4), Some(Interval::point(0)));
        let mid = tree.add_node(Some(SteinerTree::ROOT), Point::new(5, 4), None);
        tree.add_node(Some(mid), Point::new(9, 4), Some(Interval::point(0)));
        tree.add_node(Some(mid), Point::new(5, 8), Some(Interval::point(1)));
        let mut dag = RoutingDag::from_steiner(&tree);
        let before = slot_snapshot(&dag);

        construct_detours(&mut dag, &FlatGrid(10), &congested_row(10, 4), 1.0, 10);

        assert!(dag.len() > before.len());
        for (idx, slots) in before.iter().enumerate() {
            let now = &dag.node(idx).paths;
            assert!(now.len() >= slots.len());
            for (slot, alternatives) in slots.iter().enumerate() {
                assert_eq!(&now[slot][..alternatives.len()], alternatives.as_slice());
            }
        }
        let root_slot = &dag.node(RoutingDag::ROOT).paths[0];
        assert!(root_slot.len() > 1);
        for &alt in &root_slot[1..] {
            assert_ne!(dag.node(alt).point.y, 4);
        }
    }

    #[test]
    fn uncongested_net_is_unchanged() {
        let mut tree = SteinerTree::single(Point::new(0, 4), Some(Interval::point(0)));
        tree.add_node(Some(SteinerTree::ROOT), Point::new(9, 4), Some(Interval::point(0)));
        let mut dag = RoutingDag::from_steiner(&tree);
        let before = slot_snapshot(&dag);
        construct_detours(&mut dag, &FlatGrid(10), &congested_row(10, 7), 1.0, 10);
        assert_eq!(slot_snapshot(&dag), before);
    }

    #[test]
    fn trunk_shift_respects_ratio() {
        assert_eq!(total_stem_length(&[1, 4, 9], 4), 8);
        assert_eq!(shifted(Point::new(3, 3), 1, -2), Point::new(3, 1));
    }
}
