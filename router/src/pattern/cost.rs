use super::dag::RoutingDag;
use crate::error::RouteError;
use crate::grid::RoutingGrid;
use crate::tree::RouteTree;
use gr_common::geom::coord::GridCoord;

/// Fills `costs` and `best_paths` of every DAG node, children before parents.
///
/// For an entry layer `l`, a node's cost is the cheapest way to span a layer
/// range `[low, l]` with vias, covering its fixed layers, plus each child
/// slot's cheapest alternative entered somewhere in that range.
pub fn calculate_costs<G: RoutingGrid + ?Sized>(
    dag: &mut RoutingDag,
    grid: &G,
    net: &str,
) -> Result<(), RouteError> {
    let n = grid.num_layers();
    let min_layer = grid.min_routing_layer();

    for idx in dag.postorder() {
        let node = dag.node(idx);
        let point = node.point;

        // slot -> layer -> (cost, alternative)
        let mut child_costs: Vec<Vec<(f64, Option<usize>)>> = Vec::with_capacity(node.paths.len());
        for alternatives in &node.paths {
            let mut costs = vec![(f64::INFINITY, None); n];
            for (alt, &target) in alternatives.iter().enumerate() {
                let target = dag.node(target);
                let to = target.point;
                if point.x != to.x && point.y != to.y {
                    return Err(RouteError::NonRectilinearPath {
                        net: net.to_string(),
                        from: (point.x, point.y),
                        to: (to.x, to.y),
                    });
                }
                let direction = if point.x == to.x { 1 } else { 0 };
                for layer in min_layer..n {
                    if grid.layer_direction(layer) != direction {
                        continue;
                    }
                    let cost = target.costs[layer] + grid.wire_cost(layer, point, to);
                    if cost < costs[layer].0 {
                        costs[layer] = (cost, Some(alt));
                    }
                }
            }
            child_costs.push(costs);
        }

        let mut via_costs = vec![0.0; n];
        for layer in 1..n {
            via_costs[layer] = via_costs[layer - 1] + grid.via_cost(layer - 1, point);
        }

        let (fixed_low, fixed_high) = match node.fixed_layers {
            Some(fixed) if !fixed.is_valid() => {
                return Err(RouteError::InvalidFixedLayers {
                    low: fixed.low,
                    high: fixed.high,
                    x: point.x,
                    y: point.y,
                });
            }
            Some(fixed) => (fixed.low.min(n - 1), fixed.high.max(min_layer)),
            None => (n - 1, min_layer),
        };

        let slots = child_costs.len();
        let mut costs = vec![f64::INFINITY; n];
        let mut best_paths = vec![vec![None; slots]; n];
        for low in 0..=fixed_low {
            let mut min_child = vec![f64::INFINITY; slots];
            let mut chosen = vec![None; slots];
            for layer in low..n {
                for (slot, per_layer) in child_costs.iter().enumerate() {
                    let (cost, alt) = per_layer[layer];
                    if cost < min_child[slot] {
                        min_child[slot] = cost;
                        chosen[slot] = alt.map(|alt| (alt, layer));
                    }
                }
                if layer >= fixed_high {
                    let cost = via_costs[layer] - via_costs[low] + min_child.iter().sum::<f64>();
                    if cost < costs[layer] {
                        costs[layer] = cost;
                        best_paths[layer].clone_from(&chosen);
                    }
                }
            }
            for layer in (low..n - 1).rev() {
                if costs[layer + 1] < costs[layer] {
                    costs[layer] = costs[layer + 1];
                    best_paths[layer] = best_paths[layer + 1].clone();
                }
            }
        }

        let node = dag.node_mut(idx);
        node.costs = costs;
        node.best_paths = best_paths;
    }
    Ok(())
}

/// Decodes the cheapest layer assignment into a concrete routing tree.
pub fn extract_tree<G: RoutingGrid + ?Sized>(
    dag: &RoutingDag,
    grid: &G,
    net: &str,
) -> Result<RouteTree, RouteError> {
    let n = grid.num_layers();
    let root = dag.node(RoutingDag::ROOT);
    let mut root_layer = None;
    let mut min_cost = f64::INFINITY;
    for (layer, &cost) in root.costs.iter().enumerate() {
        if cost < min_cost {
            min_cost = cost;
            root_layer = Some(layer);
        }
    }
    let Some(root_layer) = root_layer else {
        return Err(RouteError::NoFeasibleLayer {
            net: net.to_string(),
        });
    };

    let mut tree = RouteTree::new(GridCoord::at(root.point, root_layer));
    // (dag node, layer it is entered on, its route node)
    let mut stack = vec![(RoutingDag::ROOT, root_layer, RouteTree::ROOT)];
    while let Some((idx, layer, route)) = stack.pop() {
        let node = dag.node(idx);
        let at = |z: usize| GridCoord::at(node.point, z);
        let mut lowest = route;
        let mut highest = route;

        if !node.paths.is_empty() {
            let mut on_layer: Vec<Vec<usize>> = vec![Vec::new(); n];
            for (slot, alternatives) in node.paths.iter().enumerate() {
                let Some((alt, child_layer)) = node.best_paths[layer][slot] else {
                    return Err(RouteError::NoFeasibleLayer {
                        net: net.to_string(),
                    });
                };
                on_layer[child_layer].push(alternatives[alt]);
            }

            let mut attach = |tree: &mut RouteTree, parent: usize, z: usize| {
                for &target in &on_layer[z] {
                    let child = tree.add_child(parent, GridCoord::at(dag.node(target).point, z));
                    stack.push((target, z, child));
                }
            };
            attach(&mut tree, route, layer);
            for z in (0..layer).rev() {
                if !on_layer[z].is_empty() {
                    lowest = tree.add_child(lowest, at(z));
                    attach(&mut tree, lowest, z);
                }
            }
            for z in layer + 1..n {
                if !on_layer[z].is_empty() {
                    highest = tree.add_child(highest, at(z));
                    attach(&mut tree, highest, z);
                }
            }
        }

        if let Some(fixed) = node.fixed_layers {
            if tree.coord(lowest).z > fixed.low {
                tree.add_child(lowest, at(fixed.low));
            }
            if tree.coord(highest).z < fixed.high {
                tree.add_child(highest, at(fixed.high));
            }
        }
    }
    Ok(tree)
}

/// Sum of wire and via costs of `tree` as currently priced by `grid`.
pub fn tree_cost<G: RoutingGrid + ?Sized>(tree: &RouteTree, grid: &G) -> f64 {
    tree.edges()
        .into_iter()
        .map(|(a, b)| {
            if a.z == b.z {
                grid.wire_cost(a.z, a.planar(), b.planar())
            } else {
                (a.z.min(b.z)..a.z.max(b.z))
                    .map(|z| grid.via_cost(z, a.planar()))
                    .sum()
            }
        })
        .sum()
}
