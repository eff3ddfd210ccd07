pub mod cost;
pub mod dag;
pub mod detour;
pub mod steiner;

use crate::algo::rsmt::SteinerEngine;
use crate::error::RouteError;
use crate::grid::{AccessPoints, GridView, RoutingGrid};
use crate::net::NetView;
use crate::tree::RouteTree;
use dag::RoutingDag;
use gr_common::geom::coord::GridCoord;
use gr_common::geom::point::Point;
use gr_common::util::config::GlobalRoutingConfig;
use std::collections::HashSet;
use std::sync::Mutex;
use steiner::SteinerTree;

/// Pattern routing of a single net: topology, layer-assignment DAG,
/// optional detours, then a dynamic-programming solve. The steps must run in
/// that order.
pub struct PatternRoute<'a, G: RoutingGrid + ?Sized> {
    grid: &'a G,
    net: &'a NetView,
    config: &'a GlobalRoutingConfig,
    access: AccessPoints,
    steiner: Option<SteinerTree>,
    dag: Option<RoutingDag>,
}

impl<'a, G: RoutingGrid + ?Sized> PatternRoute<'a, G> {
    pub fn new(grid: &'a G, net: &'a NetView, config: &'a GlobalRoutingConfig) -> Self {
        Self {
            grid,
            net,
            config,
            access: grid.select_access_points(net),
            steiner: None,
            dag: None,
        }
    }

    pub fn access_points(&self) -> &AccessPoints {
        &self.access
    }

    pub fn routing_dag(&self) -> Option<&RoutingDag> {
        self.dag.as_ref()
    }

    fn out_of_order(&self, step: &'static str, requires: &'static str) -> RouteError {
        RouteError::InvalidStage {
            net: self.net.name().to_string(),
            step,
            requires,
        }
    }

    pub fn construct_steiner_tree(&mut self, engine: &Mutex<SteinerEngine>) -> Result<(), RouteError> {
        let tree = match self.access.len() {
            0 => SteinerTree::default(),
            1 => self
                .access
                .iter()
                .next()
                .map(|a| SteinerTree::single(a.point, Some(a.fixed_layers)))
                .unwrap_or_default(),
            _ => {
                let terminals: Vec<Point<i32>> = self.access.iter().map(|a| a.point).collect();
                let branches = engine
                    .lock()
                    .map_err(|_| RouteError::LockPoisoned)?
                    .build(&terminals);
                SteinerTree::from_branches(&branches, &self.access)
            }
        };
        self.steiner = Some(tree);
        self.dag = None;
        Ok(())
    }

    /// Uses an externally built topology instead of the Steiner heuristic.
    pub fn set_steiner_tree(&mut self, tree: SteinerTree) {
        self.steiner = Some(tree);
        self.dag = None;
    }

    pub fn construct_routing_dag(&mut self) -> Result<(), RouteError> {
        let tree = self
            .steiner
            .as_ref()
            .ok_or_else(|| self.out_of_order("construct_routing_dag", "construct_steiner_tree"))?;
        self.dag = Some(RoutingDag::from_steiner(tree));
        Ok(())
    }

    pub fn construct_detours(&mut self, congestion: &GridView<bool>) -> Result<(), RouteError> {
        let Some(dag) = self.dag.as_mut() else {
            return Err(self.out_of_order("construct_detours", "construct_routing_dag"));
        };
        if !dag.is_empty() {
            detour::construct_detours(
                dag,
                self.grid,
                congestion,
                self.config.max_detour_ratio,
                self.config.target_detour_count,
            );
        }
        Ok(())
    }

    /// Solves the layer assignment and returns the pruned routing tree, or
    /// `None` for a net without access points.
    pub fn run(&mut self) -> Result<Option<RouteTree>, RouteError> {
        let name = self.net.name();
        let Some(dag) = self.dag.as_mut() else {
            return Err(self.out_of_order("run", "construct_routing_dag"));
        };
        if dag.is_empty() {
            return Ok(None);
        }
        if self.net.num_pins() == 1
            && let Some(only) = self.access.iter().next()
        {
            return Ok(Some(RouteTree::new(GridCoord::at(only.point, only.layer))));
        }
        cost::calculate_costs(dag, self.grid, name)?;
        let mut tree = cost::extract_tree(dag, self.grid, name)?;

        let access_points: Vec<GridCoord> = self.net.all_access_points().copied().collect();
        let distinct: HashSet<&GridCoord> = access_points.iter().collect();
        if distinct.len() == access_points.len() {
            tree.prune(&access_points);
        } else {
            log::debug!("Net '{}': duplicate access points, tree left unpruned", name);
        }
        Ok(Some(tree))
    }
}
