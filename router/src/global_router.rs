use crate::algo::maze::{FallbackRouter, SparseMazeRouter};
use crate::algo::rsmt::SteinerEngine;
use crate::error::RouteError;
use crate::grid::{GridView, ResourceGrid};
use crate::net::NetView;
use crate::pattern::PatternRoute;
use crate::schedule;
use crate::stats::RouteStatistics;
use crate::tree::RouteTree;
use crate::utils::conversion::GridConverter;
use gr_common::db::core::DesignDB;
use gr_common::db::indices::NetId;
use gr_common::util::config::GlobalRoutingConfig;
use gr_common::util::profiler::ScopedTimer;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

type Routed = Vec<(usize, Option<RouteTree>)>;

struct Progress {
    label: &'static str,
    total: usize,
    done: AtomicUsize,
    start: Instant,
}

impl Progress {
    fn new(label: &'static str, total: usize) -> Self {
        Self {
            label,
            total,
            done: AtomicUsize::new(0),
            start: Instant::now(),
        }
    }

    fn tick(&self) {
        let p = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if p.is_multiple_of(50) || p == self.total {
            let pct = (p as f64 / self.total.max(1) as f64) * 100.0;
            eprint!(
                "\r\x1b[36m[{}] Progress: {:>3.0}% ({}/{}) Time: {:.1}s\x1b[0m",
                self.label,
                pct,
                p,
                self.total,
                self.start.elapsed().as_secs_f32()
            );
            let _ = std::io::stderr().flush();
        }
    }

    fn finish(&self) {
        eprint!("\r\x1b[2K");
        let _ = std::io::stderr().flush();
    }
}

/// Drives every net of a design through pattern routing, detour rerouting
/// and the sparse maze fallback, keeping the shared resource grid in sync.
pub struct GlobalRouter<'a> {
    config: &'a GlobalRoutingConfig,
    grid: ResourceGrid,
    nets: Vec<NetView>,
    steiner: Mutex<SteinerEngine>,
    pool: rayon::ThreadPool,
}

impl<'a> GlobalRouter<'a> {
    pub fn new(db: &DesignDB, config: &'a GlobalRoutingConfig) -> Result<Self, RouteError> {
        config.validate().map_err(RouteError::InvalidConfig)?;
        let grid = ResourceGrid::new(db, config)?;
        let nets = (0..db.nets.len())
            .map(|i| NetView::new(db, NetId::new(i)))
            .collect::<Result<Vec<_>, _>>()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads.max(1))
            .build()?;
        Ok(Self {
            config,
            grid,
            nets,
            steiner: Mutex::new(SteinerEngine::default()),
            pool,
        })
    }

    pub fn grid(&self) -> &ResourceGrid {
        &self.grid
    }

    pub fn nets(&self) -> &[NetView] {
        &self.nets
    }

    /// Runs all enabled stages and returns the final statistics.
    pub fn route(&mut self) -> Result<RouteStatistics, RouteError> {
        let _timer = ScopedTimer::new("Global routing");
        log::info!("Global routing {} nets on {} threads", self.nets.len(), self.config.num_threads);

        // Stage 1
        let mut candidates: Vec<usize> = (0..self.nets.len()).collect();
        self.pattern_stage("GR Stage 1", &mut candidates, None)?;
        let mut candidates = self.overflowing_nets(self.config.stage2_overflow_threshold);
        log::info!("Stage 1 done, {} nets with overflow", candidates.len());

        if self.config.stage2 && !candidates.is_empty() {
            let congestion = self.grid.extract_congestion_view();
            self.pattern_stage("GR Stage 2", &mut candidates, Some(&congestion))?;
            candidates = self.overflowing_nets(self.config.stage2_overflow_threshold);
            log::info!("Stage 2 done, {} nets with overflow", candidates.len());
        }

        if self.config.stage3 {
            let mut candidates = self.overflowing_nets(self.config.stage3_overflow_threshold);
            if !candidates.is_empty() {
                let mut fallback = SparseMazeRouter::new(self.config.sparse_grid_interval);
                self.maze_stage(&mut candidates, &mut fallback)?;
            }
        }

        let remaining = self.overflowing_nets(self.config.stage3_overflow_threshold).len();
        log::info!("Routing finished, {} nets still overflow", remaining);

        let stats =
            RouteStatistics::compute(&self.grid, self.nets.iter().filter_map(NetView::routing_tree));
        stats.log();
        Ok(stats)
    }

    /// Nets whose committed tree crosses at least one edge overflowing by
    /// more than `threshold`.
    pub fn overflowing_nets(&self, threshold: f64) -> Vec<usize> {
        self.nets
            .iter()
            .enumerate()
            .filter(|(_, net)| {
                net.routing_tree()
                    .is_some_and(|tree| self.grid.check_overflow_tree(tree, threshold) > 0)
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn route_pattern(
        &self,
        index: usize,
        congestion: Option<&GridView<bool>>,
    ) -> Result<Option<RouteTree>, RouteError> {
        let net = &self.nets[index];
        if let Some(old) = net.routing_tree() {
            self.grid.commit_tree(old, true)?;
        }
        let mut pattern = PatternRoute::new(&self.grid, net, self.config);
        pattern.construct_steiner_tree(&self.steiner)?;
        pattern.construct_routing_dag()?;
        if let Some(view) = congestion {
            pattern.construct_detours(view)?;
        }
        let tree = pattern.run()?;
        if let Some(tree) = &tree {
            self.grid.commit_tree(tree, false)?;
        }
        Ok(tree)
    }

    fn route_bucket(
        &self,
        bucket: &[usize],
        congestion: Option<&GridView<bool>>,
        progress: &Progress,
    ) -> Result<Routed, RouteError> {
        let mut routed = Vec::with_capacity(bucket.len());
        for &i in bucket {
            routed.push((i, self.route_pattern(i, congestion)?));
            progress.tick();
        }
        Ok(routed)
    }

    fn pattern_stage(
        &mut self,
        label: &'static str,
        candidates: &mut [usize],
        congestion: Option<&GridView<bool>>,
    ) -> Result<(), RouteError> {
        let _timer = ScopedTimer::new(label);
        schedule::sort_by_half_perimeter(&self.nets, candidates);
        let buckets = self.config.num_threads.max(1);
        let mut groups = schedule::partition(&self.nets, candidates, buckets);
        let residual = groups.pop().unwrap_or_default();
        log::info!(
            "{}: {} nets, {} in {} parallel buckets, {} residual",
            label,
            candidates.len(),
            candidates.len() - residual.len(),
            groups.len(),
            residual.len()
        );

        let progress = Progress::new(label, candidates.len());
        let this = &*self;
        let parallel: Vec<Routed> = this.pool.install(|| {
            groups
                .par_iter()
                .map(|bucket| this.route_bucket(bucket, congestion, &progress))
                .collect::<Result<_, _>>()
        })?;
        let sequential = this.route_bucket(&residual, congestion, &progress)?;
        progress.finish();

        for (i, tree) in parallel.into_iter().flatten().chain(sequential) {
            self.nets[i].set_routing_tree(tree);
        }
        Ok(())
    }

    fn maze_stage(
        &mut self,
        candidates: &mut [usize],
        fallback: &mut impl FallbackRouter,
    ) -> Result<(), RouteError> {
        let label = "GR Stage 3";
        let _timer = ScopedTimer::new(label);
        for &i in candidates.iter() {
            if let Some(old) = self.nets[i].routing_tree() {
                self.grid.commit_tree(old, true)?;
            }
            self.nets[i].set_routing_tree(None);
        }
        let mut costs = self.grid.extract_wire_cost_view();
        schedule::sort_by_half_perimeter(&self.nets, candidates);
        log::info!("{}: {} nets", label, candidates.len());

        let progress = Progress::new(label, candidates.len());
        for &i in candidates.iter() {
            let tree = self.route_maze(i, &costs, &mut *fallback)?;
            if let Some(tree) = &tree {
                self.grid.commit_tree(tree, false)?;
                self.grid.update_wire_cost_view(&mut costs, tree);
            }
            self.nets[i].set_routing_tree(tree);
            fallback.step();
            progress.tick();
        }
        progress.finish();
        Ok(())
    }

    fn route_maze(
        &self,
        index: usize,
        costs: &GridView<f64>,
        fallback: &mut impl FallbackRouter,
    ) -> Result<Option<RouteTree>, RouteError> {
        let net = &self.nets[index];
        let mut pattern = PatternRoute::new(&self.grid, net, self.config);
        match fallback.route(net, pattern.access_points(), costs) {
            Ok(topology) => pattern.set_steiner_tree(topology),
            Err(RouteError::MazeUnreachable { net: name, x, y }) => {
                log::warn!(
                    "Net '{}': ({}, {}) unreachable on the sparse grid, keeping the pattern topology",
                    name,
                    x,
                    y
                );
                pattern.construct_steiner_tree(&self.steiner)?;
            }
            Err(e) => return Err(e),
        }
        pattern.construct_routing_dag()?;
        pattern.run()
    }

    /// Guide text of every net in netlist order.
    pub fn guides(&self, converter: &GridConverter) -> String {
        let _timer = ScopedTimer::new("Guide generation");
        let parts: Vec<String> = self
            .nets
            .par_iter()
            .map(|net| converter.net_guide(net.name(), net.routing_tree()))
            .collect();
        parts.concat()
    }

    pub fn write_guides(&self, path: &str, converter: &GridConverter) -> Result<(), RouteError> {
        log::info!("Writing route guides to {}", path);
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(self.guides(converter).as_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// Copies every routed tree into the design as route segments.
    pub fn export(&self, db: &mut DesignDB) {
        for (data, net) in db.nets.iter_mut().zip(&self.nets) {
            data.route_segments = net
                .routing_tree()
                .map(RouteTree::route_segments)
                .unwrap_or_default();
        }
    }
}
