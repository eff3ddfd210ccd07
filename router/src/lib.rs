pub mod algo;
pub mod error;
pub mod global_router;
pub mod grid;
pub mod net;
pub mod pattern;
pub mod schedule;
pub mod stats;
pub mod tree;
pub mod utils;

pub use error::RouteError;
pub use global_router::GlobalRouter;
pub use stats::RouteStatistics;

use gr_common::db::core::DesignDB;
use gr_common::util::config::Config;
use utils::conversion::GridConverter;

/// What a finished run hands back to the caller.
pub struct RouteReport {
    pub statistics: RouteStatistics,
    /// Lowest remaining resource per cell, row-major `[y * x_size + x]`.
    pub min_resource: Vec<f64>,
}

/// Routes every net of `db`, stores the result as route segments and writes
/// the configured output files.
pub fn route(db: &mut DesignDB, config: &Config) -> Result<RouteReport, RouteError> {
    let mut router = GlobalRouter::new(db, &config.global_routing)?;
    let statistics = router.route()?;
    router.export(db);

    if let Some(path) = &config.input.output_file {
        let converter = GridConverter::new(router.grid(), &config.output);
        router.write_guides(path, &converter)?;
    }
    if let Some(path) = &config.output.heatmap_file {
        router.grid().write_heatmap(path)?;
    }
    if let Some(path) = &config.output.capacity_file {
        router.grid().write_capacity(path)?;
    }

    Ok(RouteReport {
        statistics,
        min_resource: router.grid().min_resource_map(),
    })
}
