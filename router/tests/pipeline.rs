use gr_common::db::core::DesignDB;
use gr_common::db::parser::{cap, net};
use gr_common::geom::coord::GridCoord;
use gr_common::util::check;
use gr_common::util::config::{Config, GlobalRoutingConfig, GuideUnits};
use gr_router::grid::ResourceGrid;
use gr_router::pattern::cost::tree_cost;
use gr_router::tree::RouteTree;
use gr_router::GlobalRouter;

fn capacity_file(layers: usize, size: usize, capacity: f64) -> String {
    let mut text = format!("{} {} {}\n1.0 2.0\n", layers, size, size);
    text.push_str(&vec!["1"; layers].join(" "));
    text.push('\n');
    for _ in 0..2 {
        text.push_str(&vec!["1"; size - 1].join(" "));
        text.push('\n');
    }
    for l in 0..layers {
        text.push_str(&format!("metal{} {} 0\n", l + 1, l % 2));
        for _ in 0..size {
            text.push_str(&vec![capacity.to_string(); size].join(" "));
            text.push('\n');
        }
    }
    text
}

fn design(cap_text: &str, net_text: &str) -> DesignDB {
    let mut db = DesignDB::new();
    cap::parse_str(&mut db, cap_text).unwrap();
    net::parse_str(&mut db, net_text).unwrap();
    db
}

fn chain(points: &[(i32, i32, usize)]) -> RouteTree {
    let mut tree = RouteTree::new(GridCoord::new(points[0].0, points[0].1, points[0].2));
    let mut parent = RouteTree::ROOT;
    for &(x, y, z) in &points[1..] {
        parent = tree.add_child(parent, GridCoord::new(x, y, z));
    }
    tree
}

#[test]
fn two_pin_net_takes_the_cheapest_pattern() {
    let mut db = design(
        &capacity_file(2, 5, 4.0),
        "a\n(\np0 0.0 [(0, 0, 0)]\np1 0.0 [(1, 4, 4)]\n)\n",
    );
    let config = GlobalRoutingConfig {
        num_threads: 2,
        min_routing_layer: 0,
        ..GlobalRoutingConfig::default()
    };

    let idle = ResourceGrid::new(&db, &config).unwrap();
    let alternatives = [
        chain(&[(0, 0, 0), (4, 0, 0), (4, 0, 1), (4, 4, 1)]),
        chain(&[(0, 0, 0), (0, 0, 1), (0, 4, 1), (0, 4, 0), (4, 4, 0), (4, 4, 1)]),
        chain(&[(0, 0, 0), (2, 0, 0), (2, 0, 1), (2, 4, 1), (2, 4, 0), (4, 4, 0), (4, 4, 1)]),
        chain(&[(0, 0, 0), (0, 0, 1), (0, 2, 1), (0, 2, 0), (4, 2, 0), (4, 2, 1), (4, 4, 1)]),
    ];
    let best = alternatives
        .iter()
        .map(|t| tree_cost(t, &idle))
        .fold(f64::INFINITY, f64::min);

    let mut router = GlobalRouter::new(&db, &config).unwrap();
    let stats = router.route().unwrap();
    let tree = router.nets()[0].routing_tree().unwrap();
    assert!((tree_cost(tree, &idle) - best).abs() < 1e-9);
    assert_eq!(router.grid().check_overflow_tree(tree, 0.0), 0);
    assert_eq!(stats.overflow, 0.0);
    assert_eq!(stats.wire_length, 8);
    assert_eq!(stats.via_count, 1);

    router.export(&mut db);
    assert!(!db.nets[0].route_segments.is_empty());
    assert!(check::run(&db).is_ok());
}

fn congested_nets() -> String {
    let mut text = String::new();
    for i in 0..24 {
        let x0 = i % 6;
        let y0 = (i * 5) % 9;
        let x1 = 9 - (i * 3) % 7;
        let y1 = 9 - i % 8;
        let x2 = (i * 7) % 10;
        text.push_str(&format!(
            "n{}\n(\na 0.1 [(1, {}, {})]\nb -0.2 [(2, {}, {}), (1, {}, {})]\nc 0 [(1, {}, 5)]\n)\n\n",
            i, x0, y0, x1, y1, x1, y1, x2
        ));
    }
    text
}

#[test]
fn all_stages_leave_a_connected_design() {
    let mut db = design(&capacity_file(4, 10, 2.0), &congested_nets());
    let mut config = Config::default();
    config.global_routing.num_threads = 4;
    config.global_routing.stage3 = true;
    config.global_routing.stage3_overflow_threshold = 0.0;
    config.global_routing.sparse_grid_interval = 3;

    let mut router = GlobalRouter::new(&db, &config.global_routing).unwrap();
    let stats = router.route().unwrap();
    assert!(router.nets().iter().all(|n| n.routing_tree().is_some()));
    assert!(stats.via_count > 0);
    assert!(router.grid().total_vias() >= 0);

    router.export(&mut db);
    assert!(check::run(&db).is_ok());
}

#[test]
fn rerouting_keeps_demand_consistent() {
    let db = design(&capacity_file(4, 10, 2.0), &congested_nets());
    let config = GlobalRoutingConfig {
        num_threads: 3,
        stage3: true,
        ..GlobalRoutingConfig::default()
    };
    let mut router = GlobalRouter::new(&db, &config).unwrap();
    router.route().unwrap();

    // Replaying every committed tree on an idle grid gives the same demand.
    let replay = ResourceGrid::new(&db, &config).unwrap();
    for net in router.nets() {
        if let Some(tree) = net.routing_tree() {
            replay.commit_tree(tree, false).unwrap();
        }
    }
    for l in 0..4 {
        for x in 0..10 {
            for y in 0..10 {
                let diff = replay.demand(l, x, y) - router.grid().demand(l, x, y);
                assert!(diff.abs() < 1e-6, "demand differs at ({}, {}, {})", l, x, y);
            }
        }
    }
    assert_eq!(replay.total_vias(), router.grid().total_vias());
}

#[test]
fn route_writes_guides_and_dumps() {
    let mut db = design(&capacity_file(3, 6, 3.0), &congested_nets());
    let dir = std::env::temp_dir().join(format!("gr-router-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let guide = dir.join("out.guide");
    let heatmap = dir.join("heatmap.txt");

    let mut config = Config::default();
    config.global_routing.num_threads = 2;
    config.input.output_file = Some(guide.to_string_lossy().into_owned());
    config.output.heatmap_file = Some(heatmap.to_string_lossy().into_owned());
    config.output.guide_units = GuideUnits::Grid;

    // Pins beyond the 6x6 grid are rejected up front.
    let err = gr_router::route(&mut db, &config);
    assert!(matches!(err, Err(gr_router::RouteError::AccessPointOutOfGrid { .. })));

    let mut db = design(&capacity_file(3, 6, 3.0), "x\n(\np 0 [(1, 0, 0)]\nq 0 [(1, 5, 3)]\n)\ny\n(\np 0 [(2, 2, 2)]\n)\n");
    let report = gr_router::route(&mut db, &config).unwrap();
    assert_eq!(report.min_resource.len(), 36);
    assert_eq!(report.statistics.overflow, 0.0);

    let text = std::fs::read_to_string(&guide).unwrap();
    assert!(text.starts_with("x\n(\n"));
    // A single-pin net has nothing to guide.
    assert!(text.ends_with("y\n(\n)\n"));
    let lines: Vec<&str> = text.lines().collect();
    for pair in lines.windows(2) {
        if pair[0].split_whitespace().count() == 6 {
            assert_ne!(pair[0], pair[1]);
        }
    }
    let heat = std::fs::read_to_string(&heatmap).unwrap();
    assert!(heat.starts_with("3 6 6"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_detour_count_fails_before_routing() {
    let db = design(&capacity_file(3, 10, 2.0), &congested_nets());
    let config = GlobalRoutingConfig {
        target_detour_count: 0,
        ..GlobalRoutingConfig::default()
    };
    let err = GlobalRouter::new(&db, &config).err().unwrap();
    assert!(matches!(
        &err,
        gr_router::RouteError::InvalidConfig(msg) if msg.contains("target_detour_count")
    ));
}
