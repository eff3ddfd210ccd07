use gr_common::db::core::DesignDB;
use gr_common::db::parser::{ParseError, cap, net};
use gr_common::util::generator::{BenchmarkSpec, generate_random_benchmark};

#[test]
fn generated_benchmark_parses_back() {
    let dir = std::env::temp_dir().join(format!("gr-common-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let cap_file = dir.join("bench.cap");
    let net_file = dir.join("bench.net");
    let cap_path = cap_file.to_string_lossy().into_owned();
    let net_path = net_file.to_string_lossy().into_owned();

    let spec = BenchmarkSpec {
        layers: 4,
        x_size: 12,
        y_size: 9,
        nets: 30,
        capacity: 6.0,
        max_pins: 5,
    };
    generate_random_benchmark(&spec, &cap_path, &net_path).unwrap();

    let mut db = DesignDB::new();
    cap::parse(&mut db, &cap_path).unwrap();
    net::parse(&mut db, &net_path).unwrap();

    assert_eq!(db.dimension.n_layers, 4);
    assert_eq!(db.dimension.x_size, 12);
    assert_eq!(db.dimension.y_size, 9);
    assert_eq!(db.layers.len(), 4);
    assert!(db.layers[0].capacity.iter().all(|&c| c == 0.0));
    assert_eq!(db.num_nets(), 30);
    for net in &db.nets {
        assert!(net.pins.len() >= 2);
        for &pin in &net.pins {
            for p in db.pin_points(pin) {
                assert!(p.layer < 4);
                assert!(p.x >= 0 && (p.x as usize) < 12);
                assert!(p.y >= 0 && (p.y as usize) < 9);
            }
        }
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_files_report_the_path() {
    let mut db = DesignDB::new();
    let err = cap::parse(&mut db, "/nonexistent/design.cap").unwrap_err();
    assert!(matches!(err, ParseError::Io { ref path, .. } if path == "/nonexistent/design.cap"));
}

#[test]
fn truncated_layer_matrix_names_the_field() {
    let text = "1 2 2\n1 1\n1\n5\n5\nmetal1 0 0\n1 2\n3\n";
    let mut db = DesignDB::new();
    let err = cap::parse_str(&mut db, text).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    assert!(err.to_string().contains("capacity"), "{}", err);
}
