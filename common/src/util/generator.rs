use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};

pub struct BenchmarkSpec {
    pub layers: usize,
    pub x_size: usize,
    pub y_size: usize,
    pub nets: usize,
    pub capacity: f64,
    pub max_pins: usize,
}

/// Writes a random capacity file and net file pair. Layer 0 is a pin layer
/// with no routing capacity. Directions alternate from horizontal on layer 0.
pub fn generate_random_benchmark(
    spec: &BenchmarkSpec,
    cap_file: &str,
    net_file: &str,
) -> std::io::Result<()> {
    let mut rng = rand::thread_rng();
    let layers = spec.layers.max(2);
    let x_size = spec.x_size.max(2);
    let y_size = spec.y_size.max(2);

    log::info!(
        "Generating Benchmark: {} layers, {} x {} cells, {} nets",
        layers,
        x_size,
        y_size,
        spec.nets
    );

    let mut cap = BufWriter::new(File::create(cap_file)?);
    writeln!(cap, "{} {} {}", layers, x_size, y_size)?;
    writeln!(cap, "0.5 4.0")?;
    let weights: Vec<String> = (0..layers).map(|_| "1".to_string()).collect();
    writeln!(cap, "{}", weights.join(" "))?;
    let h_edges: Vec<String> = (0..x_size - 1).map(|_| "3000".to_string()).collect();
    writeln!(cap, "{}", h_edges.join(" "))?;
    let v_edges: Vec<String> = (0..y_size - 1).map(|_| "3000".to_string()).collect();
    writeln!(cap, "{}", v_edges.join(" "))?;

    for layer in 0..layers {
        let direction = layer % 2;
        writeln!(cap, "metal{} {} 0", layer + 1, direction)?;
        for _ in 0..y_size {
            let row: Vec<String> = (0..x_size)
                .map(|_| {
                    if layer == 0 {
                        "0".to_string()
                    } else {
                        let jitter = rng.gen_range(0.75..=1.0);
                        format!("{}", (spec.capacity * jitter).round())
                    }
                })
                .collect();
            writeln!(cap, "{}", row.join(" "))?;
        }
    }
    cap.flush()?;

    let mut nets = BufWriter::new(File::create(net_file)?);
    let span_x = (x_size / 8).max(2) as i32;
    let span_y = (y_size / 8).max(2) as i32;
    for i in 0..spec.nets {
        writeln!(nets, "net{}", i)?;
        writeln!(nets, "(")?;
        let cx = rng.gen_range(0..x_size as i32);
        let cy = rng.gen_range(0..y_size as i32);
        let num_pins = rng.gen_range(2..=spec.max_pins.max(2));
        for p in 0..num_pins {
            let x = (cx + rng.gen_range(-span_x..=span_x)).clamp(0, x_size as i32 - 1);
            let y = (cy + rng.gen_range(-span_y..=span_y)).clamp(0, y_size as i32 - 1);
            let slack: f64 = rng.gen_range(-1.0..1.0);
            if rng.gen_bool(0.3) {
                writeln!(nets, "p{} {:.3} [(0, {}, {}), (1, {}, {})]", p, slack, x, y, x, y)?;
            } else {
                writeln!(nets, "p{} {:.3} [(0, {}, {})]", p, slack, x, y)?;
            }
        }
        writeln!(nets, ")")?;
    }
    nets.flush()?;
    Ok(())
}
