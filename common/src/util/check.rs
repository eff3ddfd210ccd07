use crate::db::core::{DesignDB, NetData, RouteSegment};
use crate::geom::coord::GridCoord;
use rayon::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Verifies the exported route segments of every net: each segment must be a
/// legal same-layer run or via stack inside the grid, and every multi-pin net
/// must connect all of its pins.
pub fn run(db: &DesignDB) -> Result<(), String> {
    log::info!("Starting Route Verification...");

    let (geometry_result, opens_result) =
        rayon::join(|| check_geometry(db), || check_opens(db));

    let mut msgs = Vec::new();

    match geometry_result {
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: Illegal route geometry");
            log::error!("{}", e);
            msgs.push(e);
        }
        Ok(_) => log::info!("\x1b[32mPASS\x1b[0m: All segments are rectilinear and on-grid."),
    }

    match opens_result {
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: Open Net (Disconnected) Detected");
            log::error!("{}", e);
            msgs.push(e);
        }
        Ok(_) => log::info!("\x1b[32mPASS\x1b[0m: All nets are fully connected."),
    }

    if msgs.is_empty() {
        log::info!("\x1b[32mSUCCESS\x1b[0m: VALID ROUTING");
        Ok(())
    } else {
        log::error!(
            "\x1b[31mFAILURE\x1b[0m: INVALID ROUTING ({} Errors)",
            msgs.len()
        );
        Err(msgs.join("; "))
    }
}

fn record_first(found: &AtomicBool, slot: &Mutex<String>, msg: String) {
    if !found.swap(true, Ordering::Relaxed)
        && let Ok(mut guard) = slot.lock()
    {
        *guard = msg;
    }
}

fn take_message(found: AtomicBool, slot: Mutex<String>) -> Result<(), String> {
    if found.load(Ordering::Relaxed) {
        Err(slot.into_inner().unwrap_or_else(|e| e.into_inner()))
    } else {
        Ok(())
    }
}

fn check_geometry(db: &DesignDB) -> Result<(), String> {
    let dim = &db.dimension;
    let in_grid = |c: &GridCoord| {
        c.x >= 0
            && c.y >= 0
            && (c.x as usize) < dim.x_size
            && (c.y as usize) < dim.y_size
            && c.z < dim.n_layers
    };

    let error_found = AtomicBool::new(false);
    let error_msg = Mutex::new(String::new());

    db.nets.par_iter().for_each(|net| {
        if error_found.load(Ordering::Relaxed) {
            return;
        }
        for seg in &net.route_segments {
            if !in_grid(&seg.p1) || !in_grid(&seg.p2) {
                record_first(
                    &error_found,
                    &error_msg,
                    format!("Net '{}': segment {} - {} leaves the grid", net.name, seg.p1, seg.p2),
                );
                return;
            }
            let planar_run = seg.p1.z == seg.p2.z && (seg.p1.x == seg.p2.x || seg.p1.y == seg.p2.y);
            if !planar_run && !seg.is_via() {
                record_first(
                    &error_found,
                    &error_msg,
                    format!("Net '{}': segment {} - {} is not rectilinear", net.name, seg.p1, seg.p2),
                );
                return;
            }
        }
    });

    take_message(error_found, error_msg)
}

#[derive(Clone, Copy)]
struct Span {
    lo: GridCoord,
    hi: GridCoord,
}

impl Span {
    fn of(seg: &RouteSegment) -> Self {
        Self {
            lo: GridCoord::new(
                seg.p1.x.min(seg.p2.x),
                seg.p1.y.min(seg.p2.y),
                seg.p1.z.min(seg.p2.z),
            ),
            hi: GridCoord::new(
                seg.p1.x.max(seg.p2.x),
                seg.p1.y.max(seg.p2.y),
                seg.p1.z.max(seg.p2.z),
            ),
        }
    }

    // Axis-aligned segments touch exactly when their boxes overlap.
    fn touches(&self, other: &Span) -> bool {
        self.lo.x <= other.hi.x
            && other.lo.x <= self.hi.x
            && self.lo.y <= other.hi.y
            && other.lo.y <= self.hi.y
            && self.lo.z <= other.hi.z
            && other.lo.z <= self.hi.z
    }

    fn contains(&self, c: &GridCoord) -> bool {
        c.x >= self.lo.x
            && c.x <= self.hi.x
            && c.y >= self.lo.y
            && c.y <= self.hi.y
            && c.z >= self.lo.z
            && c.z <= self.hi.z
    }
}

fn pin_candidates(db: &DesignDB, net: &NetData) -> Vec<Vec<GridCoord>> {
    net.pins
        .iter()
        .map(|&pin| {
            db.pin_points(pin)
                .map(|p| GridCoord::new(p.x, p.y, p.layer))
                .collect()
        })
        .collect()
}

fn check_opens(db: &DesignDB) -> Result<(), String> {
    let error_found = AtomicBool::new(false);
    let error_msg = Mutex::new(String::new());

    db.nets.par_iter().for_each(|net| {
        if error_found.load(Ordering::Relaxed) {
            return;
        }
        let pins = pin_candidates(db, net);
        if pins.len() < 2 || pins.iter().any(|p| p.is_empty()) {
            return;
        }

        let spans: Vec<Span> = net.route_segments.iter().map(Span::of).collect();
        let n = spans.len();
        if n == 0 {
            // All pins may share one access point; nothing to route then.
            let shared: HashSet<GridCoord> = pins[0].iter().copied().collect();
            let connected = shared
                .iter()
                .any(|c| pins.iter().all(|candidates| candidates.contains(c)));
            if !connected {
                record_first(
                    &error_found,
                    &error_msg,
                    format!("Net '{}': Unrouted (No segments)", net.name),
                );
            }
            return;
        }

        let mut adj = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                if spans[i].touches(&spans[j]) {
                    adj[i].push(j);
                    adj[j].push(i);
                }
            }
        }

        let mut pin_segment_indices = Vec::with_capacity(pins.len());
        for (pin_idx, candidates) in pins.iter().enumerate() {
            let hit = spans
                .iter()
                .position(|s| candidates.iter().any(|c| s.contains(c)));
            match hit {
                Some(seg_idx) => pin_segment_indices.push(seg_idx),
                None => {
                    record_first(
                        &error_found,
                        &error_msg,
                        format!(
                            "Net '{}': Pin {} at {} not connected to any segment.",
                            net.name, pin_idx, candidates[0]
                        ),
                    );
                    return;
                }
            }
        }

        let start_node = pin_segment_indices[0];
        let mut visited = vec![false; n];
        let mut queue = VecDeque::new();
        visited[start_node] = true;
        queue.push_back(start_node);

        while let Some(u) = queue.pop_front() {
            for &v in &adj[u] {
                if !visited[v] {
                    visited[v] = true;
                    queue.push_back(v);
                }
            }
        }

        if pin_segment_indices.iter().any(|&seg_idx| !visited[seg_idx]) {
            record_first(
                &error_found,
                &error_msg,
                format!("Net '{}': Broken connectivity (Split net).", net.name),
            );
        }
    });

    take_message(error_found, error_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::core::LayerDirection;

    fn small_db() -> DesignDB {
        let mut db = DesignDB::new();
        db.set_dimension(2, 4, 4, vec![1; 3], vec![1; 3]);
        db.add_layer("M1".into(), LayerDirection::Horizontal, 0.0, vec![1.0; 16]);
        db.add_layer("M2".into(), LayerDirection::Vertical, 0.0, vec![1.0; 16]);
        let net = db.add_net("n".into());
        let a = db.add_pin(net, "a".into(), 0.0);
        db.add_point(a, 0, 0, 0);
        let b = db.add_pin(net, "b".into(), 0.0);
        db.add_point(b, 1, 3, 2);
        db
    }

    fn seg(a: (i32, i32, usize), b: (i32, i32, usize)) -> RouteSegment {
        RouteSegment {
            p1: GridCoord::new(a.0, a.1, a.2),
            p2: GridCoord::new(b.0, b.1, b.2),
        }
    }

    #[test]
    fn connected_route_passes() {
        let mut db = small_db();
        db.nets[0].route_segments = vec![
            seg((0, 0, 0), (3, 0, 0)),
            seg((3, 0, 0), (3, 0, 1)),
            seg((3, 0, 1), (3, 2, 1)),
        ];
        assert!(run(&db).is_ok());
    }

    #[test]
    fn split_route_fails() {
        let mut db = small_db();
        db.nets[0].route_segments = vec![seg((0, 0, 0), (2, 0, 0)), seg((3, 1, 1), (3, 2, 1))];
        assert!(check_opens(&db).is_err());
    }

    #[test]
    fn diagonal_segment_fails() {
        let mut db = small_db();
        db.nets[0].route_segments = vec![seg((0, 0, 0), (3, 2, 0))];
        assert!(check_geometry(&db).is_err());
    }
}
