use gr_common::geom::point::Point;

/// Per-direction 2D snapshot of edge state, indexed `[direction][x][y]`.
/// Direction 0 holds horizontal edges (cell to its right neighbour), direction
/// 1 vertical edges (cell to its upper neighbour).
#[derive(Clone, Debug, PartialEq)]
pub struct GridView<T> {
    x_size: usize,
    y_size: usize,
    cells: [Vec<T>; 2],
}

impl<T: Copy> GridView<T> {
    pub fn new(x_size: usize, y_size: usize, fill: T) -> Self {
        Self {
            x_size,
            y_size,
            cells: [vec![fill; x_size * y_size], vec![fill; x_size * y_size]],
        }
    }

    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> usize {
        x as usize * self.y_size + y as usize
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }
    pub fn y_size(&self) -> usize {
        self.y_size
    }

    #[inline]
    pub fn get(&self, direction: usize, x: i32, y: i32) -> T {
        self.cells[direction][self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, direction: usize, x: i32, y: i32, value: T) {
        let idx = self.index(x, y);
        self.cells[direction][idx] = value;
    }

    /// Visits the edges of the colinear run `u`..`v`.
    fn run(&self, u: Point<i32>, v: Point<i32>) -> impl Iterator<Item = T> + '_ {
        let (direction, fixed, lo, hi) = if u.y == v.y {
            (0, u.y, u.x.min(v.x), u.x.max(v.x))
        } else {
            (1, u.x, u.y.min(v.y), u.y.max(v.y))
        };
        (lo..hi).map(move |c| {
            if direction == 0 {
                self.get(0, c, fixed)
            } else {
                self.get(1, fixed, c)
            }
        })
    }
}

impl GridView<bool> {
    /// True when any edge of the run is flagged.
    pub fn check(&self, u: Point<i32>, v: Point<i32>) -> bool {
        debug_assert!(u.x == v.x || u.y == v.y);
        self.run(u, v).any(|flag| flag)
    }
}

impl GridView<f64> {
    pub fn sum(&self, u: Point<i32>, v: Point<i32>) -> f64 {
        debug_assert!(u.x == v.x || u.y == v.y);
        self.run(u, v).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_read_the_matching_direction() {
        let mut view = GridView::new(4, 3, false);
        view.set(0, 2, 1, true);
        assert!(view.check(Point::new(0, 1), Point::new(3, 1)));
        assert!(!view.check(Point::new(0, 1), Point::new(2, 1)));
        assert!(!view.check(Point::new(2, 0), Point::new(2, 2)));

        let mut costs = GridView::new(4, 3, 1.0);
        costs.set(1, 2, 1, 5.0);
        assert_eq!(costs.sum(Point::new(2, 2), Point::new(2, 0)), 6.0);
        assert_eq!(costs.sum(Point::new(1, 1), Point::new(1, 1)), 0.0);
    }
}
