use super::point::Point;
use std::fmt;

/// A routed location: layer `z` at grid cell (`x`, `y`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
    pub z: usize,
}

impl GridCoord {
    pub fn new(x: i32, y: i32, z: usize) -> Self {
        Self { x, y, z }
    }

    pub fn at(point: Point<i32>, z: usize) -> Self {
        Self {
            x: point.x,
            y: point.y,
            z,
        }
    }

    #[inline(always)]
    pub fn planar(&self) -> Point<i32> {
        Point::new(self.x, self.y)
    }

    pub fn same_cell(&self, other: &GridCoord) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(layer {}, {}, {})", self.z, self.x, self.y)
    }
}
