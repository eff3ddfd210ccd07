/// Planar position. The router uses `Point<i32>` for grid cells; index 0 is x
/// and index 1 is y, which lines up with the horizontal/vertical direction
/// indices of the routing layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T: Copy> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    #[inline(always)]
    pub fn get(&self, dimension: usize) -> T {
        if dimension == 0 { self.x } else { self.y }
    }

    #[inline(always)]
    pub fn get_mut(&mut self, dimension: usize) -> &mut T {
        if dimension == 0 { &mut self.x } else { &mut self.y }
    }
}

impl Point<i32> {
    pub fn manhattan(&self, other: &Point<i32>) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}
