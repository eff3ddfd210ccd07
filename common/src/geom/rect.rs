use super::point::Point;

/// Inclusive bounding box over grid cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridRect {
    pub min: Point<i32>,
    pub max: Point<i32>,
}

impl GridRect {
    pub fn new(min: Point<i32>, max: Point<i32>) -> Self {
        Self { min, max }
    }

    pub fn from_points<I: IntoIterator<Item = Point<i32>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Self::new(first, first);
        for p in iter {
            rect.min.x = rect.min.x.min(p.x);
            rect.min.y = rect.min.y.min(p.y);
            rect.max.x = rect.max.x.max(p.x);
            rect.max.y = rect.max.y.max(p.y);
        }
        Some(rect)
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }
    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    pub fn cx(&self) -> i32 {
        (self.min.x + self.max.x) / 2
    }
    pub fn cy(&self) -> i32 {
        (self.min.y + self.max.y) / 2
    }

    pub fn half_perimeter(&self) -> i32 {
        self.width() + self.height()
    }

    pub fn overlaps_x(&self, other: &GridRect) -> bool {
        self.min.x <= other.max.x && other.min.x <= self.max.x
    }

    pub fn expanded(&self, margin: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min: Point::new((self.min.x - margin).max(0), (self.min.y - margin).max(0)),
            max: Point::new((self.max.x + margin).min(max_x), (self.max.y + margin).min(max_y)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_of_points() {
        let rect = GridRect::from_points([Point::new(3, 1), Point::new(0, 4), Point::new(2, 2)])
            .unwrap();
        assert_eq!(rect.min, Point::new(0, 1));
        assert_eq!(rect.max, Point::new(3, 4));
        assert_eq!(rect.cx(), 1);
        assert_eq!(rect.cy(), 2);
        assert_eq!(rect.half_perimeter(), 6);
        assert!(GridRect::from_points(std::iter::empty()).is_none());
    }
}
