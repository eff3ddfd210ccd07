/// Closed integer interval `[low, high]`.
///
/// Unset intervals are modelled as `Option<Interval<T>>`; a constructed
/// interval always satisfies `low <= high` unless built with [`Interval::raw`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval<T> {
    pub low: T,
    pub high: T,
}

impl<T: Copy + Ord> Interval<T> {
    pub fn point(value: T) -> Self {
        Self {
            low: value,
            high: value,
        }
    }

    pub fn raw(low: T, high: T) -> Self {
        Self { low, high }
    }

    pub fn is_valid(&self) -> bool {
        self.low <= self.high
    }

    pub fn contains(&self, value: T) -> bool {
        self.low <= value && value <= self.high
    }

    pub fn update(&mut self, value: T) {
        self.low = self.low.min(value);
        self.high = self.high.max(value);
    }

    /// Grows `slot` to cover `value`, starting a new interval when unset.
    pub fn include(slot: &mut Option<Self>, value: T) {
        match slot {
            Some(interval) => interval.update(value),
            None => *slot = Some(Self::point(value)),
        }
    }
}

impl Interval<i32> {
    pub fn range(&self) -> i32 {
        self.high - self.low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_starts_and_grows() {
        let mut slot: Option<Interval<i32>> = None;
        Interval::include(&mut slot, 5);
        Interval::include(&mut slot, 2);
        Interval::include(&mut slot, 9);
        let interval = slot.unwrap();
        assert_eq!((interval.low, interval.high), (2, 9));
        assert_eq!(interval.range(), 7);
        assert!(interval.contains(5));
        assert!(!interval.contains(10));
    }

    #[test]
    fn raw_interval_can_be_invalid() {
        assert!(!Interval::raw(3usize, 1).is_valid());
        assert!(Interval::point(3usize).is_valid());
    }
}
