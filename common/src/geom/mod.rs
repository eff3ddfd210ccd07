pub mod coord;
pub mod interval;
pub mod point;
pub mod rect;
