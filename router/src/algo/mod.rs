pub mod maze;
pub mod rsmt;
