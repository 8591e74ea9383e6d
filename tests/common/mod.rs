pub mod computes;

pub use computes::*;
