//! Time series profiler math utilities.

pub mod math;

pub use math::discretize::*;
pub use math::stats::*;
