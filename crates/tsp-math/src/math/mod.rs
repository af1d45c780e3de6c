//! Core math modules.

pub mod discretize;
pub mod stats;
