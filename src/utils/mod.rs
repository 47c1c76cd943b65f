//! Logging and test helpers shared across the crate.

pub mod log;
pub mod test_utils;
