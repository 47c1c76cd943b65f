//! Intcode library.
//!
//! Provides an Intcode interpreter with a suspend/resume execution model,
//! pluggable input/output channels and threaded multi-machine pipelines.

pub mod utils;
pub mod virtual_machine;
