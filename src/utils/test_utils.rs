//! Test utilities for running Intcode programs.
