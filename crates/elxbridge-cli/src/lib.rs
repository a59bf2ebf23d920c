//! elxbridge CLI library.
//!
//! Command implementations, configuration loading and logging setup for the
//! `elxbridge` binary.

pub mod commands;
pub mod config;
pub mod logging;
