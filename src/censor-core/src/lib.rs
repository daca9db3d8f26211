//! Censor Core Library
//!
//! Configuration and logging shared by the `censor` binary.

pub mod colored_logger;
pub mod config;
