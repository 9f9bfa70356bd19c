#![allow(dead_code)]
//! Shared test utilities for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: ILCD data set builders (flows, processes, LCIA methods)
//! - `helpers`: zip package and working directory helpers

pub mod fixtures;
pub mod helpers;

pub use fixtures::{exchange, factor, flow, lcia_method, process, MAPPING_CSV};
pub use helpers::{read_package, write_package, Workdir};
