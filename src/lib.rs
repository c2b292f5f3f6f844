//! itpcat: catalog of interactive theorem prover libraries, classified by MSC
//!
//! Layers:
//! - `domain`: taxonomy entities, package aggregation, disclosure tree
//! - `application`: catalog loading and the interactive widget
//! - `infrastructure`: filesystem, selector and render surface implementations
//! - `cli`: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
