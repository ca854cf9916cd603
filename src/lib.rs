#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![allow(clippy::module_name_repetitions)]

//! Compiles log forwarder specifications into vector pipeline configuration.
//!
//! A [`config::ForwarderSpec`] names inputs, outputs and the pipelines
//! connecting them. [`generate::compile`] turns each referenced output into
//! the transforms and sink it needs and returns a validated
//! [`element::Document`] whose `Display` is the TOML configuration.

#[macro_use]
extern crate tracing;

pub mod cli;
pub mod config;
pub mod element;
pub mod generate;
pub mod graph;
pub mod preview;
pub mod sinks;
pub mod templating;
pub mod trace;
pub mod transforms;

pub use generate::{CompileError, compile, compile_with};

pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
