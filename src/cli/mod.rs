//! Command-line interface for recast
//!
//! The CLI drives the library against synthetic customer records so batch
//! sizing and conversion behaviour can be inspected on a real machine.

pub mod commands;
pub mod demo;
mod output;

pub use commands::Cli;
pub use output::Output;
