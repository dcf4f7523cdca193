//! Common functionality for besched, a rolling-horizon scheduler for building energy systems.
#![warn(missing_docs)]
pub mod cli;
pub mod device;
pub mod forecast;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod schedule;
pub mod settings;
pub mod simulation;
pub mod units;

#[cfg(test)]
mod fixture;
