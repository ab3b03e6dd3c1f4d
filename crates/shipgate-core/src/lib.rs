pub mod approval;
pub mod audit;
pub mod command;
pub mod config;
pub mod error;
pub mod io;
pub mod orchestrator;
pub mod outcome;
pub mod reply;
pub mod resolver;
pub mod systems;
pub mod types;

#[cfg(test)]
mod testkit;

pub use error::{Result, ShipgateError};
