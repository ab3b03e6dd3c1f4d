pub mod config;
pub mod history;
pub mod parse;
pub mod run;
pub mod serve;

use anyhow::Context;
use shipgate_core::config::Config;
use std::path::Path;

/// Load the config (or defaults) and apply environment overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Config::resolve(Some(p)).with_context(|| format!("loading {}", p.display())),
        None => Ok(Config::resolve(None)?),
    }
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start tokio runtime")
}
