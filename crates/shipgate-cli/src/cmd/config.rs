use crate::config_file::CONFIG_FILE;
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use shipgate_core::config::{Config, WarnLevel};
use std::path::{Path, PathBuf};

const MASK: &str = "********";

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective config (file + environment), credentials masked
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Write a config file populated with the defaults
    Init {
        /// Destination file
        #[arg(long, default_value = CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config_path: Option<&Path>, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(config_path, json),
        ConfigSubcommand::Validate => validate(config_path, json),
        ConfigSubcommand::Init { path, force } => init(&path, force),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn masked(mut config: Config) -> Config {
    for secret in [&mut config.release.api_key, &mut config.build.token] {
        if !secret.is_empty() {
            *secret = MASK.to_string();
        }
    }
    config
}

fn show(config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = masked(super::load_config(config_path)?);
    if json {
        return print_json(&config);
    }
    match config_path {
        Some(p) => println!("# {}", p.display()),
        None => println!("# defaults (no {CONFIG_FILE} found)"),
    }
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Config::default()
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masking_hides_only_populated_secrets() {
        let mut config = Config::default();
        config.release.api_key = "API-SECRET".into();
        let shown = masked(config);
        assert_eq!(shown.release.api_key, MASK);
        assert_eq!(shown.build.token, "");
    }
}
