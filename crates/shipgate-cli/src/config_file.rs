use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "shipgate.yaml";

/// Locate the config file.
///
/// Priority:
/// 1. `--config` flag / `SHIPGATE_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `shipgate.yaml`
/// 3. None: run on defaults plus environment overrides
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    let cwd = std::env::current_dir().ok()?;
    find_upward(&cwd)
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}
