use aztrack_core::config::CONFIG_FILE;
use std::path::{Path, PathBuf};

/// Resolve the config file path.
///
/// Priority:
/// 1. `--config` flag / `AZTRACK_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.aztrack.yaml`
/// 3. Walk upward from `cwd` looking for `.git/`, and use `.aztrack.yaml` there
/// 4. Fall back to `cwd/.aztrack.yaml`
pub fn resolve_config(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_from(&cwd)
}

fn resolve_from(start: &Path) -> PathBuf {
    if let Some(dir) = find_upward(start, |d| d.join(CONFIG_FILE).is_file()) {
        return dir.join(CONFIG_FILE);
    }
    if let Some(dir) = find_upward(start, |d| d.join(".git").is_dir()) {
        return dir.join(CONFIG_FILE);
    }
    start.join(CONFIG_FILE)
}

fn find_upward(start: &Path, found: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    start.ancestors().find(|d| found(d)).map(Path::to_path_buf)
}
