// Path helpers shared by configuration loading, target definitions and logging.

use crate::log_warn;
use std::path::PathBuf;

/// Expands `~` and `$VAR` / `${VAR}` references in a configured path.
///
/// Undefined variables are left as written (with a warning) rather than failing the
/// run, since the path is usually only needed much later by a post-install step.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log_warn!("Could not expand '{}': {}. Using it as written.", path, e);
            PathBuf::from(shellexpand::tilde(path).as_ref())
        }
    }
}

/// Default directory for run logs: `<local data dir>/hamshack/logs`, or `./logs`
/// when the platform has no such directory.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("hamshack").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Turns a target name into something safe to use as a single path component.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "target".to_string()
    } else {
        trimmed.to_string()
    }
}
