use crate::log_debug;
use crate::libs::utilities::path_helpers::expand_path;
use crate::schemas::config::{AppConfig, is_valid_locator};
use crate::schemas::errors::RunError;
use colored::Colorize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Loads and validates the run configuration.
///
/// The format follows the file extension: `.yaml` / `.yml` are parsed as YAML, anything
/// else as JSON. Absent sections take their defaults; unknown fields are ignored.
///
/// # Arguments
/// * `path`: Path to the configuration file, as given on the command line. `~` and
///   environment variables are expanded.
///
/// # Returns
/// * `Ok(AppConfig)` with every default applied.
/// * `Err(RunError::ConfigLoad)` when the file is unreadable, malformed, carries an
///   invalid station locator, or defines a bad or duplicate target.
pub fn load_app_config(path: &Path) -> Result<AppConfig, RunError> {
    let path = expand_path(&path.to_string_lossy());
    let fail = |reason: String| RunError::ConfigLoad {
        path: path.clone(),
        reason,
    };

    log_debug!("Loading configuration from {}", path.display().to_string().cyan());
    let contents = fs::read_to_string(&path).map_err(|e| fail(e.to_string()))?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let config: AppConfig = if is_yaml {
        // An empty YAML document means "all defaults".
        if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|e| fail(format!("invalid YAML: {e}")))?
        }
    } else {
        serde_json::from_str(&contents).map_err(|e| fail(format!("invalid JSON: {e}")))?
    };

    validate(&config).map_err(fail)?;
    log_debug!(
        "Configuration loaded: {} application block(s), {} custom target(s)",
        config.applications.len(),
        config.targets.len()
    );
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), String> {
    if let Some(locator) = config.station.locator.literal() {
        if !is_valid_locator(locator) {
            return Err(format!("'{locator}' is not a Maidenhead locator"));
        }
    }
    if config.network.fetch_timeout_secs == 0 || config.network.download_timeout_secs == 0 {
        return Err("network timeouts must be greater than zero".to_string());
    }
    if config.run.installer_timeout_secs == 0 {
        return Err("run.installer_timeout_secs must be greater than zero".to_string());
    }
    // Custom targets are checked here so a broken definition is reported against the file.
    let mut names = BTreeSet::new();
    for definition in &config.targets {
        let target = definition.clone().into_target()?;
        if !names.insert(target.name.clone()) {
            return Err(format!("target '{}' is defined more than once", target.name));
        }
    }
    Ok(())
}
