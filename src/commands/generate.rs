// src/commands/generate.rs
// Writes a sample run configuration for a new station, so a first-time user has a
// working file to edit instead of starting from a blank page.

use crate::libs::utilities::path_helpers::expand_path;
use crate::{log_debug, log_info, log_warn};
use anyhow::Context;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_OUTPUT: &str = "hamshack.json";

/// The sample configuration. Every section is optional; the values shown for
/// `network` and `run` are the defaults.
const CONFIG_TEMPLATE: &str = r#"{
  "operator": {
    "callsign": "N0CALL",
    "name": "Your Name",
    "email": "you@example.org"
  },
  "station": {
    "serial_port": "auto",
    "locator": "FN31pr"
  },
  "logging": {
    "directory": "~/hamshack/logs",
    "debug": false
  },
  "network": {
    "fetch_timeout_secs": 60,
    "download_timeout_secs": 1800,
    "retries": 2
  },
  "run": {
    "installer_timeout_secs": 3600
  },
  "applications": {
    "flmsg": { "enabled": true },
    "fldigi": {
      "ini": {
        "path": "~/fldigi.files/fldigi_def.xml.ini",
        "section": "FLDIGI",
        "values": { "MYCALL": "{callsign}", "MYLOC": "{locator}", "MYNAME": "{name}" }
      }
    }
  },
  "targets": [
    {
      "name": "my-logger",
      "description": "A logger from a vendor not in the built-in catalog",
      "default_enabled": false,
      "url": "https://example.org/downloads/logger-2.1-setup.exe",
      "installer": "inno"
    }
  ]
}
"#;

/// Main entry point for the `generate` command.
///
/// An existing file is never overwritten; the command logs a warning and leaves it
/// untouched instead.
pub fn run(output: Option<PathBuf>) -> anyhow::Result<()> {
    let path = output
        .map(|p| expand_path(&p.to_string_lossy()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    log_debug!("[Generate] Target file: {}", path.display());
    write_template(&path)
}

fn write_template(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        log_warn!(
            "[Generate] {} already exists. Leaving it untouched.",
            path.display().to_string().yellow()
        );
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log_info!(
        "[Generate] Wrote sample configuration to {}",
        path.display().to_string().green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::target_selection::{SelectionFlags, build_target_list};
    use crate::schemas::config::AppConfig;

    #[test]
    fn template_is_a_valid_config() {
        let config: AppConfig = serde_json::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.operator.callsign.as_deref(), Some("N0CALL"));
        let selected = build_target_list(&config, &SelectionFlags::default()).unwrap();
        let names: Vec<&str> = selected.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["fldigi", "flrig", "flmsg", "wsjtx"]);
        assert!(selected[0].post_install_config.is_some());
    }

    #[test]
    fn never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs/hamshack.json");
        write_template(&path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("N0CALL"));

        fs::write(&path, "{}").unwrap();
        write_template(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }
}
