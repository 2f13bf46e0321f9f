//! # Run Configuration Schema
//!
//! Typed form of the configuration file handed to `hamshack run --config`.
//! Every section is optional; absent fields fall back to the defaults documented on
//! each struct instead of silently becoming null.
//!
//! ```json
//! {
//!   "operator": { "callsign": "N0CALL", "name": "Pat" },
//!   "station": { "serial_port": "COM4", "locator": "auto" },
//!   "logging": { "directory": "~/hamshack/logs" },
//!   "network": { "retries": 3 },
//!   "applications": {
//!     "vara-hf": {
//!       "license_key": "XXXX-XXXX",
//!       "ini": { "path": "C:/VARA/VARA.ini", "section": "Setup",
//!                "values": { "Registration Key": "{license_key}" } }
//!     }
//!   }
//! }
//! ```
//!
//! The `applications` blocks are consumed only by post-install configurators,
//! never by the install engine itself.

use crate::schemas::targets::TargetDefinition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub operator: OperatorConfig,
    pub station: StationConfig,
    pub logging: LoggingConfig,
    pub network: NetworkConfig,
    pub run: RunSettings,
    /// Per-application settings blocks keyed by target name.
    pub applications: BTreeMap<String, ApplicationSettings>,
    /// Additional targets, or overrides of built-in catalog entries with the same name.
    pub targets: Vec<TargetDefinition>,
}

/// Operator identity fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    pub callsign: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Station hardware and location selectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Radio CAT/PTT serial port, e.g. `COM4`, or `auto`.
    pub serial_port: Selector,
    /// Maidenhead grid locator, e.g. `FN31pr`, or `auto`.
    pub locator: Selector,
}

/// A literal value, or the sentinel `"auto"` meaning "detect at install time".
///
/// Device and GPS detection live outside this tool, so `Auto` resolves to nothing and
/// configurators skip the settings that depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selector {
    #[default]
    Auto,
    Literal(String),
}

impl Selector {
    pub fn literal(&self) -> Option<&str> {
        match self {
            Selector::Auto => None,
            Selector::Literal(value) => Some(value.as_str()),
        }
    }
}

impl From<String> for Selector {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            Selector::Auto
        } else {
            Selector::Literal(trimmed.to_string())
        }
    }
}

impl From<Selector> for String {
    fn from(value: Selector) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Selector::Auto => write!(f, "auto"),
            Selector::Literal(value) => write!(f, "{value}"),
        }
    }
}

/// Where and how verbosely the run log is written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log directory. Defaults to `<local data dir>/hamshack/logs`.
    pub directory: Option<String>,
    /// Record DEBUG lines in the run log.
    pub debug: bool,
}

/// HTTP behaviour for listing fetches and downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Timeout for fetching a listing page or release API document. Default 60.
    pub fetch_timeout_secs: u64,
    /// Timeout for downloading one installer artifact. Default 1800.
    pub download_timeout_secs: u64,
    /// Extra attempts after a network failure, per step. Default 2.
    pub retries: u32,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            fetch_timeout_secs: 60,
            download_timeout_secs: 1800,
            retries: 2,
            user_agent: concat!("hamshack/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Orchestrator knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// How long a single installer may run before it is killed. Default 3600.
    pub installer_timeout_secs: u64,
    /// Parent directory for the per-run scratch directory. Defaults to the system temp dir.
    pub scratch_root: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings {
            installer_timeout_secs: 3600,
            scratch_root: None,
        }
    }
}

/// Settings block for one application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    /// Overrides the target's default-on flag.
    pub enabled: Option<bool>,
    pub license_key: Option<String>,
    /// Free-form values (credentials, ports, ...) available as `{key}` placeholders.
    pub settings: BTreeMap<String, String>,
    pub ini: Option<IniBlock>,
}

/// INI keys written into an application's own config file after installation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IniBlock {
    pub path: String,
    pub section: String,
    pub values: BTreeMap<String, String>,
}

/// Checks a Maidenhead locator of 2, 4, 6 or 8 characters (e.g. `FN`, `FN31`, `FN31pr`,
/// `FN31pr45`). Letters are case-insensitive.
pub fn is_valid_locator(locator: &str) -> bool {
    let chars: Vec<char> = locator.chars().collect();
    if chars.is_empty() || chars.len() > 8 || chars.len() % 2 != 0 {
        return false;
    }
    chars.chunks(2).enumerate().all(|(pair, c)| match pair {
        0 => c.iter().all(|ch| ('A'..='R').contains(&ch.to_ascii_uppercase())),
        2 => c.iter().all(|ch| ('A'..='X').contains(&ch.to_ascii_uppercase())),
        _ => c.iter().all(|ch| ch.is_ascii_digit()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_takes_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.station.serial_port, Selector::Auto);
        assert_eq!(cfg.station.locator, Selector::Auto);
        assert_eq!(cfg.network.fetch_timeout_secs, 60);
        assert_eq!(cfg.network.download_timeout_secs, 1800);
        assert_eq!(cfg.network.retries, 2);
        assert_eq!(cfg.run.installer_timeout_secs, 3600);
        assert!(cfg.network.user_agent.starts_with("hamshack/"));
        assert!(cfg.applications.is_empty());
        assert!(cfg.targets.is_empty());
    }

    #[test]
    fn selectors_parse_auto_and_literals() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{"station": {"serial_port": "COM7", "locator": "AUTO"}, "unknown": 1}"#,
        )
        .unwrap();
        assert_eq!(cfg.station.serial_port.literal(), Some("COM7"));
        assert_eq!(cfg.station.locator, Selector::Auto);
    }

    #[test]
    fn locator_validation() {
        for ok in ["FN", "fn31", "FN31pr", "JO62qm45", "RR99xx"] {
            assert!(is_valid_locator(ok), "{ok} should be valid");
        }
        for bad in ["", "F", "SN31", "FN3", "FNAA", "FN31py", "FN31pr4x", "FN31pr45aa"] {
            assert!(!is_valid_locator(bad), "{bad} should be invalid");
        }
    }
}
