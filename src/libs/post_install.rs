// Post-install configuration: the hook the orchestrator calls after a successful
// install, and the built-in INI writer that most amateur-radio applications need
// (callsign, locator, CAT port, licence key written into the app's own settings file).

use crate::libs::run_context::RunContext;
use crate::libs::utilities::path_helpers::expand_path;
use crate::{run_info, run_warn};
use crate::schemas::config::{AppConfig, IniBlock};
use crate::schemas::errors::PostConfigError;
use crate::schemas::targets::InstallTarget;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid"));

/// A configuration step run once after a target installs successfully.
///
/// Implementations are supplied by the caller and only invoked by the engine. A
/// returned error is logged as a warning; the install itself still counts as a success.
pub trait PostInstallConfig {
    fn apply(
        &self,
        target: &InstallTarget,
        config: &AppConfig,
        ctx: &RunContext,
    ) -> Result<(), PostConfigError>;
}

impl<F> PostInstallConfig for F
where
    F: Fn(&InstallTarget, &AppConfig) -> Result<(), PostConfigError>,
{
    fn apply(
        &self,
        target: &InstallTarget,
        config: &AppConfig,
        _ctx: &RunContext,
    ) -> Result<(), PostConfigError> {
        self(target, config)
    }
}

/// Writes `key=value` lines into one section of an INI file.
///
/// Values are templates: `{callsign}`, `{name}`, `{email}`, `{locator}`,
/// `{serial_port}`, `{license_key}`, plus any key from the application's `settings`
/// map. A value whose placeholder has no value (e.g. `{serial_port}` while the station
/// says `auto`) is skipped with a warning.
#[derive(Debug, Clone)]
pub struct IniSettings {
    pub path: PathBuf,
    pub section: String,
    pub values: BTreeMap<String, String>,
}

impl IniSettings {
    pub fn from_block(block: &IniBlock) -> Self {
        IniSettings {
            path: expand_path(&block.path),
            section: block.section.clone(),
            values: block.values.clone(),
        }
    }
}

/// Builds the placeholder table for one target. Every known placeholder is present;
/// `None` means "known but currently without a value".
fn placeholder_values(target: &InstallTarget, config: &AppConfig) -> BTreeMap<String, Option<String>> {
    let app = config.applications.get(&target.name);
    let mut values = BTreeMap::from([
        ("callsign".to_string(), config.operator.callsign.clone()),
        ("name".to_string(), config.operator.name.clone()),
        ("email".to_string(), config.operator.email.clone()),
        (
            "locator".to_string(),
            config.station.locator.literal().map(str::to_string),
        ),
        (
            "serial_port".to_string(),
            config.station.serial_port.literal().map(str::to_string),
        ),
        (
            "license_key".to_string(),
            app.and_then(|a| a.license_key.clone()),
        ),
    ]);
    if let Some(app) = app {
        for (key, value) in &app.settings {
            values.insert(key.clone(), Some(value.clone()));
        }
    }
    values
}

/// Substitutes placeholders in `template`.
///
/// # Returns
/// * `Ok(Some(rendered))` when every placeholder had a value.
/// * `Ok(None)` when a known placeholder has no value; the caller skips the key.
/// * `Err(UnknownPlaceholder)` for a placeholder nobody defines.
fn render(
    key: &str,
    template: &str,
    values: &BTreeMap<String, Option<String>>,
) -> Result<Option<String>, PostConfigError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = match values.get(name.as_str()) {
            Some(Some(value)) => value,
            Some(None) => return Ok(None),
            None => {
                return Err(PostConfigError::UnknownPlaceholder {
                    key: key.to_string(),
                    placeholder: name.as_str().to_string(),
                });
            }
        };
        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(value);
        last = whole.end();
    }
    rendered.push_str(&template[last..]);
    Ok(Some(rendered))
}

fn is_section_header(line: &str) -> bool {
    let line = line.trim();
    line.starts_with('[') && line.ends_with(']')
}

fn line_key(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with(';') || line.starts_with('#') {
        return None;
    }
    line.split_once('=').map(|(key, _)| key.trim())
}

/// Sets `key=value` inside `[section]`, replacing an existing assignment of the same key
/// (case-insensitive) or appending after the section's last non-blank line. A missing
/// section is appended at the end of the file.
pub fn set_ini_value(lines: &mut Vec<String>, section: &str, key: &str, value: &str) {
    let header = format!("[{section}]");
    let Some(start) = lines
        .iter()
        .position(|l| l.trim().eq_ignore_ascii_case(&header))
    else {
        if lines.last().is_some_and(|l| !l.trim().is_empty()) {
            lines.push(String::new());
        }
        lines.push(header);
        lines.push(format!("{key}={value}"));
        return;
    };

    let end = lines[start + 1..]
        .iter()
        .position(|l| is_section_header(l))
        .map_or(lines.len(), |offset| start + 1 + offset);

    for line in &mut lines[start + 1..end] {
        if let Some(existing) = line_key(line) {
            if existing.eq_ignore_ascii_case(key) {
                *line = format!("{existing}={value}");
                return;
            }
        }
    }

    let insert_at = (start + 1..end)
        .rev()
        .find(|&i| !lines[i].trim().is_empty())
        .map_or(start + 1, |i| i + 1);
    lines.insert(insert_at, format!("{key}={value}"));
}

impl PostInstallConfig for IniSettings {
    fn apply(
        &self,
        target: &InstallTarget,
        config: &AppConfig,
        ctx: &RunContext,
    ) -> Result<(), PostConfigError> {
        let placeholders = placeholder_values(target, config);

        let mut rendered = Vec::new();
        for (key, template) in &self.values {
            match render(key, template, &placeholders)? {
                Some(value) => rendered.push((key, value)),
                None => run_warn!(
                    ctx.log,
                    "[{}] Skipping '{}' in {}: its value is not available",
                    target.name,
                    key,
                    self.path.display()
                ),
            }
        }
        if rendered.is_empty() {
            return Ok(());
        }

        let io_error = |source: io::Error| PostConfigError::Io {
            path: self.path.clone(),
            source,
        };
        let existing = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(io_error(e)),
        };
        let newline = if existing.contains("\r\n") { "\r\n" } else { "\n" };
        let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();

        for (key, value) in &rendered {
            set_ini_value(&mut lines, &self.section, key, value);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let mut contents = lines.join(newline);
        contents.push_str(newline);
        fs::write(&self.path, contents).map_err(io_error)?;

        run_info!(
            ctx.log,
            "[{}] Wrote {} setting(s) to [{}] in {}",
            target.name,
            rendered.len(),
            self.section,
            self.path.display()
        );
        Ok(())
    }
}
