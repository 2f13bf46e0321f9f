// Turns the built-in catalog, the configuration file and the command-line selection
// flags into the ordered list of targets for one run.

use crate::libs::catalog::builtin_targets;
use crate::libs::post_install::IniSettings;
use crate::log_warn;
use crate::schemas::config::AppConfig;
use crate::schemas::errors::RunError;
use crate::schemas::targets::InstallTarget;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Selection switches from `hamshack run`.
#[derive(Debug, Clone, Default)]
pub struct SelectionFlags {
    /// Select every known target.
    pub all: bool,
    /// Force these targets on.
    pub with: Vec<String>,
    /// Force these targets off; wins over `all`.
    pub without: Vec<String>,
}

/// Every known target: the catalog with config-defined targets merged in. A config
/// target with a catalog name replaces that entry in place; new names are appended in
/// file order.
///
/// Configurations read from disk have already had their targets checked by
/// `load_app_config`; the checks here cover configs assembled in code.
pub fn known_targets(config: &AppConfig) -> Result<Vec<InstallTarget>, RunError> {
    let mut targets = builtin_targets();
    let mut seen_in_config = BTreeSet::new();

    for definition in &config.targets {
        let target = definition
            .clone()
            .into_target()
            .map_err(RunError::InvalidSelection)?;
        if !seen_in_config.insert(target.name.clone()) {
            return Err(RunError::InvalidSelection(format!(
                "target '{}' is defined more than once",
                target.name
            )));
        }
        match targets.iter_mut().find(|t| t.name == target.name) {
            Some(existing) => *existing = target,
            None => targets.push(target),
        }
    }
    Ok(targets)
}

/// Builds the ordered list of targets to process.
///
/// A target is selected when `--all` is given, or when its `applications.<name>.enabled`
/// flag (falling back to the target's default) says so. `--with` forces a target on and
/// `--without` forces it off. Naming an unknown target in either flag, or the same
/// target in both, is an error.
///
/// Selected targets with an `applications.<name>.ini` block get an [`IniSettings`]
/// post-install step.
pub fn build_target_list(
    config: &AppConfig,
    flags: &SelectionFlags,
) -> Result<Vec<InstallTarget>, RunError> {
    let targets = known_targets(config)?;
    let known: BTreeSet<&str> = targets.iter().map(|t| t.name.as_str()).collect();

    for name in flags.with.iter().chain(&flags.without) {
        if !known.contains(name.as_str()) {
            return Err(RunError::InvalidSelection(format!(
                "unknown target '{}' (known: {})",
                name,
                known.iter().copied().collect::<Vec<_>>().join(", ")
            )));
        }
    }
    if let Some(name) = flags.with.iter().find(|n| flags.without.contains(n)) {
        return Err(RunError::InvalidSelection(format!(
            "target '{name}' is both included and excluded"
        )));
    }
    for name in config.applications.keys() {
        if !known.contains(name.as_str()) {
            log_warn!("Settings for unknown application '{}' are ignored", name);
        }
    }

    let selected = targets
        .into_iter()
        .filter(|target| {
            let name = &target.name;
            if flags.without.contains(name) {
                return false;
            }
            if flags.all || flags.with.contains(name) {
                return true;
            }
            config
                .applications
                .get(name)
                .and_then(|app| app.enabled)
                .unwrap_or(target.default_enabled)
        })
        .map(|target| match config.applications.get(&target.name).and_then(|a| a.ini.as_ref()) {
            Some(block) if target.post_install_config.is_none() => {
                target.with_post_install(Arc::new(IniSettings::from_block(block)))
            }
            _ => target,
        })
        .collect();
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::config::{ApplicationSettings, IniBlock};
    use crate::schemas::targets::{SilentSwitches, TargetDefinition, TargetSource};

    fn names(targets: &[InstallTarget]) -> Vec<&str> {
        targets.iter().map(|t| t.name.as_str()).collect()
    }

    fn flags(all: bool, with: &[&str], without: &[&str]) -> SelectionFlags {
        SelectionFlags {
            all,
            with: with.iter().map(|s| s.to_string()).collect(),
            without: without.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn definition(name: &str, url: &str) -> TargetDefinition {
        TargetDefinition {
            name: name.into(),
            description: String::new(),
            default_enabled: true,
            url: Some(url.into()),
            listing: None,
            github: None,
            pattern: None,
            installer: SilentSwitches::Msi,
            acceptable_exit_codes: vec![3010],
            detect_path: None,
            sha256: None,
        }
    }

    #[test]
    fn defaults_follow_catalog_order() {
        let selected = build_target_list(&AppConfig::default(), &SelectionFlags::default()).unwrap();
        assert_eq!(names(&selected), ["fldigi", "flrig", "wsjtx"]);
    }

    #[test]
    fn config_and_flags_adjust_the_selection() {
        let mut config = AppConfig::default();
        config.applications.insert(
            "flrig".into(),
            ApplicationSettings {
                enabled: Some(false),
                ..Default::default()
            },
        );
        config.applications.insert(
            "qlog".into(),
            ApplicationSettings {
                enabled: Some(true),
                ..Default::default()
            },
        );

        let selected = build_target_list(&config, &flags(false, &["flmsg"], &["wsjtx"])).unwrap();
        assert_eq!(names(&selected), ["fldigi", "flmsg", "qlog"]);

        let everything = build_target_list(&config, &flags(true, &[], &["echolink"])).unwrap();
        assert_eq!(everything.len(), builtin_targets().len() - 1);
    }

    #[test]
    fn config_targets_override_or_extend_the_catalog() {
        let mut config = AppConfig::default();
        config.targets = vec![
            definition("fldigi", "https://mirror.test/fldigi-4.2.05_x64-setup.exe"),
            definition("my-logger", "https://example.test/logger.msi"),
        ];
        let selected = build_target_list(&config, &SelectionFlags::default()).unwrap();
        assert_eq!(names(&selected), ["fldigi", "flrig", "wsjtx", "my-logger"]);
        assert!(matches!(selected[0].source, TargetSource::Direct { .. }));

        config.targets.push(definition("my-logger", "https://example.test/other.msi"));
        assert!(matches!(
            build_target_list(&config, &SelectionFlags::default()),
            Err(RunError::InvalidSelection(_))
        ));
    }

    #[test]
    fn bad_flags_are_rejected() {
        let config = AppConfig::default();
        assert!(build_target_list(&config, &flags(false, &["nonesuch"], &[])).is_err());
        assert!(build_target_list(&config, &flags(false, &[], &["nonesuch"])).is_err());
        assert!(build_target_list(&config, &flags(false, &["flmsg"], &["flmsg"])).is_err());
    }

    #[test]
    fn ini_blocks_become_post_install_steps() {
        let mut config = AppConfig::default();
        config.applications.insert(
            "fldigi".into(),
            ApplicationSettings {
                ini: Some(IniBlock {
                    path: "~/fldigi.files/fldigi_def.ini".into(),
                    section: "FLDIGI".into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let selected = build_target_list(&config, &SelectionFlags::default()).unwrap();
        assert!(selected[0].post_install_config.is_some());
        assert!(selected[1].post_install_config.is_none());
    }
}
