// `hamshack list`: prints every known application as a table.

use crate::libs::config_loading::load_app_config;
use crate::libs::target_selection::known_targets;
use crate::schemas::config::AppConfig;
use crate::schemas::targets::InstallTarget;
use crate::log_debug;
use prettytable::{Cell, Row, Table};
use std::path::PathBuf;

pub fn run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => load_app_config(&path)?,
        None => AppConfig::default(),
    };
    let targets = known_targets(&config)?;
    log_debug!("[List] {} known target(s)", targets.len());
    targets_table(&targets, &config).printstd();
    Ok(())
}

/// One row per target: name, default selection, installer type, source and description.
fn targets_table(targets: &[InstallTarget], config: &AppConfig) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::new(
        ["Name", "Selected", "Installer", "Source", "Description"]
            .iter()
            .map(|title| Cell::new(title).style_spec("b"))
            .collect(),
    ));
    for target in targets {
        let selected = config
            .applications
            .get(&target.name)
            .and_then(|app| app.enabled)
            .unwrap_or(target.default_enabled);
        table.add_row(Row::new(vec![
            Cell::new(&target.name),
            Cell::new(if selected { "yes" } else { "no" })
                .style_spec(if selected { "Fg" } else { "" }),
            Cell::new(&target.silent_args.to_string()),
            Cell::new(&target.source.to_string()),
            Cell::new(&target.description),
        ]));
    }
    table
}
