// The engine and its supporting pieces.

/// Built-in catalog of installable amateur-radio applications.
pub(crate) mod catalog;
/// Loading and validating the run configuration file.
pub(crate) mod config_loading;
/// Sequencing resolve, download, install and post-install across all targets.
pub(crate) mod orchestrator;
/// Post-install configuration hooks, including the INI settings writer.
pub(crate) mod post_install;
/// The explicit per-run context: log, cancellation and dry-run flag.
pub(crate) mod run_context;
/// Catalog + configuration + command-line flags into the ordered target list.
pub(crate) mod target_selection;
pub(crate) mod utilities;
