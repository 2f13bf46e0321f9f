// This file contains the primary logic for the `hamshack run` command.
// It loads the configuration, opens the run log, selects the targets and hands
// them to the orchestrator, then turns the run summary into the process exit code.

use crate::cli::cmd_enums::RunArgs;
use crate::installers::http::UreqClient;
use crate::installers::runner::ProcessRunner;
use crate::libs::config_loading::load_app_config;
use crate::libs::orchestrator::{Orchestrator, OrchestratorSettings};
use crate::libs::run_context::{CancelToken, RunContext};
use crate::libs::target_selection::{SelectionFlags, build_target_list};
use crate::libs::utilities::path_helpers::{default_log_dir, expand_path};
use crate::logger::{self, RunLog};
use crate::{log_debug, log_info, log_warn, run_info};
use anyhow::Context;
use colored::Colorize;
use std::process::ExitCode;

/// Main entry point for the `run` command.
///
/// # Returns
/// * `Ok(ExitCode::SUCCESS)` when every selected target succeeded (or was skipped).
/// * `Ok(ExitCode::from(1))` when at least one target failed.
/// * `Err(_)` for run-level failures (configuration, selection, scratch directory),
///   which stop the run before any target is processed.
pub fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    log_debug!("Entered run::run() with {:?}", args);

    let config = load_app_config(&args.config)?;
    let debug = config.logging.debug || logger::is_debug_enabled();

    let log_dir = args
        .log_dir
        .clone()
        .or_else(|| config.logging.directory.as_deref().map(expand_path))
        .unwrap_or_else(default_log_dir);
    let log = match RunLog::create(&log_dir, debug) {
        Ok(log) => log,
        Err(e) => {
            log_warn!(
                "Could not open a run log in {}: {}. Logging to the console only.",
                log_dir.display(),
                e
            );
            RunLog::console_only(debug)
        }
    };

    let flags = SelectionFlags {
        all: args.all,
        with: args.with.clone(),
        without: args.without.clone(),
    };
    let targets = build_target_list(&config, &flags)?;
    if targets.is_empty() {
        log_info!("No applications selected. Nothing to do.");
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancelToken::default();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_token.cancel();
        log_warn!("Interrupt received, stopping after the current step...");
    }) {
        log_warn!("Could not install the Ctrl-C handler: {}", e);
    }

    let ctx = RunContext::new(log, cancel).with_dry_run(args.dry_run);
    if let Some(path) = ctx.log.path() {
        log_info!("Run log: {}", path.display().to_string().cyan());
    }
    run_info!(
        ctx.log,
        "Selected: {}",
        targets.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
    );

    let http = UreqClient::new(&config.network);
    let runner = ProcessRunner::default();
    let orchestrator = Orchestrator::new(&http, &runner, OrchestratorSettings::from_config(&config));
    let summary = orchestrator
        .run(&ctx, &targets, &config)
        .context("run aborted")?;

    Ok(ExitCode::from(summary.exit_code()))
}
