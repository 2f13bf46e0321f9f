// This file is the installer orchestration engine. It walks the ordered target list
// and, for each target, resolves the download URL, downloads the installer into a
// per-run scratch directory, runs it silently and applies any post-install
// configuration. Every target gets exactly one outcome; a failure never stops the run.

// The two seams the engine drives: HTTP for listings and downloads...
use crate::installers::http::HttpClient;
// ...turning a listing into one concrete download URL...
use crate::installers::resolver::{ResolvedVersion, resolve_latest};
// ...and the silent installer process, plus exit-code classification.
use crate::installers::runner::{InstallerRunner, execute};
// Log, cancel token and dry-run flag, shared by every step of the run.
use crate::libs::run_context::RunContext;
// Optional pinned SHA-256 check of the downloaded artifact.
use crate::libs::utilities::checksum::verify_sha256;
// `~` expansion for the scratch root, and file-system-safe names inside it.
use crate::libs::utilities::path_helpers::{expand_path, sanitize_component};
// Human-readable elapsed time for the run footer.
use crate::libs::utilities::timestamps::format_duration;
use crate::schemas::config::AppConfig;
// Per-target errors end up in outcomes; run errors abort the run.
use crate::schemas::errors::{InstallError, RunError};
use crate::schemas::outcome::{InstallOutcome, RunSummary};
use crate::schemas::targets::{InstallTarget, TargetSource};
// Our run-log macros: every line lands in the console and in the run's log file.
use crate::{run_debug, run_error, run_info, run_warn};
use std::fs;
use std::path::{Path, PathBuf};
// Sleeping between retry attempts.
use std::thread;
use std::time::Duration;
// The scratch directory deletes itself when dropped, including during a panic.
use tempfile::TempDir;

/// Orchestrator knobs derived from the configuration file.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Extra attempts after a transient (network) failure, per step.
    pub retries: u32,
    /// How long one installer may run before it is killed.
    pub installer_timeout: Duration,
    /// Parent of the per-run scratch directory; the system temp dir when `None`.
    pub scratch_root: Option<PathBuf>,
    /// Pause between retry attempts.
    pub retry_delay: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        OrchestratorSettings {
            retries: config.network.retries,
            installer_timeout: Duration::from_secs(config.run.installer_timeout_secs),
            scratch_root: config.run.scratch_root.as_deref().map(expand_path),
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Drives the per-target pipeline. Holds only borrowed seams, so tests can hand it
/// in-memory fakes.
pub struct Orchestrator<'a> {
    http: &'a dyn HttpClient,
    runner: &'a dyn InstallerRunner,
    settings: OrchestratorSettings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        runner: &'a dyn InstallerRunner,
        settings: OrchestratorSettings,
    ) -> Self {
        Orchestrator {
            http,
            runner,
            settings,
        }
    }

    /// Processes `targets` strictly in order and returns one outcome per target.
    ///
    /// The scratch directory lives exactly as long as this call: it is removed when the
    /// run finishes, and also when a panic unwinds through it.
    ///
    /// # Errors
    /// Only `RunError::Scratch`, when the scratch directory cannot be created. Every
    /// per-target problem ends up in that target's outcome instead.
    pub fn run(
        &self,
        ctx: &RunContext,
        targets: &[InstallTarget],
        config: &AppConfig,
    ) -> Result<RunSummary, RunError> {
        // Wall-clock start, for the "Run finished in ..." footer.
        let started = chrono::Local::now();
        // The only step that can abort the whole run.
        let scratch = self.create_scratch_dir()?;
        run_info!(
            ctx.log,
            "Starting run: {} target(s), scratch directory {}{}",
            targets.len(),
            scratch.path().display(),
            if ctx.dry_run { " (dry run)" } else { "" }
        );

        let mut summary = RunSummary::default();
        for (index, target) in targets.iter().enumerate() {
            // Once cancelled, the remaining targets are recorded without being touched.
            let outcome = if ctx.cancel.is_cancelled() {
                run_warn!(ctx.log, "[{}] Not started: run was cancelled", target.name);
                InstallOutcome::from_error(&target.name, None, &InstallError::Cancelled)
            } else {
                run_info!(
                    ctx.log,
                    "[{}] ({}/{}) Processing",
                    target.name,
                    index + 1,
                    targets.len()
                );
                self.process_target(ctx, index, target, config, scratch.path())
            };
            summary.record(outcome);
        }

        report(ctx, &summary, chrono::Local::now() - started);

        // Explicit close so a failed removal can at least be logged.
        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            run_warn!(
                ctx.log,
                "Failed to remove scratch directory {}: {}",
                scratch_path.display(),
                e
            );
        }
        Ok(summary)
    }

    /// Creates `hamshack-run-XXXXXX` under the configured root, or the system temp dir.
    fn create_scratch_dir(&self) -> Result<TempDir, RunError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("hamshack-run-");
        let dir = match &self.settings.scratch_root {
            Some(root) => {
                // The root itself is kept; only the per-run directory is removed later.
                fs::create_dir_all(root).map_err(RunError::Scratch)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        };
        dir.map_err(RunError::Scratch)
    }

    /// Runs every step for one target. Never fails: errors become the outcome.
    fn process_target(
        &self,
        ctx: &RunContext,
        index: usize,
        target: &InstallTarget,
        config: &AppConfig,
        scratch: &Path,
    ) -> InstallOutcome {
        // Step 1: skip targets whose detect path shows they are already installed.
        if let Some(detect) = &target.detect_path {
            if detect.exists() {
                run_info!(
                    ctx.log,
                    "[{}] Already installed ({} exists), skipping",
                    target.name,
                    detect.display()
                );
                return InstallOutcome::skipped(
                    &target.name,
                    format!("already installed: {}", detect.display()),
                );
            }
        }

        // Step 2: pin down the exact download URL.
        let resolved = match self.resolve(ctx, target) {
            Ok(resolved) => resolved,
            Err(err) => return self.failed(ctx, target, None, &err),
        };
        run_info!(
            ctx.log,
            "[{}] Resolved {} (version {})",
            target.name,
            resolved.url,
            resolved.version_label.as_deref().unwrap_or("unknown")
        );

        // A dry run stops here: resolved, but nothing downloaded or executed.
        if ctx.dry_run {
            return InstallOutcome::skipped(&target.name, format!("dry run: {}", resolved.url));
        }

        // Step 3: fetch the installer into this target's own scratch subdirectory.
        let artifact = match self.download(ctx, index, target, &resolved, scratch) {
            Ok(artifact) => artifact,
            Err(err) => return self.failed(ctx, target, None, &err),
        };

        // Never start an installer after an interrupt.
        if ctx.cancel.is_cancelled() {
            return self.failed(ctx, target, None, &InstallError::Cancelled);
        }

        // Step 4: run it silently and classify the exit code.
        let invocation = target.silent_args.invocation(&artifact);
        let outcome = execute(
            self.runner,
            ctx,
            &target.name,
            &invocation,
            &target.acceptable_exit_codes,
            self.settings.installer_timeout,
        );

        // Step 5: post-install configuration. Failures here only warn.
        if outcome.succeeded {
            if let Some(post) = &target.post_install_config {
                run_debug!(ctx.log, "[{}] Applying post-install configuration", target.name);
                if let Err(e) = post.apply(target, config, ctx) {
                    run_warn!(ctx.log, "[{}] PostConfigWarning: {}", target.name, e);
                }
            }
        }
        outcome
    }

    fn resolve(
        &self,
        ctx: &RunContext,
        target: &InstallTarget,
    ) -> Result<ResolvedVersion, InstallError> {
        match &target.source {
            // Nothing to fetch, so nothing to retry.
            TargetSource::Direct { url } => ResolvedVersion::from_direct(url, &target.name),
            TargetSource::Listing(listing) => self.with_retries(ctx, &target.name, "resolve", || {
                resolve_latest(ctx, self.http, &target.name, listing)
            }),
        }
    }

    /// Downloads into `<scratch>/<NN>-<name>/<filename>` and verifies the pinned
    /// checksum, if any.
    fn download(
        &self,
        ctx: &RunContext,
        index: usize,
        target: &InstallTarget,
        resolved: &ResolvedVersion,
        scratch: &Path,
    ) -> Result<PathBuf, InstallError> {
        let dir = scratch.join(format!("{:02}-{}", index + 1, sanitize_component(&target.name)));
        fs::create_dir_all(&dir).map_err(|source| InstallError::Io {
            context: format!("failed to create {}", dir.display()),
            source,
        })?;
        // Vendor file names come from the network; never trust them as path components.
        let artifact = dir.join(sanitize_component(&resolved.filename));

        // The cancel token goes all the way down, so Ctrl-C interrupts the transfer itself.
        let bytes = self.with_retries(ctx, &target.name, "download", || {
            self.http.download(&resolved.url, &artifact, &ctx.cancel)
        })?;
        run_info!(
            ctx.log,
            "[{}] Downloaded {} ({} bytes)",
            target.name,
            artifact.display(),
            bytes
        );

        // Only targets with a pinned digest are verified.
        if let Some(expected) = &target.sha256 {
            verify_sha256(&artifact, expected)?;
            run_debug!(ctx.log, "[{}] Checksum verified", target.name);
        }
        Ok(artifact)
    }

    /// Retries `step` after transient failures, up to `settings.retries` extra attempts.
    /// Cancellation stops further attempts.
    fn with_retries<T>(
        &self,
        ctx: &RunContext,
        target_name: &str,
        step: &str,
        mut attempt: impl FnMut() -> Result<T, InstallError>,
    ) -> Result<T, InstallError> {
        // Extra attempts made so far; the first attempt does not count.
        let mut tries = 0;
        loop {
            match attempt() {
                Ok(value) => return Ok(value),
                // Only `FetchError` qualifies; everything else would fail the same way again.
                Err(err) if err.is_transient() && tries < self.settings.retries => {
                    tries += 1;
                    run_warn!(
                        ctx.log,
                        "[{}] {} failed ({}), retrying ({}/{})",
                        target_name,
                        step,
                        err,
                        tries,
                        self.settings.retries
                    );
                    // Don't sleep through an interrupt.
                    if ctx.cancel.is_cancelled() {
                        return Err(InstallError::Cancelled);
                    }
                    thread::sleep(self.settings.retry_delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Logs `err` under its taxonomy name and turns it into a failed outcome.
    fn failed(
        &self,
        ctx: &RunContext,
        target: &InstallTarget,
        exit_code: Option<i32>,
        err: &InstallError,
    ) -> InstallOutcome {
        run_error!(ctx.log, "[{}] {}: {}", target.name, err.kind(), err);
        InstallOutcome::from_error(&target.name, exit_code, err)
    }
}

/// Prints the summary table and writes one line per target to the run log.
fn report(ctx: &RunContext, summary: &RunSummary, elapsed: chrono::Duration) {
    // The table is for the operator watching the console...
    summary.to_table().printstd();
    // ...and the per-target lines are for whoever reads the log file later.
    for outcome in summary.iter() {
        let detail = outcome.detail();
        let line = format!(
            "Summary: {} {}{}",
            outcome.target_name,
            outcome.status(),
            if detail.is_empty() { String::new() } else { format!(" ({detail})") }
        );
        if outcome.succeeded {
            run_info!(ctx.log, "{}", line);
        } else {
            run_error!(ctx.log, "{}", line);
        }
    }
    run_info!(
        ctx.log,
        "Run finished in {}: {} succeeded, {} failed, {} total",
        format_duration(&elapsed),
        summary.succeeded(),
        summary.failed(),
        summary.total()
    );
}
