// This module launches downloaded installers unattended and turns their exit status
// into an `InstallOutcome`. Launching goes through the `InstallerRunner` trait so the
// orchestrator can be exercised without spawning real processes.

use crate::libs::run_context::RunContext;
use crate::schemas::errors::InstallError;
use crate::schemas::outcome::InstallOutcome;
use crate::{run_debug, run_error, run_info};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// A program and its ordered argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    /// Space-joined rendering for log lines.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub trait InstallerRunner {
    /// Runs `invocation` to completion and returns its exit code, or `None` when the
    /// process ended without one (killed by a signal).
    fn run(
        &self,
        ctx: &RunContext,
        invocation: &Invocation,
        timeout: Duration,
    ) -> Result<Option<i32>, InstallError>;
}

/// Spawns the installer as a child process and polls it, so that a timeout or a
/// cancellation can kill it instead of blocking the run forever.
pub struct ProcessRunner {
    pub poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        ProcessRunner {
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl InstallerRunner for ProcessRunner {
    fn run(
        &self,
        ctx: &RunContext,
        invocation: &Invocation,
        timeout: Duration,
    ) -> Result<Option<i32>, InstallError> {
        let program = invocation.program.display().to_string();
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| InstallError::Launch {
                program: program.clone(),
                reason: e.to_string(),
            })?;
        run_debug!(ctx.log, "Spawned {} (pid {})", program, child.id());

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status.code()),
                Ok(None) => {}
                Err(e) => {
                    return Err(InstallError::Launch {
                        program,
                        reason: format!("failed to wait for process: {e}"),
                    });
                }
            }

            if ctx.cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(InstallError::Cancelled);
            }
            if started.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(InstallError::Launch {
                    program,
                    reason: format!("timed out after {}s", timeout.as_secs()),
                });
            }
            thread::sleep(self.poll_interval);
        }
    }
}

/// Maps an exit status to success or failure. Zero and any code in `acceptable`
/// succeed; a missing code never does.
pub fn classify_exit_code(
    code: Option<i32>,
    acceptable: &BTreeSet<i32>,
) -> Result<i32, InstallError> {
    match code {
        Some(0) => Ok(0),
        Some(code) if acceptable.contains(&code) => Ok(code),
        Some(code) => Err(InstallError::NonZeroExit { code }),
        None => Err(InstallError::Terminated),
    }
}

/// Runs one installer and records the result. Never returns an error: launch
/// failures, timeouts and bad exit codes all become a failed outcome.
pub fn execute(
    runner: &dyn InstallerRunner,
    ctx: &RunContext,
    target_name: &str,
    invocation: &Invocation,
    acceptable: &BTreeSet<i32>,
    timeout: Duration,
) -> InstallOutcome {
    run_info!(ctx.log, "[{}] Running: {}", target_name, invocation.display());

    let code = match runner.run(ctx, invocation, timeout) {
        Ok(code) => code,
        Err(err) => {
            run_error!(ctx.log, "[{}] {}: {}", target_name, err.kind(), err);
            return InstallOutcome::from_error(target_name, None, &err);
        }
    };

    match classify_exit_code(code, acceptable) {
        Ok(0) => {
            run_info!(ctx.log, "[{}] Installer finished successfully", target_name);
            InstallOutcome::success(target_name, Some(0))
        }
        Ok(code) => {
            run_info!(
                ctx.log,
                "[{}] Installer finished with accepted exit code {}",
                target_name,
                code
            );
            InstallOutcome::success(target_name, Some(code))
        }
        Err(err) => {
            run_error!(ctx.log, "[{}] {}: {}", target_name, err.kind(), err);
            InstallOutcome::from_error(target_name, code, &err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::run_context::CancelToken;
    use crate::logger::RunLog;

    struct FixedExit(Result<Option<i32>, fn() -> InstallError>);

    impl InstallerRunner for FixedExit {
        fn run(
            &self,
            _ctx: &RunContext,
            _invocation: &Invocation,
            _timeout: Duration,
        ) -> Result<Option<i32>, InstallError> {
            self.0.map_err(|make| make())
        }
    }

    fn ctx() -> RunContext {
        RunContext::new(RunLog::console_only(false), CancelToken::default())
    }

    fn invocation() -> Invocation {
        Invocation {
            program: PathBuf::from("setup.exe"),
            args: vec![OsString::from("/S")],
        }
    }

    #[test]
    fn exit_codes_are_classified() {
        let acceptable = BTreeSet::from([3010]);
        let timeout = Duration::from_secs(5);
        let ctx = ctx();

        let ok = execute(&FixedExit(Ok(Some(0))), &ctx, "a", &invocation(), &acceptable, timeout);
        assert!(ok.succeeded);
        assert_eq!(ok.exit_code, Some(0));

        let reboot =
            execute(&FixedExit(Ok(Some(3010))), &ctx, "b", &invocation(), &acceptable, timeout);
        assert!(reboot.succeeded);
        assert_eq!(reboot.exit_code, Some(3010));

        let failed =
            execute(&FixedExit(Ok(Some(1603))), &ctx, "c", &invocation(), &acceptable, timeout);
        assert!(!failed.succeeded);
        assert_eq!(failed.exit_code, Some(1603));
        assert!(failed.error_message.unwrap().starts_with("NonZeroExit"));

        let killed = execute(&FixedExit(Ok(None)), &ctx, "d", &invocation(), &acceptable, timeout);
        assert!(!killed.succeeded);
        assert_eq!(killed.exit_code, None);
    }

    #[test]
    fn launch_failure_becomes_failed_outcome() {
        let runner = FixedExit(Err(|| InstallError::Launch {
            program: "setup.exe".into(),
            reason: "not a valid application".into(),
        }));
        let outcome = execute(
            &runner,
            &ctx(),
            "a",
            &invocation(),
            &BTreeSet::new(),
            Duration::from_secs(1),
        );
        assert!(!outcome.succeeded);
        assert!(outcome.error_message.unwrap().starts_with("LaunchError"));
    }

    #[test]
    fn invocation_display_joins_arguments() {
        let inv = Invocation {
            program: PathBuf::from("msiexec"),
            args: ["/i", "pkg.msi", "/qn"].map(OsString::from).to_vec(),
        };
        assert_eq!(inv.display(), "msiexec /i pkg.msi /qn");
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn sh(script: &str) -> Invocation {
            Invocation {
                program: PathBuf::from("/bin/sh"),
                args: vec![OsString::from("-c"), OsString::from(script)],
            }
        }

        fn fast_runner() -> ProcessRunner {
            ProcessRunner {
                poll_interval: Duration::from_millis(10),
            }
        }

        #[test]
        fn reports_real_exit_codes() {
            let code = fast_runner()
                .run(&ctx(), &sh("exit 3"), Duration::from_secs(10))
                .unwrap();
            assert_eq!(code, Some(3));
        }

        #[test]
        fn missing_program_is_a_launch_error() {
            let inv = Invocation {
                program: PathBuf::from("/nonexistent/setup.exe"),
                args: vec![],
            };
            let err = fast_runner()
                .run(&ctx(), &inv, Duration::from_secs(1))
                .unwrap_err();
            assert_eq!(err.kind(), "LaunchError");
        }

        #[test]
        fn slow_installer_is_killed_on_timeout() {
            let err = fast_runner()
                .run(&ctx(), &sh("sleep 5"), Duration::from_millis(100))
                .unwrap_err();
            assert_eq!(err.kind(), "LaunchError");
            assert!(err.to_string().contains("timed out"));
        }

        #[test]
        fn cancellation_kills_the_installer() {
            let ctx = ctx();
            ctx.cancel.cancel();
            let err = fast_runner()
                .run(&ctx, &sh("sleep 5"), Duration::from_secs(10))
                .unwrap_err();
            assert!(matches!(err, InstallError::Cancelled));
        }
    }
}
