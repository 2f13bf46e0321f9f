// The explicit per-run context threaded through the resolver, the runner and the
// orchestrator. It replaces ambient state: nothing about a run (its log file, its
// cancellation flag, whether it is a dry run) lives in a global.

use crate::logger::RunLog;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag. Cloning hands out another handle to the same flag, which
/// is how the Ctrl-C handler reaches a running orchestrator.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct RunContext {
    pub log: RunLog,
    pub cancel: CancelToken,
    /// Resolve download URLs only; nothing is downloaded or executed.
    pub dry_run: bool,
}

impl RunContext {
    pub fn new(log: RunLog, cancel: CancelToken) -> Self {
        RunContext {
            log,
            cancel,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
