// Per-target outcomes and the run summary built from them.

use crate::schemas::errors::InstallError;
use prettytable::{Cell, Row, Table};

/// Result of processing one target. Created once per target per run; immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub target_name: String,
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
    /// The installer was not executed (already installed, or a dry run).
    pub skipped: bool,
    pub note: Option<String>,
}

impl InstallOutcome {
    pub fn success(target_name: &str, exit_code: Option<i32>) -> Self {
        InstallOutcome {
            target_name: target_name.to_string(),
            succeeded: true,
            exit_code,
            error_message: None,
            skipped: false,
            note: None,
        }
    }

    pub fn skipped(target_name: &str, note: String) -> Self {
        InstallOutcome {
            skipped: true,
            note: Some(note),
            ..InstallOutcome::success(target_name, None)
        }
    }

    pub fn failure(target_name: &str, exit_code: Option<i32>, message: String) -> Self {
        InstallOutcome {
            target_name: target_name.to_string(),
            succeeded: false,
            exit_code,
            error_message: Some(message),
            skipped: false,
            note: None,
        }
    }

    pub fn from_error(target_name: &str, exit_code: Option<i32>, error: &InstallError) -> Self {
        InstallOutcome::failure(target_name, exit_code, format!("{}: {}", error.kind(), error))
    }

    pub fn status(&self) -> &'static str {
        match (self.succeeded, self.skipped) {
            (true, true) => "SKIPPED",
            (true, false) => "SUCCESS",
            (false, _) => "FAILED",
        }
    }

    pub fn detail(&self) -> String {
        self.error_message
            .clone()
            .or_else(|| self.note.clone())
            .unwrap_or_default()
    }
}

/// Ordered collection of outcomes, keyed by target name, in processing order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    outcomes: Vec<InstallOutcome>,
}

impl RunSummary {
    /// Records an outcome. A later outcome for the same target replaces the earlier one
    /// in place, keeping the original position.
    pub fn record(&mut self, outcome: InstallOutcome) {
        match self
            .outcomes
            .iter_mut()
            .find(|o| o.target_name == outcome.target_name)
        {
            Some(existing) => *existing = outcome,
            None => self.outcomes.push(outcome),
        }
    }

    pub fn get(&self, target_name: &str) -> Option<&InstallOutcome> {
        self.outcomes.iter().find(|o| o.target_name == target_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstallOutcome> {
        self.outcomes.iter()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Process exit signal: 1 when any target failed, 0 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.failed() > 0 { 1 } else { 0 }
    }

    /// Human-readable table of target → status, printed at the end of every run.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.set_titles(Row::new(vec![
            Cell::new("Target").style_spec("b"),
            Cell::new("Status").style_spec("b"),
            Cell::new("Exit code").style_spec("b"),
            Cell::new("Detail").style_spec("b"),
        ]));
        for outcome in &self.outcomes {
            let colour = match outcome.status() {
                "SUCCESS" => "Fg",
                "SKIPPED" => "Fc",
                _ => "Fr",
            };
            table.add_row(Row::new(vec![
                Cell::new(&outcome.target_name),
                Cell::new(outcome.status()).style_spec(colour),
                Cell::new(
                    &outcome
                        .exit_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(&outcome.detail()),
            ]));
        }
        table
    }
}
