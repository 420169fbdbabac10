//! Command execution.

use crate::error::CliError;
use crate::scripted::{CallLog, ScriptedFile};
use colored::Colorize;
use statetab_core::{DispatchOutcome, Dispatcher, StateName};
use statetab_runtime::{AsyncRunner, RunnerConfig};
use std::path::Path;

/// A machine loaded from a scripted description file.
pub struct Session {
    pub dispatcher: Dispatcher,
    pub calls: CallLog,
}

impl Session {
    pub fn open(path: &Path) -> Result<Self, CliError> {
        let file = ScriptedFile::load(path)?;
        let calls = CallLog::default();
        let caps = file.capabilities(&calls);
        let dispatcher = Dispatcher::new(file.description, &caps)?.with_label("cli");
        Ok(Self { dispatcher, calls })
    }

    /// Starts the machine and returns the entry calls it made.
    pub fn start(&mut self) -> String {
        self.dispatcher.start();
        let mut output = format!(
            "{} in {}",
            "Started".green(),
            self.dispatcher.current_state().as_str().cyan()
        );
        push_calls(&mut output, &self.calls.take());
        output
    }

    /// Dispatches one event and formats the result.
    pub fn step(&mut self, event: &str) -> String {
        let outcome = self.dispatcher.dispatch(event);
        let mut output = format_outcome(event, &outcome, self.dispatcher.current_state());
        push_calls(&mut output, &self.calls.take());
        output
    }
}

/// Validates a description file and reports its shape and reachability.
pub fn check(path: &Path) -> Result<String, CliError> {
    let session = Session::open(path)?;
    let table = session.dispatcher.table();

    let mut output = format!(
        "{} {} (checksum: {})\n",
        "Valid".green(),
        path.display(),
        table.checksum()
    );
    output.push_str(&format!(
        "initial state: {}\n",
        table.initial().as_str().cyan()
    ));
    output.push_str(&format!("states: {}\n", table.state_names().len()));
    for name in table.state_names() {
        let events = table.events_from(name);
        output.push_str(&format!("  {} [{}]\n", name.as_str().cyan(), events.join(", ")));
    }
    if let Some(any) = table.any() {
        output.push_str(&format!("  STATE_ANY [{}]\n", any.events().join(", ")));
    }

    let warnings = table.verify();
    if warnings.is_empty() {
        output.push_str("no reachability warnings");
    } else {
        for warning in warnings {
            output.push_str(&format!("{}: {}\n", "Warning".yellow(), warning));
        }
    }
    Ok(output.trim_end().to_string())
}

/// Dispatches `events` in order on the calling thread.
pub fn run_sync(path: &Path, events: &[String]) -> Result<String, CliError> {
    let mut session = Session::open(path)?;
    let mut lines = vec![session.start()];
    for event in events {
        lines.push(session.step(event));
    }
    lines.push(format!(
        "final state: {}",
        session.dispatcher.current_state().as_str().cyan()
    ));
    Ok(lines.join("\n"))
}

/// Routes `events` through an [`AsyncRunner`], followed by the exit event.
pub async fn run_async(
    path: &Path,
    events: &[String],
    config: RunnerConfig,
) -> Result<String, CliError> {
    let Session { dispatcher, calls } = Session::open(path)?;
    let runner = AsyncRunner::new(dispatcher, config);
    runner.start()?;

    let mut lines = vec![format!("{} runner {}", "Started".green(), runner.label())];
    for event in events {
        if !runner.send_event(event).await {
            lines.push(format!("{}: {}", event, "dropped".yellow()));
        }
    }
    runner.send_exit_event().await;
    let report = runner.join().await?;

    lines.push(format!(
        "processed {} events ({} handled)",
        report.events_processed, report.events_handled
    ));
    let calls = calls.take();
    if !calls.is_empty() {
        lines.push(format!("calls: {}", calls.join(", ")));
    }
    lines.push(format!(
        "final state: {}",
        report.final_state.as_str().cyan()
    ));
    Ok(lines.join("\n"))
}

pub fn format_outcome(event: &str, outcome: &DispatchOutcome, current: &StateName) -> String {
    let detail = match outcome {
        DispatchOutcome::Transitioned { from, to } => format!("{} -> {}", from, to),
        DispatchOutcome::Remained => format!("stayed in {}", current),
        DispatchOutcome::Caught { from, to } => format!("actions failed, caught {} -> {}", from, to),
        DispatchOutcome::NoTransition => format!("not handled in {}", current),
        DispatchOutcome::GuardsRejected => format!("guards rejected in {}", current),
        DispatchOutcome::ActionFailed => format!("actions failed in {}, no catch", current),
    };
    let marker = if outcome.is_handled() {
        "ok".green()
    } else {
        "--".yellow()
    };
    format!("{} {}: {}", marker, event.bold(), detail)
}

fn push_calls(output: &mut String, calls: &[String]) {
    if !calls.is_empty() {
        output.push_str(&format!("\n   calls: {}", calls.join(", ")));
    }
}
