//! Outcome records and the run summary.

use std::fmt;

use serde::Serialize;
use tickbridge_common::OperationError;

/// How a scripted operation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Resolved with the event shown.
    Completed { event: String },
    Failed { error: String, retry: bool },
    Cancelled,
    /// The component had nothing to do, so no operation was issued.
    Skipped,
    /// Still pending when the host shut down.
    Abandoned,
}

impl OutcomeKind {
    pub fn from_result<E: fmt::Debug>(result: Result<E, OperationError>) -> Self {
        match result {
            Ok(event) => Self::Completed {
                event: format!("{event:?}"),
            },
            Err(OperationError::Cancelled) => Self::Cancelled,
            Err(e) => Self::Failed {
                retry: e.should_retry(),
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub label: &'static str,
    pub issued_at: u64,
    pub settled_at: u64,
    #[serde(flatten)]
    pub kind: OutcomeKind,
}

/// Why the tick loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    Interrupted,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub feature: &'static str,
    pub stop: StopReason,
    pub ticks: u64,
    pub delivered: u64,
    pub faults: u64,
    pub pumps: u64,
    pub status: String,
    pub outcomes: Vec<Outcome>,
}

impl Summary {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize summary: {e}\"}}"))
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} run {:?} after {} ticks: {} callbacks, {} faults, {} pumps",
            self.feature, self.stop, self.ticks, self.delivered, self.faults, self.pumps
        )?;
        writeln!(f, "  {}", self.status)?;
        for outcome in &self.outcomes {
            write!(
                f,
                "  [{:>4} -> {:>4}] {}: ",
                outcome.issued_at, outcome.settled_at, outcome.label
            )?;
            match &outcome.kind {
                OutcomeKind::Completed { event } => writeln!(f, "completed with {event}")?,
                OutcomeKind::Failed { error, retry } => {
                    writeln!(f, "failed ({error}, retry={retry})")?
                }
                OutcomeKind::Cancelled => writeln!(f, "cancelled")?,
                OutcomeKind::Skipped => writeln!(f, "skipped")?,
                OutcomeKind::Abandoned => writeln!(f, "abandoned")?,
            }
        }
        Ok(())
    }
}
