//! Progress reporting for the query pipeline.
//!
//! The pipeline narrates what it is doing through a [`ProgressReporter`].
//! Reporters are purely observational: the pipeline never reads anything
//! back from them while deciding what to do, so swapping a
//! [`TraceReporter`] for a [`NoopReporter`] leaves the answer unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Status of the thought trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceState {
    #[default]
    Running,
    Complete,
    Error,
}

/// Snapshot of everything reported during one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtTrace {
    /// Headline shown above the messages.
    pub label: String,

    /// Whether a UI should show the messages unfolded.
    pub expanded: bool,

    /// Step descriptions in the order they were written.
    pub messages: Vec<String>,

    pub state: TraceState,

    pub started_at: DateTime<Utc>,
}

impl Default for ThoughtTrace {
    fn default() -> Self {
        Self {
            label: "Thinking...".to_string(),
            expanded: false,
            messages: Vec::new(),
            state: TraceState::Running,
            started_at: Utc::now(),
        }
    }
}

impl ThoughtTrace {
    /// Messages joined as markdown paragraphs.
    pub fn to_markdown(&self) -> String {
        self.messages.join("\n\n")
    }
}

/// Side channel for human-readable progress.
pub trait ProgressReporter: Send + Sync {
    /// Change any of the headline, the expansion flag or the state.
    fn update(&self, label: Option<&str>, expanded: Option<bool>, state: Option<TraceState>);

    /// Append a step description.
    fn write(&self, message: &str);

    /// Take the trace recorded so far, leaving a fresh one behind.
    fn extract_trace(&self) -> ThoughtTrace;
}

/// Reporter that records a [`ThoughtTrace`] in memory.
#[derive(Debug, Default)]
pub struct TraceReporter {
    trace: Mutex<ThoughtTrace>,
}

impl TraceReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current trace without resetting it.
    pub fn snapshot(&self) -> ThoughtTrace {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ThoughtTrace> {
        self.trace.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProgressReporter for TraceReporter {
    fn update(&self, label: Option<&str>, expanded: Option<bool>, state: Option<TraceState>) {
        let mut trace = self.lock();
        if let Some(label) = label {
            trace.label = label.to_string();
        }
        if let Some(expanded) = expanded {
            trace.expanded = expanded;
        }
        if let Some(state) = state {
            trace.state = state;
        }
    }

    fn write(&self, message: &str) {
        self.lock().messages.push(message.to_string());
    }

    fn extract_trace(&self) -> ThoughtTrace {
        std::mem::take(&mut *self.lock())
    }
}

/// Reporter that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn update(&self, _label: Option<&str>, _expanded: Option<bool>, _state: Option<TraceState>) {}

    fn write(&self, _message: &str) {}

    fn extract_trace(&self) -> ThoughtTrace {
        ThoughtTrace::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_records_in_order() {
        let reporter = TraceReporter::new();
        reporter.write("**Step: Summarizing the question**");
        reporter.write("**Step: Retrieving context**");
        reporter.update(Some("Done"), Some(true), Some(TraceState::Complete));

        let trace = reporter.extract_trace();
        assert_eq!(trace.label, "Done");
        assert!(trace.expanded);
        assert_eq!(trace.state, TraceState::Complete);
        assert_eq!(
            trace.to_markdown(),
            "**Step: Summarizing the question**\n\n**Step: Retrieving context**"
        );
    }

    #[test]
    fn test_extract_resets() {
        let reporter = TraceReporter::new();
        reporter.write("one");
        let _ = reporter.extract_trace();

        let fresh = reporter.snapshot();
        assert!(fresh.messages.is_empty());
        assert_eq!(fresh.state, TraceState::Running);
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let reporter = TraceReporter::new();
        reporter.update(None, None, Some(TraceState::Error));

        let trace = reporter.snapshot();
        assert_eq!(trace.label, "Thinking...");
        assert_eq!(trace.state, TraceState::Error);
    }
}
