//! Terminal rendering of progress and streamed answers.

use async_trait::async_trait;
use colored::Colorize;
use matsci_rag::{OutputSink, ProgressReporter, ThoughtTrace, TraceReporter, TraceState};
use std::io::Write;
use std::sync::Mutex;

/// Prints each step as it is reported and keeps the full trace.
#[derive(Default)]
pub struct ConsoleReporter {
    trace: TraceReporter,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for ConsoleReporter {
    fn update(&self, label: Option<&str>, expanded: Option<bool>, state: Option<TraceState>) {
        match state {
            Some(TraceState::Error) => eprintln!("{}", "✗ Failed".bright_red().bold()),
            Some(TraceState::Complete) => println!("{}", "✓ Done".bright_green()),
            _ => {}
        }
        self.trace.update(label, expanded, state);
    }

    fn write(&self, message: &str) {
        println!("{}", message.dimmed());
        self.trace.write(message);
    }

    fn extract_trace(&self) -> ThoughtTrace {
        self.trace.extract_trace()
    }
}

/// Prints the new part of each partial answer.
#[derive(Default)]
pub struct StdoutSink {
    printed: Mutex<usize>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutputSink for StdoutSink {
    async fn partial(&self, accumulated: &str) -> bool {
        let mut printed = self.printed.lock().unwrap();
        let Some(suffix) = accumulated.get(*printed..) else {
            return true;
        };

        let mut stdout = std::io::stdout().lock();
        if write!(stdout, "{}", suffix).and_then(|_| stdout.flush()).is_err() {
            // Closed stdout means nobody is reading the answer
            return false;
        }
        *printed = accumulated.len();
        true
    }
}
