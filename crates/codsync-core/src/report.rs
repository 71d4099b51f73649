//! Run-level error accumulation.
//!
//! Failures during a sync are diagnostic, not fatal: each one is recorded
//! here and processing moves on to the next unit of work. The accumulated
//! messages are replayed once at process exit and decide the exit code.

use std::sync::Mutex;

/// Append-only sink for run-level error messages.
///
/// Messages are never cleared mid-run. The mutex keeps appends safe from any
/// point in the call stack; today's processing is sequential, so it is never
/// contended.
#[derive(Debug, Default)]
pub struct ErrorLog {
    messages: Mutex<Vec<String>>,
}

impl ErrorLog {
    /// Creates an empty error log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one error message.
    pub fn add(&self, message: impl Into<String>) {
        self.messages
            .lock()
            .expect("error log poisoned")
            .push(message.into());
    }

    /// Returns true if no errors have been recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().expect("error log poisoned").is_empty()
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.messages.lock().expect("error log poisoned").len()
    }

    /// Snapshot of the recorded messages, in insertion order.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("error log poisoned").clone()
    }

    /// Emits every recorded message through `tracing::error` and returns the
    /// count. Called once, at the end of the run.
    pub fn report(&self) -> usize {
        let messages = self.messages();
        for message in &messages {
            tracing::error!("{message}");
        }
        messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log() {
        let log = ErrorLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert_eq!(log.report(), 0);
    }

    #[test]
    fn test_add_preserves_order() {
        let log = ErrorLog::new();
        log.add("POL: could not find service list");
        log.add(format!("{}: could not delete service resource", "cod-ab-pol"));

        assert!(!log.is_empty());
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.messages(),
            vec![
                "POL: could not find service list".to_string(),
                "cod-ab-pol: could not delete service resource".to_string(),
            ]
        );
    }

    #[test]
    fn test_report_returns_count() {
        let log = ErrorLog::new();
        log.add("one");
        log.add("two");
        assert_eq!(log.report(), 2);
        // Reporting does not clear the log.
        assert_eq!(log.len(), 2);
    }
}
