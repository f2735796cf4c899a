//! Deobfuscation result types.

use std::{fmt, time::Duration};

use crate::deobfuscation::{
    changes::{EventKind, EventLog},
    detection::DecoderInfo,
};

/// Result of one deobfuscation run.
#[derive(Debug, Clone)]
pub struct DeobfuscationResult {
    /// All events from the run, rewrite loop and cleanup.
    pub events: EventLog,
    /// Number of rewrite-loop iterations that ran.
    pub iterations: usize,
    /// Whether the last iteration produced no change.
    pub reached_fixed_point: bool,
    /// Name of the string-table loader, if found.
    pub loader: Option<String>,
    /// Number of entries in the captured string table.
    pub table_len: usize,
    /// The decoder, if found.
    pub decoder: Option<DecoderInfo>,
    /// Total processing time.
    pub total_time: Duration,
}

impl DeobfuscationResult {
    /// Creates a new result from the run's events.
    #[must_use]
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            iterations: 0,
            reached_fixed_point: false,
            loader: None,
            table_len: 0,
            decoder: None,
            total_time: Duration::ZERO,
        }
    }

    /// Sets timing and iteration info.
    #[must_use]
    pub fn with_timing(mut self, time: Duration, iterations: usize) -> Self {
        self.total_time = time;
        self.iterations = iterations;
        self
    }

    /// Number of decoder calls replaced by table entries.
    #[must_use]
    pub fn strings_decoded(&self) -> usize {
        self.events.count_kind(EventKind::StringDecoded)
    }

    /// Generates a human-readable summary of the run.
    #[must_use]
    pub fn summary(&self) -> String {
        let discovery = match (&self.loader, &self.decoder) {
            (Some(loader), Some(decoder)) => format!(
                "loader {loader} ({} strings), decoder {decoder}",
                self.table_len
            ),
            (Some(loader), None) => {
                format!("loader {loader} ({} strings), no decoder", self.table_len)
            }
            _ => "no string table found".to_string(),
        };
        let convergence = if self.reached_fixed_point {
            "fixed point"
        } else {
            "iteration limit"
        };

        format!(
            "{} in {} iteration(s), stopped at {convergence}, {:.2?}; {discovery}",
            self.events.summary(),
            self.iterations,
            self.total_time
        )
    }
}

impl fmt::Display for DeobfuscationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_without_discovery() {
        let events = EventLog::new();
        events.record(EventKind::ConstantFolded);
        let mut result = DeobfuscationResult::new(events).with_timing(Duration::ZERO, 2);
        result.reached_fixed_point = true;

        let summary = result.summary();
        assert!(summary.starts_with("1 constant folded in 2 iteration(s)"));
        assert!(summary.contains("fixed point"));
        assert!(summary.ends_with("no string table found"));
        assert_eq!(result.strings_decoded(), 0);
    }
}
