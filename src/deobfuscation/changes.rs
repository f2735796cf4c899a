//! Change records produced by rewrite passes.
//!
//! Every rewrite a pass performs is recorded as an [`Event`] in an [`EventLog`].
//! A pass returns its own log; the engine merges the per-pass logs into the run
//! log carried by the final result. A pass made progress exactly when its log
//! is non-empty.
//!
//! # Example
//!
//! ```rust
//! use rotascope::deobfuscation::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::StringDecoded).message("_0x2b(0x5) -> \"x\"");
//! log.record(EventKind::PropertyNormalized);
//!
//! assert_eq!(log.len(), 2);
//! assert_eq!(log.count_kind(EventKind::StringDecoded), 1);
//! ```

use std::fmt;

use rustc_hash::FxHashMap;
use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Categories of rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount)]
pub enum EventKind {
    /// A decoder call was replaced by the string table entry it selects.
    StringDecoded,
    /// An expression was replaced by its statically known value.
    ConstantFolded,
    /// A reference to a constant binding was replaced by its literal value.
    ReferenceInlined,
    /// A computed member access was rewritten to dot notation.
    PropertyNormalized,
    /// An unreferenced declaration was removed.
    DeclarationRemoved,
    /// An anti-analysis guard stub was removed.
    GuardRemoved,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::StringDecoded => "string decoded",
            Self::ConstantFolded => "constant folded",
            Self::ReferenceInlined => "reference inlined",
            Self::PropertyNormalized => "property normalized",
            Self::DeclarationRemoved => "declaration removed",
            Self::GuardRemoved => "guard removed",
        }
    }

    /// Returns true if this event was produced by final cleanup rather than by
    /// the rewrite loop.
    #[must_use]
    pub fn is_cleanup(&self) -> bool {
        matches!(self, Self::DeclarationRemoved | Self::GuardRemoved)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single recorded rewrite.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// Human-readable description.
    pub message: String,
    /// Pass that produced the event, when known.
    pub pass: Option<String>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is added to the log when the
/// builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    message: Option<String>,
    pass: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            message: None,
            pass: None,
        }
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates this event with a specific pass.
    pub fn pass(mut self, pass_name: impl Into<String>) -> Self {
        self.pass = Some(pass_name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            message,
            pass: self.pass.take(),
        });
    }
}

/// Append-only collection of rewrite events.
///
/// Events can be appended through shared references, so visitors holding a
/// `&EventLog` can record without threading mutable borrows around.
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let new_log = Self::new();
        new_log.merge(self);
        new_log
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Appends every event of `other` to this log.
    pub fn merge(&self, other: &EventLog) {
        for (_, event) in &other.events {
            self.events.push(event.clone());
        }
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.iter().any(|e| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.filter_kind(kind).count()
    }

    /// Returns an iterator over all events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> FxHashMap<EventKind, usize> {
        let mut counts = FxHashMap::default();
        for event in self.iter() {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Per-kind counts for every kind, zeros included, in declaration order.
    #[must_use]
    pub fn kind_totals(&self) -> Vec<(EventKind, usize)> {
        let counts = self.count_by_kind();
        let mut totals = Vec::with_capacity(EventKind::COUNT);
        for kind in EventKind::iter() {
            totals.push((kind, counts.get(&kind).copied().unwrap_or(0)));
        }
        totals
    }

    /// Generates a one-line summary such as `3 string decoded, 1 guard removed`.
    #[must_use]
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .kind_totals()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(kind, count)| format!("{count} {kind}"))
            .collect();

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl fmt::Display for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_records_on_drop() {
        let log = EventLog::new();
        assert!(log.is_empty());

        log.record(EventKind::ConstantFolded)
            .message("1 + 2 -> 3")
            .pass("ConstantFolding");

        let event = log.iter().next().expect("one event");
        assert_eq!(event.kind, EventKind::ConstantFolded);
        assert_eq!(event.message, "1 + 2 -> 3");
        assert_eq!(event.pass.as_deref(), Some("ConstantFolding"));
    }

    #[test]
    fn default_message_is_kind_description() {
        let log = EventLog::new();
        log.record(EventKind::GuardRemoved);
        assert_eq!(log.iter().next().unwrap().message, "guard removed");
    }

    #[test]
    fn merge_and_counts() {
        let a = EventLog::new();
        a.record(EventKind::StringDecoded);
        a.record(EventKind::StringDecoded);

        let b = EventLog::new();
        b.record(EventKind::DeclarationRemoved);

        a.merge(&b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.count_kind(EventKind::StringDecoded), 2);
        assert!(a.has(EventKind::DeclarationRemoved));
        assert!(!a.has(EventKind::GuardRemoved));
        assert_eq!(a.summary(), "2 string decoded, 1 declaration removed");

        let by_kind = a.count_by_kind();
        assert_eq!(by_kind.get(&EventKind::StringDecoded), Some(&2));
        assert_eq!(by_kind.get(&EventKind::GuardRemoved), None);
    }

    #[test]
    fn totals_cover_every_kind() {
        let log = EventLog::new();
        let totals = log.kind_totals();
        assert_eq!(totals.len(), EventKind::COUNT);
        assert!(totals.iter().all(|(_, count)| *count == 0));
        assert_eq!(log.summary(), "no changes");
    }

    #[test]
    fn cleanup_kinds() {
        assert!(EventKind::GuardRemoved.is_cleanup());
        assert!(!EventKind::ReferenceInlined.is_cleanup());
    }
}
