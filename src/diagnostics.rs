/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Diagnostic events for tolerated data anomalies.
//!
//! Exchange servers are known to produce time zone definitions containing
//! duplicate period ids or non-monotonic transition intervals. Those
//! anomalies are worked around rather than rejected, but each workaround is
//! reported through a caller-provided [`DiagnosticSink`] so consumers can
//! trace them.

use time::Date;

/// A data anomaly which was tolerated while processing a time zone
/// definition.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum DiagnosticEvent {
    /// A period with this id appeared more than once in a `<Periods>` list.
    /// Only the first occurrence was kept.
    DuplicatePeriod { id: String },

    /// A transition interval did not start before it ended. No adjustment
    /// rule was built for it.
    OutOfOrderInterval {
        start_date: Date,
        effective_end_date: Date,
    },
}

/// A receiver for [`DiagnosticEvent`]s.
pub trait DiagnosticSink {
    fn emit(&mut self, event: DiagnosticEvent);
}

impl<F> DiagnosticSink for F
where
    F: FnMut(DiagnosticEvent),
{
    fn emit(&mut self, event: DiagnosticEvent) {
        self(event)
    }
}

/// Collects events in order. Useful for asserting on anomalies in tests or
/// surfacing them to a caller after the fact.
impl DiagnosticSink for Vec<DiagnosticEvent> {
    fn emit(&mut self, event: DiagnosticEvent) {
        self.push(event)
    }
}

/// A sink which discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardDiagnostics;

impl DiagnosticSink for DiscardDiagnostics {
    fn emit(&mut self, _event: DiagnosticEvent) {}
}
