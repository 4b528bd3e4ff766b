//! # Call Boundary Detection
//!
//! The statusline fires many times per API call while a response streams.
//! The snapshot carries no call identifier, so whether a snapshot starts a new
//! call has to be inferred from how its counters moved since the previous one.
//!
//! The inference is reduced to two signals:
//! - `counter_grew`: the session-cumulative input counter increased
//! - `cache_fields_changed`: the per-call cache read/write values differ from
//!   the last snapshot (catches calls served entirely from cache, where the
//!   input counter stays flat)
//!
//! Two fully-cached calls with identical cache values and no input growth are
//! indistinguishable from one call; that case is reported as continuing.

use crate::models::{CallObservation, SessionRecord};

/// Outcome of comparing a snapshot against the previous one for its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallBoundary {
    NewCall,
    ContinuingCall,
}

impl CallBoundary {
    pub fn is_new_call(self) -> bool {
        matches!(self, CallBoundary::NewCall)
    }
}

/// Input alphabet of the detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundarySignals {
    pub counter_grew: bool,
    pub cache_fields_changed: bool,
}

impl BoundarySignals {
    pub fn observe(previous: &SessionRecord, total_input: u64, call: CallObservation) -> Self {
        BoundarySignals {
            counter_grew: total_input > previous.last_boundary_input,
            cache_fields_changed: call.cache_read_tokens != previous.last_cache_read_snapshot
                || call.cache_write_tokens != previous.last_cache_write_snapshot,
        }
    }
}

/// Seam for swapping the heuristic out once snapshots carry a call id.
pub trait BoundaryDetector {
    fn classify(&self, signals: BoundarySignals) -> CallBoundary;

    fn detect(
        &self,
        previous: &SessionRecord,
        total_input: u64,
        call: CallObservation,
    ) -> CallBoundary {
        self.classify(BoundarySignals::observe(previous, total_input, call))
    }
}

/// Either signal opens a new call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterHeuristic;

impl BoundaryDetector for CounterHeuristic {
    fn classify(&self, signals: BoundarySignals) -> CallBoundary {
        if signals.counter_grew || signals.cache_fields_changed {
            CallBoundary::NewCall
        } else {
            CallBoundary::ContinuingCall
        }
    }
}
