//! # Session Accumulator
//!
//! Turns one snapshot into the deltas it contributes to the day, and the
//! replacement `SessionRecord` for its session.

use crate::boundary::{BoundaryDetector, CallBoundary};
use crate::models::{CallObservation, Counters, SessionRecord};

/// Result of folding one snapshot into a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionUpdate {
    pub boundary: CallBoundary,
    /// Amount to add to the day's counters. Never negative.
    pub delta: Counters,
    pub record: SessionRecord,
}

/// Fold a snapshot into `previous`.
///
/// Input/output deltas are clamped at zero so an out-of-order snapshot never
/// subtracts. Per-call cache values are added only at a call boundary, which
/// makes the cache delta non-zero at most once per call.
pub fn accumulate<D: BoundaryDetector + ?Sized>(
    detector: &D,
    previous: &SessionRecord,
    total_input: u64,
    total_output: u64,
    call: CallObservation,
) -> SessionUpdate {
    let boundary = detector.detect(previous, total_input, call);

    let (cache_read, cache_write) = if boundary.is_new_call() {
        (
            previous
                .accumulated_cache_read
                .saturating_add(call.cache_read_tokens),
            previous
                .accumulated_cache_write
                .saturating_add(call.cache_write_tokens),
        )
    } else {
        (
            previous.accumulated_cache_read,
            previous.accumulated_cache_write,
        )
    };

    let delta = Counters {
        input: total_input.saturating_sub(previous.last_total_input),
        output: total_output.saturating_sub(previous.last_total_output),
        cache_read: cache_read - previous.accumulated_cache_read,
        cache_write: cache_write - previous.accumulated_cache_write,
    };

    let record = SessionRecord {
        last_total_input: total_input,
        last_total_output: total_output,
        accumulated_cache_read: cache_read,
        accumulated_cache_write: cache_write,
        last_boundary_input: total_input,
        last_cache_read_snapshot: call.cache_read_tokens,
        last_cache_write_snapshot: call.cache_write_tokens,
    };

    SessionUpdate {
        boundary,
        delta,
        record,
    }
}
