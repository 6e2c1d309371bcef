//! Debug assertion macros for the pipeline's concurrency invariants.
//!
//! Only active in debug builds (`debug_assert!`), so there is zero overhead
//! on the release hot path. Release builds enforce these invariants by
//! construction, not by runtime checks.

// =============================================================================
// INV-CAP-01: Power-Of-Two Capacity
// =============================================================================

/// Assert that a ring capacity is a positive power of two.
///
/// **Invariant**: `capacity > 0 && capacity & (capacity - 1) == 0`
///
/// Used in: `RingBuffer::new()`. Public construction validates capacity with
/// a real error; this catches internal callers bypassing validation.
macro_rules! debug_assert_power_of_two {
    ($capacity:expr) => {
        debug_assert!(
            $capacity > 0 && ($capacity & ($capacity - 1)) == 0,
            "INV-CAP-01 violated: capacity {} is not a positive power of two",
            $capacity
        )
    };
}

// =============================================================================
// INV-CUR-01: Monotonic Cursor
// =============================================================================

/// Assert that a sequence value only increases.
///
/// **Invariant**: `new_value >= old_value`
///
/// Used in: `Sequencer::publish()` for the cursor.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "INV-CUR-01 violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-GATE-01: Single Lap
// =============================================================================

/// Assert that a claim stays within one lap of the slowest consumer.
///
/// **Invariant**: `claim - min(consumer sequences) <= capacity`
///
/// Used in: `Sequencer::try_claim()` after the gate refresh.
macro_rules! debug_assert_claim_gated {
    ($claim:expr, $gate:expr, $capacity:expr) => {
        debug_assert!(
            $claim - $gate <= $capacity,
            "INV-GATE-01 violated: claim {} laps the slowest consumer at {} (capacity {})",
            $claim,
            $gate,
            $capacity
        )
    };
}

// =============================================================================
// INV-PUB-01: Published Reads Only
// =============================================================================

/// Assert that a consumer only reads sequences at or below the cursor.
///
/// **Invariant**: `sequence <= cursor` for every slot read
///
/// Used in: `EventProcessor::drain()` before each slot access.
macro_rules! debug_assert_published_read {
    ($sequence:expr, $cursor:expr) => {
        debug_assert!(
            $sequence <= $cursor,
            "INV-PUB-01 violated: reading sequence {} above published cursor {}",
            $sequence,
            $cursor
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_claim_gated;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_power_of_two;
pub(crate) use debug_assert_published_read;
