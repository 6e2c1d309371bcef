use crate::invariants::{debug_assert_claim_gated, debug_assert_monotonic};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Monotonically increasing 64-bit identifier assigned to each published
/// event. Never reused; wrap-around is purely a slot-index concern.
pub type Sequence = i64;

/// Cursor value meaning "nothing ever published".
pub(crate) const INITIAL_SEQUENCE: Sequence = -1;

/// A cache-line-isolated atomic sequence counter.
///
/// 128-byte alignment keeps two sequences out of each other's way even on
/// CPUs that prefetch adjacent cache lines. One of these sits between every
/// consumer and the producer (the gating sequences) and one is the
/// publication cursor itself.
#[repr(align(128))]
#[derive(Debug)]
pub struct AtomicSequence {
    value: AtomicI64,
}

impl AtomicSequence {
    /// Creates a sequence with an initial value.
    pub fn new(initial: Sequence) -> Self {
        Self {
            value: AtomicI64::new(initial),
        }
    }

    /// Returns the current value (Acquire).
    ///
    /// Pairs with [`set`](Self::set): an observed value carries all writes
    /// that happened before the matching store.
    #[inline]
    pub fn get(&self) -> Sequence {
        self.value.load(Ordering::Acquire)
    }

    /// Stores a new value (Release).
    #[inline]
    pub fn set(&self, value: Sequence) {
        self.value.store(value, Ordering::Release);
    }
}

impl Default for AtomicSequence {
    fn default() -> Self {
        Self::new(INITIAL_SEQUENCE)
    }
}

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// The sequencer carries the pipeline's entire publication protocol:
//
// **Producer (claim + publish path):**
// 1. Load `next_value` and `cached_gate` with no ordering (UnsafeCell,
//    single-writer: only the producer thread touches them)
// 2. If the cached gate is too far behind: refresh it from the consumer
//    gating sequences with Acquire loads (synchronizes with each consumer's
//    Release progress store)
// 3. Write the claimed slot (no ordering needed - protected by the protocol)
// 4. Store the cursor with Release (publishes the slot write to consumers)
//
// **Consumer (read path):**
// 1. Load the cursor with Acquire (synchronizes with the producer's Release)
// 2. Read slots up to the cursor (no ordering needed)
// 3. Store own gating sequence with Release (publishes consumption, which
//    the producer's gate refresh observes before reusing slots)
//
// This is the publication edge: every per-slot write happens-before the
// cursor Release store, and that store synchronizes-with every Acquire
// cursor load that observes it.
//
// ## Single-Writer Invariants
//
// `next_value` and `cached_gate` are accessed via UnsafeCell without atomics
// because they have exactly one writer: the single Producer handle, which is
// not Clone and claims through `&mut self`.
//
// =============================================================================

/// Atomic publication cursor plus the single-producer reservation state.
///
/// The cursor is the highest *published* sequence; the reservation counter
/// (`next_value`) is deliberately separate so that claiming a sequence never
/// exposes an unwritten slot.
pub struct Sequencer {
    /// Highest published sequence, visible to every consumer.
    cursor: AtomicSequence,
    /// Next sequence to hand out. Producer-side only.
    next_value: UnsafeCell<Sequence>,
    /// Cached minimum of the gating sequences. Producer-side only.
    cached_gate: UnsafeCell<Sequence>,
    /// One gating sequence per consumer; each tracks that consumer's
    /// committed progress.
    gating: Box<[Arc<AtomicSequence>]>,
    capacity: i64,
}

// Safety: the UnsafeCell fields follow the single-writer protocol above;
// everything else is atomic or immutable after construction.
unsafe impl Sync for Sequencer {}

impl Sequencer {
    pub(crate) fn new(capacity: usize, gating: Box<[Arc<AtomicSequence>]>) -> Self {
        Self {
            cursor: AtomicSequence::default(),
            next_value: UnsafeCell::new(0),
            cached_gate: UnsafeCell::new(INITIAL_SEQUENCE),
            gating,
            capacity: capacity as i64,
        }
    }

    /// Returns the highest published sequence (Acquire).
    #[inline]
    pub fn cursor(&self) -> Sequence {
        self.cursor.get()
    }

    /// Claims the next sequence, or returns `None` if the claim would move
    /// more than one full lap ahead of the slowest consumer (the slot it
    /// maps to still holds an unread event).
    ///
    /// Fast path checks a cached gate minimum to avoid cross-core reads;
    /// the slow path refreshes the cache from the gating sequences.
    pub(crate) fn try_claim(&self) -> Option<Sequence> {
        // SAFETY: next_value and cached_gate are only touched by the single
        // producer (this code path); unsynchronized access is the protocol.
        let next = unsafe { *self.next_value.get() };
        let cached_gate = unsafe { *self.cached_gate.get() };

        if next - cached_gate <= self.capacity {
            unsafe { *self.next_value.get() = next + 1 };
            return Some(next);
        }

        // Slow path: refresh the gate from the consumer sequences.
        let gate = self.min_gate();
        // SAFETY: single-writer, as above. The Acquire loads in min_gate
        // synchronize with each consumer's Release progress store.
        unsafe { *self.cached_gate.get() = gate };

        if next - gate > self.capacity {
            return None;
        }

        debug_assert_claim_gated!(next, gate, self.capacity);
        unsafe { *self.next_value.get() = next + 1 };
        Some(next)
    }

    /// Makes `sequence` visible to consumers (Release store to the cursor).
    ///
    /// The producer must have finished writing the slot for `sequence`
    /// before calling this; the Release store is what carries those writes
    /// to any consumer that observes `cursor() >= sequence`.
    #[inline]
    pub(crate) fn publish(&self, sequence: Sequence) {
        debug_assert_monotonic!("cursor", self.cursor.get(), sequence);
        self.cursor.set(sequence);
    }

    /// Committed progress of the slowest consumer.
    fn min_gate(&self) -> Sequence {
        self.gating
            .iter()
            .map(|sequence| sequence.get())
            .min()
            .unwrap_or(Sequence::MAX)
    }
}
