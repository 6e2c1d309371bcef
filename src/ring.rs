use crate::invariants::debug_assert_power_of_two;
use crate::sequencer::Sequence;
use std::cell::UnsafeCell;

/// Preallocated, fixed-capacity slot storage indexed by sequence number.
///
/// Pure storage: all visibility and exclusivity rules live in the
/// [`Sequencer`](crate::Sequencer), which is the single source of truth for
/// which slots may be read or written. The ring itself carries no counters
/// and no synchronization.
///
/// Slots exist for the lifetime of the ring. Producers and consumers mutate
/// and read them in place; events are never allocated or freed per message.
pub struct RingBuffer<E> {
    /// The slot array.
    ///
    /// Uses `Box<[_]>` instead of `Vec<_>` because the size is fixed at
    /// construction and never grows.
    slots: Box<[UnsafeCell<E>]>,
    /// Capacity minus one; capacity is a power of two.
    mask: usize,
}

// Safety: RingBuffer hands out references to slots across threads. The
// sequencer's publication protocol guarantees a slot is never written and
// read concurrently: the producer has exclusive access between claim and
// publish, consumers only read at or below the published cursor, and gating
// keeps the producer a full lap away from any unread slot.
unsafe impl<E: Send> Send for RingBuffer<E> {}
unsafe impl<E: Send> Sync for RingBuffer<E> {}

impl<E> RingBuffer<E> {
    /// Creates a ring with every slot initialized from the factory.
    pub(crate) fn new<F: FnMut() -> E>(capacity: usize, mut factory: F) -> Self {
        debug_assert_power_of_two!(capacity);

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || UnsafeCell::new(factory()));

        Self {
            slots: slots.into_boxed_slice(),
            mask: capacity - 1,
        }
    }

    /// Returns the ring capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Maps a sequence to its slot index.
    #[inline]
    fn index(&self, sequence: Sequence) -> usize {
        (sequence as usize) & self.mask
    }

    /// Returns a shared reference to the slot for `sequence`.
    ///
    /// # Safety
    ///
    /// The caller must have observed a published cursor `>= sequence`, and
    /// the producer must still be gated behind this consumer (both are
    /// guaranteed inside an event processor's drain loop). Otherwise the
    /// slot may be concurrently written.
    #[inline]
    pub(crate) unsafe fn slot(&self, sequence: Sequence) -> &E {
        &*self.slots[self.index(sequence)].get()
    }

    /// Returns an exclusive reference to the slot for `sequence`.
    ///
    /// # Safety
    ///
    /// The caller must hold the claim for `sequence` (obtained from
    /// `Sequencer::try_claim` and not yet published). The claim window is
    /// the only time a slot may be mutated.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn slot_mut(&self, sequence: Sequence) -> &mut E {
        &mut *self.slots[self.index(sequence)].get()
    }
}
