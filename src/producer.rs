//! The publishing side of the pipeline: claim a sequence, write the slot in
//! place, publish it.

use crate::error::PublishError;
use crate::pipeline::Core;
use crate::sequencer::Sequence;
use crate::wait::Backoff;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Handle for publishing events into the pipeline.
///
/// The handle is `Send` (move it to whichever thread produces) but the
/// methods take `&mut self` and there is exactly one handle per pipeline:
/// the sequencer's reservation counter has a single writer by construction.
pub struct Producer<E> {
    core: Arc<Core<E>>,
}

// Note: Producer intentionally does NOT implement Clone.
// A second handle would mean two threads racing the producer-private
// reservation counter, breaking the single-writer protocol that makes the
// claim path lock-free.

impl<E> Producer<E> {
    pub(crate) fn new(core: Arc<Core<E>>) -> Self {
        Self { core }
    }

    /// Publishes one event by writing the claimed slot in place.
    ///
    /// Blocks (adaptive spin, then yield) while the ring is a full lap ahead
    /// of the slowest consumer; that backpressure is a normal condition, not
    /// an error. Returns the published sequence.
    ///
    /// # Errors
    ///
    /// [`PublishError::Halted`] once the pipeline has been halted - the
    /// consumers are gone, so nothing would ever observe the slot.
    pub fn publish<F>(&mut self, write: F) -> Result<Sequence, PublishError>
    where
        F: FnOnce(&mut E),
    {
        let sequence = self.claim()?;

        // SAFETY: we hold the claim for `sequence`: gating guarantees every
        // consumer has moved past the slot this sequence maps to, and the
        // slot only becomes visible again at the publish below.
        unsafe { write(self.core.ring.slot_mut(sequence)) };

        self.core.sequencer.publish(sequence);
        if self.core.config.enable_metrics {
            self.core.metrics.add_events_published(1);
        }
        Ok(sequence)
    }

    /// Publishes one event by overwriting the slot wholesale (convenience).
    pub fn push(&mut self, event: E) -> Result<Sequence, PublishError> {
        self.publish(|slot| *slot = event)
    }

    /// Claims the next sequence, stalling while gated.
    fn claim(&mut self) -> Result<Sequence, PublishError> {
        let mut backoff = Backoff::new();
        loop {
            if self.core.halted.load(Ordering::Acquire) {
                return Err(PublishError::Halted);
            }
            if let Some(sequence) = self.core.sequencer.try_claim() {
                return Ok(sequence);
            }
            if self.core.config.enable_metrics {
                self.core.metrics.add_publish_stalls(1);
            }
            backoff.snooze();
        }
    }
}
