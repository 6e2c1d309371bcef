//! Consumer workers: each event processor runs on a dedicated OS thread,
//! draining published slots in sequence order and applying a user handler.

use crate::config::FaultPolicy;
use crate::error::HandlerError;
use crate::invariants::debug_assert_published_read;
use crate::pipeline::Core;
use crate::sequencer::{AtomicSequence, Sequence};
use crate::wait::Waiter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// User-supplied consumer logic, invoked once per published event in strict
/// ascending sequence order.
///
/// Handlers run on the processor's worker thread. Keep `on_event` short;
/// every event the handler dwells on is an event the producer may be gated
/// behind.
///
/// Plain closures work too: any `FnMut(&E, Sequence) + Send` is an
/// infallible handler.
pub trait EventHandler<E>: Send {
    /// Called for every published event. A returned error is routed through
    /// the pipeline's [`FaultPolicy`](crate::FaultPolicy).
    fn on_event(&mut self, event: &E, sequence: Sequence) -> Result<(), HandlerError>;

    /// Called once on the worker thread before the first event.
    fn on_start(&mut self) {}

    /// Called once on the worker thread after the last event, whether the
    /// processor halted or stopped on a fault.
    fn on_shutdown(&mut self) {}
}

impl<E, F> EventHandler<E> for F
where
    F: FnMut(&E, Sequence) + Send,
{
    fn on_event(&mut self, event: &E, sequence: Sequence) -> Result<(), HandlerError> {
        self(event, sequence);
        Ok(())
    }
}

/// A consumer worker: owns its private read position and drains slots up to
/// the cursor, idling through its wait strategy when caught up.
pub(crate) struct EventProcessor<E> {
    id: usize,
    /// Next sequence to read. Private to the worker thread, never shared.
    next_sequence: Sequence,
    handler: Box<dyn EventHandler<E>>,
    core: Arc<Core<E>>,
    /// Lowered by `Pipeline::halt` (Release); read here (Acquire).
    running: Arc<AtomicBool>,
    /// Committed progress, published per batch. Gates the producer.
    sequence: Arc<AtomicSequence>,
    /// Sequence of the first failure under `FaultPolicy::Stop`; -1 = none.
    fault: Arc<AtomicSequence>,
    waiter: Waiter,
}

impl<E: Send + 'static> EventProcessor<E> {
    pub(crate) fn new(
        id: usize,
        handler: Box<dyn EventHandler<E>>,
        core: Arc<Core<E>>,
        running: Arc<AtomicBool>,
        sequence: Arc<AtomicSequence>,
        fault: Arc<AtomicSequence>,
        waiter: Waiter,
    ) -> Self {
        Self {
            id,
            next_sequence: 0,
            handler,
            core,
            running,
            sequence,
            fault,
            waiter,
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Worker main loop.
    ///
    /// Each iteration: load the cursor (Acquire), drain everything published,
    /// then either observe the halt flag or idle. On halt the cursor is
    /// re-loaded once more so that every publish that happened before the
    /// halt signal is drained before the thread exits.
    pub(crate) fn run(mut self) {
        self.handler.on_start();
        loop {
            let available = self.core.sequencer.cursor();
            if self.next_sequence <= available {
                if !self.drain(available) {
                    break;
                }
                self.waiter.reset();
                continue;
            }

            if !self.running.load(Ordering::Acquire) {
                let available = self.core.sequencer.cursor();
                if self.next_sequence <= available {
                    self.drain(available);
                }
                break;
            }

            self.waiter.idle();
        }
        self.handler.on_shutdown();
    }

    /// Processes every slot in `[next_sequence, available]` and publishes
    /// progress once for the whole batch (one Release store, no atomics in
    /// the loop). Returns `false` if the processor must stop.
    fn drain(&mut self, available: Sequence) -> bool {
        let first = self.next_sequence;

        while self.next_sequence <= available {
            let sequence = self.next_sequence;
            debug_assert_published_read!(sequence, available);

            // SAFETY: `sequence` is at or below the published cursor, so the
            // producer's slot writes happened-before our Acquire cursor load,
            // and gating keeps the producer from reclaiming this slot until
            // our gating sequence advances past it.
            let event = unsafe { self.core.ring.slot(sequence) };

            if let Err(error) = self.handler.on_event(event, sequence) {
                if let Some(on_fault) = &self.core.on_fault {
                    on_fault(self.id, sequence, &error);
                }
                match self.core.config.fault_policy {
                    FaultPolicy::Skip => {
                        if self.core.config.enable_metrics {
                            self.core.metrics.add_handler_faults(1);
                        }
                    }
                    FaultPolicy::Stop => {
                        self.fault.set(sequence);
                        // A stopped consumer must not gate the producer forever.
                        self.sequence.set(Sequence::MAX);
                        return false;
                    }
                }
            }

            self.next_sequence += 1;
        }

        self.sequence.set(available);
        if self.core.config.enable_metrics {
            self.core
                .metrics
                .add_events_processed((available - first + 1) as u64);
        }
        true
    }
}
