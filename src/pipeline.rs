//! The pipeline facade: wires the ring, the sequencer, the processors and
//! the producer together, owns the worker threads, coordinates start and
//! halt.

use crate::config::Config;
use crate::error::{BuildError, HandlerError, PipelineError};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::processor::{EventHandler, EventProcessor};
use crate::producer::Producer;
use crate::ring::RingBuffer;
use crate::sequencer::{AtomicSequence, Sequence, Sequencer};
use crate::wait::{WaitStrategy, Waiter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Pipeline-wide handler fault callback: `(processor id, failing sequence,
/// error)`.
pub(crate) type FaultCallback = Arc<dyn Fn(usize, Sequence, &HandlerError) + Send + Sync>;

/// Everything the producer and the processors share.
///
/// The pipeline constructs exactly one `Core` and hands out `Arc` clones;
/// joining the workers in `halt` makes teardown deterministic rather than
/// refcount-timed.
pub(crate) struct Core<E> {
    pub(crate) ring: RingBuffer<E>,
    pub(crate) sequencer: Sequencer,
    /// Raised by `Pipeline::halt`. Read by a stalled producer so it cannot
    /// spin forever against consumers that have already exited.
    pub(crate) halted: AtomicBool,
    pub(crate) metrics: Metrics,
    pub(crate) config: Config,
    pub(crate) on_fault: Option<FaultCallback>,
}

/// Per-processor handles the pipeline keeps for signalling and observation.
struct ProcessorControl {
    running: Arc<AtomicBool>,
    fault: Arc<AtomicSequence>,
}

/// Builder for a [`Pipeline`] and its single [`Producer`].
pub struct PipelineBuilder<E> {
    config: Config,
    producer_count: usize,
    factory: Box<dyn FnMut() -> E>,
    handlers: Vec<Box<dyn EventHandler<E> + 'static>>,
    on_fault: Option<FaultCallback>,
}

impl<E: Send + Default + 'static> PipelineBuilder<E> {
    /// Creates a builder whose slots are initialized with `E::default()`.
    pub fn new() -> Self {
        Self::with_factory(E::default)
    }
}

impl<E: Send + Default + 'static> Default for PipelineBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send + 'static> PipelineBuilder<E> {
    /// Creates a builder with an explicit event factory for slot
    /// preallocation.
    pub fn with_factory(factory: impl FnMut() -> E + 'static) -> Self {
        Self {
            config: Config::default(),
            producer_count: 1,
            factory: Box::new(factory),
            handlers: Vec::new(),
            on_fault: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the ring capacity (must be a positive power of two).
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Sets the consumer wait strategy.
    pub fn wait_strategy(mut self, wait_strategy: WaitStrategy) -> Self {
        self.config.wait_strategy = wait_strategy;
        self
    }

    /// Sets the handler fault policy.
    pub fn fault_policy(mut self, fault_policy: crate::FaultPolicy) -> Self {
        self.config.fault_policy = fault_policy;
        self
    }

    /// Enables metrics collection.
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.config.enable_metrics = enable;
        self
    }

    /// Sets the producer count. Only `1` is supported; the option exists so
    /// callers that may grow a multi-producer setup fail loudly today.
    pub fn producer_count(mut self, count: usize) -> Self {
        self.producer_count = count;
        self
    }

    /// Installs a callback invoked whenever a handler fails, before the
    /// fault policy is applied.
    pub fn on_fault(
        mut self,
        callback: impl Fn(usize, Sequence, &HandlerError) + Send + Sync + 'static,
    ) -> Self {
        self.on_fault = Some(Arc::new(callback));
        self
    }

    /// Appends a consumer. Each handler gets its own event processor and
    /// worker thread, and independently observes every published event.
    pub fn handler(mut self, handler: impl EventHandler<E> + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Validates the configuration and wires the pipeline.
    pub fn build(mut self) -> Result<(Pipeline<E>, Producer<E>), BuildError> {
        self.config.validate()?;
        if self.handlers.is_empty() {
            return Err(BuildError::NoHandlers);
        }
        if self.producer_count != 1 {
            return Err(BuildError::UnsupportedProducerCount {
                got: self.producer_count,
            });
        }

        let gating: Vec<Arc<AtomicSequence>> = (0..self.handlers.len())
            .map(|_| Arc::new(AtomicSequence::default()))
            .collect();

        let core = Arc::new(Core {
            ring: RingBuffer::new(self.config.capacity, &mut *self.factory),
            sequencer: Sequencer::new(self.config.capacity, gating.clone().into_boxed_slice()),
            halted: AtomicBool::new(false),
            metrics: Metrics::new(),
            config: self.config,
            on_fault: self.on_fault,
        });

        let mut pending = Vec::with_capacity(self.handlers.len());
        let mut controls = Vec::with_capacity(self.handlers.len());
        for (id, handler) in self.handlers.into_iter().enumerate() {
            let running = Arc::new(AtomicBool::new(true));
            let fault = Arc::new(AtomicSequence::default());
            controls.push(ProcessorControl {
                running: Arc::clone(&running),
                fault: Arc::clone(&fault),
            });
            pending.push(EventProcessor::new(
                id,
                handler,
                Arc::clone(&core),
                running,
                Arc::clone(&gating[id]),
                fault,
                Waiter::new(self.config.wait_strategy),
            ));
        }

        let producer = Producer::new(Arc::clone(&core));
        let pipeline = Pipeline {
            core,
            pending,
            controls,
            workers: Vec::new(),
            started: false,
        };
        Ok((pipeline, producer))
    }
}

/// The assembled pipeline: owns the shared core and the consumer worker
/// threads.
///
/// Threads are always retained and joined, never detached: `halt` signals
/// every processor, joins every worker, and dropping the pipeline halts it
/// implicitly, so the ring and sequencer are guaranteed to outlive every
/// thread that references them.
pub struct Pipeline<E> {
    core: Arc<Core<E>>,
    /// Processors constructed at build time, consumed by `start`.
    pending: Vec<EventProcessor<E>>,
    controls: Vec<ProcessorControl>,
    workers: Vec<JoinHandle<()>>,
    started: bool,
}

impl<E: Send + Default + 'static> Pipeline<E> {
    /// Shorthand for [`PipelineBuilder::new`].
    pub fn builder() -> PipelineBuilder<E> {
        PipelineBuilder::new()
    }
}

impl<E: Send + 'static> Pipeline<E> {
    /// Spawns one worker thread per event processor.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AlreadyStarted`] on a second call - processors
    /// cannot be restarted.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.started {
            return Err(PipelineError::AlreadyStarted);
        }
        self.started = true;

        for processor in self.pending.drain(..) {
            let name = format!("event-processor-{}", processor.id());
            let handle = thread::Builder::new()
                .name(name)
                .spawn(move || processor.run())?;
            self.workers.push(handle);
        }
        Ok(())
    }
}

impl<E> Pipeline<E> {
    /// Signals every processor to stop, then joins every worker thread.
    ///
    /// Events already published when the halt is signalled are drained
    /// before the workers exit. Idempotent; a no-op if the pipeline never
    /// started.
    pub fn halt(&mut self) {
        if !self.started {
            return;
        }

        self.core.halted.store(true, Ordering::Release);
        for control in &self.controls {
            control.running.store(false, Ordering::Release);
        }
        for worker in self.workers.drain(..) {
            // A panicked handler already tore its processor down; there is
            // nothing more to unwind here.
            let _ = worker.join();
        }
    }

    /// Highest published sequence, -1 if nothing was ever published.
    pub fn cursor(&self) -> Sequence {
        self.core.sequencer.cursor()
    }

    /// Returns `true` while worker threads are live.
    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Number of event processors.
    pub fn processor_count(&self) -> usize {
        self.controls.len()
    }

    /// The sequence at which the given processor's handler failed under
    /// [`FaultPolicy::Stop`](crate::FaultPolicy::Stop), if it did.
    pub fn fault_sequence(&self, processor: usize) -> Option<Sequence> {
        let fault = self.controls.get(processor)?.fault.get();
        (fault >= 0).then_some(fault)
    }

    /// Snapshot of the pipeline metrics (all zeros unless enabled).
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.core.config.enable_metrics {
            self.core.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl<E> Drop for Pipeline<E> {
    fn drop(&mut self) {
        self.halt();
    }
}
