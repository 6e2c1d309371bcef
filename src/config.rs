use crate::error::BuildError;
use crate::wait::WaitStrategy;

/// What an event processor does when its handler fails on a slot.
///
/// Either way the pipeline's fault callback (if any) is invoked first;
/// failures are never silently discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Terminate the processor, recording the failing sequence. The
    /// processor's gating sequence is raised so a dead consumer cannot
    /// stall the producer forever.
    #[default]
    Stop,
    /// Count the failure and advance past the slot.
    Skip,
}

/// Configuration for a pipeline.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Ring capacity in slots. Must be a positive power of two.
    pub capacity: usize,
    /// How consumers idle when caught up to the cursor.
    pub wait_strategy: WaitStrategy,
    /// Handler failure policy.
    pub fault_policy: FaultPolicy,
    /// Enable metrics collection (slight overhead).
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a configuration with the given capacity and default policies.
    ///
    /// The capacity is validated at build time, not here, so that a bad
    /// value surfaces as [`BuildError::InvalidCapacity`] rather than a panic.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Sets the wait strategy.
    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategy) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    /// Sets the fault policy.
    pub fn with_fault_policy(mut self, fault_policy: FaultPolicy) -> Self {
        self.fault_policy = fault_policy;
        self
    }

    /// Enables or disables metrics collection.
    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    /// Returns the mask for slot index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity - 1
    }

    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        if self.capacity == 0 || !self.capacity.is_power_of_two() {
            return Err(BuildError::InvalidCapacity { got: self.capacity });
        }
        self.wait_strategy.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1024,
            wait_strategy: WaitStrategy::default(),
            fault_policy: FaultPolicy::default(),
            enable_metrics: false,
        }
    }
}
