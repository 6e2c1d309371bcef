//! Idle policies for consumers that have caught up to the cursor, and the
//! adaptive backoff used by a producer gated behind a slow consumer.

use crate::error::BuildError;
use std::hint;
use std::thread;
use std::time::Duration;

/// Policy describing how an event processor idles when it has caught up to
/// the publication cursor.
///
/// Every variant is bounded: a waiting processor re-checks the cursor after
/// at most `max` (for `Backoff`) or immediately (for the others), so halt
/// latency is bounded by the strategy's longest idle interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Re-check immediately, burning a core. Lowest latency, highest CPU.
    BusySpin,
    /// Surrender the timeslice to the scheduler between checks.
    Yield,
    /// Sleep for a doubling duration between checks, reset when work appears.
    Backoff {
        /// First sleep after running dry.
        min: Duration,
        /// Upper bound on any single sleep.
        max: Duration,
    },
}

impl WaitStrategy {
    /// Parking strategy with defaults suited to sub-millisecond pipelines.
    pub const fn backoff() -> Self {
        Self::Backoff {
            min: Duration::from_micros(1),
            max: Duration::from_millis(1),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        if let Self::Backoff { min, max } = self {
            if min.is_zero() || min > max {
                return Err(BuildError::InvalidBackoff {
                    min: *min,
                    max: *max,
                });
            }
        }
        Ok(())
    }
}

impl Default for WaitStrategy {
    fn default() -> Self {
        Self::Yield
    }
}

/// Per-processor wait state. Only `Backoff` carries state across calls.
#[derive(Debug)]
pub(crate) struct Waiter {
    strategy: WaitStrategy,
    delay: Duration,
}

impl Waiter {
    pub(crate) fn new(strategy: WaitStrategy) -> Self {
        let delay = match strategy {
            WaitStrategy::Backoff { min, .. } => min,
            _ => Duration::ZERO,
        };
        Self { strategy, delay }
    }

    /// Idle once. Returns after a bounded time; acquires no locks.
    pub(crate) fn idle(&mut self) {
        match self.strategy {
            WaitStrategy::BusySpin => hint::spin_loop(),
            WaitStrategy::Yield => thread::yield_now(),
            WaitStrategy::Backoff { max, .. } => {
                thread::sleep(self.delay);
                self.delay = (self.delay * 2).min(max);
            }
        }
    }

    /// Reset backoff state after progress was made.
    pub(crate) fn reset(&mut self) {
        if let WaitStrategy::Backoff { min, .. } = self.strategy {
            self.delay = min;
        }
    }
}

/// Adaptive backoff for the producer side (Crossbeam-style).
///
/// Progressively increases wait time: spin with PAUSE, then yield to the OS.
/// Unlike a consumer waiter this never sleeps - a gated producer wants to
/// resume the instant the slowest consumer advances - and never gives up,
/// because being gated is a normal backpressure condition.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 spins max before yielding

    /// Creates a new backoff instance.
    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Back off once: light spin with PAUSE hints, escalating to yields.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            let spins = 1 << self.step;
            for _ in 0..spins {
                hint::spin_loop();
            }
            self.step += 1;
        } else {
            thread::yield_now();
        }
    }

    /// Reset for the next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
