//! RingSPMC - Lock-Free Single-Producer Multi-Consumer Event Pipeline
//!
//! A Disruptor-style in-process pipeline: one preallocated ring buffer, one
//! atomic publication cursor, and any number of consumers that each track
//! their own read position. Every consumer independently observes every
//! event, in publication order, without locks.
//!
//! # Key Features
//!
//! - 128-byte-aligned sequence counters (prefetcher false sharing elimination)
//! - Preallocated slots written in place (zero allocation per event)
//! - Batch draining (one Acquire load and one Release store per batch)
//! - Wrap-around gating (a producer never overwrites an unread slot)
//! - Pluggable wait strategies (busy-spin, yield, bounded backoff)
//! - Worker threads are owned and joined, never detached
//!
//! # Example
//!
//! ```
//! use ringspmc_rs::PipelineBuilder;
//!
//! let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
//!     .capacity(1024)
//!     .handler(|event: &u64, _sequence: i64| {
//!         let _ = event;
//!     })
//!     .build()
//!     .unwrap();
//!
//! pipeline.start().unwrap();
//!
//! // Simple API: push() overwrites the next slot
//! producer.push(42).unwrap();
//!
//! // In-place API: write the claimed slot directly
//! producer.publish(|slot| *slot = 43).unwrap();
//!
//! pipeline.halt();
//! assert_eq!(pipeline.cursor(), 1);
//! ```

mod config;
mod error;
mod invariants;
mod metrics;
mod pipeline;
mod processor;
mod producer;
mod ring;
mod sequencer;
mod wait;

pub use config::{Config, FaultPolicy};
pub use error::{BuildError, HandlerError, PipelineError, PublishError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use processor::EventHandler;
pub use producer::Producer;
pub use ring::RingBuffer;
pub use sequencer::{AtomicSequence, Sequence, Sequencer};
pub use wait::{Backoff, WaitStrategy};
