use rand::Rng;
use ringspmc_rs::{
    BuildError, EventHandler, FaultPolicy, HandlerError, PipelineBuilder, PipelineError,
    PublishError, Sequence, WaitStrategy,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

type Seen<T> = Arc<Mutex<Vec<T>>>;

fn collector<T: Clone + Send + 'static>() -> (Seen<T>, impl FnMut(&T, Sequence) + Send) {
    let seen: Seen<T> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler = move |event: &T, _sequence: Sequence| {
        sink.lock().unwrap().push(event.clone());
    };
    (seen, handler)
}

#[test]
fn test_basic_spsc() {
    let (seen, handler) = collector::<String>();
    let (mut pipeline, mut producer) = PipelineBuilder::<String>::new()
        .capacity(1024)
        .handler(handler)
        .build()
        .unwrap();

    assert_eq!(pipeline.cursor(), -1);
    pipeline.start().unwrap();

    producer.push("Event 0".to_string()).unwrap();
    producer.push("Event 1".to_string()).unwrap();
    assert_eq!(pipeline.cursor(), 1);

    pipeline.halt();
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["Event 0".to_string(), "Event 1".to_string()]
    );
}

#[test]
fn test_spmc_independent_consumers() {
    let (seen_a, handler_a) = collector::<String>();
    let (seen_b, handler_b) = collector::<String>();
    let (mut pipeline, mut producer) = PipelineBuilder::<String>::new()
        .capacity(1024)
        .handler(handler_a)
        .handler(handler_b)
        .build()
        .unwrap();

    assert_eq!(pipeline.processor_count(), 2);
    pipeline.start().unwrap();

    producer.push("Event 0".to_string()).unwrap();
    producer.push("Event 1".to_string()).unwrap();
    assert_eq!(pipeline.cursor(), 1);

    pipeline.halt();

    let expected = vec!["Event 0".to_string(), "Event 1".to_string()];
    assert_eq!(*seen_a.lock().unwrap(), expected);
    assert_eq!(*seen_b.lock().unwrap(), expected);
}

#[test]
fn test_halt_drains_published_events() {
    let (seen_a, handler_a) = collector::<u64>();
    let (seen_b, handler_b) = collector::<u64>();
    let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
        .capacity(1024)
        .wait_strategy(WaitStrategy::backoff())
        .handler(handler_a)
        .handler(handler_b)
        .build()
        .unwrap();

    pipeline.start().unwrap();
    for i in 0..100u64 {
        producer.push(i).unwrap();
    }

    // Halt immediately: everything published before the signal must still
    // be delivered before the workers exit.
    pipeline.halt();
    assert!(!pipeline.is_running());

    let expected: Vec<u64> = (0..100).collect();
    assert_eq!(*seen_a.lock().unwrap(), expected);
    assert_eq!(*seen_b.lock().unwrap(), expected);
}

#[test]
fn test_wrap_around_small_ring() {
    let (seen, handler) = collector::<u64>();
    let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
        .capacity(4)
        .handler(handler)
        .build()
        .unwrap();

    pipeline.start().unwrap();

    // Sequences 0..16 exercise every residue class of the slot mask four
    // times over.
    for i in 0..16u64 {
        producer.push(i).unwrap();
    }

    pipeline.halt();
    assert_eq!(pipeline.cursor(), 15);
    assert_eq!(*seen.lock().unwrap(), (0..16).collect::<Vec<u64>>());
}

#[test]
fn test_slow_consumer_loses_nothing() {
    let seen: Seen<u64> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler = move |event: &u64, _sequence: Sequence| {
        // Jittered dawdling, slower than the producer by design.
        let delay = rand::thread_rng().gen_range(0..50);
        if delay > 0 {
            thread::sleep(Duration::from_micros(delay));
        }
        sink.lock().unwrap().push(*event);
    };

    let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
        .capacity(8)
        .handler(handler)
        .build()
        .unwrap();

    pipeline.start().unwrap();

    // The producer outruns the consumer by far; gating must stall it at
    // each lap so that no event is overwritten before it is read.
    for i in 0..1000u64 {
        producer.push(i).unwrap();
    }

    pipeline.halt();
    assert_eq!(*seen.lock().unwrap(), (0..1000).collect::<Vec<u64>>());
}

#[test]
fn test_invalid_capacity() {
    let result = PipelineBuilder::<u64>::new()
        .capacity(6)
        .handler(|_: &u64, _: Sequence| {})
        .build();
    assert!(matches!(
        result.err(),
        Some(BuildError::InvalidCapacity { got: 6 })
    ));

    let result = PipelineBuilder::<u64>::new()
        .capacity(0)
        .handler(|_: &u64, _: Sequence| {})
        .build();
    assert!(matches!(
        result.err(),
        Some(BuildError::InvalidCapacity { got: 0 })
    ));
}

#[test]
fn test_build_requires_handlers() {
    let result = PipelineBuilder::<u64>::new().capacity(16).build();
    assert!(matches!(result.err(), Some(BuildError::NoHandlers)));
}

#[test]
fn test_build_rejects_bad_backoff() {
    let result = PipelineBuilder::<u64>::new()
        .capacity(16)
        .wait_strategy(WaitStrategy::Backoff {
            min: Duration::from_millis(2),
            max: Duration::from_millis(1),
        })
        .handler(|_: &u64, _: Sequence| {})
        .build();
    assert!(matches!(
        result.err(),
        Some(BuildError::InvalidBackoff { .. })
    ));
}

#[test]
fn test_build_rejects_multiple_producers() {
    let result = PipelineBuilder::<u64>::new()
        .capacity(16)
        .producer_count(2)
        .handler(|_: &u64, _: Sequence| {})
        .build();
    assert!(matches!(
        result.err(),
        Some(BuildError::UnsupportedProducerCount { got: 2 })
    ));
}

#[test]
fn test_start_is_not_idempotent() {
    let (mut pipeline, _producer) = PipelineBuilder::<u64>::new()
        .capacity(16)
        .handler(|_: &u64, _: Sequence| {})
        .build()
        .unwrap();

    pipeline.start().unwrap();
    assert!(matches!(
        pipeline.start(),
        Err(PipelineError::AlreadyStarted)
    ));
    pipeline.halt();
}

#[test]
fn test_halt_is_idempotent() {
    let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
        .capacity(16)
        .handler(|_: &u64, _: Sequence| {})
        .build()
        .unwrap();

    // Halt before start is a no-op; the pipeline can still start.
    pipeline.halt();
    pipeline.start().unwrap();

    producer.push(1).unwrap();
    pipeline.halt();
    pipeline.halt();
    assert!(!pipeline.is_running());
}

#[test]
fn test_publish_after_halt() {
    let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
        .capacity(16)
        .handler(|_: &u64, _: Sequence| {})
        .build()
        .unwrap();

    pipeline.start().unwrap();
    producer.push(1).unwrap();
    pipeline.halt();

    assert_eq!(producer.push(2), Err(PublishError::Halted));
}

#[test]
fn test_drop_implies_halt() {
    let (seen, handler) = collector::<u64>();
    let mut producer = {
        let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
            .capacity(16)
            .handler(handler)
            .build()
            .unwrap();
        pipeline.start().unwrap();
        producer.push(7).unwrap();
        producer
        // pipeline dropped here: workers signalled and joined
    };

    assert_eq!(*seen.lock().unwrap(), vec![7]);
    assert_eq!(producer.push(8), Err(PublishError::Halted));
}

#[test]
fn test_event_factory_preallocates_slots() {
    let (seen, handler) = collector::<String>();
    let (mut pipeline, mut producer) =
        PipelineBuilder::with_factory(|| String::with_capacity(64))
            .capacity(16)
            .handler(handler)
            .build()
            .unwrap();

    pipeline.start().unwrap();
    producer
        .publish(|slot| {
            slot.clear();
            slot.push_str("in place");
        })
        .unwrap();
    pipeline.halt();

    assert_eq!(*seen.lock().unwrap(), vec!["in place".to_string()]);
}

struct FailingHandler {
    fail_at: Sequence,
    seen: Seen<u64>,
}

impl EventHandler<u64> for FailingHandler {
    fn on_event(&mut self, event: &u64, sequence: Sequence) -> Result<(), HandlerError> {
        if sequence == self.fail_at {
            return Err(HandlerError::msg("injected failure"));
        }
        self.seen.lock().unwrap().push(*event);
        Ok(())
    }
}

#[test]
fn test_fault_policy_stop_records_sequence() {
    let seen: Seen<u64> = Arc::new(Mutex::new(Vec::new()));
    let faults = Arc::new(AtomicUsize::new(0));
    let fault_count = Arc::clone(&faults);

    let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
        .capacity(8)
        .fault_policy(FaultPolicy::Stop)
        .on_fault(move |_processor, _sequence, _error| {
            fault_count.fetch_add(1, Ordering::SeqCst);
        })
        .handler(FailingHandler {
            fail_at: 3,
            seen: Arc::clone(&seen),
        })
        .build()
        .unwrap();

    pipeline.start().unwrap();

    // The processor dies at sequence 3; the producer must not deadlock on
    // its gate once the consumer is gone.
    for i in 0..20u64 {
        producer.push(i).unwrap();
    }

    pipeline.halt();
    assert_eq!(pipeline.fault_sequence(0), Some(3));
    assert_eq!(faults.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_fault_policy_skip_advances() {
    let seen: Seen<u64> = Arc::new(Mutex::new(Vec::new()));
    let faults = Arc::new(AtomicUsize::new(0));
    let fault_count = Arc::clone(&faults);

    struct FailOdd {
        seen: Seen<u64>,
    }
    impl EventHandler<u64> for FailOdd {
        fn on_event(&mut self, event: &u64, sequence: Sequence) -> Result<(), HandlerError> {
            if sequence % 2 == 1 {
                return Err(HandlerError::msg("odd one out"));
            }
            self.seen.lock().unwrap().push(*event);
            Ok(())
        }
    }

    let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
        .capacity(16)
        .fault_policy(FaultPolicy::Skip)
        .enable_metrics(true)
        .on_fault(move |_processor, _sequence, _error| {
            fault_count.fetch_add(1, Ordering::SeqCst);
        })
        .handler(FailOdd {
            seen: Arc::clone(&seen),
        })
        .build()
        .unwrap();

    pipeline.start().unwrap();
    for i in 0..10u64 {
        producer.push(i).unwrap();
    }
    pipeline.halt();

    assert_eq!(pipeline.fault_sequence(0), None);
    assert_eq!(faults.load(Ordering::SeqCst), 5);
    assert_eq!(*seen.lock().unwrap(), vec![0, 2, 4, 6, 8]);
    assert_eq!(pipeline.metrics().handler_faults, 5);
}

#[test]
fn test_lifecycle_hooks() {
    struct Hooks {
        events: Seen<&'static str>,
    }
    impl EventHandler<u64> for Hooks {
        fn on_event(&mut self, _event: &u64, _sequence: Sequence) -> Result<(), HandlerError> {
            self.events.lock().unwrap().push("event");
            Ok(())
        }
        fn on_start(&mut self) {
            self.events.lock().unwrap().push("start");
        }
        fn on_shutdown(&mut self) {
            self.events.lock().unwrap().push("shutdown");
        }
    }

    let events: Seen<&'static str> = Arc::new(Mutex::new(Vec::new()));
    let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
        .capacity(16)
        .handler(Hooks {
            events: Arc::clone(&events),
        })
        .build()
        .unwrap();

    pipeline.start().unwrap();
    producer.push(1).unwrap();
    pipeline.halt();

    assert_eq!(*events.lock().unwrap(), vec!["start", "event", "shutdown"]);
}

#[test]
fn test_metrics_account_for_every_event() {
    let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
        .capacity(64)
        .enable_metrics(true)
        .handler(|_: &u64, _: Sequence| {})
        .handler(|_: &u64, _: Sequence| {})
        .build()
        .unwrap();

    pipeline.start().unwrap();
    for i in 0..50u64 {
        producer.push(i).unwrap();
    }
    pipeline.halt();

    let snapshot = pipeline.metrics();
    assert_eq!(snapshot.events_published, 50);
    // Both consumers see every event.
    assert_eq!(snapshot.events_processed, 100);
}

#[test]
fn test_producer_thread_handoff() {
    let (seen, handler) = collector::<u64>();
    let (mut pipeline, mut producer) = PipelineBuilder::<u64>::new()
        .capacity(256)
        .wait_strategy(WaitStrategy::Yield)
        .handler(handler)
        .build()
        .unwrap();

    pipeline.start().unwrap();

    // The producer handle is Send: publishing from a dedicated thread is
    // the expected deployment shape.
    let publisher = thread::spawn(move || {
        for i in 0..5000u64 {
            producer.push(i).unwrap();
        }
    });
    publisher.join().unwrap();

    pipeline.halt();
    assert_eq!(*seen.lock().unwrap(), (0..5000).collect::<Vec<u64>>());
}
