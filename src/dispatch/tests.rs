use std::{
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use rstest::rstest;
use tracing_test::traced_test;

use super::*;
use crate::{
    config::ConfigError,
    error::HandlerError,
    queue::inbound_queue,
    session::{ConnectionId, InMemorySession},
};

#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<u16>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    delay: Option<Duration>,
    emit: bool,
}

impl Recorder {
    fn emitting() -> Self {
        Self {
            emit: true,
            ..Self::default()
        }
    }

    fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn seen(&self) -> Vec<u16> { self.seen.lock().expect("recorder lock").clone() }

    fn peak(&self) -> usize { self.peak.load(Ordering::SeqCst) }
}

#[async_trait]
impl Handler for Recorder {
    async fn handle(&self, ctx: &HandlerContext, message: &Frame) -> Result<(), HandlerError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.seen
            .lock()
            .expect("recorder lock")
            .push(message.method_id());
        if self.emit {
            ctx.emit(DecodedEvent::TargetEligible {
                target_id: u64::from(message.method_id()),
            });
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Panicking;

#[async_trait]
impl Handler for Panicking {
    async fn handle(&self, _ctx: &HandlerContext, _message: &Frame) -> Result<(), HandlerError> {
        panic!("handler exploded");
    }
}

async fn reject(_ctx: HandlerContext, message: Frame) -> Result<(), HandlerError> {
    Err(HandlerError::rejected(message.method_id(), "not today"))
}

fn bundle(method_ids: &[u16]) -> InboundFrame {
    let mut body = BytesMut::new();
    for (n, id) in method_ids.iter().enumerate() {
        let payload = u8::try_from(n % 200).expect("small index");
        Frame::new(*id, vec![payload, 0x11]).encode_into(&mut body);
    }
    InboundFrame::new(ConnectionId::new(7), Frame::new(0x00FF, body.freeze()))
}

fn pipeline(handlers: HandlerTable) -> (DispatchPipeline, BatchReceiver) {
    let (tx, rx) = downstream_channel();
    let pipeline = DispatchPipeline::builder()
        .handlers(handlers)
        .downstream(tx)
        .build()
        .expect("downstream configured");
    (pipeline, rx)
}

#[tokio::test]
async fn twelve_sub_messages_yield_one_batch() {
    let quiet = Recorder::default();
    let loud = Recorder::emitting();
    let handlers = HandlerTable::new()
        .route(1, quiet.clone())
        .and_then(|t| t.route(2, loud.clone()))
        .expect("unique ids");
    let (pipeline, mut downstream) = pipeline(handlers);
    let (handle, inbound) = inbound_queue(&crate::config::QueueConfig::default());

    handle
        .try_push(bundle(&[1, 1, 2, 1, 1, 2, 1, 1, 1, 2, 1, 1]))
        .expect("queue open");
    drop(handle);
    pipeline.run(inbound, CancellationToken::new()).await;

    let batch = downstream.recv().await.expect("one batch forwarded");
    assert_eq!(batch.connection, ConnectionId::new(7));
    assert_eq!(batch.events.len(), 3);
    assert!(
        batch
            .events
            .iter()
            .all(|e| *e == DecodedEvent::TargetEligible { target_id: 2 })
    );
    assert!(downstream.recv().await.is_none());
    assert_eq!(quiet.seen().len() + loud.seen().len(), 12);
}

#[tokio::test]
async fn small_batches_run_in_wire_order() {
    let recorder = Recorder::delayed(Duration::from_millis(1));
    let mut handlers = HandlerTable::new();
    for id in 1..=5 {
        handlers = handlers.route(id, recorder.clone()).expect("unique id");
    }
    let (pipeline, _downstream) = pipeline(handlers);

    let batch = pipeline.process(bundle(&[5, 3, 1, 4, 2])).await;

    assert!(batch.is_none());
    assert_eq!(recorder.seen(), [5, 3, 1, 4, 2]);
    assert_eq!(recorder.peak(), 1);
}

#[rstest]
#[case::below_threshold(8, 1)]
#[case::at_threshold(9, 3)]
#[case::large_batch(30, 3)]
#[tokio::test]
async fn parallelism_follows_threshold(#[case] count: usize, #[case] expected_peak: usize) {
    let recorder = Recorder::delayed(Duration::from_millis(10));
    let handlers = HandlerTable::new()
        .route(1, recorder.clone())
        .expect("unique id");
    let (pipeline, _downstream) = pipeline(handlers);

    let _ = pipeline.process(bundle(&vec![1; count])).await;

    assert_eq!(recorder.seen().len(), count);
    assert_eq!(recorder.peak(), expected_peak);
}

#[tokio::test]
async fn custom_concurrency_is_respected() {
    let recorder = Recorder::delayed(Duration::from_millis(10));
    let handlers = HandlerTable::new()
        .route(1, recorder.clone())
        .expect("unique id");
    let (tx, _rx) = downstream_channel();
    let pipeline = DispatchPipeline::builder()
        .handlers(handlers)
        .config(DispatchConfig::new(2, 5).expect("valid config"))
        .downstream(tx)
        .build()
        .expect("downstream configured");

    let _ = pipeline.process(bundle(&[1; 10])).await;

    assert_eq!(recorder.peak(), 5);
}

#[traced_test]
#[rstest]
#[case::sequential(&[1, 2, 3])]
#[case::concurrent(&[1, 2, 3, 3, 3, 3, 3, 3, 3, 3])]
#[tokio::test]
async fn faulty_handlers_do_not_abort_siblings(#[case] ids: &[u16]) {
    let loud = Recorder::emitting();
    let handlers = HandlerTable::new()
        .route(1, Panicking)
        .and_then(|t| t.route_fn(2, reject))
        .and_then(|t| t.route(3, loud.clone()))
        .expect("unique ids");
    let (pipeline, _downstream) = pipeline(handlers);

    let batch = pipeline.process(bundle(ids)).await.expect("events emitted");

    let emitting = ids.iter().filter(|&&id| id == 3).count();
    assert_eq!(batch.events.len(), emitting);
    assert!(logs_contain("handler panicked"));
    assert!(logs_contain("handler exploded"));
    assert!(logs_contain("handler failed"));
}

#[tokio::test]
async fn unknown_methods_are_ignored() {
    let (pipeline, _downstream) = pipeline(HandlerTable::new());
    assert!(pipeline.process(bundle(&[0x7777, 0x7778])).await.is_none());
}

#[tokio::test]
async fn markerless_body_dispatches_outer_frame() {
    let recorder = Recorder::emitting();
    let handlers = HandlerTable::new()
        .route(0x0042, recorder.clone())
        .expect("unique id");
    let (pipeline, _downstream) = pipeline(handlers);
    let outer = Frame::new(0x0042, Bytes::from_static(b"plain"));

    let batch = pipeline
        .process(InboundFrame::new(ConnectionId::new(1), outer))
        .await
        .expect("outer frame handled");

    assert_eq!(batch.events, [DecodedEvent::TargetEligible { target_id: 0x42 }]);
}

#[traced_test]
#[tokio::test]
async fn closed_downstream_drops_batch() {
    let (pipeline, downstream) = pipeline(HandlerTable::new());
    drop(downstream);

    pipeline.forward(EventBatch {
        connection: ConnectionId::new(3),
        events: vec![DecodedEvent::TargetCleared { target_id: 1 }],
    });

    assert!(logs_contain("downstream queue closed; dropping event batch"));
}

#[tokio::test]
async fn cancellation_stops_the_loop() {
    let (pipeline, _downstream) = pipeline(HandlerTable::new());
    let (_handle, inbound) = inbound_queue(&crate::config::QueueConfig::default());
    let shutdown = CancellationToken::new();

    let task = tokio::spawn(pipeline.run(inbound, shutdown.clone()));
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("loop exits after cancellation")
        .expect("dispatch task");
}

#[tokio::test]
async fn session_is_shared_with_handlers() {
    let session = Arc::new(InMemorySession::new());
    let handlers = HandlerTable::new()
        .route_fn(1, |ctx: HandlerContext, _message: Frame| async move {
            ctx.session().remove_target(5);
            Ok::<(), HandlerError>(())
        })
        .expect("unique id");
    let (tx, _rx) = downstream_channel();
    let pipeline = DispatchPipeline::builder()
        .handlers(handlers)
        .session(session.clone())
        .downstream(tx)
        .build()
        .expect("downstream configured");
    session.insert_target(crate::session::KnownTarget {
        target_id: 5,
        kind: 0,
    });

    let _ = pipeline.process(bundle(&[1])).await;

    assert!(session.target(5).is_none());
}

#[test]
fn builder_requires_downstream() {
    let result = DispatchPipeline::builder().build();
    assert_eq!(result.err(), Some(ConfigError::MissingDownstream));
}
