//! End-to-end flow from captured bytes to downstream event batches.

use std::{sync::Arc, time::Duration};

use bundlewire::{
    ConnectionId,
    DecodedEvent,
    DecoderRegistry,
    DispatchPipeline,
    HandlerTable,
    Ingest,
    QueueConfig,
    SessionStore,
    downstream_channel,
    handlers::{
        PLAYER_INFO,
        PlayerInfo,
        TARGET_APPEARED,
        TARGET_REMOVED,
        TargetAppeared,
        TargetRemoved,
        builtin_table,
        install,
    },
    inbound_queue,
};
use bundlewire_testing::{RecordingHandler, frame_bytes, message_bytes, recv_expect, split_every};
use tokio_util::sync::CancellationToken;

fn outer(sub_messages: &[Vec<u8>]) -> Vec<u8> { frame_bytes(0x00AA, &sub_messages.concat()) }

fn appeared(target_id: u64, eligible: bool) -> Vec<u8> {
    message_bytes(TARGET_APPEARED, &TargetAppeared {
        target_id,
        kind: 1,
        eligible,
    })
}

#[tokio::test]
async fn captured_bytes_become_event_batches() {
    let (handle, inbound) = inbound_queue(&QueueConfig::default());
    let (tx, mut downstream) = downstream_channel();
    let shutdown = CancellationToken::new();
    let pipeline = DispatchPipeline::builder()
        .handlers(builtin_table().expect("builtin routes"))
        .downstream(tx)
        .build()
        .expect("downstream configured");
    let session = Arc::clone(pipeline.session());
    let ingest = Ingest::new(Arc::new(DecoderRegistry::default()), handle, shutdown.clone());
    let task = tokio::spawn(pipeline.run(inbound, shutdown.clone()));

    let connection = ConnectionId::new(1);
    let mut stream = outer(&[
        message_bytes(PLAYER_INFO, &PlayerInfo {
            player_id: 9,
            name: "warden".to_owned(),
        }),
        appeared(100, true),
        appeared(101, false),
    ]);
    stream.extend(outer(&[message_bytes(TARGET_REMOVED, &TargetRemoved {
        target_id: 100,
    })]));
    for chunk in split_every(&stream, 5) {
        ingest.on_bytes(connection, &chunk).expect("queue open");
    }

    let first = recv_expect!(downstream.recv());
    assert_eq!(first.connection, connection);
    assert_eq!(first.events, [
        DecodedEvent::ConnectionIdentified {
            player_id: 9,
            name: "warden".to_owned(),
        },
        DecodedEvent::TargetEligible { target_id: 100 },
    ]);
    let second = recv_expect!(downstream.recv());
    assert_eq!(second.events, [DecodedEvent::TargetCleared { target_id: 100 }]);

    assert_eq!(session.player().map(|p| p.player_id), Some(9));
    assert_eq!(session.known_targets(), [101]);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("dispatch loop exits")
        .expect("dispatch task");
}

#[tokio::test]
async fn frames_without_events_produce_no_batch() {
    let (handle, inbound) = inbound_queue(&QueueConfig::default());
    let (tx, mut downstream) = downstream_channel();
    let recorder = RecordingHandler::new();
    let handlers = HandlerTable::new()
        .route(0x0301, recorder.clone())
        .expect("unique id");
    let pipeline = DispatchPipeline::builder()
        .handlers(handlers)
        .downstream(tx)
        .build()
        .expect("downstream configured");
    let ingest = Ingest::new(
        Arc::new(DecoderRegistry::default()),
        handle,
        CancellationToken::new(),
    );

    ingest
        .on_bytes(
            ConnectionId::new(2),
            &outer(&[frame_bytes(0x0301, b"one"), frame_bytes(0x0301, b"two")]),
        )
        .expect("queue open");
    drop(ingest);
    pipeline.run(inbound, CancellationToken::new()).await;

    assert_eq!(recorder.bodies(), [b"one".to_vec(), b"two".to_vec()]);
    assert!(downstream.recv().await.is_none());
}

#[tokio::test]
async fn connections_keep_separate_decoders() {
    let (handle, inbound) = inbound_queue(&QueueConfig::default());
    let (tx, mut downstream) = downstream_channel();
    let recorder = RecordingHandler::emitting();
    let handlers = install(HandlerTable::new().route(0x0302, recorder.clone()).expect("unique id"))
        .expect("no overlap with builtins");
    let pipeline = DispatchPipeline::builder()
        .handlers(handlers)
        .downstream(tx)
        .build()
        .expect("downstream configured");
    let registry = Arc::new(DecoderRegistry::default());
    let ingest = Ingest::new(Arc::clone(&registry), handle, CancellationToken::new());

    let a = outer(&[frame_bytes(0x0302, b"from-a")]);
    let b = outer(&[frame_bytes(0x0302, b"from-b")]);
    let (a_head, a_tail) = a.split_at(7);
    let (b_head, b_tail) = b.split_at(3);

    let (ca, cb) = (ConnectionId::new(10), ConnectionId::new(11));
    assert_eq!(ingest.on_bytes(ca, a_head), Ok(0));
    assert_eq!(ingest.on_bytes(cb, b_head), Ok(0));
    assert_eq!(ingest.on_bytes(cb, b_tail), Ok(1));
    assert_eq!(ingest.on_bytes(ca, a_tail), Ok(1));
    assert_eq!(registry.len(), 2);
    drop(ingest);
    pipeline.run(inbound, CancellationToken::new()).await;

    let first = recv_expect!(downstream.recv());
    let second = recv_expect!(downstream.recv());
    assert_eq!((first.connection, second.connection), (cb, ca));
    assert_eq!(recorder.bodies(), [b"from-b".to_vec(), b"from-a".to_vec()]);
}
