//! Repair-queue integration tests over both storage strategies.

use std::sync::Arc;

use orbit_proto::InjuredSegment;
use orbit_repair::{RepairError, RepairQueue};
use orbit_store::{EmbeddedStore, MemoryQueue, MemoryStore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

fn segment(i: i32) -> InjuredSegment {
    InjuredSegment {
        path: i.to_string().into_bytes(),
        lost_pieces: vec![i],
    }
}

fn memory_queue() -> RepairQueue {
    RepairQueue::new(Arc::new(MemoryQueue::new()))
}

fn sequenced_memory_queue() -> RepairQueue {
    RepairQueue::sequenced(Arc::new(MemoryStore::new()))
}

async fn enqueue_peek_dequeue(queue: &RepairQueue) {
    let cancel = CancellationToken::new();
    let seg = InjuredSegment {
        path: b"this/is/my/path".to_vec(),
        lost_pieces: vec![0, 1, 2, 3, 4, 5],
    };

    queue.enqueue(&cancel, &seg).await.unwrap();
    let peeked = queue.peek(&cancel, 1).await.unwrap();
    assert_eq!(peeked, vec![seg.clone()]);

    let entry = queue.dequeue(&cancel).await.unwrap();
    assert_eq!(entry, seg);
    assert!(queue.peek(&cancel, 1).await.unwrap().is_empty());
}

async fn sequential_order(queue: &RepairQueue) {
    const N: i32 = 100;
    let cancel = CancellationToken::new();

    for i in 0..N {
        queue.enqueue(&cancel, &segment(i)).await.unwrap();
    }

    let peeked = queue.peek(&cancel, N as usize).await.unwrap();
    assert_eq!(peeked.len(), N as usize);
    for (i, seg) in peeked.iter().enumerate() {
        assert_eq!(*seg, segment(i as i32));
    }

    for i in 0..N {
        assert_eq!(queue.dequeue(&cancel).await.unwrap(), segment(i));
    }
    assert!(matches!(
        queue.dequeue(&cancel).await,
        Err(RepairError::QueueEmpty)
    ));
}

#[tokio::test]
async fn enqueue_peek_dequeue_native() {
    enqueue_peek_dequeue(&memory_queue()).await;
}

#[tokio::test]
async fn enqueue_peek_dequeue_sequenced() {
    enqueue_peek_dequeue(&sequenced_memory_queue()).await;
}

#[tokio::test]
async fn sequential_order_native() {
    sequential_order(&memory_queue()).await;
}

#[tokio::test]
async fn sequential_order_sequenced() {
    sequential_order(&sequenced_memory_queue()).await;
}

#[tokio::test]
async fn sequential_order_sequenced_embedded() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = EmbeddedStore::open(dir.path().join("repair.db"), "repair").unwrap();
    sequential_order(&RepairQueue::sequenced(Arc::new(store))).await;
}

#[tokio::test]
async fn dequeue_on_empty_queue_fails_fast() {
    let cancel = CancellationToken::new();
    assert!(matches!(
        memory_queue().dequeue(&cancel).await,
        Err(RepairError::QueueEmpty)
    ));
}

#[tokio::test]
async fn empty_path_is_rejected() {
    let cancel = CancellationToken::new();
    let bad = InjuredSegment {
        path: Vec::new(),
        lost_pieces: vec![1],
    };
    assert!(matches!(
        memory_queue().enqueue(&cancel, &bad).await,
        Err(RepairError::InvalidArgument(_))
    ));
}

async fn parallel_multiset(queue: RepairQueue) {
    const N: i32 = 100;
    let queue = Arc::new(queue);
    let cancel = CancellationToken::new();

    let mut producers = JoinSet::new();
    for i in 0..N {
        let queue = queue.clone();
        let cancel = cancel.clone();
        producers.spawn(async move { queue.enqueue(&cancel, &segment(i)).await });
    }
    while let Some(result) = producers.join_next().await {
        result.unwrap().unwrap();
    }

    let mut consumers = JoinSet::new();
    for _ in 0..N {
        let queue = queue.clone();
        let cancel = cancel.clone();
        consumers.spawn(async move { queue.dequeue(&cancel).await });
    }
    let mut items = Vec::new();
    while let Some(result) = consumers.join_next().await {
        items.push(result.unwrap().unwrap());
    }

    items.sort_by_key(|seg| seg.lost_pieces[0]);
    for (i, seg) in items.iter().enumerate() {
        assert_eq!(*seg, segment(i as i32));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_native() {
    parallel_multiset(memory_queue()).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_sequenced() {
    parallel_multiset(sequenced_memory_queue()).await;
}
