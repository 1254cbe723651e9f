//! Integration tests for the queue engine over the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tasq_rs::engine::QueueEngine;
use tasq_rs::error::{Error, Result};
use tasq_rs::model::{LIST_LIMIT, ScoredPayload};
use tasq_rs::store::{MemoryScoreStore, ScoreStore};

fn test_engine() -> QueueEngine<MemoryScoreStore> {
    QueueEngine::new(MemoryScoreStore::new())
}

const ITEMS: [&str; 10] = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];

// ---------------------------------------------------------------------------
// Basic lifecycle: enqueue → list → dequeue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn basic_enqueue_list_dequeue() {
    let engine = test_engine();

    let list = engine.list("foo").await.unwrap();
    assert!(list.keys.is_empty());
    assert_eq!(list.count, 0);
    assert!(engine.dequeue("foo").await.unwrap_err().is_empty_queue());

    let enqueued = engine.enqueue("foo", b"bar").await.unwrap();
    assert_eq!(enqueued.key, "foo:bar");

    let list = engine.list("foo").await.unwrap();
    assert_eq!(list.keys, vec!["foo:bar".to_string()]);
    assert_eq!(list.count, 1);

    // Shouldn't leak to other queues
    let other = engine.list("bar").await.unwrap();
    assert!(other.keys.is_empty());
    assert_eq!(other.count, 0);

    let dequeued = engine.dequeue("foo").await.unwrap();
    assert_eq!(dequeued.key, "foo:bar");
    assert_eq!(dequeued.payload, b"bar");

    let list = engine.list("foo").await.unwrap();
    assert!(list.keys.is_empty());
    assert_eq!(list.count, 0);
    assert!(matches!(
        engine.dequeue("foo").await,
        Err(Error::EmptyQueue(q)) if q == "foo"
    ));
}

#[tokio::test]
async fn empty_payload_is_a_real_entry() {
    let engine = test_engine();

    let enqueued = engine.enqueue("q", b"").await.unwrap();
    assert_eq!(enqueued.key, "q:");

    let dequeued = engine.dequeue("q").await.unwrap();
    assert!(dequeued.payload.is_empty());
    assert!(engine.dequeue("q").await.unwrap_err().is_empty_queue());
}

#[tokio::test]
async fn binary_payload_round_trips_bytes() {
    let engine = test_engine();
    let payload = [0u8, 0xff, 0x10, b':'];

    engine.enqueue("bin", &payload).await.unwrap();
    let dequeued = engine.dequeue("bin").await.unwrap();
    assert_eq!(dequeued.payload, payload);
}

// ---------------------------------------------------------------------------
// Score accumulation and ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_enqueue_accumulates_one_entry() {
    let engine = test_engine();

    for _ in 0..7 {
        let enqueued = engine.enqueue("acc", b"same").await.unwrap();
        assert_eq!(enqueued.key, "acc:same");
    }

    let list = engine.list("acc").await.unwrap();
    assert_eq!(list.count, 1);
    assert_eq!(list.keys, vec!["acc:same".to_string()]);

    let popped = engine.store().pop_max_score("acc", 1).await.unwrap();
    assert_eq!(popped[0].score, 7);
}

#[tokio::test]
async fn payloads_differing_by_one_byte_are_distinct() {
    let engine = test_engine();
    engine.enqueue("q", b"task1").await.unwrap();
    engine.enqueue("q", b"task2").await.unwrap();
    assert_eq!(engine.list("q").await.unwrap().count, 2);
}

#[tokio::test]
async fn priority_follows_enqueue_count() {
    let engine = test_engine();

    for (i, item) in ITEMS.iter().enumerate() {
        for _ in 0..=i {
            engine.enqueue("foo", item.as_bytes()).await.unwrap();
        }
    }
    assert_eq!(engine.list("foo").await.unwrap().count, ITEMS.len() as u64);

    for item in ITEMS.iter().rev() {
        let dequeued = engine.dequeue("foo").await.unwrap();
        assert_eq!(dequeued.payload, item.as_bytes());
    }
    assert_eq!(engine.list("foo").await.unwrap().count, 0);
}

#[tokio::test]
async fn priority_independent_of_insertion_order() {
    let engine = test_engine();

    for (i, item) in ITEMS.iter().enumerate().rev() {
        for _ in 0..=i {
            engine.enqueue("foo", item.as_bytes()).await.unwrap();
        }
    }

    for item in ITEMS.iter().rev() {
        let dequeued = engine.dequeue("foo").await.unwrap();
        assert_eq!(dequeued.payload, item.as_bytes());
    }
    assert!(engine.dequeue("foo").await.unwrap_err().is_empty_queue());
}

#[tokio::test]
async fn interleaved_enqueues_accumulate() {
    let engine = test_engine();

    // x:3, y:2, z:1 submitted interleaved
    for payload in ["x", "y", "x", "z", "y", "x"] {
        engine.enqueue("mix", payload.as_bytes()).await.unwrap();
    }

    let list = engine.list("mix").await.unwrap();
    assert_eq!(list.keys, vec!["mix:x", "mix:y", "mix:z"]);
}

#[tokio::test]
async fn list_orders_by_score_descending() {
    let engine = test_engine();

    for (i, item) in ITEMS.iter().enumerate() {
        for _ in 0..=i {
            engine.enqueue("ord", item.as_bytes()).await.unwrap();
        }
    }

    let list = engine.list("ord").await.unwrap();
    let expected: Vec<String> = ITEMS.iter().rev().map(|i| format!("ord:{i}")).collect();
    assert_eq!(list.keys, expected);
}

#[tokio::test]
async fn ties_are_deterministic_and_complete() {
    let engine = test_engine();

    for payload in ["m", "a", "z", "q"] {
        engine.enqueue("tie", payload.as_bytes()).await.unwrap();
    }

    // First listed is next dequeued; payload bytes descending on ties.
    let list = engine.list("tie").await.unwrap();
    assert_eq!(list.keys, vec!["tie:z", "tie:q", "tie:m", "tie:a"]);

    let mut seen = Vec::new();
    while let Ok(dequeued) = engine.dequeue("tie").await {
        seen.push(String::from_utf8(dequeued.payload).unwrap());
    }
    assert_eq!(seen, vec!["z", "q", "m", "a"]);
}

#[tokio::test]
async fn score_resets_after_dequeue() {
    let engine = test_engine();

    for _ in 0..5 {
        engine.enqueue("reset", b"old").await.unwrap();
    }
    engine.dequeue("reset").await.unwrap();

    engine.enqueue("reset", b"old").await.unwrap();
    engine.enqueue("reset", b"new").await.unwrap();
    engine.enqueue("reset", b"new").await.unwrap();

    // "old" restarted at 1, so "new" (2) wins
    assert_eq!(engine.dequeue("reset").await.unwrap().payload, b"new");
}

// ---------------------------------------------------------------------------
// Listing bounds and exhaustion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_truncates_but_counts_everything() {
    let engine = test_engine();

    for i in 0..150 {
        engine.enqueue("big", format!("item-{i:03}").as_bytes()).await.unwrap();
    }
    // Raise one entry so it must lead the list
    engine.enqueue("big", b"item-149").await.unwrap();

    let list = engine.list("big").await.unwrap();
    assert_eq!(list.count, 150);
    assert_eq!(list.keys.len(), LIST_LIMIT);
    assert_eq!(list.keys[0], "big:item-149");
}

#[tokio::test]
async fn exhaustion_after_count_dequeues() {
    let engine = test_engine();

    for i in 0..12 {
        for _ in 0..(i % 4 + 1) {
            engine.enqueue("ex", format!("p{i}").as_bytes()).await.unwrap();
        }
    }

    let count = engine.list("ex").await.unwrap().count;
    assert_eq!(count, 12);

    let mut last_score = i64::MAX;
    for _ in 0..count {
        let dequeued = engine.dequeue("ex").await.unwrap();
        let i: usize = String::from_utf8(dequeued.payload).unwrap()[1..].parse().unwrap();
        let score = (i % 4 + 1) as i64;
        assert!(score <= last_score, "dequeued out of order");
        last_score = score;
    }

    let list = engine.list("ex").await.unwrap();
    assert_eq!(list.count, 0);
    assert!(list.keys.is_empty());
    assert!(engine.dequeue("ex").await.unwrap_err().is_empty_queue());
}

// ---------------------------------------------------------------------------
// Isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn queues_are_isolated_including_prefixes() {
    let engine = test_engine();

    engine.enqueue("jobs", b"a").await.unwrap();
    engine.enqueue("jobs:", b"b").await.unwrap();
    engine.enqueue("job", b"c").await.unwrap();
    engine.enqueue("jobs/high", b"d").await.unwrap();
    engine.enqueue("myjobs", b"e").await.unwrap();

    for (queue, payload) in [
        ("jobs", "a"),
        ("jobs:", "b"),
        ("job", "c"),
        ("jobs/high", "d"),
        ("myjobs", "e"),
    ] {
        let list = engine.list(queue).await.unwrap();
        assert_eq!(list.count, 1, "queue {queue}");
        assert_eq!(list.keys, vec![format!("{queue}:{payload}")]);
    }

    assert_eq!(engine.dequeue("jobs").await.unwrap().payload, b"a");
    assert!(engine.dequeue("jobs").await.unwrap_err().is_empty_queue());
    assert_eq!(engine.list("jobs:").await.unwrap().count, 1);
    assert_eq!(engine.list("myjobs").await.unwrap().count, 1);
}

#[tokio::test]
async fn colon_ambiguity_is_preserved() {
    let engine = test_engine();

    let a = engine.enqueue("a:b", b"c").await.unwrap();
    let b = engine.enqueue("a", b"b:c").await.unwrap();
    assert_eq!(a.key, b.key);

    // Same key text, different entries
    assert_eq!(engine.list("a:b").await.unwrap().count, 1);
    assert_eq!(engine.list("a").await.unwrap().count, 1);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_enqueues_lose_no_increments() {
    let engine = Arc::new(test_engine());
    let n = 200;

    let handles: Vec<_> = (0..n)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.enqueue("hot", b"payload").await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let popped = engine.store().pop_max_score("hot", 1).await.unwrap();
    assert_eq!(popped.len(), 1);
    assert_eq!(popped[0].score, n);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dequeues_deliver_exactly_once() {
    let engine = Arc::new(test_engine());
    let n = 100;

    for i in 0..n {
        engine.enqueue("work", format!("task-{i}").as_bytes()).await.unwrap();
    }

    let handles: Vec<_> = (0..n)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.dequeue("work").await })
        })
        .collect();

    let mut delivered = HashSet::new();
    for handle in handles {
        let dequeued = handle.await.unwrap().unwrap();
        assert!(delivered.insert(dequeued.payload), "entry delivered twice");
    }
    assert_eq!(delivered.len(), n);
    assert!(engine.dequeue("work").await.unwrap_err().is_empty_queue());
}

// ---------------------------------------------------------------------------
// Store failures
// ---------------------------------------------------------------------------

/// A store whose every call hangs or misbehaves.
enum BrokenStore {
    Hangs,
    Down,
    PopsTooMany,
}

impl ScoreStore for BrokenStore {
    async fn increment_score(&self, _queue: &str, _payload: &[u8], _delta: i64) -> Result<i64> {
        self.fail().await?;
        Ok(1)
    }

    async fn pop_max_score(&self, _queue: &str, _n: usize) -> Result<Vec<ScoredPayload>> {
        self.fail().await?;
        Ok(vec![
            ScoredPayload { payload: b"one".to_vec(), score: 2 },
            ScoredPayload { payload: b"two".to_vec(), score: 1 },
        ])
    }

    async fn cardinality(&self, _queue: &str) -> Result<u64> {
        self.fail().await?;
        Ok(0)
    }

    async fn range_by_score_desc(&self, _queue: &str, limit: usize) -> Result<Vec<Vec<u8>>> {
        self.fail().await?;
        Ok(vec![Vec::new(); limit + 1])
    }
}

impl BrokenStore {
    async fn fail(&self) -> Result<()> {
        match self {
            BrokenStore::Hangs => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
            BrokenStore::Down => Err(Error::StoreUnavailable("connection refused".to_string())),
            BrokenStore::PopsTooMany => Ok(()),
        }
    }
}

#[tokio::test]
async fn store_failure_is_not_empty_queue() {
    let engine = QueueEngine::new(BrokenStore::Down);

    let err = engine.dequeue("q").await.unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable(_)));
    assert!(!err.is_empty_queue());

    assert!(matches!(
        engine.enqueue("q", b"x").await,
        Err(Error::StoreUnavailable(_))
    ));
    assert!(matches!(engine.list("q").await, Err(Error::StoreUnavailable(_))));
}

#[tokio::test]
async fn timeout_reports_store_unavailable() {
    let engine =
        QueueEngine::new(BrokenStore::Hangs).with_timeout(Some(Duration::from_millis(20)));

    assert!(matches!(
        engine.enqueue("q", b"x").await,
        Err(Error::StoreUnavailable(_))
    ));
    assert!(matches!(engine.dequeue("q").await, Err(Error::StoreUnavailable(_))));
}

#[tokio::test]
async fn count_and_top_agree_with_list() {
    let engine = test_engine();
    engine.enqueue("q", b"a").await.unwrap();
    engine.enqueue("q", b"b").await.unwrap();
    engine.enqueue("q", b"b").await.unwrap();

    let list = engine.list("q").await.unwrap();
    assert_eq!(engine.count("q").await.unwrap(), list.count);
    assert_eq!(engine.top("q").await.unwrap(), list.keys);
    assert_eq!(list.keys, vec!["q:b", "q:a"]);
}

#[tokio::test]
async fn oversized_results_are_malformed() {
    let engine = QueueEngine::new(BrokenStore::PopsTooMany);

    assert!(matches!(
        engine.dequeue("q").await,
        Err(Error::MalformedStoreResult(_))
    ));
    assert!(matches!(
        engine.list("q").await,
        Err(Error::MalformedStoreResult(_))
    ));
}
