use edgekit_concurrent::{QueueError, SafeQueue};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

const THREADS: usize = 8;
const PER_THREAD: usize = 2_000;

#[test]
fn test_concurrent_producers_and_consumers() {
    let q = Arc::new(SafeQueue::new());
    let done = Arc::new(AtomicBool::new(false));
    let collected = Arc::new(Mutex::new(Vec::new()));

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let q = q.clone();
            let done = done.clone();
            let collected = collected.clone();
            thread::spawn(move || {
                let mut local = Vec::new();
                loop {
                    // Read the flag before dequeueing so an empty result after
                    // `done` really means every producer has finished.
                    let finished = done.load(Ordering::Acquire);
                    match q.dequeue() {
                        Ok(v) => local.push(v),
                        Err(QueueError::Empty) if finished => break,
                        Err(QueueError::Empty) => thread::yield_now(),
                    }
                }
                collected.lock().unwrap().extend(local);
            })
        })
        .collect();

    let producers: Vec<_> = (0..THREADS)
        .map(|t| {
            let q = q.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    q.enqueue((t, i));
                }
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    done.store(true, Ordering::Release);
    for c in consumers {
        c.join().unwrap();
    }

    assert_eq!(q.len(), 0);

    let items = collected.lock().unwrap();
    assert_eq!(items.len(), THREADS * PER_THREAD);
    let unique: HashSet<_> = items.iter().copied().collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD);
}

#[test]
fn test_per_producer_order_is_preserved() {
    let q = Arc::new(SafeQueue::new());
    let producers: Vec<_> = (0..THREADS)
        .map(|t| {
            let q = q.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    q.enqueue((t, i));
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    let mut next = vec![0usize; THREADS];
    for (t, i) in q.drain() {
        assert_eq!(i, next[t], "producer {} out of order", t);
        next[t] += 1;
    }
    assert!(next.iter().all(|&n| n == PER_THREAD));
}

#[test]
fn test_peek_and_len_under_contention() {
    let q = Arc::new(SafeQueue::new());
    for i in 0..100 {
        q.enqueue(i);
    }

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let q = q.clone();
            thread::spawn(move || {
                for _ in 0..1_000 {
                    let len = q.len();
                    assert!(len <= 100);
                    if let Ok(head) = q.peek() {
                        assert!(head < 100);
                    }
                    let snapshot = q.values();
                    assert!(snapshot.windows(2).all(|w| w[0] < w[1]));
                }
            })
        })
        .collect();

    let writer = {
        let q = q.clone();
        thread::spawn(move || {
            while q.dequeue().is_ok() {}
        })
    };

    for r in readers {
        r.join().unwrap();
    }
    writer.join().unwrap();
    assert!(q.is_empty());
}

#[test]
fn test_shared_payloads_keep_identity() {
    let q = SafeQueue::new();
    let payload = Arc::new(String::from("reading"));
    q.enqueue(payload.clone());

    let peeked = q.peek().unwrap();
    assert!(Arc::ptr_eq(&peeked, &payload));
    let taken = q.dequeue().unwrap();
    assert!(Arc::ptr_eq(&taken, &payload));
}
