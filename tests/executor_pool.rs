use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use widerow::ExecutorPool;

#[test]
fn tasks_on_one_executor_run_in_fifo_order() {
    let pool = ExecutorPool::new(1, "fifo");
    let log = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = mpsc::channel();
    for i in 0..100 {
        let log = log.clone();
        let tx = tx.clone();
        pool.executor(0)
            .post(move || {
                log.lock().unwrap().push(i);
                if i == 99 {
                    tx.send(()).unwrap();
                }
            })
            .unwrap();
    }
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    let seen = log.lock().unwrap().clone();
    assert_eq!(seen, (0..100).collect::<Vec<_>>());
}

#[test]
fn round_robin_covers_every_executor() {
    let pool = Arc::new(ExecutorPool::new(4, "rr"));
    let (tx, rx) = mpsc::channel();
    for _ in 0..8 {
        let tx = tx.clone();
        pool.post(move || {
            tx.send(thread::current().name().map(str::to_string)).unwrap();
        })
        .unwrap();
    }
    let mut names = std::collections::BTreeSet::new();
    for _ in 0..8 {
        names.insert(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }
    // two full rounds over four executors touch all four threads
    assert_eq!(names.len(), 4);
}

#[test]
fn tasks_may_post_to_other_executors() {
    let pool = Arc::new(ExecutorPool::new(2, "hop"));
    let (tx, rx) = mpsc::channel();
    let pool2 = pool.clone();
    pool.executor(0)
        .post(move || {
            pool2
                .executor(1)
                .post(move || tx.send(42).unwrap())
                .unwrap();
        })
        .unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
}

#[test]
fn delayed_tasks_fire_after_their_delay() {
    let pool = ExecutorPool::new(1, "timer");
    let (tx, rx) = mpsc::channel();
    let started = Instant::now();
    pool.executor(0)
        .post_after(Duration::from_millis(50), move || {
            tx.send(Instant::now()).unwrap();
        })
        .unwrap();
    let fired = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(fired.duration_since(started) >= Duration::from_millis(50));
}

#[test]
fn delayed_task_does_not_block_fifo_work() {
    let pool = ExecutorPool::new(1, "mix");
    let (tx, rx) = mpsc::channel();
    let tx2 = tx.clone();
    pool.executor(0)
        .post_after(Duration::from_millis(200), move || {
            tx.send("late").unwrap();
        })
        .unwrap();
    pool.executor(0).post(move || tx2.send("now").unwrap()).unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "now");
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "late");
}

#[test]
fn shutdown_drains_queued_tasks() {
    let pool = ExecutorPool::new(2, "drain");
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..50 {
        let counter = counter.clone();
        pool.post(move || {
            thread::sleep(Duration::from_millis(1));
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    pool.shutdown();
    assert_eq!(counter.load(Ordering::SeqCst), 50);
}

#[test]
fn post_after_shutdown_hands_the_task_back() {
    let pool = ExecutorPool::new(1, "closed");
    pool.shutdown();
    let rejected = pool.post(|| ()).unwrap_err();
    // the caller can still run it, keeping exactly-once promises alive
    rejected.run();
}
