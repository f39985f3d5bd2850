//! Fixed pool of single-threaded cooperative executors.
//!
//! Each executor drains a FIFO inbox on its own thread; tasks run to
//! completion without preemption and may post further tasks to any
//! executor. A timer heap rides next to the FIFO so retry pauses can be
//! scheduled on the same executor that owns the call.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A task bounced off a closed executor, handed back so the caller can still
/// run it (callbacks must fire exactly once even during shutdown).
pub struct Rejected(Task);

impl Rejected {
    pub fn into_task(self) -> Task {
        self.0
    }

    pub fn run(self) {
        (self.0)()
    }
}

impl std::fmt::Debug for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Rejected(..)")
    }
}

struct DelayedTask {
    due: Instant,
    seq: u64,
    task: Task,
}

impl PartialEq for DelayedTask {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for DelayedTask {}

impl PartialOrd for DelayedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedTask {
    // reversed so the BinaryHeap pops the earliest due time first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct InboxState {
    fifo: VecDeque<Task>,
    timers: BinaryHeap<DelayedTask>,
    closed: bool,
}

struct Inbox {
    state: Mutex<InboxState>,
    cv: Condvar,
    seq: AtomicU64,
}

impl Inbox {
    fn new() -> Self {
        Self {
            state: Mutex::new(InboxState {
                fifo: VecDeque::new(),
                timers: BinaryHeap::new(),
                closed: false,
            }),
            cv: Condvar::new(),
            seq: AtomicU64::new(0),
        }
    }
}

/// One single-threaded executor.
pub struct Executor {
    inbox: Arc<Inbox>,
    join: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Executor {
    fn start(name: String) -> Self {
        let inbox = Arc::new(Inbox::new());
        let worker_inbox = inbox.clone();
        let join = thread::Builder::new()
            .name(name)
            .spawn(move || run_worker(worker_inbox))
            .expect("failed to spawn executor worker");
        Self {
            inbox,
            join: Mutex::new(Some(join)),
        }
    }

    /// Appends a task to the FIFO inbox.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> Result<(), Rejected> {
        let mut state = self.inbox.state.lock().expect("executor inbox poisoned");
        if state.closed {
            return Err(Rejected(Box::new(task)));
        }
        state.fifo.push_back(Box::new(task));
        self.inbox.cv.notify_one();
        Ok(())
    }

    /// Schedules a task to run after `delay`, after any FIFO work due then.
    pub fn post_after(
        &self,
        delay: Duration,
        task: impl FnOnce() + Send + 'static,
    ) -> Result<(), Rejected> {
        let seq = self.inbox.seq.fetch_add(1, AtomicOrdering::Relaxed);
        let mut state = self.inbox.state.lock().expect("executor inbox poisoned");
        if state.closed {
            return Err(Rejected(Box::new(task)));
        }
        state.timers.push(DelayedTask {
            due: Instant::now() + delay,
            seq,
            task: Box::new(task),
        });
        self.inbox.cv.notify_one();
        Ok(())
    }

    /// Stops accepting tasks, drains everything already queued (timers
    /// included), and joins the worker.
    fn shutdown(&self) {
        {
            let mut state = self.inbox.state.lock().expect("executor inbox poisoned");
            state.closed = true;
            self.inbox.cv.notify_all();
        }
        if let Some(handle) = self.join.lock().expect("executor join poisoned").take() {
            join_unless_self(handle);
        }
    }
}

fn run_worker(inbox: Arc<Inbox>) {
    loop {
        let task = {
            let mut state = inbox.state.lock().expect("executor inbox poisoned");
            loop {
                let now = Instant::now();
                while matches!(state.timers.peek(), Some(timer) if timer.due <= now) {
                    let timer = state.timers.pop().expect("peeked timer exists");
                    state.fifo.push_back(timer.task);
                }
                if let Some(task) = state.fifo.pop_front() {
                    break task;
                }
                match state.timers.peek().map(|timer| timer.due) {
                    // draining sleeps through remaining timers too
                    Some(due) => {
                        let wait = due.saturating_duration_since(Instant::now());
                        let (next, _) = inbox
                            .cv
                            .wait_timeout(state, wait)
                            .expect("executor inbox poisoned");
                        state = next;
                    }
                    None => {
                        if state.closed {
                            return;
                        }
                        state = inbox.cv.wait(state).expect("executor inbox poisoned");
                    }
                }
            }
        };
        task();
    }
}

/// Ordered, fixed-size collection of executors with round-robin posting.
pub struct ExecutorPool {
    executors: Vec<Executor>,
    selector: AtomicU64,
}

impl ExecutorPool {
    pub fn new(size: usize, name_prefix: &str) -> Self {
        let size = size.max(1);
        let executors = (0..size)
            .map(|idx| Executor::start(format!("{name_prefix}_{idx}")))
            .collect();
        Self {
            executors,
            selector: AtomicU64::new(0),
        }
    }

    pub fn size(&self) -> usize {
        self.executors.len()
    }

    pub fn executor(&self, idx: usize) -> &Executor {
        &self.executors[idx % self.executors.len()]
    }

    /// Round-robin index for the next post.
    pub fn pick_index(&self) -> usize {
        (self.selector.fetch_add(1, AtomicOrdering::Relaxed) as usize) % self.executors.len()
    }

    /// Posts onto the next executor in round-robin order.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> Result<(), Rejected> {
        self.executor(self.pick_index()).post(task)
    }

    /// Closes every inbox, drains queued work and joins all workers.
    pub fn shutdown(&self) {
        for executor in &self.executors {
            let mut state = executor.inbox.state.lock().expect("executor inbox poisoned");
            state.closed = true;
            executor.inbox.cv.notify_all();
        }
        for executor in &self.executors {
            if let Some(handle) = executor
                .join
                .lock()
                .expect("executor join poisoned")
                .take()
            {
                join_unless_self(handle);
            }
        }
    }
}

/// Joining a worker from inside that worker (a task dropping the pool's last
/// owner) would wait forever; the worker exits on its own once the current
/// task returns, so it is detached instead.
fn join_unless_self(handle: thread::JoinHandle<()>) {
    if handle.thread().id() == thread::current().id() {
        drop(handle);
    } else {
        let _ = handle.join();
    }
}

impl Drop for ExecutorPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
