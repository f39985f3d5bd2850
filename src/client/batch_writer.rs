//! The aggregating batch writer.
//!
//! Independently submitted single-row writes are coalesced into
//! `BatchWriteRow` calls by an aggregator thread. In-flight batches are
//! bounded by an adaptive concurrency ceiling that stops growing while the
//! server throttles, and the aggregator nap doubles under throttling and
//! shrinks linearly otherwise. Row-level results are demultiplexed back to
//! each submitter's callback, each firing exactly once, on the configured
//! executor pool and never under the waiting-list lock.

use crate::client::core::AsyncClient;
use crate::error::OtsError;
use crate::executor::ExecutorPool;
use crate::observability::logging::{LogLevel, Logger};
use crate::protocol::Action;
use crate::retry;
use crate::types::criterion::WithUserData;
use crate::types::request::{
    BatchWriteRowRequest, BatchWriteRowResponse, DeleteRowRequest, DeleteRowResponse,
    OpRequest, PutRowRequest, PutRowResponse, ResponseMeta, UpdateRowRequest,
    UpdateRowResponse,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

const LOG_MODULE: &str = "batch_writer";

/// How far the permitted concurrency may grow per aggregator round.
pub const CONCURRENCY_INC_STEP: i64 = 100;

/// Knobs of the batch writer.
#[derive(Clone)]
pub struct BatchWriterConfig {
    /// Upper bound on in-flight `BatchWriteRow` calls.
    pub max_concurrency: i64,
    /// Upper bound on rows per outgoing batch.
    pub max_batch_size: i64,
    /// Aggregator poll period when the queue is healthy.
    pub regular_nap: Duration,
    /// Cap on the adaptive nap while throttled.
    pub max_nap: Duration,
    /// Decrement applied to the nap per calm round.
    pub nap_shrink_step: Duration,
    /// Executor pool for submitter callbacks; the client's own pool when
    /// absent.
    pub actors: Option<Arc<ExecutorPool>>,
}

impl Default for BatchWriterConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 32,
            max_batch_size: 200,
            regular_nap: Duration::from_millis(10),
            max_nap: Duration::from_secs(10),
            nap_shrink_step: Duration::from_millis(157),
            actors: None,
        }
    }
}

impl BatchWriterConfig {
    pub fn validate(&self) -> Result<(), OtsError> {
        if self.max_concurrency < 1 {
            return Err(OtsError::parameter_invalid("Max concurrency must be positive."));
        }
        if self.max_batch_size < 1 {
            return Err(OtsError::parameter_invalid("Max batch size must be positive."));
        }
        if self.regular_nap <= Duration::from_millis(1) {
            return Err(OtsError::parameter_invalid(
                "Regular nap must be greater than one msec.",
            ));
        }
        if self.max_nap < self.regular_nap * 2 {
            return Err(OtsError::parameter_invalid(
                "Max nap must be longer than twice regular period.",
            ));
        }
        if self.nap_shrink_step.is_zero() {
            return Err(OtsError::parameter_invalid(
                "Each step on shrinking nap must be positive.",
            ));
        }
        if matches!(&self.actors, Some(pool) if pool.size() == 0) {
            return Err(OtsError::parameter_invalid(
                "Number of invoking-callback executors must be positive.",
            ));
        }
        Ok(())
    }

    /// One scheduling round of the adaptive heuristic.
    ///
    /// A latched backoff clamps the permitted concurrency to what is already
    /// in flight (floor one) and doubles the nap up to `max_nap`; a calm
    /// round grows the ceiling by [`CONCURRENCY_INC_STEP`] toward
    /// `max_concurrency` and shrinks the nap linearly toward `regular_nap`.
    pub fn next_nap_and_concurrency(
        &self,
        backoff: &AtomicBool,
        in_flight: i64,
        permitted: i64,
        nap: Duration,
    ) -> (Duration, i64) {
        if backoff.swap(false, Ordering::AcqRel) {
            let next_permitted = permitted.min(in_flight).max(1);
            let next_nap = (nap * 2).min(self.max_nap);
            (next_nap, next_permitted)
        } else {
            let next_permitted = in_flight
                .saturating_add(CONCURRENCY_INC_STEP)
                .min(self.max_concurrency);
            let next_nap = nap
                .saturating_sub(self.nap_shrink_step)
                .max(self.regular_nap);
            (next_nap, next_permitted)
        }
    }
}

pub type PutRowCallback =
    Box<dyn FnOnce(PutRowRequest, Option<OtsError>, PutRowResponse) + Send>;
pub type UpdateRowCallback =
    Box<dyn FnOnce(UpdateRowRequest, Option<OtsError>, UpdateRowResponse) + Send>;
pub type DeleteRowCallback =
    Box<dyn FnOnce(DeleteRowRequest, Option<OtsError>, DeleteRowResponse) + Send>;
pub type BatchWriteRowCallback =
    Box<dyn FnOnce(BatchWriteRowRequest, Option<OtsError>, BatchWriteRowResponse) + Send>;

/// The slice of a client the writer needs: batch dispatch plus the pools it
/// schedules callbacks on. Tests plug mock runners in here.
pub trait BatchWriteRunner: Send + Sync + 'static {
    fn batch_write_row(&self, request: BatchWriteRowRequest, callback: BatchWriteRowCallback);
    fn callback_pool(&self) -> Arc<ExecutorPool>;
    fn logger(&self) -> Arc<dyn Logger>;
}

impl BatchWriteRunner for AsyncClient {
    fn batch_write_row(&self, request: BatchWriteRowRequest, callback: BatchWriteRowCallback) {
        AsyncClient::batch_write_row(self, request, move |request, err, response| {
            callback(request, err, response)
        });
    }

    fn callback_pool(&self) -> Arc<ExecutorPool> {
        self.inner().callback_pool().clone()
    }

    fn logger(&self) -> Arc<dyn Logger> {
        self.inner().logger().clone()
    }
}

enum Item {
    Put {
        request: PutRowRequest,
        callback: PutRowCallback,
    },
    Update {
        request: UpdateRowRequest,
        callback: UpdateRowCallback,
    },
    Delete {
        request: DeleteRowRequest,
        callback: DeleteRowCallback,
    },
}

struct WakeSignal {
    nudges: Mutex<u64>,
    cv: Condvar,
}

impl WakeSignal {
    fn new() -> Self {
        Self {
            nudges: Mutex::new(0),
            cv: Condvar::new(),
        }
    }

    fn nudge(&self) {
        let mut nudges = self.nudges.lock().expect("wake signal poisoned");
        *nudges += 1;
        self.cv.notify_one();
    }

    /// Sleeps up to `nap`, returning early when nudged. Consumes all pending
    /// nudges.
    fn take_nap(&self, nap: Duration) {
        let mut nudges = self.nudges.lock().expect("wake signal poisoned");
        if *nudges == 0 {
            let (next, _) = self
                .cv
                .wait_timeout(nudges, nap)
                .expect("wake signal poisoned");
            nudges = next;
        }
        *nudges = 0;
    }
}

struct WriterInner {
    runner: Arc<dyn BatchWriteRunner>,
    config: BatchWriterConfig,
    actors: Arc<ExecutorPool>,
    waiting: Mutex<VecDeque<Item>>,
    wake: WakeSignal,
    exit: AtomicBool,
    in_flight: AtomicI64,
    should_backoff: AtomicBool,
}

impl WriterInner {
    fn log(&self, level: LogLevel, message: &str) {
        self.runner.logger().record(level, LOG_MODULE, "", message);
    }

    fn enqueue(self: &Arc<Self>, item: Item) {
        self.waiting
            .lock()
            .expect("waiting list poisoned")
            .push_back(item);
        self.wake.nudge();
    }

    /// Puts items back at the head of the waiting list, keeping their
    /// relative submission order.
    fn prepend(&self, items: Vec<Item>) {
        let mut waiting = self.waiting.lock().expect("waiting list poisoned");
        for item in items.into_iter().rev() {
            waiting.push_front(item);
        }
    }

    fn pop_batch(&self) -> Vec<Item> {
        let mut waiting = self.waiting.lock().expect("waiting list poisoned");
        let take = (self.config.max_batch_size as usize).min(waiting.len());
        waiting.drain(..take).collect()
    }

    fn send_batches(self: &Arc<Self>, permitted: i64) {
        while self.in_flight.load(Ordering::Acquire) < permitted {
            let items = self.pop_batch();
            if items.is_empty() {
                break;
            }
            self.dispatch(items);
        }
    }

    fn dispatch(self: &Arc<Self>, items: Vec<Item>) {
        let mut request = BatchWriteRowRequest::default();
        for (idx, item) in items.iter().enumerate() {
            let idx = idx as u64;
            match item {
                Item::Put { request: single, .. } => request
                    .puts
                    .push(WithUserData::tagged(single.row_change.clone(), idx)),
                Item::Update { request: single, .. } => request
                    .updates
                    .push(WithUserData::tagged(single.row_change.clone(), idx)),
                Item::Delete { request: single, .. } => request
                    .deletes
                    .push(WithUserData::tagged(single.row_change.clone(), idx)),
            }
        }
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        self.log(
            LogLevel::Debug,
            &format!(
                "batch_dispatch rows={} in_flight={}",
                items.len(),
                self.in_flight.load(Ordering::Acquire)
            ),
        );
        let inner = self.clone();
        self.runner.batch_write_row(
            request,
            Box::new(move |request, err, response| {
                inner.on_batch_done(items, request, err, response);
            }),
        );
    }

    fn on_batch_done(
        self: &Arc<Self>,
        items: Vec<Item>,
        _request: BatchWriteRowRequest,
        err: Option<OtsError>,
        response: BatchWriteRowResponse,
    ) {
        match err {
            Some(err) if retry::retriable(Action::BatchWriteRow, &err) => {
                self.should_backoff.store(true, Ordering::Release);
                self.log(
                    LogLevel::Info,
                    &format!("batch_requeue rows={} code={}", items.len(), err.code),
                );
                self.prepend(items);
            }
            Some(err) => {
                // terminal request-level failure: every item hears about it
                for item in items {
                    self.complete_item(item, Some(err.clone()), None, ResponseMeta::default());
                }
            }
            None => self.demux(items, response),
        }
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.wake.nudge();
    }

    /// Splits a request-level OK into per-row outcomes: retriable row errors
    /// go back to the head of the waiting list, everything else completes.
    fn demux(self: &Arc<Self>, items: Vec<Item>, response: BatchWriteRowResponse) {
        let meta = response.meta.clone();
        let mut slots: Vec<Option<Item>> = items.into_iter().map(Some).collect();
        let mut requeue: Vec<(u64, Item)> = Vec::new();
        let results = response
            .put_results
            .into_iter()
            .chain(response.update_results)
            .chain(response.delete_results);
        for result in results {
            let Some(idx) = result.user_data else { continue };
            let Some(item) = slots.get_mut(idx as usize).and_then(Option::take) else {
                continue;
            };
            match result.data {
                Ok(row) => self.complete_item(item, None, row, meta.clone()),
                Err(row_err) => {
                    if retry::retriable(Action::BatchWriteRow, &row_err) {
                        self.should_backoff.store(true, Ordering::Release);
                        requeue.push((idx, item));
                    } else {
                        self.complete_item(item, Some(row_err), None, meta.clone());
                    }
                }
            }
        }
        // a row the server did not answer is treated as lost
        for item in slots.into_iter().flatten() {
            self.complete_item(
                item,
                Some(OtsError::new(
                    crate::error::ErrorCode::ResponseDirectlyLost,
                    "row result is missing in the batch response",
                )),
                None,
                meta.clone(),
            );
        }
        if !requeue.is_empty() {
            self.log(
                LogLevel::Info,
                &format!("row_requeue rows={}", requeue.len()),
            );
            // back to the head in original submission order
            requeue.sort_by_key(|(idx, _)| *idx);
            self.prepend(requeue.into_iter().map(|(_, item)| item).collect());
        }
    }

    fn complete_item(
        self: &Arc<Self>,
        item: Item,
        err: Option<OtsError>,
        row: Option<crate::types::row::Row>,
        meta: ResponseMeta,
    ) {
        let task: Box<dyn FnOnce() + Send> = match item {
            Item::Put { request, callback } => {
                let mut response = PutRowResponse::default();
                if err.is_none() {
                    response.meta = meta;
                    response.row = row;
                }
                Box::new(move || callback(request, err, response))
            }
            Item::Update { request, callback } => {
                let mut response = UpdateRowResponse::default();
                if err.is_none() {
                    response.meta = meta;
                    response.row = row;
                }
                Box::new(move || callback(request, err, response))
            }
            Item::Delete { request, callback } => {
                let mut response = DeleteRowResponse::default();
                if err.is_none() {
                    response.meta = meta;
                    response.row = row;
                }
                Box::new(move || callback(request, err, response))
            }
        };
        if let Err(rejected) = self.actors.post(task) {
            rejected.run();
        }
    }

    fn flush_all(self: &Arc<Self>) {
        loop {
            let items = self.pop_batch();
            if items.is_empty() {
                break;
            }
            self.dispatch(items);
        }
    }

    fn aggregator(self: &Arc<Self>) {
        let mut nap = self.config.regular_nap;
        let mut permitted: i64 = 1;
        while !self.exit.load(Ordering::Acquire) {
            self.wake.take_nap(nap);
            if self.exit.load(Ordering::Acquire) {
                break;
            }
            let (next_nap, next_permitted) = self.config.next_nap_and_concurrency(
                &self.should_backoff,
                self.in_flight.load(Ordering::Acquire),
                permitted,
                nap,
            );
            nap = next_nap;
            permitted = next_permitted;
            self.send_batches(permitted);
        }
        // drain: flush everything left, ignoring the concurrency cap, and
        // wait out the in-flight batches (requeues included)
        self.log(LogLevel::Info, "aggregator_drain_start");
        loop {
            self.flush_all();
            let waiting_empty = self
                .waiting
                .lock()
                .expect("waiting list poisoned")
                .is_empty();
            if waiting_empty && self.in_flight.load(Ordering::Acquire) == 0 {
                break;
            }
            self.wake.take_nap(self.config.regular_nap);
        }
        self.log(LogLevel::Info, "aggregator_drain_done");
    }
}

/// Non-blocking batch writer.
///
/// Dropping it flushes the waiting list, waits for every in-flight batch,
/// and only then returns; every enqueued item gets its one callback.
pub struct AsyncBatchWriter {
    inner: Arc<WriterInner>,
    aggregator: Option<thread::JoinHandle<()>>,
}

impl AsyncBatchWriter {
    pub fn new(client: &AsyncClient, config: BatchWriterConfig) -> Result<Self, OtsError> {
        Self::with_runner(Arc::new(client.clone()), config)
    }

    /// Builds a writer over any runner; the seam tests mock.
    pub fn with_runner(
        runner: Arc<dyn BatchWriteRunner>,
        config: BatchWriterConfig,
    ) -> Result<Self, OtsError> {
        config.validate()?;
        let actors = match &config.actors {
            Some(pool) => pool.clone(),
            None => runner.callback_pool(),
        };
        let inner = Arc::new(WriterInner {
            runner,
            config,
            actors,
            waiting: Mutex::new(VecDeque::new()),
            wake: WakeSignal::new(),
            exit: AtomicBool::new(false),
            in_flight: AtomicI64::new(0),
            should_backoff: AtomicBool::new(false),
        });
        let worker = inner.clone();
        let aggregator = thread::Builder::new()
            .name("widerow_batch_writer".to_string())
            .spawn(move || worker.aggregator())
            .expect("failed to spawn batch-writer aggregator");
        Ok(Self {
            inner,
            aggregator: Some(aggregator),
        })
    }

    /// Current number of in-flight `BatchWriteRow` calls.
    pub fn in_flight(&self) -> i64 {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Enqueues a put. Returns immediately; the callback fires later,
    /// exactly once.
    pub fn put_row(
        &self,
        request: PutRowRequest,
        callback: impl FnOnce(PutRowRequest, Option<OtsError>, PutRowResponse) + Send + 'static,
    ) {
        if let Err(err) = request.validate() {
            self.reject(move || callback(request, Some(err), PutRowResponse::default()));
            return;
        }
        self.inner.enqueue(Item::Put {
            request,
            callback: Box::new(callback),
        });
    }

    /// Enqueues an update. Returns immediately; the callback fires later,
    /// exactly once.
    pub fn update_row(
        &self,
        request: UpdateRowRequest,
        callback: impl FnOnce(UpdateRowRequest, Option<OtsError>, UpdateRowResponse) + Send + 'static,
    ) {
        if let Err(err) = request.validate() {
            self.reject(move || callback(request, Some(err), UpdateRowResponse::default()));
            return;
        }
        self.inner.enqueue(Item::Update {
            request,
            callback: Box::new(callback),
        });
    }

    /// Enqueues a delete. Returns immediately; the callback fires later,
    /// exactly once.
    pub fn delete_row(
        &self,
        request: DeleteRowRequest,
        callback: impl FnOnce(DeleteRowRequest, Option<OtsError>, DeleteRowResponse) + Send + 'static,
    ) {
        if let Err(err) = request.validate() {
            self.reject(move || callback(request, Some(err), DeleteRowResponse::default()));
            return;
        }
        self.inner.enqueue(Item::Delete {
            request,
            callback: Box::new(callback),
        });
    }

    fn reject(&self, task: impl FnOnce() + Send + 'static) {
        if let Err(rejected) = self.inner.actors.post(task) {
            rejected.run();
        }
    }
}

impl Drop for AsyncBatchWriter {
    fn drop(&mut self) {
        self.inner.exit.store(true, Ordering::Release);
        self.inner.wake.nudge();
        if let Some(handle) = self.aggregator.take() {
            let _ = handle.join();
        }
    }
}

/// Blocking facade over [`AsyncBatchWriter`].
pub struct SyncBatchWriter {
    writer: AsyncBatchWriter,
}

impl SyncBatchWriter {
    pub fn new(client: &AsyncClient, config: BatchWriterConfig) -> Result<Self, OtsError> {
        Ok(Self {
            writer: AsyncBatchWriter::new(client, config)?,
        })
    }

    pub fn put_row(&self, request: PutRowRequest) -> Result<PutRowResponse, OtsError> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.writer.put_row(request, move |_request, err, response| {
            let _ = tx.send((err, response));
        });
        wait_slot(rx)
    }

    pub fn update_row(&self, request: UpdateRowRequest) -> Result<UpdateRowResponse, OtsError> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.writer.update_row(request, move |_request, err, response| {
            let _ = tx.send((err, response));
        });
        wait_slot(rx)
    }

    pub fn delete_row(&self, request: DeleteRowRequest) -> Result<DeleteRowResponse, OtsError> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.writer.delete_row(request, move |_request, err, response| {
            let _ = tx.send((err, response));
        });
        wait_slot(rx)
    }
}

fn wait_slot<T>(rx: mpsc::Receiver<(Option<OtsError>, T)>) -> Result<T, OtsError> {
    let (err, response) = rx.recv().map_err(|_| {
        OtsError::new(
            crate::error::ErrorCode::OtsClientUnknown,
            "callback never fired",
        )
    })?;
    match err {
        Some(err) => Err(err),
        None => Ok(response),
    }
}
