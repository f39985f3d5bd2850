//! The request pipeline and its two facades.
//!
//! One logical call walks validate → encode → sign → send → decode →
//! classify → retry-or-complete. Transport I/O runs on the I/O executors;
//! response handling and the user callback always run on callback
//! executors, never on a transport thread. Both facades are thin handles
//! over one shared inner pipeline.

use crate::client::options::{ClientOptions, Credential};
use crate::error::{ErrorCode, OtsError};
use crate::executor::ExecutorPool;
use crate::http::endpoint::{Endpoint, ParsedEndpoint};
use crate::http::transport::{HttpRequest, ReqwestTransport, Transport};
use crate::observability::logging::{LogLevel, Logger};
use crate::protocol::{self, Api};
use crate::retry::RetryStrategy;
use crate::signer;
use crate::time::UtcTime;
use crate::tracker::Tracker;
use crate::types::request::*;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

const LOG_MODULE: &str = "pipeline";

pub(crate) struct ClientInner {
    instance_name: String,
    credential: Credential,
    transport: Arc<dyn Transport>,
    connect_timeout: Duration,
    request_timeout: Duration,
    retry_template: Box<dyn RetryStrategy>,
    logger: Arc<dyn Logger>,
    callback_pool: Arc<ExecutorPool>,
    io_pool: Arc<ExecutorPool>,
}

impl ClientInner {
    fn build(
        endpoint: Endpoint,
        credential: Credential,
        options: ClientOptions,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Arc<Self>, OtsError> {
        endpoint.validate()?;
        credential.validate()?;
        options.validate()?;
        let parsed = ParsedEndpoint::parse(&endpoint.endpoint)?;
        let transport = match transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(
                &parsed,
                options.connect_timeout,
                options.max_connections,
            )?),
        };
        Ok(Arc::new(Self {
            instance_name: endpoint.instance_name,
            credential,
            transport,
            connect_timeout: options.connect_timeout,
            request_timeout: options.request_timeout,
            retry_template: options.retry_strategy,
            logger: options.logger,
            callback_pool: Arc::new(ExecutorPool::new(options.callback_executors, "widerow_cb")),
            io_pool: Arc::new(ExecutorPool::new(options.callback_executors, "widerow_io")),
        }))
    }

    pub(crate) fn callback_pool(&self) -> &Arc<ExecutorPool> {
        &self.callback_pool
    }

    pub(crate) fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    fn log(&self, level: LogLevel, tracker: &str, message: &str) {
        self.logger.record(level, LOG_MODULE, tracker, message);
    }
}

struct CallContext<A: Api> {
    inner: Arc<ClientInner>,
    tracker: Tracker,
    retry: Box<dyn RetryStrategy>,
    /// The executor this call's response handling and timers live on.
    executor_idx: usize,
    request: A::Request,
    callback: Box<dyn FnOnce(A::Request, Option<OtsError>, A::Response) + Send>,
}

fn issue<A: Api>(
    inner: &Arc<ClientInner>,
    request: A::Request,
    callback: Box<dyn FnOnce(A::Request, Option<OtsError>, A::Response) + Send>,
) {
    let tracker = Tracker::generate();
    // pre-flight validation fails synchronously on the calling thread
    if let Err(err) = request.validate() {
        let err = err.with_trace_id(tracker.trace_id());
        callback(request, Some(err), A::Response::default());
        return;
    }
    inner.log(
        LogLevel::Debug,
        tracker.trace_id(),
        &format!("call_start action={}", A::ACTION),
    );
    let ctx = CallContext::<A> {
        inner: inner.clone(),
        tracker,
        retry: inner.retry_template.clone_for_call(),
        executor_idx: inner.callback_pool.pick_index(),
        request,
        callback,
    };
    let executor = inner.callback_pool.executor(ctx.executor_idx);
    if let Err(rejected) = executor.post(move || attempt::<A>(ctx)) {
        // client is closing; the callback still fires exactly once
        rejected.run();
    }
}

fn attempt<A: Api>(ctx: CallContext<A>) {
    let body = match A::encode(&ctx.request) {
        Ok(body) => body,
        Err(err) => return complete::<A>(ctx, Err(err)),
    };
    let inner = ctx.inner.clone();
    let mut headers = signer::build_headers(
        &inner.credential,
        &inner.instance_name,
        &ctx.tracker,
        &body,
        UtcTime::now(),
    );
    signer::sign(&mut headers, A::ACTION.path(), &inner.credential.access_key_secret);
    let http_request = HttpRequest {
        path: A::ACTION.path().to_string(),
        headers,
        body,
        connect_timeout: inner.connect_timeout,
        request_timeout: inner.request_timeout,
    };
    let io_task = move || {
        let result = ctx.inner.transport.send(http_request);
        // hop off the transport thread before any decoding or user code
        let inner = ctx.inner.clone();
        let executor = inner.callback_pool.executor(ctx.executor_idx);
        if let Err(rejected) = executor.post(move || handle_response::<A>(ctx, result)) {
            rejected.run();
        }
    };
    if let Err(rejected) = inner.io_pool.post(io_task) {
        rejected.run();
    }
}

fn handle_response<A: Api>(ctx: CallContext<A>, result: Result<crate::http::transport::HttpResponse, OtsError>) {
    let trace_id = ctx.tracker.trace_id().to_string();
    match result {
        Err(err) => classify::<A>(ctx, err.with_trace_id(trace_id)),
        Ok(response) => {
            let request_id = response
                .headers
                .get(signer::HEADER_REQUEST_ID)
                .cloned()
                .unwrap_or_default();
            if response.status >= 400 {
                let err = protocol::decode_error(response.status, &response.body)
                    .with_request_id(request_id)
                    .with_trace_id(trace_id);
                return classify::<A>(ctx, err);
            }
            match A::decode(&response.body) {
                Ok(mut decoded) => {
                    A::correlate(&ctx.request, &mut decoded);
                    let meta = decoded.meta_mut();
                    meta.request_id = request_id;
                    meta.trace_id = trace_id;
                    complete::<A>(ctx, Ok(decoded));
                }
                Err(err) => {
                    let err = err.with_request_id(request_id).with_trace_id(trace_id);
                    classify::<A>(ctx, err)
                }
            }
        }
    }
}

fn classify<A: Api>(mut ctx: CallContext<A>, err: OtsError) {
    if ctx.retry.should_retry(A::ACTION, &err) {
        if let Some(pause) = ctx.retry.next_pause() {
            ctx.inner.log(
                LogLevel::Info,
                ctx.tracker.trace_id(),
                &format!(
                    "retry action={} code={} retries={} pause_msec={}",
                    A::ACTION,
                    err.code,
                    ctx.retry.retries(),
                    pause.as_millis()
                ),
            );
            let inner = ctx.inner.clone();
            let executor = inner.callback_pool.executor(ctx.executor_idx);
            if let Err(rejected) = executor.post_after(pause, move || attempt::<A>(ctx)) {
                rejected.run();
            }
            return;
        }
    }
    complete::<A>(ctx, Err(err));
}

fn complete<A: Api>(ctx: CallContext<A>, result: Result<A::Response, OtsError>) {
    let CallContext {
        inner,
        tracker,
        request,
        callback,
        ..
    } = ctx;
    let (err, response) = match result {
        Ok(response) => {
            inner.log(
                LogLevel::Debug,
                tracker.trace_id(),
                &format!("call_completed action={} ok=true", A::ACTION),
            );
            (None, response)
        }
        Err(err) => {
            inner.log(
                LogLevel::Info,
                tracker.trace_id(),
                &format!(
                    "call_completed action={} ok=false code={}",
                    A::ACTION,
                    err.code
                ),
            );
            // the response container stays in its reset state on error
            (Some(err), A::Response::default())
        }
    };
    if let Err(rejected) = inner
        .callback_pool
        .post(move || callback(request, err, response))
    {
        rejected.run();
    }
}

macro_rules! async_op {
    ($(#[$doc:meta])* $name:ident, $api:ty, $request:ty, $response:ty) => {
        $(#[$doc])*
        pub fn $name(
            &self,
            request: $request,
            callback: impl FnOnce($request, Option<OtsError>, $response) + Send + 'static,
        ) {
            issue::<$api>(&self.inner, request, Box::new(callback));
        }
    };
}

macro_rules! sync_op {
    ($(#[$doc:meta])* $name:ident, $api:ty, $request:ty, $response:ty) => {
        $(#[$doc])*
        pub fn $name(&self, request: $request) -> Result<$response, OtsError> {
            let (tx, rx) = mpsc::sync_channel::<(Option<OtsError>, $response)>(1);
            issue::<$api>(
                &self.inner,
                request,
                Box::new(move |_request, err, response| {
                    let _ = tx.send((err, response));
                }),
            );
            let (err, response) = rx.recv().map_err(|_| {
                OtsError::new(ErrorCode::OtsClientUnknown, "callback never fired")
            })?;
            match err {
                Some(err) => Err(err),
                None => Ok(response),
            }
        }
    };
}

/// Non-blocking client. Every method returns immediately; the callback
/// fires later, exactly once, on a callback executor.
///
/// Cloning is cheap and shares the underlying pipeline.
#[derive(Clone)]
pub struct AsyncClient {
    inner: Arc<ClientInner>,
}

impl AsyncClient {
    pub fn create(
        endpoint: Endpoint,
        credential: Credential,
        options: ClientOptions,
    ) -> Result<Self, OtsError> {
        Ok(Self {
            inner: ClientInner::build(endpoint, credential, options, None)?,
        })
    }

    /// Same as [`AsyncClient::create`] but with an injected transport;
    /// the seam tests mock.
    pub fn create_with_transport(
        endpoint: Endpoint,
        credential: Credential,
        options: ClientOptions,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, OtsError> {
        Ok(Self {
            inner: ClientInner::build(endpoint, credential, options, Some(transport))?,
        })
    }

    /// The blocking facade over the same pipeline.
    pub fn as_sync(&self) -> SyncClient {
        SyncClient {
            inner: self.inner.clone(),
        }
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        self.inner.logger()
    }

    pub(crate) fn inner(&self) -> &Arc<ClientInner> {
        &self.inner
    }

    async_op!(
        /// Lists all tables under the instance.
        list_table, protocol::ListTable, ListTableRequest, ListTableResponse);
    async_op!(
        /// Creates a table.
        create_table, protocol::CreateTable, CreateTableRequest, CreateTableResponse);
    async_op!(
        /// Deletes a table.
        delete_table, protocol::DeleteTable, DeleteTableRequest, DeleteTableResponse);
    async_op!(
        /// Fetches meta of a table.
        describe_table, protocol::DescribeTable, DescribeTableRequest, DescribeTableResponse);
    async_op!(
        /// Updates mutable fields of meta of a table.
        update_table, protocol::UpdateTable, UpdateTableRequest, UpdateTableResponse);
    async_op!(
        /// Gets a row. A missing row yields an absent row field, not an error.
        get_row, protocol::GetRow, GetRowRequest, GetRowResponse);
    async_op!(
        /// Puts a row, overwriting per the request's condition.
        put_row, protocol::PutRow, PutRowRequest, PutRowResponse);
    async_op!(
        /// Updates a row, or inserts it when absent.
        update_row, protocol::UpdateRow, UpdateRowRequest, UpdateRowResponse);
    async_op!(
        /// Deletes a row.
        delete_row, protocol::DeleteRow, DeleteRowRequest, DeleteRowResponse);
    async_op!(
        /// Gets a batch of rows. Row-level errors land in their respective
        /// results, never as a request-level failure.
        batch_get_row, protocol::BatchGetRow, BatchGetRowRequest, BatchGetRowResponse);
    async_op!(
        /// Writes a batch of rows. Row-level errors land in their respective
        /// results, never as a request-level failure.
        batch_write_row, protocol::BatchWriteRow, BatchWriteRowRequest, BatchWriteRowResponse);
    async_op!(
        /// Fetches one page of a range. Prefer `RangeIterator` for ranges
        /// that may span pages.
        get_range, protocol::GetRange, GetRangeRequest, GetRangeResponse);
    async_op!(
        /// Computes horizontal splits by approximate size.
        compute_splits_by_size, protocol::ComputeSplitsBySize, ComputeSplitsBySizeRequest,
        ComputeSplitsBySizeResponse);
}

/// Blocking client. Each call parks the calling thread on a one-shot slot
/// until its callback fires.
#[derive(Clone)]
pub struct SyncClient {
    inner: Arc<ClientInner>,
}

impl SyncClient {
    pub fn create(
        endpoint: Endpoint,
        credential: Credential,
        options: ClientOptions,
    ) -> Result<Self, OtsError> {
        Ok(Self {
            inner: ClientInner::build(endpoint, credential, options, None)?,
        })
    }

    /// The non-blocking facade over the same pipeline.
    pub fn as_async(&self) -> AsyncClient {
        AsyncClient {
            inner: self.inner.clone(),
        }
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        self.inner.logger()
    }

    sync_op!(
        /// Lists all tables under the instance.
        list_table, protocol::ListTable, ListTableRequest, ListTableResponse);
    sync_op!(
        /// Creates a table.
        create_table, protocol::CreateTable, CreateTableRequest, CreateTableResponse);
    sync_op!(
        /// Deletes a table.
        delete_table, protocol::DeleteTable, DeleteTableRequest, DeleteTableResponse);
    sync_op!(
        /// Fetches meta of a table.
        describe_table, protocol::DescribeTable, DescribeTableRequest, DescribeTableResponse);
    sync_op!(
        /// Updates mutable fields of meta of a table.
        update_table, protocol::UpdateTable, UpdateTableRequest, UpdateTableResponse);
    sync_op!(
        /// Gets a row. A missing row yields an absent row field, not an error.
        get_row, protocol::GetRow, GetRowRequest, GetRowResponse);
    sync_op!(
        /// Puts a row, overwriting per the request's condition.
        put_row, protocol::PutRow, PutRowRequest, PutRowResponse);
    sync_op!(
        /// Updates a row, or inserts it when absent.
        update_row, protocol::UpdateRow, UpdateRowRequest, UpdateRowResponse);
    sync_op!(
        /// Deletes a row.
        delete_row, protocol::DeleteRow, DeleteRowRequest, DeleteRowResponse);
    sync_op!(
        /// Gets a batch of rows. Row-level errors land in their respective
        /// results, never as a request-level failure.
        batch_get_row, protocol::BatchGetRow, BatchGetRowRequest, BatchGetRowResponse);
    sync_op!(
        /// Writes a batch of rows. Row-level errors land in their respective
        /// results, never as a request-level failure.
        batch_write_row, protocol::BatchWriteRow, BatchWriteRowRequest, BatchWriteRowResponse);
    sync_op!(
        /// Fetches one page of a range. Prefer `RangeIterator` for ranges
        /// that may span pages.
        get_range, protocol::GetRange, GetRangeRequest, GetRangeResponse);
    sync_op!(
        /// Computes horizontal splits by approximate size.
        compute_splits_by_size, protocol::ComputeSplitsBySize, ComputeSplitsBySizeRequest,
        ComputeSplitsBySizeResponse);
}
