//! Client SDK for the WideRow wide-column cloud table service.
//!
//! The crate centers on four subsystems: the asynchronous request pipeline
//! (validate, sign, dispatch, decode, retry), the retry policy engine, the
//! aggregating batch writer, and the plainbuffer row codec. A blocking and a
//! non-blocking facade share one pipeline.

pub mod error;
pub mod protocol;
pub mod retry;
pub mod security;
pub mod signer;
pub mod time;
pub mod tracker;

pub mod executor;

pub mod types {
    pub mod change;
    pub mod criterion;
    pub mod request;
    pub mod row;
    pub mod schema;
    pub mod value;

    pub use change::*;
    pub use criterion::*;
    pub use request::*;
    pub use row::*;
    pub use schema::*;
    pub use value::*;
}

pub mod plainbuffer {
    pub mod consts;
    pub mod reader;
    pub mod writer;

    pub use consts::*;
    pub use reader::{decode_row, decode_rows};
    pub use writer::{encode_delete, encode_primary_key, encode_put, encode_update};
}

pub mod http {
    pub mod endpoint;
    pub mod transport;

    pub use endpoint::*;
    pub use transport::*;
}

pub mod observability {
    pub mod logging;

    pub use logging::*;
}

pub mod client {
    pub mod batch_writer;
    pub mod core;
    pub mod options;
    pub mod range_iterator;

    pub use batch_writer::*;
    pub use core::*;
    pub use options::*;
    pub use range_iterator::*;
}

pub use client::{
    AsyncBatchWriter, AsyncClient, BatchWriteRunner, BatchWriterConfig, ClientOptions,
    Credential, RangeIterator, RangeReader, SyncBatchWriter, SyncClient,
    CONCURRENCY_INC_STEP,
};
pub use error::{ErrorCode, OtsError};
pub use executor::{Executor, ExecutorPool};
pub use http::{Endpoint, HttpRequest, HttpResponse, ParsedEndpoint, Protocol, Transport};
pub use observability::{JsonLineLogger, LogLevel, Logger, NullLogger};
pub use protocol::{Action, Api};
pub use retry::{classify, retriable, DeadlineRetryStrategy, NoRetry, RetryCategory, RetryStrategy};
pub use time::UtcTime;
pub use tracker::Tracker;
pub use types::{
    Attribute, AttributeValue, BatchGetRowRequest, BatchGetRowResponse, BatchWriteRowRequest,
    BatchWriteRowResponse, CapacityUnit, CompareResult, ComputeSplitsBySizeRequest,
    ComputeSplitsBySizeResponse, Condition, CreateTableRequest, CreateTableResponse,
    DeleteRowRequest, DeleteRowResponse, DeleteTableRequest, DeleteTableResponse,
    DescribeTableRequest, DescribeTableResponse, GetRangeRequest, GetRangeResponse,
    GetRowRequest, GetRowResponse, ListTableRequest, ListTableResponse,
    MultiPointQueryCriterion, OpRequest, OpResponse, PointQueryCriterion, PrimaryKey,
    PrimaryKeyColumn, PrimaryKeyColumnSchema, PrimaryKeyType, PrimaryKeyValue, PutRowRequest,
    PutRowResponse, RangeDirection, RangeQueryCriterion, ResponseMeta, ReturnType, Row,
    RowDeleteChange, RowExistenceExpectation, RowPutChange, RowResult, RowUpdate,
    RowUpdateChange, RowUpdateOp, Schema, Split, TableMeta, TableOptions, TableStatus,
    TimeRange, UpdateRowRequest, UpdateRowResponse, UpdateTableRequest, UpdateTableResponse,
    WithUserData,
};
