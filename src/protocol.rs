//! Action catalog and the envelope codec.
//!
//! The store's protobuf descriptors are an external collaborator; this
//! module implements the same logical-request-to-bytes mapping with serde
//! envelopes. Row bodies travel as plainbuffer frames, base64-encoded inside
//! the envelope, so the row codec's semantics are identical either way.

use crate::error::{ErrorCode, OtsError};
use crate::plainbuffer::{reader, writer};
use crate::security::{base64_decode, base64_encode};
use crate::types::change::{
    Condition, ReturnType, RowDeleteChange, RowExistenceExpectation, RowPutChange,
    RowUpdateChange,
};
use crate::types::criterion::{RangeDirection, TimeRange, WithUserData};
use crate::types::request::*;
use crate::types::row::{CapacityUnit, PrimaryKey, Row};
use crate::types::schema::{
    PrimaryKeyColumnSchema, PrimaryKeyType, Schema, Split, TableMeta, TableOptions, TableStatus,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The twelve logical APIs plus split computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ListTable,
    CreateTable,
    DeleteTable,
    DescribeTable,
    UpdateTable,
    GetRow,
    PutRow,
    UpdateRow,
    DeleteRow,
    BatchGetRow,
    BatchWriteRow,
    GetRange,
    ComputeSplitsBySize,
}

impl Action {
    /// URI path of the action; fixed by the server.
    pub fn path(self) -> &'static str {
        match self {
            Action::ListTable => "/ListTable",
            Action::CreateTable => "/CreateTable",
            Action::DeleteTable => "/DeleteTable",
            Action::DescribeTable => "/DescribeTable",
            Action::UpdateTable => "/UpdateTable",
            Action::GetRow => "/GetRow",
            Action::PutRow => "/PutRow",
            Action::UpdateRow => "/UpdateRow",
            Action::DeleteRow => "/DeleteRow",
            Action::BatchGetRow => "/BatchGetRow",
            Action::BatchWriteRow => "/BatchWriteRow",
            Action::GetRange => "/GetRange",
            Action::ComputeSplitsBySize => "/ComputeSplitPointsBySize",
        }
    }

    /// Whether retrying the action cannot apply its effect twice.
    /// Deleting a row twice deletes it once, so DeleteRow counts; UpdateRow
    /// is additive and does not.
    pub fn idempotent(self) -> bool {
        matches!(
            self,
            Action::ListTable
                | Action::DescribeTable
                | Action::GetRow
                | Action::GetRange
                | Action::BatchGetRow
                | Action::DeleteRow
                | Action::DeleteTable
        )
    }

    pub fn all() -> [Action; 13] {
        [
            Action::ListTable,
            Action::CreateTable,
            Action::DeleteTable,
            Action::DescribeTable,
            Action::UpdateTable,
            Action::GetRow,
            Action::PutRow,
            Action::UpdateRow,
            Action::DeleteRow,
            Action::BatchGetRow,
            Action::BatchWriteRow,
            Action::GetRange,
            Action::ComputeSplitsBySize,
        ]
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.path()[1..])
    }
}

/// Static description of one API: its action constant, request/response
/// types, and the envelope codec. Implemented once per action marker.
pub trait Api: 'static {
    const ACTION: Action;
    type Request: OpRequest;
    type Response: OpResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError>;
    fn decode(body: &[u8]) -> Result<Self::Response, OtsError>;

    /// Copies caller context from request entries onto positionally matching
    /// response results. Only the batch APIs carry any.
    fn correlate(_request: &Self::Request, _response: &mut Self::Response) {}
}

fn encode_envelope<T: Serialize>(envelope: &T) -> Result<Vec<u8>, OtsError> {
    serde_json::to_vec(envelope).map_err(|err| {
        OtsError::new(
            ErrorCode::OtsClientUnknown,
            format!("fail to serialize request envelope: {err}"),
        )
    })
}

fn decode_envelope<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, OtsError> {
    serde_json::from_slice(body)
        .map_err(|_| OtsError::corrupted_response("fail to parse response envelope", 0))
}

fn pk_to_b64(primary_key: &PrimaryKey) -> Result<String, OtsError> {
    writer::encode_primary_key(primary_key).map(|frame| base64_encode(&frame))
}

fn pk_from_b64(text: &str) -> Result<PrimaryKey, OtsError> {
    let frame = base64_decode(text)
        .ok_or_else(|| OtsError::corrupted_response("primary key is not valid base64", 0))?;
    reader::decode_row(&frame).map(|row| row.primary_key)
}

fn row_from_b64(text: &str) -> Result<Row, OtsError> {
    let frame = base64_decode(text)
        .ok_or_else(|| OtsError::corrupted_response("row is not valid base64", 0))?;
    reader::decode_row(&frame)
}

fn rows_from_b64(text: &str) -> Result<Vec<Row>, OtsError> {
    let frame = base64_decode(text)
        .ok_or_else(|| OtsError::corrupted_response("rows are not valid base64", 0))?;
    reader::decode_rows(&frame)
}

// shared envelope fragments

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireCapacity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    read: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    write: Option<i64>,
}

impl From<&CapacityUnit> for WireCapacity {
    fn from(cu: &CapacityUnit) -> Self {
        Self { read: cu.read, write: cu.write }
    }
}

impl From<WireCapacity> for CapacityUnit {
    fn from(wire: WireCapacity) -> Self {
        Self { read: wire.read, write: wire.write }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireTimeRange {
    start_msec: i64,
    end_msec: i64,
}

impl From<&TimeRange> for WireTimeRange {
    fn from(range: &TimeRange) -> Self {
        Self {
            start_msec: range.start.to_msec(),
            end_msec: range.end.to_msec(),
        }
    }
}

fn condition_str(condition: &Condition) -> &'static str {
    match condition.row_condition {
        RowExistenceExpectation::Ignore => "IGNORE",
        RowExistenceExpectation::ExpectExist => "EXPECT_EXIST",
        RowExistenceExpectation::ExpectNotExist => "EXPECT_NOT_EXIST",
    }
}

fn return_type_str(return_type: ReturnType) -> &'static str {
    match return_type {
        ReturnType::Nothing => "RT_NONE",
        ReturnType::PrimaryKey => "RT_PK",
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WirePkSchema {
    name: String,
    #[serde(rename = "type")]
    key_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    auto_increment: bool,
}

fn key_type_str(key_type: PrimaryKeyType) -> &'static str {
    match key_type {
        PrimaryKeyType::Integer => "INTEGER",
        PrimaryKeyType::Str => "STRING",
        PrimaryKeyType::Binary => "BINARY",
    }
}

fn key_type_from_str(text: &str) -> Result<PrimaryKeyType, OtsError> {
    match text {
        "INTEGER" => Ok(PrimaryKeyType::Integer),
        "STRING" => Ok(PrimaryKeyType::Str),
        "BINARY" => Ok(PrimaryKeyType::Binary),
        _ => Err(OtsError::corrupted_response("unknown primary-key type", 0)),
    }
}

fn schema_to_wire(schema: &Schema) -> Vec<WirePkSchema> {
    schema
        .columns
        .iter()
        .map(|column| WirePkSchema {
            name: column.name.clone(),
            key_type: key_type_str(column.key_type).to_string(),
            auto_increment: column.auto_increment,
        })
        .collect()
}

fn schema_from_wire(wire: Vec<WirePkSchema>) -> Result<Schema, OtsError> {
    let mut columns = Vec::with_capacity(wire.len());
    for entry in wire {
        columns.push(PrimaryKeyColumnSchema {
            name: entry.name,
            key_type: key_type_from_str(&entry.key_type)?,
            auto_increment: entry.auto_increment,
        });
    }
    Ok(Schema { columns })
}

#[derive(Debug, Serialize, Deserialize)]
struct WireTableMeta {
    table_name: String,
    primary_key_schema: Vec<WirePkSchema>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireTableOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reserved_throughput: Option<WireCapacity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_to_live_sec: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_versions: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_time_deviation_sec: Option<i64>,
}

fn options_to_wire(options: &TableOptions) -> WireTableOptions {
    WireTableOptions {
        reserved_throughput: options.reserved_throughput.as_ref().map(WireCapacity::from),
        time_to_live_sec: options.time_to_live.map(|ttl| ttl.as_secs() as i64),
        max_versions: options.max_versions,
        max_time_deviation_sec: options.max_time_deviation.map(|dev| dev.as_secs() as i64),
    }
}

fn options_from_wire(wire: WireTableOptions) -> TableOptions {
    TableOptions {
        reserved_throughput: wire.reserved_throughput.map(CapacityUnit::from),
        time_to_live: wire
            .time_to_live_sec
            .map(|sec| std::time::Duration::from_secs(sec.max(0) as u64)),
        max_versions: wire.max_versions,
        max_time_deviation: wire
            .max_time_deviation_sec
            .map(|sec| std::time::Duration::from_secs(sec.max(0) as u64)),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireRowEntry {
    table: String,
    row_b64: String,
    condition: String,
    return_type: String,
}

#[derive(Debug, Default, Deserialize)]
struct WireRowResult {
    is_ok: bool,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    row_b64: Option<String>,
}

fn row_result_from_wire(wire: WireRowResult) -> Result<WithUserData<RowResult>, OtsError> {
    let result = if wire.is_ok {
        let row = match wire.row_b64.as_deref() {
            Some(text) if !text.is_empty() => Some(row_from_b64(text)?),
            _ => None,
        };
        Ok(row)
    } else {
        let code = wire
            .error_code
            .as_deref()
            .and_then(ErrorCode::from_wire)
            .unwrap_or(ErrorCode::OtsClientUnknown);
        Err(OtsError::new(code, wire.error_message.unwrap_or_default()))
    };
    Ok(WithUserData::new(result))
}

/// Server error envelope; any HTTP status of 400 or above carries one.
#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

/// Translates an error body into an `OtsError`. Unrecognized bodies still
/// produce an error of kind `OTSClientUnknownError` so the status is never
/// swallowed.
pub fn decode_error(status: i64, body: &[u8]) -> OtsError {
    match serde_json::from_slice::<WireError>(body) {
        Ok(wire) => {
            let code =
                ErrorCode::from_wire(&wire.error_code).unwrap_or(ErrorCode::OtsClientUnknown);
            OtsError::new(code, wire.message).with_status(status)
        }
        Err(_) => OtsError::new(
            ErrorCode::OtsClientUnknown,
            "unrecognized error envelope in response",
        )
        .with_status(status),
    }
}

// per-action markers

pub enum ListTable {}
pub enum CreateTable {}
pub enum DeleteTable {}
pub enum DescribeTable {}
pub enum UpdateTable {}
pub enum GetRow {}
pub enum PutRow {}
pub enum UpdateRow {}
pub enum DeleteRow {}
pub enum BatchGetRow {}
pub enum BatchWriteRow {}
pub enum GetRange {}
pub enum ComputeSplitsBySize {}

impl Api for ListTable {
    const ACTION: Action = Action::ListTable;
    type Request = ListTableRequest;
    type Response = ListTableResponse;

    fn encode(_request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        Ok(b"{}".to_vec())
    }

    fn decode(body: &[u8]) -> Result<Self::Response, OtsError> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default)]
            tables: Vec<String>,
        }
        let envelope: Envelope = decode_envelope(body)?;
        Ok(ListTableResponse {
            tables: envelope.tables,
            ..Default::default()
        })
    }
}

impl Api for CreateTable {
    const ACTION: Action = Action::CreateTable;
    type Request = CreateTableRequest;
    type Response = CreateTableResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        #[derive(Serialize)]
        struct Envelope {
            table_meta: WireTableMeta,
            options: WireTableOptions,
            shard_split_points_b64: Vec<String>,
        }
        let mut shard_split_points_b64 = Vec::with_capacity(request.shard_split_points.len());
        for point in &request.shard_split_points {
            shard_split_points_b64.push(pk_to_b64(point)?);
        }
        encode_envelope(&Envelope {
            table_meta: WireTableMeta {
                table_name: request.meta.table_name.clone(),
                primary_key_schema: schema_to_wire(&request.meta.schema),
            },
            options: options_to_wire(&request.options),
            shard_split_points_b64,
        })
    }

    fn decode(_body: &[u8]) -> Result<Self::Response, OtsError> {
        Ok(CreateTableResponse::default())
    }
}

impl Api for DeleteTable {
    const ACTION: Action = Action::DeleteTable;
    type Request = DeleteTableRequest;
    type Response = DeleteTableResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        #[derive(Serialize)]
        struct Envelope<'a> {
            table: &'a str,
        }
        encode_envelope(&Envelope { table: &request.table })
    }

    fn decode(_body: &[u8]) -> Result<Self::Response, OtsError> {
        Ok(DeleteTableResponse::default())
    }
}

impl Api for DescribeTable {
    const ACTION: Action = Action::DescribeTable;
    type Request = DescribeTableRequest;
    type Response = DescribeTableResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        #[derive(Serialize)]
        struct Envelope<'a> {
            table: &'a str,
        }
        encode_envelope(&Envelope { table: &request.table })
    }

    fn decode(body: &[u8]) -> Result<Self::Response, OtsError> {
        #[derive(Deserialize)]
        struct Envelope {
            table_meta: WireTableMeta,
            #[serde(default)]
            options: WireTableOptions,
            status: String,
            #[serde(default)]
            shard_split_points_b64: Vec<String>,
        }
        let envelope: Envelope = decode_envelope(body)?;
        let status = match envelope.status.as_str() {
            "ACTIVE" => TableStatus::Active,
            "INACTIVE" => TableStatus::Inactive,
            "LOADING" => TableStatus::Loading,
            "UNLOADING" => TableStatus::Unloading,
            "UPDATING" => TableStatus::Updating,
            _ => return Err(OtsError::corrupted_response("unknown table status", 0)),
        };
        let mut shard_split_points = Vec::with_capacity(envelope.shard_split_points_b64.len());
        for text in &envelope.shard_split_points_b64 {
            shard_split_points.push(pk_from_b64(text)?);
        }
        Ok(DescribeTableResponse {
            meta: ResponseMeta::default(),
            table_meta: TableMeta {
                table_name: envelope.table_meta.table_name,
                schema: schema_from_wire(envelope.table_meta.primary_key_schema)?,
            },
            options: options_from_wire(envelope.options),
            status,
            shard_split_points,
        })
    }
}

impl Api for UpdateTable {
    const ACTION: Action = Action::UpdateTable;
    type Request = UpdateTableRequest;
    type Response = UpdateTableResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        #[derive(Serialize)]
        struct Envelope<'a> {
            table: &'a str,
            options: WireTableOptions,
        }
        encode_envelope(&Envelope {
            table: &request.table,
            options: options_to_wire(&request.options),
        })
    }

    fn decode(_body: &[u8]) -> Result<Self::Response, OtsError> {
        Ok(UpdateTableResponse::default())
    }
}

impl Api for ComputeSplitsBySize {
    const ACTION: Action = Action::ComputeSplitsBySize;
    type Request = ComputeSplitsBySizeRequest;
    type Response = ComputeSplitsBySizeResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        #[derive(Serialize)]
        struct Envelope<'a> {
            table: &'a str,
            split_size: i64,
        }
        encode_envelope(&Envelope {
            table: &request.table,
            split_size: request.split_size,
        })
    }

    fn decode(body: &[u8]) -> Result<Self::Response, OtsError> {
        #[derive(Deserialize)]
        struct WireSplit {
            lower_bound_b64: String,
            upper_bound_b64: String,
            #[serde(default)]
            location: String,
        }
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default)]
            consumed: WireCapacity,
            #[serde(default)]
            primary_key_schema: Vec<WirePkSchema>,
            #[serde(default)]
            splits: Vec<WireSplit>,
        }
        let envelope: Envelope = decode_envelope(body)?;
        let mut splits = Vec::with_capacity(envelope.splits.len());
        for wire in envelope.splits {
            splits.push(Split {
                lower_bound: pk_from_b64(&wire.lower_bound_b64)?,
                upper_bound: pk_from_b64(&wire.upper_bound_b64)?,
                location: wire.location,
            });
        }
        Ok(ComputeSplitsBySizeResponse {
            meta: ResponseMeta::default(),
            consumed_capacity: envelope.consumed.into(),
            schema: schema_from_wire(envelope.primary_key_schema)?,
            splits,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WirePointQuery {
    table: String,
    primary_key_b64: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    columns_to_get: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_versions: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_range: Option<WireTimeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cache_blocks: Option<bool>,
}

impl Api for GetRow {
    const ACTION: Action = Action::GetRow;
    type Request = GetRowRequest;
    type Response = GetRowResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        let criterion = &request.query_criterion;
        encode_envelope(&WirePointQuery {
            table: criterion.table.clone(),
            primary_key_b64: pk_to_b64(&criterion.primary_key)?,
            columns_to_get: criterion.columns_to_get.clone(),
            max_versions: criterion.max_versions,
            time_range: criterion.time_range.as_ref().map(WireTimeRange::from),
            cache_blocks: criterion.cache_blocks,
        })
    }

    fn decode(body: &[u8]) -> Result<Self::Response, OtsError> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default)]
            consumed: WireCapacity,
            #[serde(default)]
            row_b64: Option<String>,
        }
        let envelope: Envelope = decode_envelope(body)?;
        let row = match envelope.row_b64.as_deref() {
            Some(text) if !text.is_empty() => Some(row_from_b64(text)?),
            _ => None,
        };
        Ok(GetRowResponse {
            meta: ResponseMeta::default(),
            consumed_capacity: envelope.consumed.into(),
            row,
        })
    }
}

fn put_entry(change: &RowPutChange) -> Result<WireRowEntry, OtsError> {
    Ok(WireRowEntry {
        table: change.table.clone(),
        row_b64: base64_encode(&writer::encode_put(change)?),
        condition: condition_str(&change.condition).to_string(),
        return_type: return_type_str(change.return_type).to_string(),
    })
}

fn update_entry(change: &RowUpdateChange) -> Result<WireRowEntry, OtsError> {
    Ok(WireRowEntry {
        table: change.table.clone(),
        row_b64: base64_encode(&writer::encode_update(change)?),
        condition: condition_str(&change.condition).to_string(),
        return_type: return_type_str(change.return_type).to_string(),
    })
}

fn delete_entry(change: &RowDeleteChange) -> Result<WireRowEntry, OtsError> {
    Ok(WireRowEntry {
        table: change.table.clone(),
        row_b64: base64_encode(&writer::encode_delete(change)?),
        condition: condition_str(&change.condition).to_string(),
        return_type: return_type_str(change.return_type).to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct WireWriteResponse {
    #[serde(default)]
    consumed: WireCapacity,
    #[serde(default)]
    row_b64: Option<String>,
}

fn decode_write_row(body: &[u8]) -> Result<(CapacityUnit, Option<Row>), OtsError> {
    let envelope: WireWriteResponse = decode_envelope(body)?;
    let row = match envelope.row_b64.as_deref() {
        Some(text) if !text.is_empty() => Some(row_from_b64(text)?),
        _ => None,
    };
    Ok((envelope.consumed.into(), row))
}

impl Api for PutRow {
    const ACTION: Action = Action::PutRow;
    type Request = PutRowRequest;
    type Response = PutRowResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        encode_envelope(&put_entry(&request.row_change)?)
    }

    fn decode(body: &[u8]) -> Result<Self::Response, OtsError> {
        let (consumed_capacity, row) = decode_write_row(body)?;
        Ok(PutRowResponse {
            meta: ResponseMeta::default(),
            consumed_capacity,
            row,
        })
    }
}

impl Api for UpdateRow {
    const ACTION: Action = Action::UpdateRow;
    type Request = UpdateRowRequest;
    type Response = UpdateRowResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        encode_envelope(&update_entry(&request.row_change)?)
    }

    fn decode(body: &[u8]) -> Result<Self::Response, OtsError> {
        let (consumed_capacity, row) = decode_write_row(body)?;
        Ok(UpdateRowResponse {
            meta: ResponseMeta::default(),
            consumed_capacity,
            row,
        })
    }
}

impl Api for DeleteRow {
    const ACTION: Action = Action::DeleteRow;
    type Request = DeleteRowRequest;
    type Response = DeleteRowResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        encode_envelope(&delete_entry(&request.row_change)?)
    }

    fn decode(body: &[u8]) -> Result<Self::Response, OtsError> {
        let (consumed_capacity, row) = decode_write_row(body)?;
        Ok(DeleteRowResponse {
            meta: ResponseMeta::default(),
            consumed_capacity,
            row,
        })
    }
}

impl Api for GetRange {
    const ACTION: Action = Action::GetRange;
    type Request = GetRangeRequest;
    type Response = GetRangeResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        #[derive(Serialize)]
        struct Envelope {
            table: String,
            direction: &'static str,
            inclusive_start_b64: String,
            exclusive_end_b64: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            limit: Option<i64>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            columns_to_get: Vec<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            max_versions: Option<i64>,
            #[serde(skip_serializing_if = "Option::is_none")]
            time_range: Option<WireTimeRange>,
            #[serde(skip_serializing_if = "Option::is_none")]
            cache_blocks: Option<bool>,
        }
        let criterion = &request.query_criterion;
        encode_envelope(&Envelope {
            table: criterion.table.clone(),
            direction: match criterion.direction {
                RangeDirection::Forward => "FORWARD",
                RangeDirection::Backward => "BACKWARD",
            },
            inclusive_start_b64: pk_to_b64(&criterion.inclusive_start)?,
            exclusive_end_b64: pk_to_b64(&criterion.exclusive_end)?,
            limit: criterion.limit,
            columns_to_get: criterion.columns_to_get.clone(),
            max_versions: criterion.max_versions,
            time_range: criterion.time_range.as_ref().map(WireTimeRange::from),
            cache_blocks: criterion.cache_blocks,
        })
    }

    fn decode(body: &[u8]) -> Result<Self::Response, OtsError> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default)]
            consumed: WireCapacity,
            #[serde(default)]
            rows_b64: Option<String>,
            #[serde(default)]
            next_start_b64: Option<String>,
        }
        let envelope: Envelope = decode_envelope(body)?;
        let rows = match envelope.rows_b64.as_deref() {
            Some(text) if !text.is_empty() => rows_from_b64(text)?,
            _ => Vec::new(),
        };
        let next_start = match envelope.next_start_b64.as_deref() {
            Some(text) if !text.is_empty() => Some(pk_from_b64(text)?),
            _ => None,
        };
        Ok(GetRangeResponse {
            meta: ResponseMeta::default(),
            consumed_capacity: envelope.consumed.into(),
            rows,
            next_start,
        })
    }
}

impl Api for BatchGetRow {
    const ACTION: Action = Action::BatchGetRow;
    type Request = BatchGetRowRequest;
    type Response = BatchGetRowResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        #[derive(Serialize)]
        struct WireCriterion {
            table: String,
            primary_keys_b64: Vec<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            columns_to_get: Vec<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            max_versions: Option<i64>,
            #[serde(skip_serializing_if = "Option::is_none")]
            time_range: Option<WireTimeRange>,
            #[serde(skip_serializing_if = "Option::is_none")]
            cache_blocks: Option<bool>,
        }
        #[derive(Serialize)]
        struct Envelope {
            tables: Vec<WireCriterion>,
        }
        let mut tables = Vec::with_capacity(request.criteria.len());
        for criterion in &request.criteria {
            let mut primary_keys_b64 = Vec::with_capacity(criterion.row_keys.len());
            for key in &criterion.row_keys {
                primary_keys_b64.push(pk_to_b64(&key.data)?);
            }
            tables.push(WireCriterion {
                table: criterion.table.clone(),
                primary_keys_b64,
                columns_to_get: criterion.columns_to_get.clone(),
                max_versions: criterion.max_versions,
                time_range: criterion.time_range.as_ref().map(WireTimeRange::from),
                cache_blocks: criterion.cache_blocks,
            });
        }
        encode_envelope(&Envelope { tables })
    }

    fn decode(body: &[u8]) -> Result<Self::Response, OtsError> {
        #[derive(Deserialize)]
        struct WireTable {
            #[serde(default)]
            rows: Vec<WireRowResult>,
        }
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default)]
            consumed: WireCapacity,
            #[serde(default)]
            tables: Vec<WireTable>,
        }
        let envelope: Envelope = decode_envelope(body)?;
        let mut results = Vec::new();
        for table in envelope.tables {
            for wire in table.rows {
                results.push(row_result_from_wire(wire)?);
            }
        }
        Ok(BatchGetRowResponse {
            meta: ResponseMeta::default(),
            consumed_capacity: envelope.consumed.into(),
            results,
        })
    }

    fn correlate(request: &Self::Request, response: &mut Self::Response) {
        let user_data = request
            .criteria
            .iter()
            .flat_map(|criterion| criterion.row_keys.iter().map(|key| key.user_data));
        for (result, user_data) in response.results.iter_mut().zip(user_data) {
            result.user_data = user_data;
        }
    }
}

impl Api for BatchWriteRow {
    const ACTION: Action = Action::BatchWriteRow;
    type Request = BatchWriteRowRequest;
    type Response = BatchWriteRowResponse;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, OtsError> {
        #[derive(Serialize)]
        struct Envelope {
            puts: Vec<WireRowEntry>,
            updates: Vec<WireRowEntry>,
            deletes: Vec<WireRowEntry>,
        }
        let mut puts = Vec::with_capacity(request.puts.len());
        for put in &request.puts {
            puts.push(put_entry(&put.data)?);
        }
        let mut updates = Vec::with_capacity(request.updates.len());
        for update in &request.updates {
            updates.push(update_entry(&update.data)?);
        }
        let mut deletes = Vec::with_capacity(request.deletes.len());
        for delete in &request.deletes {
            deletes.push(delete_entry(&delete.data)?);
        }
        encode_envelope(&Envelope { puts, updates, deletes })
    }

    fn decode(body: &[u8]) -> Result<Self::Response, OtsError> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default)]
            consumed: WireCapacity,
            #[serde(default)]
            put_results: Vec<WireRowResult>,
            #[serde(default)]
            update_results: Vec<WireRowResult>,
            #[serde(default)]
            delete_results: Vec<WireRowResult>,
        }
        let envelope: Envelope = decode_envelope(body)?;
        let mut response = BatchWriteRowResponse {
            meta: ResponseMeta::default(),
            consumed_capacity: envelope.consumed.into(),
            ..Default::default()
        };
        for wire in envelope.put_results {
            response.put_results.push(row_result_from_wire(wire)?);
        }
        for wire in envelope.update_results {
            response.update_results.push(row_result_from_wire(wire)?);
        }
        for wire in envelope.delete_results {
            response.delete_results.push(row_result_from_wire(wire)?);
        }
        Ok(response)
    }

    fn correlate(request: &Self::Request, response: &mut Self::Response) {
        for (result, entry) in response.put_results.iter_mut().zip(request.puts.iter()) {
            result.user_data = entry.user_data;
        }
        for (result, entry) in response.update_results.iter_mut().zip(request.updates.iter()) {
            result.user_data = entry.user_data;
        }
        for (result, entry) in response.delete_results.iter_mut().zip(request.deletes.iter()) {
            result.user_data = entry.user_data;
        }
    }
}
