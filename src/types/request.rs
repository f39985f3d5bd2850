use crate::error::OtsError;
use crate::types::change::{RowDeleteChange, RowPutChange, RowUpdateChange};
use crate::types::criterion::{
    MultiPointQueryCriterion, PointQueryCriterion, RangeQueryCriterion, WithUserData,
};
use crate::types::row::{CapacityUnit, PrimaryKey, Row};
use crate::types::schema::{Schema, Split, TableMeta, TableOptions, TableStatus};

/// Correlation identifiers present on every response, success or error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    /// Server-issued, fresh per attempt.
    pub request_id: String,
    /// Echo of the tracker the client sent.
    pub trace_id: String,
}

/// A request the pipeline can carry: it knows how to check itself before any
/// network I/O happens.
pub trait OpRequest: Send + 'static {
    fn validate(&self) -> Result<(), OtsError>;
}

/// A response container: resettable to its default state and carrying the
/// correlation meta block.
pub trait OpResponse: Default + Send + 'static {
    fn meta_mut(&mut self) -> &mut ResponseMeta;
}

macro_rules! impl_op_response {
    ($($ty:ty),+ $(,)?) => {
        $(impl OpResponse for $ty {
            fn meta_mut(&mut self) -> &mut ResponseMeta {
                &mut self.meta
            }
        })+
    };
}

fn validate_split_points(
    schema: &Schema,
    split_points: &[PrimaryKey],
) -> Result<(), OtsError> {
    for point in split_points {
        if point.len() != 1 {
            return Err(OtsError::parameter_invalid(
                "Length of a shard split point must be exactly one.",
            ));
        }
        let column = &point.columns[0];
        let declared = &schema.columns[0];
        if column.name != declared.name {
            return Err(OtsError::parameter_invalid(format!(
                "A shard split point must be on the first primary-key column \"{}\".",
                declared.name
            )));
        }
        if !declared.key_type.matches(&column.value) {
            return Err(OtsError::parameter_invalid(format!(
                "Type of a shard split point mismatches the schema, for primary key \"{}\".",
                column.name
            )));
        }
    }
    Ok(())
}

// table operations

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateTableRequest {
    pub meta: TableMeta,
    pub options: TableOptions,
    pub shard_split_points: Vec<PrimaryKey>,
}

impl OpRequest for CreateTableRequest {
    fn validate(&self) -> Result<(), OtsError> {
        self.meta.validate()?;
        self.options.validate()?;
        validate_split_points(&self.meta.schema, &self.shard_split_points)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateTableResponse {
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListTableRequest;

impl OpRequest for ListTableRequest {
    fn validate(&self) -> Result<(), OtsError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListTableResponse {
    pub meta: ResponseMeta,
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteTableRequest {
    pub table: String,
}

impl OpRequest for DeleteTableRequest {
    fn validate(&self) -> Result<(), OtsError> {
        if self.table.is_empty() {
            return Err(OtsError::parameter_invalid("Table name must be nonempty."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteTableResponse {
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeTableRequest {
    pub table: String,
}

impl OpRequest for DescribeTableRequest {
    fn validate(&self) -> Result<(), OtsError> {
        if self.table.is_empty() {
            return Err(OtsError::parameter_invalid("Table name must be nonempty."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescribeTableResponse {
    pub meta: ResponseMeta,
    pub table_meta: TableMeta,
    pub options: TableOptions,
    pub status: TableStatus,
    pub shard_split_points: Vec<PrimaryKey>,
}

impl Default for DescribeTableResponse {
    fn default() -> Self {
        Self {
            meta: ResponseMeta::default(),
            table_meta: TableMeta::default(),
            options: TableOptions::default(),
            status: TableStatus::Active,
            shard_split_points: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTableRequest {
    pub table: String,
    pub options: TableOptions,
}

impl OpRequest for UpdateTableRequest {
    fn validate(&self) -> Result<(), OtsError> {
        if self.table.is_empty() {
            return Err(OtsError::parameter_invalid("Table name must be nonempty."));
        }
        self.options.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTableResponse {
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeSplitsBySizeRequest {
    pub table: String,
    /// Desired split size, in hundreds of megabytes.
    pub split_size: i64,
}

impl Default for ComputeSplitsBySizeRequest {
    fn default() -> Self {
        Self { table: String::new(), split_size: 5 }
    }
}

impl OpRequest for ComputeSplitsBySizeRequest {
    fn validate(&self) -> Result<(), OtsError> {
        if self.table.is_empty() {
            return Err(OtsError::parameter_invalid("Table name must be nonempty."));
        }
        if self.split_size <= 0 {
            return Err(OtsError::parameter_invalid("Split size must be positive."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputeSplitsBySizeResponse {
    pub meta: ResponseMeta,
    pub consumed_capacity: CapacityUnit,
    pub schema: Schema,
    pub splits: Vec<Split>,
}

// point reads and writes

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetRowRequest {
    pub query_criterion: PointQueryCriterion,
}

impl OpRequest for GetRowRequest {
    fn validate(&self) -> Result<(), OtsError> {
        self.query_criterion.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetRowResponse {
    pub meta: ResponseMeta,
    pub consumed_capacity: CapacityUnit,
    /// Absent when the row does not exist; that is not an error.
    pub row: Option<Row>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutRowRequest {
    pub row_change: RowPutChange,
}

impl OpRequest for PutRowRequest {
    fn validate(&self) -> Result<(), OtsError> {
        self.row_change.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutRowResponse {
    pub meta: ResponseMeta,
    pub consumed_capacity: CapacityUnit,
    pub row: Option<Row>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRowRequest {
    pub row_change: RowUpdateChange,
}

impl OpRequest for UpdateRowRequest {
    fn validate(&self) -> Result<(), OtsError> {
        self.row_change.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRowResponse {
    pub meta: ResponseMeta,
    pub consumed_capacity: CapacityUnit,
    pub row: Option<Row>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteRowRequest {
    pub row_change: RowDeleteChange,
}

impl OpRequest for DeleteRowRequest {
    fn validate(&self) -> Result<(), OtsError> {
        self.row_change.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteRowResponse {
    pub meta: ResponseMeta,
    pub consumed_capacity: CapacityUnit,
    pub row: Option<Row>,
}

// range reads

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetRangeRequest {
    pub query_criterion: RangeQueryCriterion,
}

impl OpRequest for GetRangeRequest {
    fn validate(&self) -> Result<(), OtsError> {
        self.query_criterion.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetRangeResponse {
    pub meta: ResponseMeta,
    pub consumed_capacity: CapacityUnit,
    pub rows: Vec<Row>,
    /// Set when the server responded prematurely; feed it back as the next
    /// page's inclusive start. `RangeIterator` does this for you.
    pub next_start: Option<PrimaryKey>,
}

// batches

/// Per-row outcome inside a batch response.
pub type RowResult = Result<Option<Row>, OtsError>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetRowRequest {
    pub criteria: Vec<MultiPointQueryCriterion>,
}

impl OpRequest for BatchGetRowRequest {
    fn validate(&self) -> Result<(), OtsError> {
        if self.criteria.is_empty() {
            return Err(OtsError::parameter_invalid(
                "Batch-getting rows requires at least one criterion.",
            ));
        }
        for criterion in &self.criteria {
            criterion.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetRowResponse {
    pub meta: ResponseMeta,
    pub consumed_capacity: CapacityUnit,
    pub results: Vec<WithUserData<RowResult>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteRowRequest {
    pub puts: Vec<WithUserData<RowPutChange>>,
    pub updates: Vec<WithUserData<RowUpdateChange>>,
    pub deletes: Vec<WithUserData<RowDeleteChange>>,
}

impl BatchWriteRowRequest {
    pub fn row_count(&self) -> usize {
        self.puts.len() + self.updates.len() + self.deletes.len()
    }
}

impl OpRequest for BatchWriteRowRequest {
    fn validate(&self) -> Result<(), OtsError> {
        if self.row_count() == 0 {
            return Err(OtsError::parameter_invalid(
                "Batch-writing rows requires at least one row.",
            ));
        }
        for put in &self.puts {
            put.data.validate()?;
        }
        for update in &self.updates {
            update.data.validate()?;
        }
        for delete in &self.deletes {
            delete.data.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteRowResponse {
    pub meta: ResponseMeta,
    pub consumed_capacity: CapacityUnit,
    pub put_results: Vec<WithUserData<RowResult>>,
    pub update_results: Vec<WithUserData<RowResult>>,
    pub delete_results: Vec<WithUserData<RowResult>>,
}

impl_op_response!(
    CreateTableResponse,
    ListTableResponse,
    DeleteTableResponse,
    DescribeTableResponse,
    UpdateTableResponse,
    ComputeSplitsBySizeResponse,
    GetRowResponse,
    PutRowResponse,
    UpdateRowResponse,
    DeleteRowResponse,
    GetRangeResponse,
    BatchGetRowResponse,
    BatchWriteRowResponse,
);
