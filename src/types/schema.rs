use crate::error::OtsError;
use crate::types::row::{CapacityUnit, PrimaryKey};
use crate::types::value::PrimaryKeyValue;
use std::time::Duration;

/// Declared type of a primary-key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyType {
    Integer,
    Str,
    Binary,
}

impl PrimaryKeyType {
    /// Whether a concrete value matches this declared type. Infinities and
    /// auto-increment placeholders match nothing; they are rejected wherever
    /// a schema check applies.
    pub fn matches(self, value: &PrimaryKeyValue) -> bool {
        matches!(
            (self, value),
            (PrimaryKeyType::Integer, PrimaryKeyValue::Integer(_))
                | (PrimaryKeyType::Str, PrimaryKeyValue::Str(_))
                | (PrimaryKeyType::Binary, PrimaryKeyValue::Blob(_))
        )
    }
}

/// Schema of a single primary-key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyColumnSchema {
    pub name: String,
    pub key_type: PrimaryKeyType,
    pub auto_increment: bool,
}

impl PrimaryKeyColumnSchema {
    pub fn new(name: impl Into<String>, key_type: PrimaryKeyType) -> Self {
        Self { name: name.into(), key_type, auto_increment: false }
    }

    pub fn auto_increment(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_type: PrimaryKeyType::Integer,
            auto_increment: true,
        }
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        if self.name.is_empty() {
            return Err(OtsError::parameter_invalid(
                "\"name\" is required in primary-key column schema.",
            ));
        }
        if self.auto_increment && self.key_type != PrimaryKeyType::Integer {
            return Err(OtsError::parameter_invalid(format!(
                "AutoIncrement can only be applied on integer columns, for primary key \"{}\".",
                self.name
            )));
        }
        Ok(())
    }
}

/// Ordered primary-key schema of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub columns: Vec<PrimaryKeyColumnSchema>,
}

impl Schema {
    pub fn new(columns: Vec<PrimaryKeyColumnSchema>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        if self.columns.is_empty() {
            return Err(OtsError::parameter_invalid("Table schema must be nonempty."));
        }
        for column in &self.columns {
            column.validate()?;
        }
        Ok(())
    }
}

/// Lifecycle state of a table, as reported by DescribeTable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Active,
    Inactive,
    Loading,
    Unloading,
    Updating,
}

/// Immutable identity of a table: name and primary-key schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMeta {
    pub table_name: String,
    pub schema: Schema,
}

impl TableMeta {
    pub fn validate(&self) -> Result<(), OtsError> {
        if self.table_name.is_empty() {
            return Err(OtsError::parameter_invalid("Table name is required."));
        }
        self.schema.validate()
    }
}

/// Tunable options of a table; absent fields keep server defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub reserved_throughput: Option<CapacityUnit>,
    pub time_to_live: Option<Duration>,
    pub max_versions: Option<i64>,
    pub max_time_deviation: Option<Duration>,
}

impl TableOptions {
    pub fn validate(&self) -> Result<(), OtsError> {
        if let Some(throughput) = &self.reserved_throughput {
            throughput.validate()?;
            if throughput.read.is_none() && throughput.write.is_none() {
                return Err(OtsError::parameter_invalid(
                    "Both read and write capacity units are missing in reserved throughput.",
                ));
            }
        }
        if matches!(self.time_to_live, Some(ttl) if ttl.as_secs() == 0) {
            return Err(OtsError::parameter_invalid(
                "Time-to-live must be positive, in whole seconds.",
            ));
        }
        if matches!(self.max_versions, Some(versions) if versions <= 0) {
            return Err(OtsError::parameter_invalid("Max versions must be positive."));
        }
        Ok(())
    }
}

/// A horizontal split computed by ComputeSplitsBySize, directly usable as a
/// range query boundary pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split {
    pub lower_bound: PrimaryKey,
    pub upper_bound: PrimaryKey,
    /// Hint about the server location hosting the split; may be empty.
    pub location: String,
}
