use crate::error::OtsError;
use crate::time::UtcTime;
use crate::types::value::{AttributeValue, CompareResult, PrimaryKeyValue};

/// One named primary-key column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryKeyColumn {
    pub name: String,
    pub value: PrimaryKeyValue,
}

impl PrimaryKeyColumn {
    pub fn new(name: impl Into<String>, value: PrimaryKeyValue) -> Self {
        Self { name: name.into(), value }
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        if self.name.is_empty() {
            return Err(OtsError::parameter_invalid(
                "Name of primary-key column must be nonempty.",
            ));
        }
        self.value.validate()
    }
}

/// Ordered sequence of primary-key columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryKey {
    pub columns: Vec<PrimaryKeyColumn>,
}

impl PrimaryKey {
    pub fn new(columns: Vec<PrimaryKeyColumn>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column-by-column comparison. Keys of different width, or any
    /// uncomparable column pair, make the whole comparison uncomparable.
    pub fn compare(&self, other: &PrimaryKey) -> CompareResult {
        if self.columns.len() != other.columns.len() {
            return CompareResult::Uncomparable;
        }
        for (a, b) in self.columns.iter().zip(other.columns.iter()) {
            match a.value.compare(&b.value) {
                CompareResult::Equivalent => continue,
                other => return other,
            }
        }
        CompareResult::Equivalent
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        if self.columns.is_empty() {
            return Err(OtsError::parameter_invalid("Primary key must be nonempty."));
        }
        for column in &self.columns {
            column.validate()?;
        }
        Ok(())
    }
}

/// One attribute cell, optionally stamped with a UTC millisecond timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
    pub timestamp: Option<UtcTime>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: AttributeValue) -> Self {
        Self { name: name.into(), value, timestamp: None }
    }

    pub fn with_timestamp(mut self, timestamp: UtcTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        if self.name.is_empty() {
            return Err(OtsError::parameter_invalid(
                "Name of attribute column must be nonempty.",
            ));
        }
        self.value.validate()?;
        if let Some(ts) = self.timestamp {
            if !ts.is_whole_msec() {
                return Err(OtsError::parameter_invalid(
                    "Timestamp of attribute column must be multiple of one millisecond.",
                ));
            }
        }
        Ok(())
    }
}

/// A materialized row: primary key plus attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub primary_key: PrimaryKey,
    pub attributes: Vec<Attribute>,
}

impl Row {
    pub fn validate(&self) -> Result<(), OtsError> {
        self.primary_key.validate()?;
        for attr in &self.attributes {
            attr.validate()?;
        }
        Ok(())
    }
}

/// Read/write capacity consumed by a request, as reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapacityUnit {
    pub read: Option<i64>,
    pub write: Option<i64>,
}

impl CapacityUnit {
    pub fn new(read: i64, write: i64) -> Self {
        Self { read: Some(read), write: Some(write) }
    }

    /// Accumulates another tally into this one. Absent stays absent unless
    /// the other side carries a number.
    pub fn merge(&mut self, other: &CapacityUnit) {
        if let Some(read) = other.read {
            *self.read.get_or_insert(0) += read;
        }
        if let Some(write) = other.write {
            *self.write.get_or_insert(0) += write;
        }
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        if matches!(self.read, Some(read) if read < 0) {
            return Err(OtsError::parameter_invalid(
                "Read capacity unit must be non-negative.",
            ));
        }
        if matches!(self.write, Some(write) if write < 0) {
            return Err(OtsError::parameter_invalid(
                "Write capacity unit must be non-negative.",
            ));
        }
        Ok(())
    }
}
