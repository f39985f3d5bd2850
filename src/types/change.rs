use crate::error::OtsError;
use crate::time::UtcTime;
use crate::types::row::{Attribute, PrimaryKey};
use crate::types::value::{AttributeValue, PrimaryKeyValue};

/// Row-existence expectation checked server-side before a write applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowExistenceExpectation {
    #[default]
    Ignore,
    ExpectExist,
    ExpectNotExist,
}

/// Precondition attached to a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Condition {
    pub row_condition: RowExistenceExpectation,
}

/// What a write returns besides its capacity tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnType {
    #[default]
    Nothing,
    PrimaryKey,
}

fn validate_write_key(table: &str, primary_key: &PrimaryKey) -> Result<(), OtsError> {
    if table.is_empty() {
        return Err(OtsError::parameter_invalid("Table name must be nonempty."));
    }
    primary_key.validate()?;
    for column in &primary_key.columns {
        if column.value.is_infinity() {
            return Err(OtsError::parameter_invalid(format!(
                "Infinity is not allowed in writing a row, for primary key \"{}\".",
                column.name
            )));
        }
    }
    Ok(())
}

/// Whole-row overwrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPutChange {
    pub table: String,
    pub primary_key: PrimaryKey,
    pub condition: Condition,
    pub return_type: ReturnType,
    pub attributes: Vec<Attribute>,
}

impl RowPutChange {
    pub fn new(table: impl Into<String>, primary_key: PrimaryKey) -> Self {
        Self {
            table: table.into(),
            primary_key,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        validate_write_key(&self.table, &self.primary_key)?;
        for attr in &self.attributes {
            attr.validate()?;
        }
        Ok(())
    }
}

/// Kind of mutation a single update cell applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowUpdateOp {
    /// Overwrite the cell, inserting it when absent.
    #[default]
    Put,
    /// Delete the single version at the given timestamp.
    DeleteOneVersion,
    /// Delete every version of the column.
    DeleteAllVersions,
}

/// One cell-level mutation inside a RowUpdateChange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowUpdate {
    pub op: RowUpdateOp,
    pub name: String,
    pub value: Option<AttributeValue>,
    pub timestamp: Option<UtcTime>,
}

impl RowUpdate {
    pub fn put(name: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            op: RowUpdateOp::Put,
            name: name.into(),
            value: Some(value),
            timestamp: None,
        }
    }

    pub fn delete_one_version(name: impl Into<String>, timestamp: UtcTime) -> Self {
        Self {
            op: RowUpdateOp::DeleteOneVersion,
            name: name.into(),
            value: None,
            timestamp: Some(timestamp),
        }
    }

    pub fn delete_all_versions(name: impl Into<String>) -> Self {
        Self {
            op: RowUpdateOp::DeleteAllVersions,
            name: name.into(),
            value: None,
            timestamp: None,
        }
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        if self.name.is_empty() {
            return Err(OtsError::parameter_invalid(
                "Name of attribute column must be nonempty.",
            ));
        }
        match self.op {
            RowUpdateOp::Put => match &self.value {
                Some(value) => value.validate()?,
                None => {
                    return Err(OtsError::parameter_invalid(format!(
                        "A value is required to put attribute \"{}\".",
                        self.name
                    )))
                }
            },
            RowUpdateOp::DeleteOneVersion => {
                if self.value.is_some() {
                    return Err(OtsError::parameter_invalid(format!(
                        "A value must not go with deleting one version of attribute \"{}\".",
                        self.name
                    )));
                }
                if self.timestamp.is_none() {
                    return Err(OtsError::parameter_invalid(format!(
                        "A timestamp is required to delete one version of attribute \"{}\".",
                        self.name
                    )));
                }
            }
            RowUpdateOp::DeleteAllVersions => {
                if self.value.is_some() || self.timestamp.is_some() {
                    return Err(OtsError::parameter_invalid(format!(
                        "Neither value nor timestamp may go with deleting all versions of attribute \"{}\".",
                        self.name
                    )));
                }
            }
        }
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

/// Cell-level modification of an existing (or new) row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowUpdateChange {
    pub table: String,
    pub primary_key: PrimaryKey,
    pub condition: Condition,
    pub return_type: ReturnType,
    pub updates: Vec<RowUpdate>,
}

impl RowUpdateChange {
    pub fn new(table: impl Into<String>, primary_key: PrimaryKey) -> Self {
        Self {
            table: table.into(),
            primary_key,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        validate_write_key(&self.table, &self.primary_key)?;
        if self.updates.is_empty() {
            return Err(OtsError::parameter_invalid(
                "Updating a row requires at least one attribute.",
            ));
        }
        for update in &self.updates {
            update.validate()?;
        }
        for column in &self.primary_key.columns {
            if matches!(column.value, PrimaryKeyValue::AutoIncrement) {
                return Err(OtsError::parameter_invalid(format!(
                    "AutoIncrement is not allowed in updating a row, for primary key \"{}\".",
                    column.name
                )));
            }
        }
        Ok(())
    }
}

/// Whole-row deletion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowDeleteChange {
    pub table: String,
    pub primary_key: PrimaryKey,
    pub condition: Condition,
    pub return_type: ReturnType,
}

impl RowDeleteChange {
    pub fn new(table: impl Into<String>, primary_key: PrimaryKey) -> Self {
        Self {
            table: table.into(),
            primary_key,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        validate_write_key(&self.table, &self.primary_key)?;
        for column in &self.primary_key.columns {
            if matches!(column.value, PrimaryKeyValue::AutoIncrement) {
                return Err(OtsError::parameter_invalid(format!(
                    "AutoIncrement is not allowed in deleting a row, for primary key \"{}\".",
                    column.name
                )));
            }
        }
        Ok(())
    }
}
