use crate::error::OtsError;
use crate::time::UtcTime;
use crate::types::row::PrimaryKey;
use crate::types::value::{CompareResult, PrimaryKeyValue};

/// Half-open interval of cell timestamps, millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: UtcTime,
    pub end: UtcTime,
}

impl TimeRange {
    pub fn validate(&self) -> Result<(), OtsError> {
        if !self.start.is_whole_msec() || !self.end.is_whole_msec() {
            return Err(OtsError::parameter_invalid(
                "Both ends of a time range must be multiples of one millisecond.",
            ));
        }
        if self.start > self.end {
            return Err(OtsError::parameter_invalid(
                "Start of a time range must be no greater than its end.",
            ));
        }
        Ok(())
    }
}

fn validate_read_options(
    table: &str,
    max_versions: Option<i64>,
    time_range: Option<&TimeRange>,
) -> Result<(), OtsError> {
    if table.is_empty() {
        return Err(OtsError::parameter_invalid("Table name must be nonempty."));
    }
    if matches!(max_versions, Some(versions) if versions <= 0) {
        return Err(OtsError::parameter_invalid("Max versions must be positive."));
    }
    if let Some(range) = time_range {
        range.validate()?;
    }
    Ok(())
}

/// Read criterion addressing a single row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointQueryCriterion {
    pub table: String,
    pub primary_key: PrimaryKey,
    pub columns_to_get: Vec<String>,
    pub max_versions: Option<i64>,
    pub time_range: Option<TimeRange>,
    pub cache_blocks: Option<bool>,
}

impl PointQueryCriterion {
    pub fn validate(&self) -> Result<(), OtsError> {
        validate_read_options(&self.table, self.max_versions, self.time_range.as_ref())?;
        self.primary_key.validate()?;
        for column in &self.primary_key.columns {
            if !column.value.is_real() {
                return Err(OtsError::parameter_invalid(format!(
                    "A real value is required in reading a row, for primary key \"{}\".",
                    column.name
                )));
            }
        }
        Ok(())
    }
}

/// Scan direction of a range read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RangeDirection {
    #[default]
    Forward,
    Backward,
}

/// Read criterion addressing a contiguous range of rows.
///
/// `inclusive_start`/`exclusive_end` may use the infinity placeholders.
/// `limit` caps the number of rows the whole scan yields, not one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeQueryCriterion {
    pub table: String,
    pub direction: RangeDirection,
    pub inclusive_start: PrimaryKey,
    pub exclusive_end: PrimaryKey,
    pub limit: Option<i64>,
    pub columns_to_get: Vec<String>,
    pub max_versions: Option<i64>,
    pub time_range: Option<TimeRange>,
    pub cache_blocks: Option<bool>,
}

impl RangeQueryCriterion {
    pub fn validate(&self) -> Result<(), OtsError> {
        validate_read_options(&self.table, self.max_versions, self.time_range.as_ref())?;
        if self.inclusive_start.is_empty() || self.exclusive_end.is_empty() {
            return Err(OtsError::parameter_invalid(
                "Both ends of a range query must be nonempty.",
            ));
        }
        for key in [&self.inclusive_start, &self.exclusive_end] {
            for column in &key.columns {
                if matches!(column.value, PrimaryKeyValue::None | PrimaryKeyValue::AutoIncrement) {
                    return Err(OtsError::parameter_invalid(format!(
                        "Neither absent nor auto-increment values are allowed in a range \
                         boundary, for primary key \"{}\".",
                        column.name
                    )));
                }
            }
        }
        if matches!(self.limit, Some(limit) if limit <= 0) {
            return Err(OtsError::parameter_invalid("Limit must be positive."));
        }
        // Order is only enforced where it is decidable: boundaries with
        // infinities compare uncomparable and pass through.
        let cmp = self.inclusive_start.compare(&self.exclusive_end);
        match self.direction {
            RangeDirection::Forward if cmp == CompareResult::Larger => {
                Err(OtsError::parameter_invalid(
                    "Start of a forward range must be no greater than its end.",
                ))
            }
            RangeDirection::Backward if cmp == CompareResult::Smaller => {
                Err(OtsError::parameter_invalid(
                    "Start of a backward range must be no smaller than its end.",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Pairs a datum with opaque caller context that rides through a batch
/// request into its per-row result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WithUserData<T> {
    pub data: T,
    pub user_data: Option<u64>,
}

impl<T> WithUserData<T> {
    pub fn new(data: T) -> Self {
        Self { data, user_data: None }
    }

    pub fn tagged(data: T, user_data: u64) -> Self {
        Self { data, user_data: Some(user_data) }
    }
}

/// Read criterion addressing scattered rows of one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiPointQueryCriterion {
    pub table: String,
    pub row_keys: Vec<WithUserData<PrimaryKey>>,
    pub columns_to_get: Vec<String>,
    pub max_versions: Option<i64>,
    pub time_range: Option<TimeRange>,
    pub cache_blocks: Option<bool>,
}

impl MultiPointQueryCriterion {
    pub fn validate(&self) -> Result<(), OtsError> {
        validate_read_options(&self.table, self.max_versions, self.time_range.as_ref())?;
        if self.row_keys.is_empty() {
            return Err(OtsError::parameter_invalid(
                "A multi-point query requires at least one row key.",
            ));
        }
        for key in &self.row_keys {
            key.data.validate()?;
            for column in &key.data.columns {
                if !column.value.is_real() {
                    return Err(OtsError::parameter_invalid(format!(
                        "A real value is required in reading a row, for primary key \"{}\".",
                        column.name
                    )));
                }
            }
        }
        Ok(())
    }
}
