use crate::error::OtsError;
use std::cmp::Ordering;

/// Outcome of comparing two values whose categories may forbid ordering.
///
/// Callers inside the SDK treat `Uncomparable` as a hard error whenever an
/// actual order is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Uncomparable,
    Equivalent,
    Smaller,
    Larger,
}

impl CompareResult {
    fn from_ordering(ord: Ordering) -> Self {
        match ord {
            Ordering::Less => CompareResult::Smaller,
            Ordering::Equal => CompareResult::Equivalent,
            Ordering::Greater => CompareResult::Larger,
        }
    }
}

/// Value of a single primary-key column.
///
/// `InfMin`/`InfMax` exist for range boundaries, `AutoIncrement` for writes
/// against an auto-increment column. Only `Integer`, `Str` and `Blob` are
/// real values a server can store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PrimaryKeyValue {
    #[default]
    None,
    InfMin,
    InfMax,
    AutoIncrement,
    Integer(i64),
    Str(String),
    Blob(Vec<u8>),
}

impl PrimaryKeyValue {
    /// Whether this is a value a row can actually carry.
    pub fn is_real(&self) -> bool {
        matches!(
            self,
            PrimaryKeyValue::Integer(_) | PrimaryKeyValue::Str(_) | PrimaryKeyValue::Blob(_)
        )
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, PrimaryKeyValue::InfMin | PrimaryKeyValue::InfMax)
    }

    /// Compares two primary-key values.
    ///
    /// Like real categories order naturally (strings and blobs
    /// lexicographically). An infinity orders against any real value.
    /// Everything else, including infinity against infinity and
    /// `AutoIncrement` against anything, is `Uncomparable`.
    pub fn compare(&self, other: &PrimaryKeyValue) -> CompareResult {
        use PrimaryKeyValue::*;
        match (self, other) {
            (Integer(a), Integer(b)) => CompareResult::from_ordering(a.cmp(b)),
            (Str(a), Str(b)) => CompareResult::from_ordering(a.as_bytes().cmp(b.as_bytes())),
            (Blob(a), Blob(b)) => CompareResult::from_ordering(a.cmp(b)),
            (InfMin, b) if b.is_real() => CompareResult::Smaller,
            (a, InfMin) if a.is_real() => CompareResult::Larger,
            (InfMax, b) if b.is_real() => CompareResult::Larger,
            (a, InfMax) if a.is_real() => CompareResult::Smaller,
            _ => CompareResult::Uncomparable,
        }
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        if matches!(self, PrimaryKeyValue::None) {
            return Err(OtsError::parameter_invalid(
                "Primary-key value must not be absent.",
            ));
        }
        Ok(())
    }
}

/// Value of an attribute column.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AttributeValue {
    #[default]
    None,
    Str(String),
    Integer(i64),
    Blob(Vec<u8>),
    Boolean(bool),
    Float(f64),
}

impl AttributeValue {
    /// Compares two attribute values of the same category; cross-category
    /// and NaN comparisons are `Uncomparable`.
    pub fn compare(&self, other: &AttributeValue) -> CompareResult {
        use AttributeValue::*;
        match (self, other) {
            (Integer(a), Integer(b)) => CompareResult::from_ordering(a.cmp(b)),
            (Str(a), Str(b)) => CompareResult::from_ordering(a.as_bytes().cmp(b.as_bytes())),
            (Blob(a), Blob(b)) => CompareResult::from_ordering(a.cmp(b)),
            (Boolean(a), Boolean(b)) => CompareResult::from_ordering(a.cmp(b)),
            (Float(a), Float(b)) => match a.partial_cmp(b) {
                Some(ord) => CompareResult::from_ordering(ord),
                Option::None => CompareResult::Uncomparable,
            },
            _ => CompareResult::Uncomparable,
        }
    }

    /// Rejects absent values and non-finite floats. NaN and infinities have
    /// no wire representation.
    pub fn validate(&self) -> Result<(), OtsError> {
        match self {
            AttributeValue::None => Err(OtsError::parameter_invalid(
                "Attribute value must not be absent.",
            )),
            AttributeValue::Float(v) if !v.is_finite() => Err(OtsError::parameter_invalid(
                "Floating-point attribute must be finite.",
            )),
            _ => Ok(()),
        }
    }
}
