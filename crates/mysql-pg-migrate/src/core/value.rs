//! SQL value types for database-agnostic data transfer.
//!
//! This module provides efficient value representations for moving row data
//! between the source and target engines.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Type hint for NULL values so the target encoding stays type-correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    Bytes,
    Uuid,
    Decimal,
    DateTime,
    TimestampTz,
    Date,
    Time,
    Json,
}

/// SQL value enum for type-safe row handling.
///
/// Uses `Cow` for string and byte data to enable zero-copy transfers when the
/// driver allows borrowing from its row buffers. Values that flow through
/// channels are converted to `'static` with [`SqlValue::into_owned`].
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    /// NULL with type hint for correct parameter binding.
    Null(SqlNullType),

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint, tinyint widened).
    I16(i16),

    /// 32-bit signed integer (int, mediumint).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point.
    F32(f32),

    /// 64-bit floating point.
    F64(f64),

    /// Text/string data.
    Text(Cow<'a, str>),

    /// Binary data.
    Bytes(Cow<'a, [u8]>),

    /// UUID value.
    Uuid(Uuid),

    /// Exact decimal value.
    Decimal(Decimal),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    TimestampTz(DateTime<FixedOffset>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// JSON document.
    Json(serde_json::Value),
}

impl<'a> SqlValue<'a> {
    /// Convert to a fully owned value with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> SqlValue<'static> {
        match self {
            SqlValue::Null(t) => SqlValue::Null(t),
            SqlValue::Bool(v) => SqlValue::Bool(v),
            SqlValue::I16(v) => SqlValue::I16(v),
            SqlValue::I32(v) => SqlValue::I32(v),
            SqlValue::I64(v) => SqlValue::I64(v),
            SqlValue::F32(v) => SqlValue::F32(v),
            SqlValue::F64(v) => SqlValue::F64(v),
            SqlValue::Text(v) => SqlValue::Text(Cow::Owned(v.into_owned())),
            SqlValue::Bytes(v) => SqlValue::Bytes(Cow::Owned(v.into_owned())),
            SqlValue::Uuid(v) => SqlValue::Uuid(v),
            SqlValue::Decimal(v) => SqlValue::Decimal(v),
            SqlValue::DateTime(v) => SqlValue::DateTime(v),
            SqlValue::TimestampTz(v) => SqlValue::TimestampTz(v),
            SqlValue::Date(v) => SqlValue::Date(v),
            SqlValue::Time(v) => SqlValue::Time(v),
            SqlValue::Json(v) => SqlValue::Json(v),
        }
    }

    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Create a text value from an owned String.
    #[must_use]
    pub fn text_owned(s: String) -> SqlValue<'static> {
        SqlValue::Text(Cow::Owned(s))
    }

    /// Create a bytes value from an owned Vec<u8>.
    #[must_use]
    pub fn bytes_owned(b: Vec<u8>) -> SqlValue<'static> {
        SqlValue::Bytes(Cow::Owned(b))
    }
}

impl From<bool> for SqlValue<'static> {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i16> for SqlValue<'static> {
    fn from(v: i16) -> Self {
        SqlValue::I16(v)
    }
}

impl From<i32> for SqlValue<'static> {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue<'static> {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<String> for SqlValue<'static> {
    fn from(v: String) -> Self {
        SqlValue::Text(Cow::Owned(v))
    }
}

impl<'a> From<&'a str> for SqlValue<'a> {
    fn from(v: &'a str) -> Self {
        SqlValue::Text(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue<'static> {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(Cow::Owned(v))
    }
}

impl From<Uuid> for SqlValue<'static> {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<Decimal> for SqlValue<'static> {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<NaiveDateTime> for SqlValue<'static> {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<NaiveDate> for SqlValue<'static> {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveTime> for SqlValue<'static> {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v)
    }
}

/// A batch of rows for streaming transfer.
///
/// The unit of work between producer and writer. Each batch is inserted with
/// one parameterized statement; bounded channels between the stages provide
/// back-pressure.
#[derive(Debug)]
pub struct Batch {
    /// Rows in this batch (owned for channel transfer).
    pub rows: Vec<Vec<SqlValue<'static>>>,

    /// Whether this is the final batch for the table.
    pub is_last: bool,
}

impl Batch {
    /// Create a new batch with the given rows.
    pub fn new(rows: Vec<Vec<SqlValue<'static>>>) -> Self {
        Self {
            rows,
            is_last: false,
        }
    }

    /// Mark this as the final batch.
    pub fn mark_final(mut self) -> Self {
        self.is_last = true;
        self
    }

    /// Get the number of rows in this batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_into_owned() {
        let borrowed: SqlValue<'_> = SqlValue::Text(Cow::Borrowed("hello"));
        let owned: SqlValue<'static> = borrowed.into_owned();
        assert_eq!(owned, SqlValue::Text(Cow::Owned("hello".to_string())));
    }

    #[test]
    fn test_sql_value_is_null() {
        assert!(SqlValue::<'static>::Null(SqlNullType::String).is_null());
        assert!(!SqlValue::I32(42).is_null());
    }

    #[test]
    fn test_batch_operations() {
        let batch = Batch::new(vec![
            vec![SqlValue::I32(1), SqlValue::text_owned("a".to_string())],
            vec![SqlValue::I32(2), SqlValue::text_owned("b".to_string())],
        ]);

        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
        assert!(!batch.is_last);

        let final_batch = batch.mark_final();
        assert!(final_batch.is_last);
    }

    #[test]
    fn test_from_implementations() {
        let v: SqlValue<'static> = 42i32.into();
        assert_eq!(v, SqlValue::I32(42));

        let v: SqlValue<'static> = "hello".to_string().into();
        assert_eq!(v, SqlValue::Text(Cow::Owned("hello".to_string())));
    }
}
