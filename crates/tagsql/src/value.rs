//! Loosely-typed scalar values.
//!
//! [`Cell`] is what a driver hands back for one column of one row, in the
//! backend's own representation. [`Value`] is the normalized scalar used in
//! row mappings and bound arguments: the row scanner folds every integer width
//! into [`Value::Int`] and byte buffers into [`Value::Text`], and keeps any
//! other backend-native cell as [`Value::Native`].
//!
//! Binding is checked per column type: a value is converted only where the
//! conversion is exact, and any other pairing is an error rather than a
//! reinterpretation of its bytes.

use crate::numeric;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// One row, keyed by column name.
pub type RowMap = HashMap<String, Value>;

/// Write parameters keyed by column name.
///
/// Ordered by key so generated column lists and argument sequences are stable.
pub type ParamMap = BTreeMap<String, Value>;

/// A backend-native cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    Text(String),
    Json(serde_json::Value),
    Uuid(Uuid),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Exact decimal, as text.
    Numeric(String),
    /// A column type with no dedicated variant, in the backend's encoding.
    Raw { type_name: String, bytes: Vec<u8> },
}

/// A loosely-typed scalar.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Any backend-native value the scanner passes through untouched.
    Native(Cell),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Native(Cell::Null))
    }

    /// Borrow the text payload, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Native(Cell::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        i64::from_value(self.clone())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Native(cell) => write!(f, "{cell}"),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NULL"),
            Cell::Bool(v) => write!(f, "{v}"),
            Cell::I16(v) => write!(f, "{v}"),
            Cell::I32(v) => write!(f, "{v}"),
            Cell::I64(v) => write!(f, "{v}"),
            Cell::F32(v) => write!(f, "{v}"),
            Cell::F64(v) => write!(f, "{v}"),
            Cell::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
            Cell::Text(v) => f.write_str(v),
            Cell::Json(v) => write!(f, "{v}"),
            Cell::Uuid(v) => write!(f, "{v}"),
            Cell::Timestamp(v) => write!(f, "{v}"),
            Cell::TimestampTz(v) => write!(f, "{v}"),
            Cell::Date(v) => write!(f, "{v}"),
            Cell::Time(v) => write!(f, "{v}"),
            Cell::Numeric(v) => f.write_str(v),
            Cell::Raw { bytes, .. } => {
                f.write_str("\\x")?;
                bytes.iter().try_for_each(|b| write!(f, "{b:02x}"))
            }
        }
    }
}

// ── Binding to tokio-postgres ───────────────────────────────────────────────

type BindResult = Result<IsNull, Box<dyn Error + Sync + Send>>;

fn mismatch(what: &str, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot bind {what} to a column of type {ty}").into()
}

fn is_text(ty: &Type) -> bool {
    <String as ToSql>::accepts(ty)
}

/// Bind through `T`'s own encoding, only where `T` accepts the column type.
fn checked<T: ToSql>(v: &T, what: &str, ty: &Type, out: &mut BytesMut) -> BindResult {
    if T::accepts(ty) {
        v.to_sql(ty, out)
    } else {
        Err(mismatch(what, ty))
    }
}

fn numeric_to_sql(text: &str, out: &mut BytesMut) -> BindResult {
    numeric::encode(text, out)?;
    Ok(IsNull::No)
}

fn bool_to_sql(v: bool, ty: &Type, out: &mut BytesMut) -> BindResult {
    match *ty {
        Type::BOOL => v.to_sql(ty, out),
        _ if is_text(ty) => v.to_string().to_sql(ty, out),
        _ => Err(mismatch("a boolean", ty)),
    }
}

fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> BindResult {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::NUMERIC => numeric_to_sql(&v.to_string(), out),
        _ if is_text(ty) => v.to_string().to_sql(ty, out),
        _ => Err(mismatch("an integer", ty)),
    }
}

fn float_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> BindResult {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => v.to_sql(ty, out),
        Type::NUMERIC if v.is_nan() => numeric_to_sql("NaN", out),
        Type::NUMERIC if v.is_infinite() => Err(mismatch("an infinite float", ty)),
        Type::NUMERIC => numeric_to_sql(&v.to_string(), out),
        _ if is_text(ty) => v.to_string().to_sql(ty, out),
        _ => Err(mismatch("a float", ty)),
    }
}

fn text_to_sql(v: &str, ty: &Type, out: &mut BytesMut) -> BindResult {
    match *ty {
        _ if is_text(ty) => v.to_sql(ty, out),
        Type::NUMERIC => numeric_to_sql(v, out),
        Type::UUID => Uuid::parse_str(v)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out),
        _ => Err(mismatch("text", ty)),
    }
}

/// Every column type is offered to `to_sql`, which decides per variant.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> BindResult {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => bool_to_sql(*v, ty, out),
            Value::Int(v) => int_to_sql(*v, ty, out),
            Value::Float(v) => float_to_sql(*v, ty, out),
            Value::Text(v) => text_to_sql(v, ty, out),
            Value::Native(cell) => cell.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl ToSql for Cell {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> BindResult {
        match self {
            Cell::Null => Ok(IsNull::Yes),
            Cell::Bool(v) => bool_to_sql(*v, ty, out),
            Cell::I16(v) => int_to_sql(i64::from(*v), ty, out),
            Cell::I32(v) => int_to_sql(i64::from(*v), ty, out),
            Cell::I64(v) => int_to_sql(*v, ty, out),
            Cell::F32(v) => float_to_sql(f64::from(*v), ty, out),
            Cell::F64(v) => float_to_sql(*v, ty, out),
            Cell::Bytes(v) if is_text(ty) => std::str::from_utf8(v)?.to_sql(ty, out),
            Cell::Bytes(v) => checked(v, "bytes", ty, out),
            Cell::Text(v) => text_to_sql(v, ty, out),
            Cell::Json(v) => checked(v, "json", ty, out),
            Cell::Uuid(v) => checked(v, "a uuid", ty, out),
            Cell::Timestamp(v) => checked(v, "a timestamp", ty, out),
            Cell::TimestampTz(v) => checked(v, "a timestamptz", ty, out),
            Cell::Date(v) => checked(v, "a date", ty, out),
            Cell::Time(v) => checked(v, "a time", ty, out),
            Cell::Numeric(v) => match *ty {
                Type::NUMERIC => numeric_to_sql(v, out),
                _ if is_text(ty) => v.to_sql(ty, out),
                _ => Err(mismatch("a numeric", ty)),
            },
            Cell::Raw { type_name, bytes } if ty.name() == type_name.as_str() => {
                out.extend_from_slice(bytes);
                Ok(IsNull::No)
            }
            Cell::Raw { type_name, .. } => Err(mismatch(&format!("a raw {type_name}"), ty)),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

// ── Conversions ─────────────────────────────────────────────────────────────

/// Extract a Rust value from a [`Value`].
///
/// Returns `None` when the value has a different shape.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

/// Produce a [`Value`] from a Rust value.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

macro_rules! impl_int_value {
    ($($t:ty),* $(,)?) => {$(
        impl FromValue for $t {
            fn from_value(value: Value) -> Option<Self> {
                let wide = match value {
                    Value::Int(v) => v,
                    Value::Native(Cell::I16(v)) => i64::from(v),
                    Value::Native(Cell::I32(v)) => i64::from(v),
                    Value::Native(Cell::I64(v)) => v,
                    Value::Native(Cell::Numeric(v)) => v.parse::<i64>().ok()?,
                    _ => return None,
                };
                <$t>::try_from(wide).ok()
            }
        }

        impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }
        }

        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        }
    )*};
}

impl_int_value!(i8, i16, i32, i64, u8, u16, u32, isize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(v),
            Value::Int(v) => Some(v as f64),
            Value::Native(Cell::F32(v)) => Some(f64::from(v)),
            Value::Native(Cell::F64(v)) => Some(v),
            Value::Native(Cell::Numeric(v)) => v.parse().ok(),
            _ => None,
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Option<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(v) | Value::Native(Cell::Bool(v)) => Some(v),
            _ => None,
        }
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(v) | Value::Native(Cell::Text(v)) => Some(v),
            _ => None,
        }
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.into_bytes()),
            Value::Native(Cell::Bytes(v)) => Some(v),
            _ => None,
        }
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Native(Cell::Bytes(self.clone()))
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl From<Cell> for Value {
    fn from(cell: Cell) -> Self {
        Value::Native(cell)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Option<Self> {
        if value.is_null() {
            return Some(None);
        }
        T::from_value(value).map(Some)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

macro_rules! impl_native_value {
    ($($t:ty => $variant:ident),* $(,)?) => {$(
        impl FromValue for $t {
            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::Native(Cell::$variant(v)) => Some(v),
                    _ => None,
                }
            }
        }

        impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::Native(Cell::$variant(self.clone()))
            }
        }

        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Native(Cell::$variant(v))
            }
        }
    )*};
}

impl_native_value!(
    serde_json::Value => Json,
    Uuid => Uuid,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    NaiveDate => Date,
    NaiveTime => Time,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_narrow_through_try_from() {
        assert_eq!(i32::from_value(Value::Int(7)), Some(7));
        assert_eq!(u8::from_value(Value::Int(300)), None);
        assert_eq!(i64::from_value(Value::Native(Cell::I16(-3))), Some(-3));
    }

    #[test]
    fn option_maps_null_to_none() {
        assert_eq!(Option::<i64>::from_value(Value::Null), Some(None));
        assert_eq!(Option::<i64>::from_value(Value::Int(1)), Some(Some(1)));
        assert_eq!(Option::<String>::None.to_value(), Value::Null);
    }

    #[test]
    fn display_is_the_generic_string_form() {
        assert_eq!(Value::Int(5).to_string(), "5");
        assert_eq!(Value::Float(2.0).to_string(), "2");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Native(Cell::Bytes(b"abc".to_vec())).to_string(), "abc");
    }

    #[test]
    fn int_binds_to_narrow_columns() {
        let mut out = BytesMut::new();
        Value::Int(7).to_sql(&Type::INT4, &mut out).unwrap();
        assert_eq!(&out[..], &7_i32.to_be_bytes()[..]);

        let mut out = BytesMut::new();
        assert!(Value::Int(i64::MAX).to_sql(&Type::INT2, &mut out).is_err());
    }

    fn bound(value: &Value, ty: &Type) -> Result<Vec<u8>, String> {
        let mut out = BytesMut::new();
        value
            .to_sql(ty, &mut out)
            .map(|_| out.to_vec())
            .map_err(|e| e.to_string())
    }

    #[test]
    fn bool_binds_to_text_as_words() {
        assert_eq!(bound(&Value::Bool(true), &Type::TEXT).unwrap(), b"true");
        assert_eq!(bound(&Value::Bool(false), &Type::VARCHAR).unwrap(), b"false");
        assert_eq!(bound(&Value::Bool(true), &Type::BOOL).unwrap(), [1_u8]);
    }

    #[test]
    fn int_binds_to_numeric_as_decimal() {
        // ndigits=1 weight=0 sign=+ dscale=0, digit 5
        assert_eq!(
            bound(&Value::Int(5), &Type::NUMERIC).unwrap(),
            [0_u8, 1, 0, 0, 0, 0, 0, 0, 0, 5]
        );
        assert_eq!(
            bound(&Value::Float(1.5), &Type::NUMERIC).unwrap(),
            [0_u8, 2, 0, 0, 0, 0, 0, 1, 0, 1, 0x13, 0x88]
        );
        assert!(bound(&Value::Float(f64::INFINITY), &Type::NUMERIC).is_err());
    }

    #[test]
    fn mismatched_types_are_rejected() {
        let err = bound(&Value::Bool(true), &Type::INT4).unwrap_err();
        assert_eq!(err, "cannot bind a boolean to a column of type int4");
        assert!(bound(&Value::Int(1), &Type::UUID).is_err());
        assert!(bound(&Value::Float(1.0), &Type::INT8).is_err());
        assert!(bound(&Value::Text("abc".into()), &Type::INT4).is_err());
        assert!(bound(&Value::Native(Cell::Bytes(vec![1])), &Type::INT4).is_err());
        assert!(bound(&Value::Native(Cell::Json(serde_json::json!(1))), &Type::TEXT).is_err());
    }

    #[test]
    fn text_parses_into_structured_columns() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let uuid = Uuid::parse_str(id).unwrap();
        assert_eq!(bound(&Value::Text(id.into()), &Type::UUID).unwrap(), uuid.as_bytes());
        assert!(bound(&Value::Text("not-a-uuid".into()), &Type::UUID).is_err());
        assert!(bound(&Value::Text("12.5".into()), &Type::NUMERIC).is_ok());
        assert!(bound(&Value::Text("twelve".into()), &Type::NUMERIC).is_err());
    }

    #[test]
    fn raw_cells_bind_only_to_their_own_type() {
        let raw = Value::Native(Cell::Raw {
            type_name: "inet".into(),
            bytes: vec![2, 32, 0, 4, 10, 0, 0, 1],
        });
        assert_eq!(bound(&raw, &Type::INET).unwrap(), [2_u8, 32, 0, 4, 10, 0, 0, 1]);
        assert!(bound(&raw, &Type::TEXT).is_err());
        assert_eq!(raw.to_string(), "\\x022000040a000001");
    }

    #[test]
    fn numeric_text_converts_to_numbers() {
        assert_eq!(f64::from_value(Value::Native(Cell::Numeric("2.50".into()))), Some(2.5));
        assert_eq!(i64::from_value(Value::Native(Cell::Numeric("42".into()))), Some(42));
        assert_eq!(i64::from_value(Value::Native(Cell::Numeric("4.2".into()))), None);
    }

    #[test]
    fn null_binds_as_null() {
        let mut out = BytesMut::new();
        let is_null = Value::Null.to_sql(&Type::TEXT, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }
}
