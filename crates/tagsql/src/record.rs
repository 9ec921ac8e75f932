//! Record mapping between row mappings and typed structs.
//!
//! Each record type declares a static binding table, usually generated by
//! `#[derive(Record)]`:
//!
//! ```ignore
//! use tagsql::Record;
//!
//! #[derive(Debug, Default, Record)]
//! struct AdsTagCopy {
//!     #[builder("id", omit)]
//!     id: i64,
//!     #[builder("ad_id")]
//!     ad_id: i64,
//!     #[builder("content_tag")]
//!     content_tag: String,
//! }
//! ```
//!
//! Reading is lenient: a value that cannot be coerced into its field leaves the
//! field at its zero value. Use [`to_record_strict`] to get a decode error instead.

use crate::error::{OrmError, OrmResult};
use crate::value::{ParamMap, RowMap, Value};

/// Declared kind of a record field, used to pick the read coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any integer width; parsed from the value's string form.
    Int,
    /// Text; the value's string form.
    Text,
    /// Floating point; parsed from the value's string form.
    Float,
    /// Anything else; the value is passed through.
    Other,
}

/// One entry of a record's binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    /// Rust field name.
    pub field: &'static str,
    /// Column / parameter key.
    pub key: &'static str,
    pub kind: FieldKind,
    /// Excluded from generated INSERT/UPDATE parameters.
    pub omit: bool,
}

impl FieldBinding {
    pub const fn new(field: &'static str, key: &'static str, kind: FieldKind) -> Self {
        Self {
            field,
            key,
            kind,
            omit: false,
        }
    }

    /// Mark the field omit-on-write.
    pub const fn omit(mut self) -> Self {
        self.omit = true;
        self
    }

    /// Whether the field takes part in generated write parameters.
    pub fn is_writable(&self) -> bool {
        !self.key.is_empty() && !self.omit
    }
}

/// A struct with a static field-binding table.
pub trait Record: Default {
    /// Binding table, one entry per bound field.
    const BINDINGS: &'static [FieldBinding];

    /// Store `value` in the field bound to `key`.
    ///
    /// Returns `false`, leaving the field untouched, when the key is unknown
    /// or the value does not fit the field type.
    fn assign(&mut self, key: &str, value: Value) -> bool;

    /// Current value of the field bound to `key`.
    fn value_of(&self, key: &str) -> Option<Value>;
}

/// Coerce a scanned value into the shape a field of `kind` expects.
///
/// Returns `None` when the value's string form does not parse.
pub fn coerce(kind: FieldKind, value: &Value) -> Option<Value> {
    if value.is_null() {
        return match kind {
            FieldKind::Other => Some(Value::Null),
            _ => None,
        };
    }

    match kind {
        FieldKind::Int => match value {
            Value::Int(v) => Some(Value::Int(*v)),
            other => other.to_string().parse::<i64>().ok().map(Value::Int),
        },
        FieldKind::Text => Some(Value::Text(value.to_string())),
        FieldKind::Float => match value {
            Value::Float(v) => Some(Value::Float(*v)),
            other => other.to_string().parse::<f64>().ok().map(Value::Float),
        },
        FieldKind::Other => Some(value.clone()),
    }
}

/// Build a record from a row mapping.
///
/// Fields whose key is missing from the row, or whose value cannot be coerced,
/// keep their zero value.
pub fn to_record<R: Record>(row: &RowMap) -> R {
    let mut record = R::default();
    for binding in R::BINDINGS {
        let Some(raw) = row.get(binding.key) else {
            continue;
        };
        let assigned = coerce(binding.kind, raw).is_some_and(|v| record.assign(binding.key, v));
        if !assigned && !raw.is_null() {
            tracing::trace!(
                target: "tagsql.record",
                field = binding.field,
                key = binding.key,
                value = %raw,
                "value does not fit field; left at zero value"
            );
        }
    }
    record
}

/// Build a record from a row mapping, failing on values that do not fit.
///
/// Missing keys and NULLs still leave the field at its zero value.
pub fn to_record_strict<R: Record>(row: &RowMap) -> OrmResult<R> {
    let mut record = R::default();
    for binding in R::BINDINGS {
        let Some(raw) = row.get(binding.key) else {
            continue;
        };
        if raw.is_null() && binding.kind != FieldKind::Other {
            continue;
        }
        let coerced = coerce(binding.kind, raw).ok_or_else(|| {
            OrmError::decode(
                binding.key,
                format!("cannot coerce `{raw}` into {:?} field `{}`", binding.kind, binding.field),
            )
        })?;
        if !record.assign(binding.key, coerced) {
            return Err(OrmError::decode(
                binding.key,
                format!("value `{raw}` does not fit field `{}`", binding.field),
            ));
        }
    }
    Ok(record)
}

/// Extract the writable fields of a record into a parameter mapping.
pub fn from_record<R: Record>(record: &R) -> ParamMap {
    R::BINDINGS
        .iter()
        .filter(|binding| binding.is_writable())
        .filter_map(|binding| {
            record
                .value_of(binding.key)
                .map(|value| (binding.key.to_string(), value))
        })
        .collect()
}
