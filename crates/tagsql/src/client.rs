//! Connection trait: the backend seam the builder executes against.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::numeric;
use crate::row::normalize_cell;
use crate::value::{Cell, FromValue, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::collections::VecDeque;
use std::error::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, ToSql, Type};
use uuid::Uuid;

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecSummary {
    /// Number of rows the statement touched.
    pub rows_affected: u64,
    /// Identifier generated by an insert, when the backend reports one.
    pub last_insert_id: Option<i64>,
}

impl ExecSummary {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

/// An open result set: column names plus the rows still to be read.
///
/// Rows are released by [`Cursor::close`] or when the cursor is dropped,
/// whichever comes first.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<Cell>>,
    closed: bool,
}

impl Cursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            closed: false,
        }
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Take the next row, or `None` once exhausted or closed.
    pub fn next_row(&mut self) -> Option<Vec<Cell>> {
        if self.closed {
            return None;
        }
        self.rows.pop_front()
    }

    /// Rows not yet read.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Release any unread rows.
    pub fn close(&mut self) {
        self.closed = true;
        self.rows.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read the generated id from the first cell of an insert's result.
    ///
    /// A result with no columns carries no id and yields 0.
    pub fn into_generated_id(mut self) -> OrmResult<i64> {
        let Some(column) = self.columns.first().cloned() else {
            return Ok(0);
        };
        let first = self.next_row().and_then(|row| row.into_iter().next());
        self.close();

        let cell = first.ok_or_else(|| OrmError::not_found("insert returned no generated id"))?;
        let value = normalize_cell(cell);
        i64::from_value(value.clone()).ok_or_else(|| {
            OrmError::decode(column, format!("generated id `{value}` is not an integer"))
        })
    }
}

impl Iterator for Cursor {
    type Item = Vec<Cell>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }
}

/// A live database handle.
///
/// A single handle may be shared by many builders; implementations must
/// tolerate concurrent `query`/`execute` calls the way pooled driver handles do.
pub trait Connection: Send + Sync {
    /// Placeholder and quoting rules for statements sent to this handle.
    fn dialect(&self) -> Dialect;

    /// Whether the handle can no longer execute statements.
    fn is_closed(&self) -> bool {
        false
    }

    /// Prepare and run a read statement.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Cursor>> + Send;

    /// Prepare and run a write statement.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<ExecSummary>> + Send;

    /// Open a transaction on this handle's session.
    ///
    /// Only handles that own their session can scope a transaction this way;
    /// the default refuses.
    fn begin(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send {
        async { Err(no_session()) }
    }

    /// Commit the open transaction.
    fn commit(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send {
        async { Err(no_session()) }
    }

    /// Roll back the open transaction.
    fn rollback(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send {
        async { Err(no_session()) }
    }

    /// Run one insert as a single unit of work and return the generated id.
    ///
    /// No other statement sent through this handle may take part in the unit.
    /// The default wraps the statement in `begin`/`commit`, rolling back on any
    /// failure. Dialects that return ids read the first cell of the result;
    /// others use the id the write reports, or 0.
    fn insert(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<i64>> + Send {
        async move {
            self.begin().await?;

            let outcome = if self.dialect().returns_generated_id() {
                match self.query(sql, params).await {
                    Ok(cursor) => cursor.into_generated_id(),
                    Err(e) => Err(e),
                }
            } else {
                self.execute(sql, params)
                    .await
                    .map(|summary| summary.last_insert_id.unwrap_or(0))
            };

            match outcome {
                Ok(id) => {
                    self.commit().await?;
                    Ok(id)
                }
                Err(error) => {
                    tracing::debug!(target: "tagsql.sql", error = %error, "rolling back failed insert");
                    match self.rollback().await {
                        Ok(()) => Err(error),
                        Err(rollback_err) => Err(OrmError::Transaction(format!(
                            "{error} (rollback failed: {rollback_err})"
                        ))),
                    }
                }
            }
        }
    }
}

fn no_session() -> OrmError {
    OrmError::Transaction("handle has no dedicated session to hold a transaction".to_string())
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

/// A NUMERIC column as decimal text.
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        numeric::decode(raw).map(NumericText)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Any column, kept in the server's binary encoding.
struct RawBytes(Vec<u8>);

impl<'a> FromSql<'a> for RawBytes {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawBytes(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Decode one column of a postgres row into its native cell.
fn decode_cell(row: &Row, idx: usize) -> OrmResult<Cell> {
    let column = &row.columns()[idx];
    let name = column.name();
    let ty = column.type_();

    macro_rules! get {
        ($t:ty, $variant:ident) => {
            row.try_get::<_, Option<$t>>(idx)
                .map(|v| v.map_or(Cell::Null, Cell::$variant))
        };
    }

    let cell = match *ty {
        Type::BOOL => get!(bool, Bool),
        Type::INT2 => get!(i16, I16),
        Type::INT4 => get!(i32, I32),
        Type::INT8 => get!(i64, I64),
        Type::FLOAT4 => get!(f32, F32),
        Type::FLOAT8 => get!(f64, F64),
        Type::BYTEA => get!(Vec<u8>, Bytes),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get!(String, Text)
        }
        Type::JSON | Type::JSONB => get!(serde_json::Value, Json),
        Type::UUID => get!(Uuid, Uuid),
        Type::TIMESTAMP => get!(NaiveDateTime, Timestamp),
        Type::TIMESTAMPTZ => get!(DateTime<Utc>, TimestampTz),
        Type::DATE => get!(NaiveDate, Date),
        Type::TIME => get!(NaiveTime, Time),
        Type::NUMERIC => row
            .try_get::<_, Option<NumericText>>(idx)
            .map(|v| v.map_or(Cell::Null, |n| Cell::Numeric(n.0))),
        _ => row.try_get::<_, Option<RawBytes>>(idx).map(|v| {
            v.map_or(Cell::Null, |raw| Cell::Raw {
                type_name: ty.name().to_string(),
                bytes: raw.0,
            })
        }),
    };
    cell.map_err(|e| OrmError::decode(name, e.to_string()))
}

fn decode_row(row: &Row) -> OrmResult<Vec<Cell>> {
    (0..row.len()).map(|idx| decode_cell(row, idx)).collect()
}

impl Connection for tokio_postgres::Client {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn is_closed(&self) -> bool {
        tokio_postgres::Client::is_closed(self)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Cursor> {
        let stmt = tokio_postgres::Client::prepare(self, sql)
            .await
            .map_err(OrmError::from_db_error)?;
        let columns = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let refs = param_refs(params);
        let rows = tokio_postgres::Client::query(self, &stmt, &refs)
            .await
            .map_err(OrmError::from_db_error)?;
        let rows = rows.iter().map(decode_row).collect::<OrmResult<Vec<_>>>()?;

        Ok(Cursor::new(columns, rows))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<ExecSummary> {
        let stmt = tokio_postgres::Client::prepare(self, sql)
            .await
            .map_err(OrmError::from_db_error)?;

        let refs = param_refs(params);
        let affected = tokio_postgres::Client::execute(self, &stmt, &refs)
            .await
            .map_err(OrmError::from_db_error)?;

        Ok(ExecSummary::new(affected))
    }

    /// The client is shared by every builder bound to its name, so a
    /// session-level `BEGIN` would capture their statements too. An
    /// `INSERT ... RETURNING` already commits or fails as one statement.
    async fn insert(&self, sql: &str, params: &[Value]) -> OrmResult<i64> {
        <Self as Connection>::query(self, sql, params)
            .await?
            .into_generated_id()
    }
}
