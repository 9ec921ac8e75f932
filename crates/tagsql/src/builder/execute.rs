//! Execution methods: render, run through the execute adapter, map results.

use super::Query;
use super::render::{Rendered, finish, insert_template, update_template};
use crate::client::{Connection, Cursor, ExecSummary};
use crate::error::{OrmError, OrmResult};
use crate::exec;
use crate::record::{Record, from_record, to_record};
use crate::row::{normalize_cell, scan_all};
use crate::value::{FromValue, ParamMap, RowMap, Value};

fn check_bind(rendered: &Rendered, args: &[Value]) -> OrmResult<()> {
    if rendered.placeholders != args.len() {
        return Err(OrmError::statement(
            &rendered.sql,
            OrmError::Bind {
                expected: rendered.placeholders,
                got: args.len(),
            },
        ));
    }
    Ok(())
}

impl<C: Connection> Query<C> {
    fn checked(&self) -> OrmResult<(&str, Vec<Value>)> {
        let rendered = self.rendered();
        let args = self.args();
        check_bind(rendered, &args)?;
        Ok((rendered.sql.as_str(), args))
    }

    /// Execute the statement as a write.
    pub async fn result(&self) -> OrmResult<ExecSummary> {
        let (sql, args) = self.checked()?;
        exec::exec(&*self.conn, sql, &args)
            .await
            .map_err(|e| OrmError::statement(sql, e))
    }

    /// Execute the statement as a read and return the open cursor.
    pub async fn rows(&self) -> OrmResult<Cursor> {
        let (sql, args) = self.checked()?;
        exec::query(&*self.conn, sql, &args)
            .await
            .map_err(|e| OrmError::statement(sql, e))
    }

    /// Execute the statement and scan every row.
    pub async fn results(&self) -> OrmResult<Vec<RowMap>> {
        let cursor = self.rows().await?;
        scan_all(cursor).map_err(|e| OrmError::statement(self.render(), e))
    }

    /// Execute the statement and hand back the cursor with its column names,
    /// leaving scanning to the caller.
    pub async fn results_simple(&self) -> OrmResult<(Cursor, Vec<String>)> {
        let cursor = self.rows().await?;
        let columns = cursor.columns().to_vec();
        Ok((cursor, columns))
    }

    /// Execute with `LIMIT 1` and return the first row.
    ///
    /// Fails with [`OrmError::NotFound`] when nothing matches.
    pub async fn first_result(&mut self) -> OrmResult<RowMap> {
        self.limit(1);
        let rows = self.results().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| OrmError::statement(self.render(), OrmError::not_found("No results")))
    }

    /// Count matching rows by primary key.
    ///
    /// Rendered from a copy of the clause state with the select list replaced
    /// by `COUNT(pk)` and no ordering; the builder itself is left as it was.
    pub async fn count(&self) -> OrmResult<i64> {
        let mut state = self.state.clone();
        state.base = None;
        state.select = vec![format!("COUNT({})", self.dialect.quote_field(&self.primary_key))];
        state.order = None;

        let rendered = state.render(self.table(), self.dialect);
        let args = self.args();
        check_bind(&rendered, &args)?;
        let sql = rendered.sql;

        let mut cursor = exec::query(&*self.conn, &sql, &args)
            .await
            .map_err(|e| OrmError::statement(&sql, e))?;
        let first = cursor.next_row().and_then(|row| row.into_iter().next());
        cursor.close();

        let Some(cell) = first else {
            return Ok(0);
        };
        let value = normalize_cell(cell);
        i64::from_value(value.clone()).ok_or_else(|| {
            OrmError::statement(
                &sql,
                OrmError::decode("count", format!("`{value}` is not an integer")),
            )
        })
    }

    /// Update every matching row with `params` and return the affected count.
    ///
    /// Switches the base clause to `UPDATE table SET col=?,...`; the values
    /// are bound ahead of any WHERE arguments.
    pub async fn update_all(&mut self, params: &ParamMap) -> OrmResult<u64> {
        if params.is_empty() {
            return Err(OrmError::Other(
                "update requires at least one column".to_string(),
            ));
        }
        let (template, values) = update_template(self.table(), params, self.dialect);
        self.update_sql(template);
        self.set_args = values;
        self.result().await.map(|summary| summary.rows_affected)
    }

    /// Alias of [`Query::update_all`].
    pub async fn update(&mut self, params: &ParamMap) -> OrmResult<u64> {
        self.update_all(params).await
    }

    /// Update matching rows from the writable fields of `record`.
    pub async fn update_record<R: Record>(&mut self, record: &R) -> OrmResult<u64> {
        self.update_all(&from_record(record)).await
    }

    /// Delete every matching row and return the affected count.
    pub async fn delete_all(&mut self) -> OrmResult<u64> {
        let template = format!("DELETE FROM {}", self.table());
        self.set_args.clear();
        self.update_sql(template);
        self.result().await.map(|summary| summary.rows_affected)
    }

    /// Insert one row inside a transaction and return its generated id.
    pub async fn insert(&self, params: &ParamMap) -> OrmResult<i64> {
        if params.is_empty() {
            return Err(OrmError::Other(
                "insert requires at least one column".to_string(),
            ));
        }
        let (sql, args) = self.insert_sql(params);
        exec::insert(&*self.conn, &sql, &args)
            .await
            .map_err(|e| OrmError::statement(&sql, e))
    }

    /// Insert the writable fields of `record`.
    pub async fn insert_record<R: Record>(&self, record: &R) -> OrmResult<i64> {
        self.insert(&from_record(record)).await
    }

    /// Execute and map every row into `R`.
    pub async fn fetch_all<R: Record>(&self) -> OrmResult<Vec<R>> {
        Ok(self.results().await?.iter().map(to_record).collect())
    }

    /// Execute with `LIMIT 1` and map the row into `R`.
    pub async fn fetch_first<R: Record>(&mut self) -> OrmResult<R> {
        self.first_result().await.map(|row| to_record(&row))
    }
}

impl<C> Query<C> {
    /// The INSERT statement and arguments generated for `params`.
    ///
    /// Columns and arguments follow the parameter keys in sorted order.
    pub fn insert_sql(&self, params: &ParamMap) -> (String, Vec<Value>) {
        let (template, args) =
            insert_template(&self.table_name, &self.primary_key, params, self.dialect);
        (finish(&template, self.dialect).sql, args)
    }

    /// The UPDATE statement and arguments `update_all(params)` would run,
    /// without changing the builder.
    pub fn update_sql_for(&self, params: &ParamMap) -> (String, Vec<Value>) {
        let (template, mut args) = update_template(self.table(), params, self.dialect);
        let mut state = self.state.clone();
        state.base = Some(template);
        args.extend(self.args.iter().cloned());
        (state.render(self.table(), self.dialect).sql, args)
    }
}
