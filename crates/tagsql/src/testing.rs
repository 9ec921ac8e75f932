//! In-memory [`Connection`] for tests.
//!
//! `MockConnection` records every statement it receives and replays scripted
//! results in order. Unscripted reads return an empty cursor and unscripted
//! writes report zero affected rows. Transactions are recorded as if the
//! handle owned its session.
//!
//! Available to this crate's own tests and, through the `testing` feature, to
//! downstream test code.

use crate::client::{Connection, Cursor, ExecSummary};
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// A call received by a [`MockConnection`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Query(String, Vec<Value>),
    Exec(String, Vec<Value>),
    Begin,
    Commit,
    Rollback,
}

#[derive(Default)]
struct Script {
    cursors: VecDeque<OrmResult<Cursor>>,
    execs: VecDeque<OrmResult<ExecSummary>>,
    rollback_error: Option<OrmError>,
    log: Vec<Recorded>,
}

/// Scripted connection handle.
pub struct MockConnection {
    dialect: Dialect,
    closed: AtomicBool,
    script: Mutex<Script>,
}

impl MockConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            closed: AtomicBool::new(false),
            script: Mutex::new(Script::default()),
        }
    }

    /// Queue the result of the next read statement.
    pub fn push_cursor(&self, cursor: Cursor) -> &Self {
        self.with(|s| s.cursors.push_back(Ok(cursor)));
        self
    }

    /// Queue a failing read statement.
    pub fn push_query_error(&self, error: OrmError) -> &Self {
        self.with(|s| s.cursors.push_back(Err(error)));
        self
    }

    /// Queue the result of the next write statement.
    pub fn push_exec(&self, result: OrmResult<ExecSummary>) -> &Self {
        self.with(|s| s.execs.push_back(result));
        self
    }

    /// Make the next rollback fail with `error`.
    pub fn fail_rollback(&self, error: OrmError) -> &Self {
        self.with(|s| s.rollback_error = Some(error));
        self
    }

    /// Mark the handle closed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Every call received so far.
    pub fn log(&self) -> Vec<Recorded> {
        self.with(|s| s.log.clone())
    }

    /// Statements received so far, reads and writes alike.
    pub fn statements(&self) -> Vec<String> {
        self.with(|s| {
            s.log
                .iter()
                .filter_map(|call| match call {
                    Recorded::Query(sql, _) | Recorded::Exec(sql, _) => Some(sql.clone()),
                    _ => None,
                })
                .collect()
        })
    }

    fn with<T>(&self, f: impl FnOnce(&mut Script) -> T) -> T {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut script)
    }
}

impl Connection for MockConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Cursor> {
        self.with(|s| {
            s.log.push(Recorded::Query(sql.to_string(), params.to_vec()));
            s.cursors.pop_front().unwrap_or_else(|| Ok(Cursor::default()))
        })
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<ExecSummary> {
        self.with(|s| {
            s.log.push(Recorded::Exec(sql.to_string(), params.to_vec()));
            s.execs.pop_front().unwrap_or_else(|| Ok(ExecSummary::default()))
        })
    }

    async fn begin(&self) -> OrmResult<()> {
        self.with(|s| s.log.push(Recorded::Begin));
        Ok(())
    }

    async fn commit(&self) -> OrmResult<()> {
        self.with(|s| s.log.push(Recorded::Commit));
        Ok(())
    }

    async fn rollback(&self) -> OrmResult<()> {
        self.with(|s| {
            s.log.push(Recorded::Rollback);
            s.rollback_error.take().map_or(Ok(()), Err)
        })
    }
}
