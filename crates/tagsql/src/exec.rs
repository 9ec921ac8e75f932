//! Execute adapter: runs rendered statements against a connection handle.
//!
//! Read statements return a [`Cursor`]; write statements return an
//! [`ExecSummary`]. Inserts run as one unit of work on the handle, see
//! [`Connection::insert`].

use crate::client::{Connection, Cursor, ExecSummary};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

pub use crate::row::scan_row;

fn ensure_live<C: Connection>(conn: &C) -> OrmResult<()> {
    if conn.is_closed() {
        return Err(OrmError::NoConnection);
    }
    Ok(())
}

/// Run a read statement.
pub async fn query<C: Connection>(
    conn: &C,
    sql: &str,
    args: &[Value],
) -> OrmResult<Cursor> {
    ensure_live(conn)?;
    tracing::debug!(target: "tagsql.sql", kind = "query", param_count = args.len(), sql);
    conn.query(sql, args).await.inspect_err(|e| {
        tracing::warn!(target: "tagsql.sql", kind = "query", error = %e, sql, "statement failed");
    })
}

/// Run a write statement.
pub async fn exec<C: Connection>(
    conn: &C,
    sql: &str,
    args: &[Value],
) -> OrmResult<ExecSummary> {
    ensure_live(conn)?;
    tracing::debug!(target: "tagsql.sql", kind = "exec", param_count = args.len(), sql);
    conn.execute(sql, args).await.inspect_err(|e| {
        tracing::warn!(target: "tagsql.sql", kind = "exec", error = %e, sql, "statement failed");
    })
}

/// Run an insert as one unit of work and return the generated id.
pub async fn insert<C: Connection>(
    conn: &C,
    sql: &str,
    args: &[Value],
) -> OrmResult<i64> {
    ensure_live(conn)?;
    tracing::debug!(target: "tagsql.sql", kind = "insert", param_count = args.len(), sql);
    conn.insert(sql, args).await.inspect_err(|e| {
        tracing::warn!(target: "tagsql.sql", kind = "insert", error = %e, sql, "statement failed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::testing::{MockConnection, Recorded};
    use crate::value::Cell;

    #[tokio::test]
    async fn closed_handle_is_no_connection() {
        let conn = MockConnection::new(Dialect::MySql);
        conn.close();
        let err = query(&conn, "SELECT 1;", &[]).await.unwrap_err();
        assert!(matches!(err, OrmError::NoConnection));
        let err = exec(&conn, "DELETE FROM t;", &[]).await.unwrap_err();
        assert!(matches!(err, OrmError::NoConnection));
    }

    #[tokio::test]
    async fn insert_commits_and_returns_id() {
        let conn = MockConnection::new(Dialect::MySql);
        conn.push_exec(Ok(ExecSummary::new(1).with_last_insert_id(12)));

        let id = insert(&conn, "INSERT INTO t (`a`) VALUES(?);", &[Value::Int(1)])
            .await
            .unwrap();

        assert_eq!(id, 12);
        assert_eq!(
            conn.log(),
            vec![
                Recorded::Begin,
                Recorded::Exec("INSERT INTO t (`a`) VALUES(?);".into(), vec![Value::Int(1)]),
                Recorded::Commit,
            ]
        );
    }

    #[tokio::test]
    async fn failed_insert_rolls_back() {
        let conn = MockConnection::new(Dialect::MySql);
        conn.push_exec(Err(OrmError::Other("duplicate".into())));

        let err = insert(&conn, "INSERT INTO t (`a`) VALUES(?);", &[Value::Int(1)])
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "duplicate");
        assert_eq!(conn.log().last(), Some(&Recorded::Rollback));
        assert!(!conn.log().contains(&Recorded::Commit));
    }

    #[tokio::test]
    async fn returning_dialect_reads_first_cell() {
        let conn = MockConnection::new(Dialect::Postgres);
        conn.push_cursor(Cursor::new(vec!["id".into()], vec![vec![Cell::I32(5)]]));

        let id = insert(&conn, "INSERT INTO t (\"a\") VALUES($1) RETURNING \"id\";", &[Value::Int(1)])
            .await
            .unwrap();

        assert_eq!(id, 5);
        assert_eq!(conn.log().last(), Some(&Recorded::Commit));
    }

    #[tokio::test]
    async fn returning_nothing_rolls_back() {
        let conn = MockConnection::new(Dialect::Postgres);
        conn.push_cursor(Cursor::new(vec!["id".into()], vec![]));

        let err = insert(&conn, "INSERT INTO t (\"a\") VALUES($1) RETURNING \"id\";", &[Value::Int(1)])
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(conn.log().last(), Some(&Recorded::Rollback));
    }

    #[tokio::test]
    async fn failed_rollback_reports_both_errors() {
        let conn = MockConnection::new(Dialect::MySql);
        conn.push_exec(Err(OrmError::Other("duplicate".into())));
        conn.fail_rollback(OrmError::NoConnection);

        let err = insert(&conn, "INSERT INTO t (`a`) VALUES(?);", &[Value::Int(1)])
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Transaction error: duplicate (rollback failed: No database available)"
        );
    }
}
