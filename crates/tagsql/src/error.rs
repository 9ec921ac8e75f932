//! Error types for tagsql

use thiserror::Error;

/// Result type alias for tagsql operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for statement building and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// No live handle for a named backend, or an invalid setup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The bound connection handle is gone or closed
    #[error("No database available")]
    NoConnection,

    /// Query execution error
    #[error("Query error: {}", describe_pg_error(.0))]
    Query(#[from] tokio_postgres::Error),

    /// An execution failure together with the statement that caused it
    #[error("{source}\nQUERY: {sql}")]
    Statement {
        sql: String,
        #[source]
        source: Box<OrmError>,
    },

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Placeholder count does not match the bound arguments
    #[error("Bind error: statement has {expected} placeholder(s) but {got} argument(s) were bound")]
    Bind { expected: usize, got: usize },

    /// Transaction begin/commit/rollback error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// Server errors show their message and SQLSTATE; client-side errors show
/// their cause, which the driver keeps out of its own message.
fn describe_pg_error(err: &tokio_postgres::Error) -> String {
    if let Some(db) = err.as_db_error() {
        let mut out = format!(
            "{}: {} (SQLSTATE {})",
            db.severity(),
            db.message(),
            db.code().code()
        );
        if let Some(detail) = db.detail() {
            out.push_str("\nDETAIL: ");
            out.push_str(detail);
        }
        return out;
    }

    let summary = err.to_string();
    match std::error::Error::source(err).map(ToString::to_string) {
        Some(cause) if !summary.contains(&cause) => format!("{summary}: {cause}"),
        _ => summary,
    }
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Attach the rendered statement to an execution error.
    ///
    /// Errors that already carry a statement are returned unchanged.
    pub fn statement(sql: impl Into<String>, source: OrmError) -> Self {
        match source {
            err @ Self::Statement { .. } => err,
            source => Self::Statement {
                sql: sql.into(),
                source: Box::new(source),
            },
        }
    }

    /// The statement attached to this error, if any.
    pub fn statement_sql(&self) -> Option<&str> {
        match self {
            Self::Statement { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// The error with any statement wrapper removed.
    pub fn root(&self) -> &OrmError {
        match self {
            Self::Statement { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound(_))
    }

    /// Check if this error means no usable connection
    pub fn is_no_connection(&self) -> bool {
        matches!(self.root(), Self::NoConnection)
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self.root(), Self::UniqueViolation(_))
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        if err.is_closed() {
            return Self::NoConnection;
        }
        Self::Query(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_wraps_once() {
        let err = OrmError::statement("SELECT 1;", OrmError::NoConnection);
        let err = OrmError::statement("SELECT 2;", err);
        assert_eq!(err.statement_sql(), Some("SELECT 1;"));
        assert!(err.is_no_connection());
    }

    #[test]
    fn statement_display_includes_query() {
        let err = OrmError::statement("SELECT t.* FROM t;", OrmError::not_found("No results"));
        assert_eq!(err.to_string(), "Not found: No results\nQUERY: SELECT t.* FROM t;");
        assert!(err.is_not_found());
    }
}
