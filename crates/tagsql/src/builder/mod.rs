//! Chainable statement builder.
//!
//! A [`Query`] is bound to one table, its primary key and a connection
//! handle. Clause setters mutate it in place and return `&mut Self`; the
//! rendered statement is cached until the next setter runs.
//!
//! # Example
//!
//! ```ignore
//! use tagsql::{ConnectionRegistry, Query};
//!
//! let registry = ConnectionRegistry::new();
//! registry.connect("bg_dsp4", "postgres://localhost/bg_dsp4").await?;
//!
//! let mut q = Query::new("ads_tags", "id", &registry, "bg_dsp4")?;
//! q.select(["ad_id", "content_tag"])
//!     .where_cmp("ad_id", ">", 100)
//!     .order("ad_id DESC")
//!     .limit(10);
//! let rows = q.results().await?;
//! ```
//!
//! # Literal values
//!
//! Fragments passed to `where_`, `order`, joins and friends are concatenated
//! verbatim, and the value given to `where_cmp` is inlined as literal text.
//! Never route untrusted input through them; use `where_bind` instead, which
//! sends values as bound arguments.

mod clause;
mod execute;
mod render;


pub use clause::JoinKind;

use crate::client::Connection;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::registry::ConnectionRegistry;
use crate::value::Value;
use clause::{Conj, Predicate, collapse_whitespace, format_literal, in_predicate};
use render::{ClauseState, Rendered};
use std::sync::{Arc, OnceLock};

/// A dynamic statement bound to a table and a connection handle.
///
/// One `Query` describes one logical statement. Setters take `&mut self`,
/// so a builder cannot be mutated from two places at once.
#[must_use]
pub struct Query<C> {
    conn: Arc<C>,
    dialect: Dialect,
    table_name: String,
    primary_key: String,
    state: ClauseState,
    /// Values bound by `update_all`, ahead of the WHERE arguments.
    set_args: Vec<Value>,
    /// Values bound by `where_bind`, in call order.
    args: Vec<Value>,
    rendered: OnceLock<Rendered>,
}

impl<C> std::fmt::Debug for Query<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("table", &self.table_name)
            .field("primary_key", &self.primary_key)
            .field("dialect", &self.dialect)
            .field("state", &self.state)
            .field("args", &self.args())
            .finish()
    }
}

impl<C: Connection> Query<C> {
    /// Create a builder for `table` using the handle registered as `database`.
    ///
    /// Fails with [`OrmError::Configuration`] when the registry has no live
    /// handle under that name.
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        registry: &ConnectionRegistry<C>,
        database: &str,
    ) -> OrmResult<Self> {
        let conn = registry.resolve(database).ok_or_else(|| {
            OrmError::Configuration(format!("no live connection for database `{database}`"))
        })?;
        Ok(Self::with_handle(table, primary_key, conn))
    }

    /// Create a builder over an already resolved handle.
    pub fn with_handle(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        conn: Arc<C>,
    ) -> Self {
        let dialect = conn.dialect();
        Self {
            conn,
            dialect,
            table_name: table.into(),
            primary_key: primary_key.into(),
            state: ClauseState::default(),
            set_args: Vec::new(),
            args: Vec::new(),
            rendered: OnceLock::new(),
        }
    }
}

impl<C> Query<C> {
    /// Table used in rendered statements: the `from` override if set,
    /// otherwise the bound table.
    pub fn table(&self) -> &str {
        self.state.from.as_deref().unwrap_or(&self.table_name)
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Bound arguments in placeholder order.
    pub fn args(&self) -> Vec<Value> {
        self.set_args.iter().chain(&self.args).cloned().collect()
    }

    /// Render the statement, reusing the cached text until the next mutation.
    pub fn render(&self) -> &str {
        &self.rendered().sql
    }

    pub(crate) fn rendered(&self) -> &Rendered {
        self.rendered
            .get_or_init(|| self.state.render(self.table(), self.dialect))
    }

    fn touch(&mut self) -> &mut Self {
        self.rendered.take();
        self
    }

    // ── SELECT / FROM ───────────────────────────────────────────────────────

    /// Replace the select list. An empty list renders as `table.*`.
    pub fn select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.select.clear();
        self.add_select(fields)
    }

    /// Append to the select list.
    pub fn add_select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.select.extend(
            fields
                .into_iter()
                .map(|f| collapse_whitespace(f.as_ref()))
                .filter(|f| !f.is_empty()),
        );
        self.touch()
    }

    /// Clear the select list.
    pub fn reset_select(&mut self) -> &mut Self {
        self.state.select.clear();
        self.touch()
    }

    /// Override the table name used in rendered statements.
    pub fn from(&mut self, table: impl Into<String>) -> &mut Self {
        let table = table.into();
        self.state.from = (!table.is_empty()).then_some(table);
        self.touch()
    }

    /// Replace the generated SELECT base with a raw clause such as
    /// `UPDATE t SET ...` or `DELETE FROM t`. An empty string restores SELECT.
    pub fn update_sql(&mut self, template: impl Into<String>) -> &mut Self {
        let template = template.into();
        self.state.base = (!template.trim().is_empty()).then_some(template);
        self.touch()
    }

    // ── WHERE ───────────────────────────────────────────────────────────────

    fn push_predicate(&mut self, conj: Conj, sql: String) -> &mut Self {
        self.state.wheres.push(Predicate { conj, sql });
        self.touch()
    }

    /// Add a raw predicate, ANDed with earlier ones.
    pub fn where_(&mut self, fragment: impl AsRef<str>) -> &mut Self {
        self.push_predicate(Conj::And, fragment.as_ref().to_string())
    }

    /// Alias of [`Query::where_`].
    pub fn and_where(&mut self, fragment: impl AsRef<str>) -> &mut Self {
        self.where_(fragment)
    }

    /// Add a raw predicate, ORed with earlier ones.
    pub fn or_where(&mut self, fragment: impl AsRef<str>) -> &mut Self {
        self.push_predicate(Conj::Or, fragment.as_ref().to_string())
    }

    /// Add `column op literal`, with the value inlined as literal text:
    /// `where_cmp("id", "=", 5)` renders `(id=5)`.
    pub fn where_cmp(
        &mut self,
        column: &str,
        op: &str,
        literal: impl Into<Value>,
    ) -> &mut Self {
        let sql = format!("{column}{op}{}", format_literal(&literal.into()));
        self.push_predicate(Conj::And, sql)
    }

    /// Alias of [`Query::where_cmp`].
    pub fn and_where_cmp(
        &mut self,
        column: &str,
        op: &str,
        literal: impl Into<Value>,
    ) -> &mut Self {
        self.where_cmp(column, op, literal)
    }

    /// ORed variant of [`Query::where_cmp`].
    pub fn or_where_cmp(
        &mut self,
        column: &str,
        op: &str,
        literal: impl Into<Value>,
    ) -> &mut Self {
        let sql = format!("{column}{op}{}", format_literal(&literal.into()));
        self.push_predicate(Conj::Or, sql)
    }

    /// Add a predicate containing `?` placeholders and bind `args` to them,
    /// in order.
    pub fn where_bind<I, V>(&mut self, fragment: impl AsRef<str>, args: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self.push_predicate(Conj::And, fragment.as_ref().to_string())
    }

    /// ORed variant of [`Query::where_bind`].
    pub fn or_where_bind<I, V>(&mut self, fragment: impl AsRef<str>, args: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self.push_predicate(Conj::Or, fragment.as_ref().to_string())
    }

    /// Add `column IN (...)` from a comma-separated list.
    ///
    /// An empty list makes the statement match no rows.
    pub fn where_in(&mut self, column: &str, values: &str) -> &mut Self {
        if values.is_empty() {
            self.state.match_none = true;
            return self.touch();
        }
        self.push_predicate(Conj::And, in_predicate(column, values))
    }

    /// Extend the last predicate group with `OR column IN (...)`.
    ///
    /// An empty list makes the statement match no rows.
    pub fn or_where_in(&mut self, column: &str, values: &str) -> &mut Self {
        if values.is_empty() {
            self.state.match_none = true;
            return self.touch();
        }
        let sql = in_predicate(column, values);
        if let Some(last) = self.state.wheres.last_mut() {
            last.sql = format!("{} OR {}", last.sql, sql);
            return self.touch();
        }
        self.push_predicate(Conj::And, sql)
    }

    // ── JOIN ────────────────────────────────────────────────────────────────

    /// Append `KIND JOIN table ON ...`; the ON fragments are concatenated
    /// as given.
    pub fn join<I, S>(&mut self, kind: JoinKind, table: &str, on: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let on: String = on.into_iter().map(|s| s.as_ref().to_string()).collect();
        self.state
            .joins
            .push(format!("{} {} ON {}", kind.keyword(), table, on));
        self.touch()
    }

    pub fn inner_join<I, S>(&mut self, table: &str, on: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.join(JoinKind::Inner, table, on)
    }

    pub fn left_join<I, S>(&mut self, table: &str, on: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.join(JoinKind::Left, table, on)
    }

    pub fn right_join<I, S>(&mut self, table: &str, on: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.join(JoinKind::Right, table, on)
    }

    pub fn full_join<I, S>(&mut self, table: &str, on: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.join(JoinKind::Full, table, on)
    }

    // ── GROUP / HAVING / ORDER / LIMIT / OFFSET ─────────────────────────────

    /// Set `ORDER BY`; an empty string clears it.
    pub fn order(&mut self, sql: &str) -> &mut Self {
        self.state.order = (!sql.is_empty()).then(|| sql.to_string());
        self.touch()
    }

    /// Set `GROUP BY`; an empty string clears it.
    pub fn group(&mut self, sql: &str) -> &mut Self {
        self.state.group = (!sql.is_empty()).then(|| sql.to_string());
        self.touch()
    }

    /// Set `HAVING`; an empty string clears it.
    pub fn having(&mut self, sql: &str) -> &mut Self {
        self.state.having = (!sql.is_empty()).then(|| sql.to_string());
        self.touch()
    }

    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.state.limit = Some(n);
        self.touch()
    }

    pub fn offset(&mut self, n: u64) -> &mut Self {
        self.state.offset = Some(n);
        self.touch()
    }
}
