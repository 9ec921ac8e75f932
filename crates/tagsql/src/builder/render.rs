use super::clause::{Conj, Predicate, collapse_whitespace};
use crate::dialect::{Dialect, substitute_placeholders};
use crate::value::{ParamMap, Value};

/// Accumulated clause fragments of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ClauseState {
    pub(crate) select: Vec<String>,
    pub(crate) from: Option<String>,
    /// Raw base clause replacing the generated SELECT.
    pub(crate) base: Option<String>,
    pub(crate) joins: Vec<String>,
    pub(crate) wheres: Vec<Predicate>,
    pub(crate) group: Option<String>,
    pub(crate) having: Option<String>,
    pub(crate) order: Option<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    /// Set by an empty IN list: the statement must match no rows.
    pub(crate) match_none: bool,
}

/// A rendered statement and the number of placeholders it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rendered {
    pub(crate) sql: String,
    pub(crate) placeholders: usize,
}

impl ClauseState {
    fn base_clause(&self, table: &str) -> String {
        if let Some(base) = &self.base {
            return base.clone();
        }
        if self.select.is_empty() {
            format!("SELECT {table}.* FROM {table}")
        } else {
            format!("SELECT {} FROM {table}", self.select.join(","))
        }
    }

    fn where_clause(&self) -> Option<String> {
        if self.wheres.is_empty() {
            return None;
        }
        let mut out = String::from("WHERE ");
        for (i, predicate) in self.wheres.iter().enumerate() {
            if i > 0 {
                out.push_str(match predicate.conj {
                    Conj::And => " AND ",
                    Conj::Or => " OR ",
                });
            }
            out.push('(');
            out.push_str(&predicate.sql);
            out.push(')');
        }
        Some(out)
    }

    /// The statement before placeholder substitution, without terminator.
    pub(crate) fn template(&self, table: &str) -> String {
        let limit = if self.match_none { Some(0) } else { self.limit };

        let parts = std::iter::once(self.base_clause(table))
            .chain(self.joins.iter().cloned())
            .chain(self.where_clause())
            .chain(self.group.as_ref().map(|g| format!("GROUP BY {g}")))
            .chain(self.having.as_ref().map(|h| format!("HAVING {h}")))
            .chain(self.order.as_ref().map(|o| format!("ORDER BY {o}")))
            .chain(limit.map(|n| format!("LIMIT {n}")))
            .chain(self.offset.map(|n| format!("OFFSET {n}")))
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>();

        collapse_whitespace(&parts.join(" "))
    }

    pub(crate) fn render(&self, table: &str, dialect: Dialect) -> Rendered {
        finish(&self.template(table), dialect)
    }
}

/// Trim trailing separators, substitute placeholders and terminate.
pub(crate) fn finish(template: &str, dialect: Dialect) -> Rendered {
    let trimmed = template.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    let (mut sql, placeholders) = substitute_placeholders(trimmed, dialect);
    sql.push(';');
    Rendered { sql, placeholders }
}

/// `INSERT INTO table (cols) VALUES(?,...)` for the given parameters.
pub(crate) fn insert_template(
    table: &str,
    primary_key: &str,
    params: &ParamMap,
    dialect: Dialect,
) -> (String, Vec<Value>) {
    let cols: Vec<String> = params.keys().map(|k| dialect.quote_field(k)).collect();
    let marks = vec!["?"; params.len()].join(",");
    let mut sql = format!("INSERT INTO {} ({}) VALUES({})", table, cols.join(","), marks);
    if dialect.returns_generated_id() && !primary_key.is_empty() {
        sql.push_str(" RETURNING ");
        sql.push_str(&dialect.quote_field(primary_key));
    }
    (sql, params.values().cloned().collect())
}

/// `UPDATE table SET col=?,...` for the given parameters.
pub(crate) fn update_template(table: &str, params: &ParamMap, dialect: Dialect) -> (String, Vec<Value>) {
    let sets: Vec<String> = params
        .keys()
        .map(|k| format!("{}=?", dialect.quote_field(k)))
        .collect();
    (
        format!("UPDATE {} SET {}", table, sets.join(",")),
        params.values().cloned().collect(),
    )
}
