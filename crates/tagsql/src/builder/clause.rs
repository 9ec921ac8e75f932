//! Clause fragments and the text helpers used to build them.

use crate::value::{Cell, Value};

/// How a predicate joins the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Conj {
    And,
    Or,
}

/// One parenthesized WHERE group.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Predicate {
    pub(crate) conj: Conj,
    pub(crate) sql: String,
}

/// Join kinds accepted by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

/// Collapse whitespace runs to single spaces and trim, leaving quoted
/// literals untouched.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for ch in s.chars() {
        if quote.is_none() && ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        match quote {
            Some(open) if ch == open => quote = None,
            None if matches!(ch, '\'' | '"' | '`') => quote = Some(ch),
            _ => {}
        }
        out.push(ch);
    }
    out
}

/// Quote a string literal, doubling embedded quotes.
pub(crate) fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Inline a value as SQL literal text.
///
/// Strings and other textual natives are quoted; numbers, booleans and NULL
/// are written bare.
pub(crate) fn format_literal(value: &Value) -> String {
    match value {
        Value::Text(s) => quote_literal(s),
        Value::Native(cell) => match cell {
            Cell::Null
            | Cell::Bool(_)
            | Cell::I16(_)
            | Cell::I32(_)
            | Cell::I64(_)
            | Cell::F32(_)
            | Cell::F64(_) => cell.to_string(),
            other => quote_literal(&other.to_string()),
        },
        other => other.to_string(),
    }
}

/// Render `col IN (...)` from a comma-separated list.
///
/// Tokens that parse as integers are written bare, everything else quoted.
pub(crate) fn in_predicate(column: &str, values: &str) -> String {
    let items: Vec<String> = values
        .split(',')
        .map(|token| match token.parse::<i64>() {
            Ok(n) => n.to_string(),
            Err(_) => quote_literal(token),
        })
        .collect();
    format!("{} IN ({})", column, items.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_keeps_literals() {
        assert_eq!(collapse_whitespace("  a   b\n\tc  "), "a b c");
        assert_eq!(collapse_whitespace("x = 'two  spaces'"), "x = 'two  spaces'");
        assert_eq!(collapse_whitespace("\"a  b\"   = 1"), "\"a  b\" = 1");
    }

    #[test]
    fn literals_by_type() {
        assert_eq!(format_literal(&Value::Int(5)), "5");
        assert_eq!(format_literal(&Value::Float(1.25)), "1.25");
        assert_eq!(format_literal(&Value::Bool(false)), "false");
        assert_eq!(format_literal(&Value::Text("o'neil".into())), "'o''neil'");
        assert_eq!(format_literal(&Value::Null), "NULL");
    }

    #[test]
    fn in_list_classifies_tokens() {
        assert_eq!(in_predicate("col", "1,2,abc"), "col IN (1,2,'abc')");
        assert_eq!(in_predicate("col", "007"), "col IN (7)");
    }
}
