//! Backend-specific spelling of placeholders and quoted identifiers.

/// The generic positional placeholder used in statement templates.
pub const GENERIC_PLACEHOLDER: char = '?';

/// SQL dialect of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `?` placeholders, backtick-quoted identifiers, `LAST_INSERT_ID` style ids.
    #[default]
    MySql,
    /// `$1, $2, ...` placeholders, double-quoted identifiers, `RETURNING` ids.
    Postgres,
}

impl Dialect {
    /// Backend token for the `index`-th (1-based) bound argument.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::MySql => GENERIC_PLACEHOLDER.to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }

    /// Quote a table or column name.
    pub fn quote_field(self, name: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", name.replace('`', "``")),
            Dialect::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Whether generated ids come back through a `RETURNING` clause rather
    /// than the write result.
    pub fn returns_generated_id(self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

/// Replace each generic placeholder in `sql`, left to right, with the
/// backend token for its position.
///
/// Placeholders inside single-quoted literals and inside `"..."` or
/// `` `...` `` quoted identifiers are left alone. Returns the rewritten
/// statement and the number of placeholders found.
pub fn substitute_placeholders(sql: &str, dialect: Dialect) -> (String, usize) {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut count = 0;

    for ch in sql.chars() {
        match (quote, ch) {
            // A doubled quote closes and reopens, staying inside.
            (Some(open), _) if ch == open => quote = None,
            (None, '\'' | '"' | '`') => quote = Some(ch),
            (None, GENERIC_PLACEHOLDER) => {
                count += 1;
                out.push_str(&dialect.placeholder(count));
                continue;
            }
            _ => {}
        }
        out.push(ch);
    }

    (out, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_keeps_question_marks() {
        let (sql, n) = substitute_placeholders("a=? AND b=?", Dialect::MySql);
        assert_eq!(sql, "a=? AND b=?");
        assert_eq!(n, 2);
    }

    #[test]
    fn postgres_numbers_in_order() {
        let (sql, n) = substitute_placeholders("a=? AND b=? OR c=?", Dialect::Postgres);
        assert_eq!(sql, "a=$1 AND b=$2 OR c=$3");
        assert_eq!(n, 3);
    }

    #[test]
    fn literals_are_not_placeholders() {
        let (sql, n) = substitute_placeholders("a='what?' AND b=? AND c='it''s?'", Dialect::Postgres);
        assert_eq!(sql, "a='what?' AND b=$1 AND c='it''s?'");
        assert_eq!(n, 1);
    }

    #[test]
    fn quoted_identifiers_are_not_placeholders() {
        let (sql, n) = substitute_placeholders("\"why?\" = ? AND `who?` = ?", Dialect::Postgres);
        assert_eq!(sql, "\"why?\" = $1 AND `who?` = $2");
        assert_eq!(n, 2);

        let (sql, n) = substitute_placeholders("a = '\"?' AND b = ?", Dialect::Postgres);
        assert_eq!(sql, "a = '\"?' AND b = $1");
        assert_eq!(n, 1);
    }

    #[test]
    fn quoting() {
        assert_eq!(Dialect::MySql.quote_field("ad_id"), "`ad_id`");
        assert_eq!(Dialect::Postgres.quote_field("ad_id"), "\"ad_id\"");
    }
}
