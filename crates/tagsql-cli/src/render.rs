use crate::cli::RenderArgs;
use std::sync::Arc;
use tagsql::{Connection, Cursor, Dialect, ExecSummary, OrmError, OrmResult, Query, Value};

/// A handle that only knows its dialect; every statement fails.
struct Offline(Dialect);

impl Connection for Offline {
    fn dialect(&self) -> Dialect {
        self.0
    }

    fn is_closed(&self) -> bool {
        true
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> OrmResult<Cursor> {
        Err(OrmError::NoConnection)
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> OrmResult<ExecSummary> {
        Err(OrmError::NoConnection)
    }
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    println!("{}", render(&args));
    Ok(())
}

fn render(args: &RenderArgs) -> String {
    let mut q = Query::with_handle(
        args.table.as_str(),
        args.primary_key.as_str(),
        Arc::new(Offline(args.dialect)),
    );
    q.select(&args.select);
    for fragment in &args.wheres {
        q.where_(fragment);
    }
    if let Some(order) = &args.order {
        q.order(order);
    }
    if let Some(n) = args.limit {
        q.limit(n);
    }
    if let Some(n) = args.offset {
        q.offset(n);
    }
    q.render().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dialect: Dialect) -> RenderArgs {
        RenderArgs {
            table: "ads_tags".into(),
            primary_key: "id".into(),
            select: vec!["ad_id".into(), "content_tag".into()],
            wheres: vec!["ad_id > ?".into(), "content_tag = ?".into()],
            order: Some("ad_id DESC".into()),
            limit: Some(10),
            offset: None,
            dialect,
        }
    }

    #[test]
    fn renders_mysql_placeholders() {
        assert_eq!(
            render(&args(Dialect::MySql)),
            "SELECT ad_id,content_tag FROM ads_tags WHERE (ad_id > ?) AND (content_tag = ?) \
             ORDER BY ad_id DESC LIMIT 10;"
        );
    }

    #[test]
    fn renders_postgres_placeholders() {
        assert_eq!(
            render(&args(Dialect::Postgres)),
            "SELECT ad_id,content_tag FROM ads_tags WHERE (ad_id > $1) AND (content_tag = $2) \
             ORDER BY ad_id DESC LIMIT 10;"
        );
    }

    #[test]
    fn bare_table_renders_star() {
        let args = RenderArgs {
            select: Vec::new(),
            wheres: Vec::new(),
            order: None,
            limit: None,
            ..args(Dialect::MySql)
        };
        assert_eq!(render(&args), "SELECT ads_tags.* FROM ads_tags;");
    }
}
