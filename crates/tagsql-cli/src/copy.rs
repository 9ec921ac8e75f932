use crate::cli::CopyArgs;
use crate::config::{CopyConfig, ProjectConfig};
use anyhow::Context;
use tagsql::{Connection, ConnectionRegistry, OrmResult, Query, Record, from_record, to_record};

#[derive(Debug, Default, Clone, PartialEq, Record)]
pub struct AdsTag {
    #[builder("id")]
    pub id: i64,
    #[builder("ad_id")]
    pub ad_id: i64,
    #[builder("content_tag")]
    pub content_tag: String,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
pub struct AdsTagCopy {
    #[builder("id", omit)]
    pub id: i64,
    #[builder("ad_id")]
    pub ad_id: i64,
    #[builder("content_tag")]
    pub content_tag: String,
}

impl From<&AdsTag> for AdsTagCopy {
    fn from(tag: &AdsTag) -> Self {
        Self {
            id: 0,
            ad_id: tag.ad_id,
            content_tag: tag.content_tag.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyReport {
    pub read: usize,
    pub copied: usize,
    pub failed: usize,
}

pub async fn run(args: CopyArgs) -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let project = ProjectConfig::load(args.config)?;
    let Some(plan) = project.file.copy.clone() else {
        anyhow::bail!(
            "config file {} has no [copy] section",
            project.config_path.display()
        );
    };

    let registry = ConnectionRegistry::new();
    for db in &project.file.databases {
        registry
            .connect(db.name.clone(), &db.url)
            .await
            .with_context(|| format!("failed to open database `{}`", db.name))?;
    }

    let outcome = copy_rows(&registry, &plan, args.dry_run).await;
    registry.close_all();
    let report = outcome.context("copy failed")?;

    if args.dry_run {
        println!(
            "dry run: {} row(s) read from {}.{}, nothing written",
            report.read, plan.source, plan.source_table
        );
    } else {
        println!(
            "copied {} of {} row(s) from {}.{} to {}.{} ({} failed)",
            report.copied,
            report.read,
            plan.source,
            plan.source_table,
            plan.target,
            plan.target_table,
            report.failed
        );
    }
    Ok(())
}

/// Read every source row and insert it into the target table.
///
/// A failed insert is logged and counted; the remaining rows are still copied.
pub async fn copy_rows<C: Connection>(
    registry: &ConnectionRegistry<C>,
    plan: &CopyConfig,
    dry_run: bool,
) -> OrmResult<CopyReport> {
    let mut source = Query::new(&plan.source_table, &plan.primary_key, registry, &plan.source)?;
    source.select(["*"]);
    let rows = source.results().await?;

    let target = Query::new(&plan.target_table, &plan.primary_key, registry, &plan.target)?;
    let mut report = CopyReport {
        read: rows.len(),
        ..Default::default()
    };
    tracing::info!(source = %plan.source, table = %plan.source_table, rows = rows.len(), "read source rows");

    for row in &rows {
        let tag: AdsTag = to_record(row);
        let copy = AdsTagCopy::from(&tag);

        if dry_run {
            let (sql, args) = target.insert_sql(&from_record(&copy));
            let args: Vec<String> = args.iter().map(ToString::to_string).collect();
            println!("{sql} -- [{}]", args.join(", "));
            continue;
        }

        match target.insert_record(&copy).await {
            Ok(id) => {
                tracing::debug!(source_id = tag.id, target_id = id, "copied row");
                report.copied += 1;
            }
            Err(e) => {
                tracing::warn!(source_id = tag.id, error = %e, "failed to copy row");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tagsql::testing::{MockConnection, Recorded};
    use tagsql::{Cell, Cursor, Dialect, ExecSummary, OrmError, Value};

    fn plan() -> CopyConfig {
        CopyConfig {
            source: "bg_dsp4".into(),
            source_table: "ads_tags".into(),
            target: "bg_email".into(),
            target_table: "ads_tag_copy".into(),
            primary_key: "id".into(),
        }
    }

    fn setup() -> (
        ConnectionRegistry<MockConnection>,
        Arc<MockConnection>,
        Arc<MockConnection>,
    ) {
        let source = Arc::new(MockConnection::new(Dialect::MySql));
        source.push_cursor(Cursor::new(
            vec!["id".into(), "ad_id".into(), "content_tag".into()],
            vec![
                vec![Cell::I64(1), Cell::I64(7), Cell::Text("x".into())],
                vec![Cell::I64(2), Cell::I64(8), Cell::Text("y".into())],
            ],
        ));
        let target = Arc::new(MockConnection::new(Dialect::MySql));

        let registry = ConnectionRegistry::new();
        registry.register_arc("bg_dsp4", Arc::clone(&source));
        registry.register_arc("bg_email", Arc::clone(&target));
        (registry, source, target)
    }

    #[tokio::test]
    async fn copies_every_row_without_ids() {
        let (registry, source, target) = setup();

        let report = copy_rows(&registry, &plan(), false).await.unwrap();
        assert_eq!(
            report,
            CopyReport {
                read: 2,
                copied: 2,
                failed: 0
            }
        );
        assert_eq!(source.statements(), vec!["SELECT * FROM ads_tags;"]);
        assert_eq!(
            target.statements(),
            vec![
                "INSERT INTO ads_tag_copy (`ad_id`,`content_tag`) VALUES(?,?);",
                "INSERT INTO ads_tag_copy (`ad_id`,`content_tag`) VALUES(?,?);",
            ]
        );
        assert!(target.log().contains(&Recorded::Exec(
            "INSERT INTO ads_tag_copy (`ad_id`,`content_tag`) VALUES(?,?);".into(),
            vec![Value::Int(8), Value::Text("y".into())]
        )));
    }

    #[tokio::test]
    async fn failed_rows_are_counted_and_skipped() {
        let (registry, _, target) = setup();
        target.push_exec(Err(OrmError::UniqueViolation("dup".into())));

        let report = copy_rows(&registry, &plan(), false).await.unwrap();
        assert_eq!(report.copied, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(
            target.log().iter().filter(|c| **c == Recorded::Rollback).count(),
            1
        );
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let (registry, _, target) = setup();

        let report = copy_rows(&registry, &plan(), true).await.unwrap();
        assert_eq!(report.read, 2);
        assert_eq!(report.copied, 0);
        assert!(target.log().is_empty());
    }

    #[tokio::test]
    async fn missing_database_is_a_configuration_error() {
        let (registry, _, _) = setup();
        registry.close("bg_email");

        let err = copy_rows(&registry, &plan(), false).await.unwrap_err();
        assert!(matches!(err, OrmError::Configuration(_)));
    }
}
