use std::sync::Arc;
use tagsql::testing::{MockConnection, Recorded};
use tagsql::{
    Dialect, ExecSummary, FieldBinding, FieldKind, Query, Record, RowMap, Value, from_record,
    to_record, to_record_strict,
};

#[derive(Debug, Default, PartialEq, Record)]
struct AdsTag {
    #[builder("id")]
    id: i64,
    #[builder("ad_id")]
    ad_id: i32,
    #[builder("content_tag")]
    content_tag: String,
}

#[derive(Debug, Default, PartialEq, Record)]
struct AdsTagCopy {
    #[builder("id", omit)]
    id: i64,
    #[builder("ad_id")]
    ad_id: i32,
    #[builder("content_tag")]
    content_tag: String,
    note: String,
}

#[derive(Debug, Default, PartialEq, Record)]
struct Scored {
    #[builder("score")]
    score: f64,
    #[builder("label")]
    label: Option<String>,
    #[builder("flag")]
    flag: bool,
}

fn row(pairs: &[(&str, Value)]) -> RowMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn bindings_follow_attributes() {
    assert_eq!(
        AdsTagCopy::BINDINGS,
        &[
            FieldBinding::new("id", "id", FieldKind::Int).omit(),
            FieldBinding::new("ad_id", "ad_id", FieldKind::Int),
            FieldBinding::new("content_tag", "content_tag", FieldKind::Text),
        ]
    );
    assert_eq!(Scored::BINDINGS[0].kind, FieldKind::Float);
    assert_eq!(Scored::BINDINGS[1].kind, FieldKind::Other);
    assert_eq!(Scored::BINDINGS[2].kind, FieldKind::Other);
}

#[test]
fn untagged_fields_are_never_bound() {
    let mut copy = AdsTagCopy::default();
    assert!(!copy.assign("note", Value::Text("x".into())));
    assert!(copy.value_of("note").is_none());
}

#[test]
fn to_record_fills_tagged_fields() {
    let tag: AdsTag = to_record(&row(&[
        ("id", Value::Int(1)),
        ("ad_id", Value::Text("7".into())),
        ("content_tag", Value::Text("x".into())),
        ("extra", Value::Int(99)),
    ]));
    assert_eq!(
        tag,
        AdsTag {
            id: 1,
            ad_id: 7,
            content_tag: "x".into(),
        }
    );
}

#[test]
fn unparsable_values_leave_zero_unless_strict() {
    let row = row(&[("ad_id", Value::Text("seven".into()))]);
    let tag: AdsTag = to_record(&row);
    assert_eq!(tag.ad_id, 0);

    let err = to_record_strict::<AdsTag>(&row).unwrap_err();
    assert!(err.to_string().contains("ad_id"));
}

#[test]
fn null_and_option_fields() {
    let scored: Scored = to_record(&row(&[
        ("score", Value::Null),
        ("label", Value::Null),
        ("flag", Value::Bool(true)),
    ]));
    assert_eq!(
        scored,
        Scored {
            score: 0.0,
            label: None,
            flag: true,
        }
    );

    let scored: Scored = to_record(&row(&[("label", Value::Text("hot".into()))]));
    assert_eq!(scored.label.as_deref(), Some("hot"));
}

#[test]
fn from_record_skips_omitted_fields() {
    let copy = AdsTagCopy {
        id: 5,
        ad_id: 7,
        content_tag: "x".into(),
        note: "ignored".into(),
    };
    let params = from_record(&copy);
    assert_eq!(params.len(), 2);
    assert_eq!(params["ad_id"], Value::Int(7));
    assert_eq!(params["content_tag"], Value::Text("x".into()));
}

#[tokio::test]
async fn copy_one_row_between_tables() {
    let source = Arc::new(MockConnection::new(Dialect::MySql));
    source.push_cursor(tagsql::Cursor::new(
        vec!["id".into(), "ad_id".into(), "content_tag".into()],
        vec![vec![
            tagsql::Cell::I64(3),
            tagsql::Cell::I32(7),
            tagsql::Cell::Text("x".into()),
        ]],
    ));
    let target = Arc::new(MockConnection::new(Dialect::MySql));
    target.push_exec(Ok(ExecSummary::new(1).with_last_insert_id(40)));

    let tags: Vec<AdsTag> = Query::with_handle("ads_tags", "id", Arc::clone(&source))
        .fetch_all()
        .await
        .unwrap();
    assert_eq!(tags.len(), 1);

    let copy = AdsTagCopy {
        ad_id: tags[0].ad_id,
        content_tag: tags[0].content_tag.clone(),
        ..Default::default()
    };
    let id = Query::with_handle("ads_tag_copy", "id", Arc::clone(&target))
        .insert_record(&copy)
        .await
        .unwrap();

    assert_eq!(id, 40);
    assert_eq!(source.statements(), vec!["SELECT ads_tags.* FROM ads_tags;"]);
    assert_eq!(
        target.log()[1],
        Recorded::Exec(
            "INSERT INTO ads_tag_copy (`ad_id`,`content_tag`) VALUES(?,?);".into(),
            vec![Value::Int(7), Value::Text("x".into())]
        )
    );
}
