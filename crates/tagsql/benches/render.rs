use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use tagsql::testing::MockConnection;
use tagsql::{Dialect, Query};

/// A builder with `n` bound predicates:
/// SELECT col0, ... FROM t WHERE (col0 = ?) AND (col1 = ?) ... ORDER BY col0 LIMIT 10
fn build_query(n: usize, dialect: Dialect) -> Query<MockConnection> {
    let mut q = Query::with_handle("t", "id", Arc::new(MockConnection::new(dialect)));
    q.select((0..n).map(|i| format!("col{i}")));
    for i in 0..n {
        q.where_bind(format!("col{i} = ?"), [i as i64]);
    }
    q.order("col0").limit(10);
    q
}

fn bench_render_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/cold");

    for n in [1, 5, 10, 50] {
        for dialect in [Dialect::MySql, Dialect::Postgres] {
            let id = BenchmarkId::new(format!("{dialect:?}"), n);
            group.bench_with_input(id, &n, |b, &n| {
                b.iter(|| {
                    let q = build_query(n, dialect);
                    black_box(q.render().len());
                });
            });
        }
    }

    group.finish();
}

fn bench_render_cached(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/cached");

    for n in [1, 10, 50] {
        let q = build_query(n, Dialect::Postgres);
        group.bench_with_input(BenchmarkId::from_parameter(n), &q, |b, q| {
            b.iter(|| black_box(q.render().len()));
        });
    }

    group.finish();
}

fn bench_insert_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/insert_sql");

    for n in [1, 10, 50] {
        let q = build_query(0, Dialect::MySql);
        let params: tagsql::ParamMap = (0..n)
            .map(|i| (format!("col{i}"), tagsql::Value::Int(i as i64)))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &params, |b, params| {
            b.iter(|| black_box(q.insert_sql(params)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_render_cold,
    bench_render_cached,
    bench_insert_sql
);
criterion_main!(benches);
