use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlweave::prelude::*;

/// SELECT col0, col1, ... FROM t WHERE col0 = %d AND col1 = %d ...
fn build_select(n: usize) -> QueryBuilder {
    let mut qb = QueryBuilder::new(CompilerConfig::new().with_table_prefix("wp_")).table("t");
    for i in 0..n {
        qb = qb.select([format!("t.col{i}")]).where_(format!("t.col{i}"), "=", i as i64);
    }
    qb
}

fn bench_compile_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/select");

    for n in [1, 5, 10, 50, 100] {
        let qb = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &qb, |b, qb| {
            b.iter(|| black_box(qb.select_query()));
        });
    }

    group.finish();
}

fn bench_nested_criteria(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/nested_criteria");

    for depth in [1, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut qb = QueryBuilder::default().table("t");
                for i in 0..depth {
                    qb = qb.or_where_nested(|n| n.where_("a", "=", i).or_where_in("b", [1, 2, 3]));
                }
                black_box(qb.select_query())
            });
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/in_list");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let qb = QueryBuilder::default()
                    .table("t")
                    .where_in("id", values.iter().copied());
                black_box(qb.select_query())
            });
        });
    }

    group.finish();
}

fn bench_batch_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/batch_insert");

    for n in [1, 10, 100] {
        let rows: Vec<Row> = (0..n)
            .map(|i| row([("id", Value::from(i)), ("name", Value::from(format!("user{i}")))]))
            .collect();
        let qb = QueryBuilder::default().table("users");
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            b.iter(|| black_box(qb.batch_insert_queries(rows.clone(), InsertMode::Insert)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compile_select,
    bench_nested_criteria,
    bench_in_list,
    bench_batch_insert
);
criterion_main!(benches);
