//! 条件评估器性能基准测试
//!
//! 针对 ConditionEvaluator 的各种比较进行细粒度的性能测试。

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rule_engine::{ComparisonOperator, ConditionEvaluator, is_truthy};
use serde_json::{Value, json};
use std::hint::black_box;

const ALL_OPERATORS: [ComparisonOperator; 6] = [
    ComparisonOperator::Equal,
    ComparisonOperator::NotEqual,
    ComparisonOperator::Greater,
    ComparisonOperator::GreaterOrEqual,
    ComparisonOperator::Less,
    ComparisonOperator::LessOrEqual,
];

fn bench_with_values(c: &mut Criterion, name: &str, left: Value, right: Value) {
    let mut group = c.benchmark_group(name);

    for op in ALL_OPERATORS {
        group.bench_with_input(BenchmarkId::from_parameter(op), &op, |b, op| {
            b.iter(|| {
                ConditionEvaluator::evaluate(
                    black_box(Some(&left)),
                    black_box(*op),
                    black_box(Some(&right)),
                )
            })
        });
    }

    group.finish();
}

/// 数值比较基准
fn bench_numeric_operations(c: &mut Criterion) {
    bench_with_values(c, "numeric_operations", json!(1000), json!(500.5));
}

/// 字符串按码元字典序比较基准
fn bench_string_operations(c: &mut Criterion) {
    bench_with_values(
        c,
        "string_operations",
        json!("hello world"),
        json!("hello there"),
    );
}

/// 混合类型（需要数值转换）比较基准
fn bench_coercion_operations(c: &mut Criterion) {
    bench_with_values(c, "coercion_operations", json!("  0x1F "), json!(true));
}

/// 无值比较基准
fn bench_missing_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("missing_value");
    let null = Value::Null;

    group.bench_function("eq_null", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(None),
                black_box(ComparisonOperator::Equal),
                black_box(Some(&null)),
            )
        })
    });

    group.bench_function("gt_null", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(None),
                black_box(ComparisonOperator::Greater),
                black_box(Some(&null)),
            )
        })
    });

    group.finish();
}

fn bench_truthiness(c: &mut Criterion) {
    let values = [json!(0), json!(""), json!("x"), json!(null), json!([]), json!(1.5)];

    c.bench_function("truthiness", |b| {
        b.iter(|| {
            values
                .iter()
                .filter(|v| is_truthy(black_box(Some(*v))))
                .count()
        })
    });
}

criterion_group!(
    benches,
    bench_numeric_operations,
    bench_string_operations,
    bench_coercion_operations,
    bench_missing_value,
    bench_truthiness,
);

criterion_main!(benches);
