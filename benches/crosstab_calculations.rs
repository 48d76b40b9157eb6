//! Benchmarks for the calculation pipeline.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crosstab_engine::{
    AggregationKind, CrosstabCalculator, CrosstabDefinition, CrosstabTable, DimensionSpec,
    MetricSpec, Record,
};
use serde_json::json;

const PROVINCES: &[&str] = &["Zhejiang", "Jiangsu", "Guangdong", "Sichuan", "Hubei"];
const TYPES: &[&str] = &["Furniture", "Office", "Appliance", "Outdoor"];

fn synthetic_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            json!({
                "province": PROVINCES[i % PROVINCES.len()],
                "city": format!("City{}", i % 23),
                "type": TYPES[i % TYPES.len()],
                "amount": (i % 997) as f64 * 1.5,
                "qty": (i % 13) as f64,
            })
            .as_object()
            .unwrap()
            .clone()
        })
        .collect()
}

fn pivot_definition() -> CrosstabDefinition {
    CrosstabDefinition {
        row_dimensions: vec![DimensionSpec::new("province"), DimensionSpec::new("city")],
        column_dimensions: vec![DimensionSpec::new("type")],
        metrics: vec![
            MetricSpec::new("amount", AggregationKind::Sum),
            MetricSpec::new("qty", AggregationKind::Avg),
            MetricSpec::expression("unit_price", "{amount} / {qty}"),
        ],
        ..Default::default()
    }
}

fn bench_calculate(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate");
    for count in [1_000usize, 10_000, 50_000] {
        let data = synthetic_records(count);
        let def = pivot_definition();
        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |b, data| {
            b.iter(|| {
                let view = CrosstabCalculator::new(&def, black_box(data)).calculate();
                black_box(view)
            })
        });
    }
    group.finish();
}

fn bench_cached_replay(c: &mut Criterion) {
    let data = synthetic_records(10_000);
    let mut table = CrosstabTable::new(pivot_definition());
    table.calculate(&data);

    c.bench_function("cached_replay_10k", |b| {
        b.iter(|| black_box(table.calculate(black_box(&data))))
    });
}

fn bench_visible_rows(c: &mut Criterion) {
    let data = synthetic_records(10_000);
    let mut table = CrosstabTable::new(pivot_definition());
    let view = table.calculate(&data);

    c.bench_function("visible_rows_10k", |b| {
        b.iter(|| black_box(table.visible_rows(black_box(&view))))
    });
}

criterion_group!(
    benches,
    bench_calculate,
    bench_cached_replay,
    bench_visible_rows
);
criterion_main!(benches);
