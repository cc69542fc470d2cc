//! Benchmark for the delete-compaction sweep.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use pico_sql::{parse, FieldType, Schema, Table};

fn populated_table(rows: usize) -> Table {
    let schema = Schema::new(vec![
        ("id".into(), FieldType::Int),
        ("name".into(), FieldType::Text),
    ])
    .unwrap();
    let table = Table::new("bench", schema);

    let mut rng = StdRng::seed_from_u64(7);
    for chunk in (0..rows).collect::<Vec<_>>().chunks(500) {
        let values: Vec<String> = chunk
            .iter()
            .map(|i| format!("({}, 'row{}')", i, rng.gen_range(0..rows)))
            .collect();
        let sql = format!("INSERT INTO bench (id, name) VALUES {}", values.join(", "));
        table.insert(&parse(&sql).unwrap()).unwrap();
    }
    table
}

fn bench_delete_half(c: &mut Criterion) {
    let query = parse("DELETE FROM bench WHERE id < 5000").unwrap();

    c.bench_function("delete_half_10k", |b| {
        b.iter_batched(
            || populated_table(10_000),
            |table| {
                black_box(table.delete(&query).unwrap());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_select_scan(c: &mut Criterion) {
    let table = populated_table(10_000);
    let query = parse("SELECT id FROM bench WHERE id >= 9000").unwrap();

    c.bench_function("select_scan_10k", |b| {
        b.iter(|| black_box(table.select(&query).unwrap()))
    });
}

criterion_group!(benches, bench_delete_half, bench_select_scan);
criterion_main!(benches);
