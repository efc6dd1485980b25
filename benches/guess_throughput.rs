use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use csv_valuetypes::accessor::ColumnAccessor;
use csv_valuetypes::data::Value;
use csv_valuetypes::guess::{GuessOptions, guess_value_type};
use csv_valuetypes::importer::{Row, import_columns};
use csv_valuetypes::registry::{EditorRegistry, ValueTypeEditor};
use futures::executor::block_on;

const ROWS: usize = 50_000;

fn generate_rows(rows: usize) -> Vec<Row> {
    (0..rows)
        .map(|i| {
            let status = match i % 3 {
                0 => "shipped",
                1 => "pending",
                _ => "processing",
            };
            vec![
                Value::text(i.to_string()),
                Value::text(format!("{}.{:02}", i % 977, i % 100)),
                Value::text(status),
                Value::text(format!("[{},{},{}]", i % 7, i % 11, i % 13)),
                Value::text(format!("note {i}")),
            ]
        })
        .collect()
}

fn editors() -> Vec<ValueTypeEditor<Row>> {
    block_on(EditorRegistry::with_builtins().create_editors())
}

fn bench_guess(c: &mut Criterion) {
    let rows = generate_rows(ROWS);
    let editors = editors();
    let options = GuessOptions::default();
    let mut group = c.benchmark_group("guess");
    for (index, name) in ["id", "amount", "status", "vector", "note"].into_iter().enumerate() {
        group.bench_function(name, |b| {
            b.iter(|| {
                block_on(guess_value_type(
                    &editors,
                    name,
                    index,
                    &rows,
                    &ColumnAccessor::new(index),
                    &options,
                ))
                .expect("guess")
            })
        });
    }
    group.finish();
}

fn bench_import(c: &mut Criterion) {
    let rows = generate_rows(ROWS);
    let editors = editors();
    let fields = ["id", "amount", "status", "vector", "note"]
        .map(str::to_string)
        .to_vec();
    let options = GuessOptions::default();
    c.bench_function("import_all_columns", |b| {
        b.iter_batched(
            || rows.clone(),
            |mut data| {
                block_on(import_columns(&editors, &fields, &mut data, &options)).expect("import")
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_guess, bench_import);
criterion_main!(benches);
