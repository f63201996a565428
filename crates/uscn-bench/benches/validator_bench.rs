//! End-to-end `Validator::validate` benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uscn_core::buffer::Buffer;
use uscn_core::schema::{FieldDescriptor, FieldType, Schema};
use uscn_membrane::{Validator, ValidatorConfig};

fn schema_with_fields(count: usize) -> Schema {
    let fields = (0..count)
        .map(|i| FieldDescriptor::new(format!("field{i}"), FieldType::String, false, None, None).unwrap())
        .collect();
    Schema::new(fields).unwrap()
}

fn message_with_fields(count: usize) -> Vec<u8> {
    let mut out = String::from("{");
    for i in 0..count {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!("\"field{i}\":\"value{i}\""));
    }
    out.push('}');
    out.into_bytes()
}

fn bench_validate_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_end_to_end");

    for &field_count in &[1usize, 8, 32] {
        let schema = schema_with_fields(field_count);
        let validator = Validator::new(schema, ValidatorConfig::default()).unwrap();
        let input = message_with_fields(field_count);
        group.bench_with_input(
            BenchmarkId::new("fields", field_count),
            &input,
            |b, input| {
                b.iter(|| {
                    let mut buffer = Buffer::from_bytes(black_box(input.clone())).unwrap();
                    black_box(validator.validate(&mut buffer))
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_validate_end_to_end);
criterion_main!(benches);
