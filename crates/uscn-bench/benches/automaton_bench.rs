//! Minimized DFA automaton recognition/parsing benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uscn_core::Automaton;

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

fn bench_automaton_run(c: &mut Criterion) {
    let automaton = Automaton::new();
    let mut group = c.benchmark_group("automaton_run");

    for &field_count in &[1usize, 8, 32] {
        let input = message_with_fields(field_count);
        group.bench_with_input(
            BenchmarkId::new("fields", field_count),
            &input,
            |b, input| {
                b.iter(|| black_box(automaton.run(black_box(input))));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_automaton_run);
criterion_main!(benches);
