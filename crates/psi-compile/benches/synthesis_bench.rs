//! Benchmarks for predicate synthesis and full lowering
//!
//! Run with: cargo bench -p psi-compile

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use psi_compile::synthesis::{SynthesisContext, phase_oracle, reflect_mean};
use psi_compile::{AncillaPool, CompilerConfig, ControlSet, Topology, compile};
use psi_ir::{Circuit, Span};
use std::f64::consts::PI;

/// Benchmark the phase oracle by literal count
fn bench_phase_oracle(c: &mut Criterion) {
    let mut group = c.benchmark_group("phase_oracle");

    for literals in &[1usize, 2, 3, 6, 10] {
        group.bench_with_input(
            BenchmarkId::new("literals", literals),
            literals,
            |b, &k| {
                b.iter(|| {
                    let mut circuit = Circuit::new("bench");
                    let q = circuit.add_qreg("q", k as u32).unwrap();
                    let mut pool = AncillaPool::new(k);
                    let ctx = SynthesisContext::new(Span::default());
                    phase_oracle(
                        &mut circuit,
                        &mut pool,
                        &ctx,
                        &ControlSet::all_ones(&q),
                        black_box(PI),
                        q[0],
                    )
                    .unwrap();
                    circuit
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the diffusion operator by register width
fn bench_reflect_mean(c: &mut Criterion) {
    let mut group = c.benchmark_group("reflect_mean");

    for width in &[2u32, 4, 8, 16] {
        group.bench_with_input(BenchmarkId::new("wires", width), width, |b, &n| {
            b.iter(|| {
                let mut circuit = Circuit::new("bench");
                let q = circuit.add_qreg("q", n).unwrap();
                let mut pool = AncillaPool::new(n as usize);
                reflect_mean(&mut circuit, &mut pool, &SynthesisContext::default(), &q).unwrap();
                circuit
            });
        });
    }

    group.finish();
}

/// Benchmark end-to-end compilation of a Grover search
fn bench_compile_grover(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_grover");

    for width in &[3usize, 6, 10] {
        let predicate: Vec<String> = (0..*width).map(|i| format!("q[{i}] == {}", i % 2)).collect();
        let source = format!(
            "let q = Register({width});\nq.Superpose(targets: ALL);\nrepeat(4) {{\n  q.Phase(angle: PI, where: {});\n  q.Reflect(axis: MEAN);\n}}\n",
            predicate.join(" && ")
        );

        group.bench_with_input(BenchmarkId::new("full", width), &source, |b, source| {
            let config = CompilerConfig::new().with_ancilla_capacity(*width);
            b.iter(|| compile(black_box(source), &config).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("linear", width), &source, |b, source| {
            let config = CompilerConfig::new()
                .with_topology(Topology::Linear)
                .with_ancilla_capacity(*width);
            b.iter(|| compile(black_box(source), &config).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_phase_oracle,
    bench_reflect_mean,
    bench_compile_grover
);
criterion_main!(benches);
