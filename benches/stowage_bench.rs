//! Criterion benchmarks for u-stowage model construction.
//!
//! Measures building the full constraint model (grids, rules, scenario,
//! weight ordering, objective) on synthetic yards. Solving is not timed.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use u_stowage::cp::{MilpBackend, SolverBackend};
use u_stowage::stowage::{Scenario, Shipment, StowageConfig, StowageModel};

// ===========================================================================
// Synthetic yard: bottom tier full, one arrival and one departure per phase
// ===========================================================================

fn synthetic(stacks: usize, heights: usize, phases: usize) -> Scenario {
    let mut scenario = Scenario::new(stacks, heights);
    for s in 0..stacks {
        scenario = scenario
            .with_container(format!("I{s}"), s, 0)
            .with_weight(format!("I{s}"), 1 + (s % 3) as u32);
    }
    for p in 0..phases {
        let shipment = Shipment::new(2)
            .arriving([format!("N{p}")])
            .departing([format!("I{}", p % stacks)]);
        scenario = scenario.with_shipment(shipment);
    }
    scenario
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("stowage_build");
    group.sample_size(10);

    for &(stacks, heights, phases) in &[(2, 2, 1), (3, 3, 2), (4, 3, 3)] {
        let scenario = synthetic(stacks, heights, phases);
        group.bench_with_input(
            BenchmarkId::new(format!("s{}_h{}_p{}", stacks, heights, phases), stacks),
            &scenario,
            |b, s| {
                b.iter(|| {
                    let model = StowageModel::build(
                        black_box(s),
                        MilpBackend::new("bench"),
                        StowageConfig::default(),
                    );
                    black_box(model.map(|m| m.backend().constraint_count()))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
