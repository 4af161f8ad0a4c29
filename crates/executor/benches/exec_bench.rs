//! Benchmarks for the fetch/decode/execute loop.
//!
//! Run with: cargo bench -p absm-executor --bench exec_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use absm_executor::decode::{assemble_i, assemble_j, assemble_r, TERMINATOR};
use absm_executor::registers::gpr;
use absm_executor::{Core, OpCode, SegmentMap, SegmentRange};

const MEM_SIZE: usize = 4096;

fn segments() -> SegmentMap {
    SegmentMap {
        cs: SegmentRange::new(0, 2047),
        ss: SegmentRange::new(2048, 3071),
        ds: SegmentRange::new(3072, 4000),
        es: SegmentRange::new(4001, 4095),
    }
}

fn straight_line_program(len: usize) -> Vec<u32> {
    let mut program: Vec<u32> = (0..len)
        .map(|_| assemble_i(OpCode::Add, gpr::R1, gpr::R1, 1))
        .collect();
    program.push(TERMINATOR);
    program
}

fn bench_straight_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("Core-StraightLine");

    for size in [64usize, 256, 1024] {
        let program = straight_line_program(size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut core = Core::new(MEM_SIZE, segments()).unwrap();
                core.load_instructions(&program);
                core.run().unwrap();
                black_box(core)
            })
        });
    }

    group.finish();
}

fn bench_countdown_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("Core-CountdownLoop");

    for iterations in [100u32, 1000] {
        let program = vec![
            assemble_r(OpCode::Add, gpr::R1, gpr::R1, gpr::R2), // R1 -= 1
            assemble_i(OpCode::Umul, gpr::R3, gpr::R1, 3),      // busywork
            assemble_j(OpCode::Jz, 4),
            assemble_j(OpCode::Jmp, 0),
            TERMINATOR,
        ];

        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &iterations,
            |b, &iterations| {
                b.iter(|| {
                    let mut core = Core::new(MEM_SIZE, segments()).unwrap();
                    core.load_instructions(&program);
                    *core.registers_mut().gp_mut(gpr::R1) = iterations;
                    *core.registers_mut().gp_mut(gpr::R2) = 1u32.wrapping_neg();
                    core.run().unwrap();
                    black_box(core)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_straight_line, bench_countdown_loop);
criterion_main!(benches);
