#![allow(unused)]
extern crate hexsuite;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use hexsuite::prelude::*;
use std::hint::black_box;

/// Builds a nested expression `add (xdu (mul r8, #n), r16), #1 -> r0`.
fn nested(ea: Ea, n: u64) -> Instruction {
    let mul = factory::make_mul(ea, Reg::new(8, 4), (n, 4), Operand::Null);
    let xdu = factory::make_xdu(ea, mul, Operand::Null);
    let sum = factory::make_add(ea, xdu, Reg::new(16, 8), Operand::Null);
    factory::make_add(ea, sum, (1u64, 8), Reg::new(0, 8))
}

fn function_with(blocks: u32, insns_per_block: u64) -> LocalFunction {
    let mut func = LocalFunction::new(0x1000, FrameId(0));
    for serial in 0..blocks {
        let start = 0x1000 + u64::from(serial) * 0x100;
        func.add_block(start);
        for offset in 0..insns_per_block {
            func.blocks[serial as usize].push(factory::make_add(
                start + offset,
                Reg::new(8, 4),
                (0u64, 4),
                Reg::new(0, 4),
            ));
        }
    }
    func
}

/// Benchmark instruction construction through the opcode factories
fn bench_factories(c: &mut Criterion) {
    let mut group = c.benchmark_group("factories");
    group.throughput(Throughput::Elements(1));

    group.bench_function("make_add", |b| {
        b.iter(|| {
            black_box(factory::make_add(
                black_box(0x1000),
                Reg::new(8, 4),
                (2u64, 4),
                Reg::new(0, 4),
            ))
        });
    });

    group.bench_function("nested", |b| {
        b.iter(|| black_box(nested(black_box(0x1000), black_box(4))));
    });

    let tree = nested(0x1000, 4);
    group.bench_function("clone_nested", |b| {
        b.iter(|| black_box(black_box(&tree).clone()));
    });
    group.finish();
}

/// Benchmark a full optimizer pipeline run on the reference host
fn bench_pipeline(c: &mut Criterion) {
    let host = LocalHost::with_config(LocalHostConfig {
        record_history: false,
        ..LocalHostConfig::default()
    });
    let mut fold = InsnOptimizer::new(&host, |_: &mut dyn MicroBlock, insn: &mut Instruction, _| {
        if insn.opcode == Opcode::Add && insn.r.value() == Some(0) {
            let (l, d) = (insn.l.take(), insn.d.take());
            *insn = factory::make_mov(insn.ea, l, d);
            1
        } else {
            0
        }
    });
    fold.install();

    let template = function_with(16, 64);
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(16 * 64));
    group.bench_function("optimize_function", |b| {
        b.iter(|| {
            let mut func = template.clone();
            black_box(host.optimize_function(&mut func, OptFlags::default()))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_factories, bench_pipeline);
criterion_main!(benches);
