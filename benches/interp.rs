use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chip8_vm::prelude::*;

/// Counts v0 up to 255 and starts over.
const COUNTER_LOOP: &[u8] = &[
    0x60, 0x00, // LD v0, 0
    0x70, 0x01, // ADD v0, 1
    0x30, 0xFF, // SE v0, 255
    0x12, 0x02, // JP 0x202
    0x12, 0x00, // JP 0x200
];

/// Redraws a glyph sprite in a tight loop.
const DRAW_LOOP: &[u8] = &[
    0xA2, 0x08, // LD I, 0x208
    0x60, 0x07, // LD v0, 7
    0xD0, 0x05, // DRW v0, v0, 5
    0x12, 0x04, // JP 0x204
    0xF0, 0x90, // sprite
    0xF0, 0x90, //
    0x90, 0x00, //
];

fn criterion_benchmark(c: &mut Criterion) {
    {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_bytecode(COUNTER_LOOP).unwrap();

        c.bench_function("counter bytecode", |b| {
            b.iter(|| {
                let step_count = black_box(1000_usize);
                black_box(vm.run_steps(step_count))
            })
        });
    }

    {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_bytecode(DRAW_LOOP).unwrap();

        c.bench_function("draw bytecode", |b| {
            b.iter(|| {
                let step_count = black_box(1000_usize);
                black_box(vm.run_steps(step_count))
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
