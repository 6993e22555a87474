//! Criterion benchmarks for the allocation strategies.
//!
//! Run with: cargo bench

use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

use bumpalo::Bump;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use zonealloc::size::{kb, mb};
use zonealloc::{
    FreeListAllocator, LinearAllocator, MemSpace, PoolAllocator, StackAllocator, Strategy, Zone,
};

/// Heap buffer with the alignment the strategies expect.
struct BenchBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl BenchBuffer {
    fn new(size: usize) -> Self {
        let layout = Layout::from_size_align(size, 16).expect("invalid bench layout");
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc(layout) };
        Self {
            ptr: NonNull::new(ptr).expect("failed to allocate bench buffer"),
            layout,
        }
    }
}

impl Drop for BenchBuffer {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with this layout.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

fn bench_linear(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear");

    let buffer = BenchBuffer::new(mb(1));
    let mut linear = unsafe { LinearAllocator::init(buffer.ptr, mb(1)) };

    group.bench_function("alloc_64b_1000x_reset", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                black_box(linear.allocate(64, 16));
            }
            linear.reset();
        })
    });

    group.bench_function("bumpalo_64b_1000x_reset", |b| {
        let mut bump = Bump::with_capacity(mb(1));
        b.iter(|| {
            for _ in 0..1000 {
                black_box(bump.alloc([0u8; 64]));
            }
            bump.reset();
        })
    });

    group.finish();
}

fn bench_stack(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack");

    let buffer = BenchBuffer::new(kb(64));
    let mut stack = unsafe { StackAllocator::init(buffer.ptr, kb(64)) };

    group.bench_function("push_pop_64b", |b| {
        b.iter(|| {
            let ptr = stack.push(64, 16);
            black_box(ptr);
            unsafe { stack.pop() };
        })
    });

    group.finish();
}

fn bench_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool");

    let buffer = BenchBuffer::new(kb(64));
    let mut pool = unsafe { PoolAllocator::<64>::init(buffer.ptr, kb(64)) };

    group.bench_function("alloc_free_block", |b| {
        b.iter(|| {
            let ptr = pool.allocate(64, 16);
            black_box(ptr);
            unsafe { pool.free(ptr) };
        })
    });

    group.finish();
}

fn bench_free_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("free_list");

    let buffer = BenchBuffer::new(mb(1));
    let mut free_list = unsafe { FreeListAllocator::init(buffer.ptr, mb(1)) };

    group.bench_function("alloc_free_256b", |b| {
        b.iter(|| {
            let ptr = free_list.allocate(256, 16);
            black_box(ptr);
            unsafe { free_list.free(ptr) };
        })
    });

    group.bench_function("alloc_free_mixed_sizes", |b| {
        b.iter(|| {
            let a = free_list.allocate(64, 8);
            let b2 = free_list.allocate(512, 16);
            let c2 = free_list.allocate(128, 8);
            unsafe {
                free_list.free(b2);
                free_list.free(a);
                free_list.free(c2);
            }
        })
    });

    group.finish();
}

fn bench_zone(c: &mut Criterion) {
    let mut group = c.benchmark_group("zone");

    let zone = Zone::<FreeListAllocator>::new(None, mb(1), "bench");

    group.bench_function("locked_alloc_free_256b", |b| {
        b.iter(|| {
            let ptr = zone.allocate(256, 16);
            black_box(ptr);
            unsafe { zone.free(ptr) };
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_linear,
    bench_stack,
    bench_pool,
    bench_free_list,
    bench_zone
);
criterion_main!(benches);
