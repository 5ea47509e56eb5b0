//! Benchmark tool: ns/op for the four canonical workloads, with a hard
//! check that the timed loops perform zero heap allocations.
//!
//! Workloads: add-resting, cancel, marketable-match, and a mixed stream.
//! Every loop is preceded by a warmup pass. The process exits non-zero if
//! any allocation slips into a timed region.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use hdrhistogram::Histogram;
use tickbook::{Book, NullSink, OrderId, PriceTicks, Qty, Side};

/// Counts every allocator entry so the timed loops can assert they made
/// none. The counter lives in the harness; the engine itself has no
/// atomics.
struct CountingAllocator;

static ALLOC_CALLS: AtomicU64 = AtomicU64::new(0);

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
        System.alloc(layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        ALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
        System.alloc_zeroed(layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
        System.realloc(ptr, layout, new_size)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

fn alloc_calls() -> u64 {
    ALLOC_CALLS.load(Ordering::Relaxed)
}

/// Linear congruential generator; good enough for workload shaping and
/// completely deterministic across runs.
#[inline]
fn lcg(state: &mut u32) -> u32 {
    *state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    *state
}

fn report(name: &str, ops: usize, nanos: u128) {
    let sec = nanos as f64 * 1e-9;
    let ns_per_op = if ops > 0 { nanos as f64 / ops as f64 } else { 0.0 };
    let ops_per_s = if sec > 0.0 { ops as f64 / sec } else { 0.0 };
    println!(
        "{name} ops={ops} sec={sec:.6} ns_per_op={ns_per_op:.1} ops_per_s={ops_per_s:.0}"
    );
}

/// Returns `false` (and complains) if the timed region allocated.
fn check_allocs(name: &str, before: u64, after: u64) -> bool {
    let delta = after - before;
    if delta != 0 {
        eprintln!("{name} ERROR: allocations during timed loop = {delta}");
        return false;
    }
    true
}

fn bench_add_resting(max_orders: usize, warmup_ops: usize, ops: usize) -> bool {
    let mut book = Book::new(max_orders);
    let mut rng = 1u32;
    let mut id: OrderId = 1;

    for _ in 0..warmup_ops {
        let r = lcg(&mut rng);
        let side = if r & 1 == 1 { Side::Buy } else { Side::Sell };
        let price = 10_000 + (r % 100) as PriceTicks;
        let qty = 1 + (r % 10) as Qty;
        let res = book.add_limit(id, qty, side, price);
        std::hint::black_box(res.accepted);
        id += 1;
    }

    let before = alloc_calls();
    let t0 = Instant::now();
    for _ in 0..ops {
        let r = lcg(&mut rng);
        let side = if r & 1 == 1 { Side::Buy } else { Side::Sell };
        let price = 10_000 + (r % 100) as PriceTicks;
        let qty = 1 + (r % 10) as Qty;
        let res = book.add_limit(id, qty, side, price);
        std::hint::black_box(res.accepted);
        id += 1;
    }
    let elapsed = t0.elapsed();
    let after = alloc_calls();

    report("add_resting", ops, elapsed.as_nanos());
    check_allocs("add_resting", before, after)
}

fn bench_cancel(max_orders: usize, warmup_ops: usize, ops: usize) -> bool {
    let mut book = Book::new(max_orders);
    let mut rng = 2u32;
    let mut id: OrderId = 1;

    let mut live: Vec<OrderId> = Vec::with_capacity(ops);
    for _ in 0..ops {
        let r = lcg(&mut rng);
        let side = if r & 1 == 1 { Side::Buy } else { Side::Sell };
        let price = 20_000 + (r % 100) as PriceTicks;
        let qty = 1 + (r % 10) as Qty;
        let res = book.add_limit(id, qty, side, price);
        std::hint::black_box(res.accepted);
        live.push(id);
        id += 1;
    }

    // Warm the cancel path, then backfill so the timed loop sees live ids.
    for i in 0..warmup_ops.min(live.len()) {
        let ok = book.cancel(live[i]);
        std::hint::black_box(ok);
    }
    for i in 0..warmup_ops.min(live.len()) {
        let r = lcg(&mut rng);
        let side = if r & 1 == 1 { Side::Buy } else { Side::Sell };
        let price = 20_000 + (r % 100) as PriceTicks;
        let qty = 1 + (r % 10) as Qty;
        let res = book.add_limit(id, qty, side, price);
        std::hint::black_box(res.accepted);
        live[i] = id;
        id += 1;
    }

    let before = alloc_calls();
    let t0 = Instant::now();
    for &victim in live.iter().take(ops) {
        let ok = book.cancel(victim);
        std::hint::black_box(ok);
    }
    let elapsed = t0.elapsed();
    let after = alloc_calls();

    report("cancel", ops, elapsed.as_nanos());
    check_allocs("cancel", before, after)
}

fn bench_marketable_match(max_orders: usize, warmup_ops: usize, ops: usize) -> bool {
    let mut book = Book::new(max_orders);
    let mut id: OrderId = 1;

    // Deep resting liquidity so the timed aggressors never run dry.
    for _ in 0..1_000 {
        let res = book.add_limit(id, 1_000_000, Side::Sell, 10_000);
        std::hint::black_box(res.accepted);
        id += 1;
    }

    for _ in 0..warmup_ops {
        let res = book.add_limit(id, 1, Side::Buy, 20_000);
        std::hint::black_box(res.accepted);
        id += 1;
    }

    let before = alloc_calls();
    let t0 = Instant::now();
    for _ in 0..ops {
        let res = book.add_limit(id, 1, Side::Buy, 20_000);
        std::hint::black_box(res.accepted);
        id += 1;
    }
    let elapsed = t0.elapsed();
    let after = alloc_calls();

    report("marketable_match", ops, elapsed.as_nanos());
    check_allocs("marketable_match", before, after)
}

fn bench_mixed_stream(max_orders: usize, warmup_iters: usize, iters: usize) -> bool {
    let mut book: Book<NullSink> = Book::new(max_orders);
    let mut rng = 42u32;
    let mut id: OrderId = 1;

    // Reserved up front so pushes inside the timed loop cannot reallocate.
    let mut cancellable: Vec<OrderId> = Vec::with_capacity((warmup_iters + iters) * 3);
    let mut hist = Histogram::<u64>::new_with_bounds(1, 10_000_000, 3).unwrap();

    fn one_iter(
        book: &mut Book<NullSink>,
        rng: &mut u32,
        id: &mut OrderId,
        cancellable: &mut Vec<OrderId>,
    ) {
        // Three passive adds near the touch.
        for _ in 0..3 {
            let r = lcg(rng);
            let side = if r & 1 == 1 { Side::Buy } else { Side::Sell };
            let price = 10_000 + (r % 20) as PriceTicks;
            let qty = 1 + (r % 5) as Qty;
            let res = book.add_limit(*id, qty, side, price);
            std::hint::black_box(res.accepted);
            cancellable.push(*id);
            *id += 1;
        }

        // One cancel.
        if let Some(victim) = cancellable.pop() {
            let ok = book.cancel(victim);
            std::hint::black_box(ok);
        }

        // One aggressive sweep.
        let r = lcg(rng);
        let (side, price) = if r & 1 == 1 {
            (Side::Buy, 20_000)
        } else {
            (Side::Sell, 1)
        };
        let res = book.add_limit(*id, 1, side, price);
        std::hint::black_box(res.accepted);
        *id += 1;
    }

    for _ in 0..warmup_iters {
        one_iter(&mut book, &mut rng, &mut id, &mut cancellable);
    }

    let before = alloc_calls();
    let t0 = Instant::now();
    for _ in 0..iters {
        let iter_start = Instant::now();
        one_iter(&mut book, &mut rng, &mut id, &mut cancellable);
        hist.saturating_record(iter_start.elapsed().as_nanos() as u64);
    }
    let elapsed = t0.elapsed();
    let after = alloc_calls();

    // Five book operations per iteration.
    report("mixed_stream", iters * 5, elapsed.as_nanos());
    let clean = check_allocs("mixed_stream", before, after);

    println!("mixed_stream iteration latency (5 ops, ns):");
    println!("  p50={}", hist.value_at_quantile(0.50));
    println!("  p99={}", hist.value_at_quantile(0.99));
    println!("  p99.9={}", hist.value_at_quantile(0.999));
    println!("  max={}", hist.max());

    clean
}

fn pin_to_last_core() {
    if let Some(core_ids) = core_affinity::get_core_ids() {
        if let Some(last) = core_ids.last() {
            core_affinity::set_for_current(*last);
        }
    }
}

fn main() {
    const MAX_ORDERS: usize = 5_000_000;
    const OPS: usize = 2_000_000;
    const WARMUP: usize = 200_000;

    pin_to_last_core();

    let mut clean = true;
    clean &= bench_add_resting(MAX_ORDERS, WARMUP, OPS);
    clean &= bench_cancel(MAX_ORDERS, WARMUP / 10, OPS / 2);
    clean &= bench_marketable_match(MAX_ORDERS, WARMUP, OPS);
    clean &= bench_mixed_stream(MAX_ORDERS, 50_000, 500_000);

    println!("process_total_alloc_calls={}", alloc_calls());

    if !clean {
        std::process::exit(1);
    }
}
