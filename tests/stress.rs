//! Stress and boundary tests: capacity edges, churn, contention, and the
//! structural invariants after randomized workloads.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tickbook::{reason, Book, Event, LadderConfig, OrderId, Qty, RecordingSink, Side};

fn narrow_config() -> LadderConfig {
    LadderConfig {
        min_price_ticks: 1_000,
        max_price_ticks: 2_000,
    }
}

// ============================================================================
// Capacity boundaries
// ============================================================================

#[test]
fn test_pool_rejects_order_n_plus_one() {
    const CAPACITY: usize = 1_000;
    let mut book = Book::with_config(CAPACITY, narrow_config());

    // Non-crossing adds: bids low, asks high.
    for i in 0..CAPACITY {
        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
        let price = if i % 2 == 0 {
            1_100 + (i % 50) as i32
        } else {
            1_800 + (i % 50) as i32
        };
        let res = book.add_limit((i + 1) as OrderId, 10, side, price);
        assert!(res.accepted, "order {} should fit", i + 1);
    }
    assert_eq!(book.live_orders(), CAPACITY);

    let res = book.add_limit((CAPACITY + 1) as OrderId, 10, Side::Buy, 1_100);
    assert!(!res.accepted);
    assert_eq!(res.reason, Some(reason::POOL_FULL));

    book.check_invariants();
}

#[test]
fn test_slot_reuse_after_cancel() {
    const CAPACITY: usize = 100;
    let mut book = Book::with_config(CAPACITY, narrow_config());

    for i in 0..CAPACITY {
        assert!(book
            .add_limit((i + 1) as OrderId, 10, Side::Buy, 1_500)
            .accepted);
    }
    assert!(!book.add_limit(500, 10, Side::Buy, 1_500).accepted);

    assert!(book.cancel(50));
    assert!(book.add_limit(500, 10, Side::Buy, 1_500).accepted);
    assert_eq!(book.live_orders(), CAPACITY);

    book.check_invariants();
}

#[test]
fn test_full_drain_then_refill() {
    const CAPACITY: usize = 500;
    let mut book = Book::with_config(CAPACITY, narrow_config());

    for i in 0..CAPACITY {
        book.add_limit((i + 1) as OrderId, 10, Side::Buy, 1_200 + (i % 100) as i32);
    }
    for i in 0..CAPACITY {
        assert!(book.cancel((i + 1) as OrderId));
    }
    assert_eq!(book.live_orders(), 0);
    assert_eq!(book.best_bid(), None);

    // Every slot must be reusable.
    for i in 0..CAPACITY {
        assert!(book
            .add_limit((i + 1) as OrderId, 10, Side::Sell, 1_700)
            .accepted);
    }
    assert_eq!(book.live_orders(), CAPACITY);
    book.check_invariants();
}

// ============================================================================
// Price boundaries
// ============================================================================

#[test]
fn test_tick_range_endpoints() {
    let mut book = Book::with_config(16, narrow_config());

    assert!(book.add_limit(1, 10, Side::Buy, 1_000).accepted);
    assert!(book.add_limit(2, 10, Side::Sell, 2_000).accepted);

    assert_eq!(
        book.add_limit(3, 10, Side::Buy, 999).reason,
        Some(reason::INVALID_PRICE)
    );
    assert_eq!(
        book.add_limit(3, 10, Side::Sell, 2_001).reason,
        Some(reason::INVALID_PRICE)
    );

    book.check_invariants();
}

#[test]
fn test_quantity_boundaries() {
    let mut book = Book::with_config(16, narrow_config());

    assert_eq!(
        book.add_limit(1, 0, Side::Buy, 1_500).reason,
        Some(reason::QTY_NOT_POSITIVE)
    );
    assert_eq!(
        book.add_limit(1, -7, Side::Buy, 1_500).reason,
        Some(reason::QTY_NOT_POSITIVE)
    );
    assert!(book.add_limit(1, 1, Side::Buy, 1_500).accepted);
    assert!(book.add_limit(2, Qty::MAX, Side::Sell, 1_900).accepted);

    book.check_invariants();
}

// ============================================================================
// Contention and churn
// ============================================================================

#[test]
fn test_fifo_priority_under_single_level_contention() {
    const ORDERS: usize = 1_000;
    let mut book = Book::with_sink(10_000, narrow_config(), RecordingSink::new());

    for i in 0..ORDERS {
        book.add_limit((i + 1) as OrderId, 10, Side::Sell, 1_500);
    }
    book.sink_mut().clear();

    // Sweep half of the level in one aggressive order.
    book.add_limit(5_000, (ORDERS as Qty / 2) * 10, Side::Buy, 1_500);

    let makers: Vec<OrderId> = book
        .sink()
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Trade(t) => Some(t.resting_id),
            _ => None,
        })
        .collect();

    assert_eq!(makers.len(), ORDERS / 2);
    for (i, &maker) in makers.iter().enumerate() {
        assert_eq!(maker, (i + 1) as OrderId, "fill {i} out of FIFO order");
    }

    assert_eq!(book.live_orders(), ORDERS / 2);
    book.check_invariants();
}

#[test]
fn test_add_cancel_churn_returns_to_initial_state() {
    const CYCLES: usize = 10_000;
    let mut book = Book::with_config(1_000, narrow_config());

    for cycle in 0..CYCLES {
        let id = (cycle % 900 + 1) as OrderId;
        let side = if cycle % 2 == 0 { Side::Buy } else { Side::Sell };
        let price = if cycle % 2 == 0 { 1_400 } else { 1_600 };

        assert!(book.add_limit(id, 10, side, price).accepted);
        assert!(book.cancel(id));
    }

    assert_eq!(book.live_orders(), 0);
    assert_eq!(book.best_bid(), None);
    assert_eq!(book.best_ask(), None);
    book.check_invariants();
}

#[test]
fn test_match_churn_leaves_empty_book() {
    const CYCLES: usize = 5_000;
    let mut book = Book::with_sink(10_000, narrow_config(), RecordingSink::new());

    let mut fills = 0usize;
    for cycle in 0..CYCLES {
        let ask_id = (cycle * 2 + 1) as OrderId;
        let bid_id = (cycle * 2 + 2) as OrderId;

        book.add_limit(ask_id, 100, Side::Sell, 1_500);
        book.add_limit(bid_id, 100, Side::Buy, 1_500);

        fills += book
            .sink()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Trade(_)))
            .count();
        book.sink_mut().clear();
    }

    assert_eq!(fills, CYCLES);
    assert_eq!(book.live_orders(), 0);
    book.check_invariants();
}

#[test]
fn test_sweep_through_many_levels() {
    let mut book = Book::with_sink(10_000, narrow_config(), RecordingSink::new());

    // One order per tick over a 500-tick band.
    for i in 0..500 {
        book.add_limit((i + 1) as OrderId, 10, Side::Sell, 1_200 + i as i32);
    }
    book.sink_mut().clear();

    // Cross the whole band.
    let res = book.add_limit(9_999, 500 * 10, Side::Buy, 1_699);
    assert!(res.accepted);

    let trades: Vec<i32> = book
        .sink()
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Trade(t) => Some(t.price),
            _ => None,
        })
        .collect();

    assert_eq!(trades.len(), 500);
    // Strictly ascending price sweep.
    for pair in trades.windows(2) {
        assert!(pair[0] < pair[1]);
    }

    assert_eq!(book.live_orders(), 0);
    assert_eq!(book.best_ask(), None);
    book.check_invariants();
}

// ============================================================================
// Randomized workload + invariants
// ============================================================================

#[test]
fn test_random_workload_preserves_invariants() {
    const SEED: u64 = 0xABCD_EF12_3456;
    const OPS: usize = 30_000;

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut book = Book::with_sink(50_000, narrow_config(), RecordingSink::new());

    let mut next_id: OrderId = 1;
    let mut resting: Vec<OrderId> = Vec::new();

    for i in 0..OPS {
        if resting.is_empty() || rng.gen_bool(0.65) {
            let id = next_id;
            next_id += 1;

            book.sink_mut().clear();
            let res = book.add_limit(
                id,
                rng.gen_range(1..300),
                if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell },
                rng.gen_range(1_000..=2_000),
            );
            assert!(res.accepted, "ids never repeat, pool is large enough");

            let rested = book
                .sink()
                .events
                .iter()
                .any(|e| matches!(e, Event::AckAdd(_)));
            if rested {
                resting.push(id);
            }
        } else {
            let idx = rng.gen_range(0..resting.len());
            let victim = resting.swap_remove(idx);
            // The order may have been consumed by matching since it rested.
            let existed = book.contains(victim);
            assert_eq!(book.cancel(victim), existed);
        }

        if i % 1_000 == 0 {
            book.check_invariants();
        }
    }

    book.check_invariants();
}

#[test]
fn test_self_trade_is_permitted() {
    // The engine has no account identity; an id's owner can cross itself.
    let mut book = Book::with_sink(16, narrow_config(), RecordingSink::new());

    book.add_limit(1, 10, Side::Sell, 1_500);
    book.add_limit(2, 10, Side::Buy, 1_500);

    assert!(book
        .sink()
        .events
        .iter()
        .any(|e| matches!(e, Event::Trade(_))));
    assert_eq!(book.live_orders(), 0);
}
