//! Book: validation, matching, and event emission.
//!
//! The book owns the arena, the id index, and the ladder, and is the only
//! code that mutates them. Every public operation runs to completion on the
//! caller's thread and emits its events synchronously through the sink
//! before returning.
//!
//! Matching is strict price-time priority: the ladder exposes the best
//! contra price first, and each level's FIFO exposes its oldest order
//! first. Trades print at the resting order's price.

use std::mem;

use crate::arena::{OrderArena, OrderIdIndex, NULL_INDEX};
use crate::events::{
    reason, AckAdd, AckCancel, EventSink, NullSink, OrderId, PriceTicks, Qty, RejectAdd,
    RejectCancel, Side, Trade,
};
use crate::ladder::{Ladder, LadderConfig};

/// Synchronous result of [`Book::add_limit`]. The sink sees the same
/// outcome as a reject or ack event; the return value is a convenience for
/// callers that do not wire a sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddResult {
    pub accepted: bool,
    pub reason: Option<&'static str>,
}

impl AddResult {
    const ACCEPTED: Self = Self {
        accepted: true,
        reason: None,
    };

    const fn rejected(reason: &'static str) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
        }
    }
}

/// Single-instrument central limit order book.
///
/// `max_orders` bounds both the arena and the id space: valid order ids are
/// `1..=max_orders`. Construction is the only point that allocates; the
/// operational path never does.
pub struct Book<S: EventSink = NullSink> {
    arena: OrderArena,
    ids: OrderIdIndex,
    ladder: Ladder,
    sink: S,
    next_time_seq: u64,
}

impl Book<NullSink> {
    /// Book over the default tick range with a discarding sink.
    pub fn new(max_orders: usize) -> Self {
        Self::with_sink(max_orders, LadderConfig::default(), NullSink)
    }

    pub fn with_config(max_orders: usize, cfg: LadderConfig) -> Self {
        Self::with_sink(max_orders, cfg, NullSink)
    }
}

impl<S: EventSink> Book<S> {
    pub fn with_sink(max_orders: usize, cfg: LadderConfig, sink: S) -> Self {
        Self {
            arena: OrderArena::new(max_orders),
            ids: OrderIdIndex::new(max_orders),
            ladder: Ladder::new(cfg),
            sink,
            next_time_seq: 1,
        }
    }

    /// Swap the event sink, returning the previous one.
    pub fn set_sink(&mut self, sink: S) -> S {
        mem::replace(&mut self.sink, sink)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the book and hand back the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Submit a limit order.
    ///
    /// Validation runs in a fixed order (quantity, price, duplicate id);
    /// a failure rejects the order with the book untouched. The order then
    /// crosses against the contra side as far as its limit allows; any
    /// residual rests in the book. A residual that cannot be parked because
    /// the pool is exhausted is rejected, but trades already emitted during
    /// this call stand.
    pub fn add_limit(
        &mut self,
        order_id: OrderId,
        qty: Qty,
        side: Side,
        price: PriceTicks,
    ) -> AddResult {
        if qty <= 0 {
            return self.reject_add(order_id, reason::QTY_NOT_POSITIVE);
        }
        if !self.ladder.is_valid_price(price) {
            return self.reject_add(order_id, reason::INVALID_PRICE);
        }
        if self.ids.exists(order_id) {
            return self.reject_add(order_id, reason::DUPLICATE_ORDER_ID);
        }

        let mut remaining = qty;
        match side {
            Side::Buy => self.match_buy(order_id, price, &mut remaining),
            Side::Sell => self.match_sell(order_id, price, &mut remaining),
        }

        // Fully filled on arrival: nothing rests and no ack is emitted
        // beyond the trades already produced.
        if remaining == 0 {
            return AddResult::ACCEPTED;
        }

        let Some(oi) = self.arena.allocate() else {
            return self.reject_add(order_id, reason::POOL_FULL);
        };

        let time_seq = self.assign_time_seq();
        {
            let rec = self.arena.get_mut(oi);
            rec.order_id = order_id;
            rec.side = side;
            rec.price_ticks = price;
            rec.qty_remaining = remaining;
            rec.time_seq = time_seq;
        }
        self.ids.set(order_id, oi);

        let li = self.ladder.level_index(price);
        let was_empty = self.ladder.level(li).is_empty();
        self.ladder.level_mut(li).push_back(&mut self.arena, oi);
        if was_empty {
            match side {
                Side::Buy => self.ladder.on_bid_level_became_non_empty(li),
                Side::Sell => self.ladder.on_ask_level_became_non_empty(li),
            }
        }

        self.sink.on_ack_add(&AckAdd { order_id });
        AddResult::ACCEPTED
    }

    /// Cancel a resting order. Returns `false` (with a reject event) when
    /// the id is not resting; `true` after the order has been removed and
    /// its record reclaimed.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        let Some(oi) = self.ids.get(order_id) else {
            self.sink.on_reject_cancel(&RejectCancel {
                order_id,
                reason: reason::UNKNOWN_ORDER_ID,
            });
            return false;
        };

        let (price, side) = {
            let rec = self.arena.get(oi);
            (rec.price_ticks, rec.side)
        };

        let li = self.ladder.level_index(price);
        self.ladder.level_mut(li).erase(&mut self.arena, oi);
        if self.ladder.level(li).is_empty() {
            match side {
                Side::Buy => self.ladder.on_bid_level_became_empty(li),
                Side::Sell => self.ladder.on_ask_level_became_empty(li),
            }
        }

        self.ids.clear(order_id);
        self.arena.get_mut(oi).qty_remaining = 0;
        self.arena.free(oi);

        self.sink.on_ack_cancel(&AckCancel { order_id });
        true
    }

    /// Drain asks at or below `limit_price` into `remaining`.
    fn match_buy(&mut self, incoming_id: OrderId, limit_price: PriceTicks, remaining: &mut Qty) {
        while *remaining > 0 {
            let Some(li) = self.ladder.best_ask_level() else {
                break;
            };
            let level_price = self.ladder.level(li).price_ticks;
            if level_price > limit_price {
                break;
            }

            while *remaining > 0 {
                let Some(oi) = self.ladder.level(li).front() else {
                    break;
                };
                self.fill_against(oi, li, incoming_id, level_price, remaining);
            }

            // One notification per empty transition, after the drain.
            if self.ladder.level(li).is_empty() {
                self.ladder.on_ask_level_became_empty(li);
            }
        }
    }

    /// Drain bids at or above `limit_price` into `remaining`.
    fn match_sell(&mut self, incoming_id: OrderId, limit_price: PriceTicks, remaining: &mut Qty) {
        while *remaining > 0 {
            let Some(li) = self.ladder.best_bid_level() else {
                break;
            };
            let level_price = self.ladder.level(li).price_ticks;
            if level_price < limit_price {
                break;
            }

            while *remaining > 0 {
                let Some(oi) = self.ladder.level(li).front() else {
                    break;
                };
                self.fill_against(oi, li, incoming_id, level_price, remaining);
            }

            if self.ladder.level(li).is_empty() {
                self.ladder.on_bid_level_became_empty(li);
            }
        }
    }

    /// Trade the incoming order against one resting order at `level_price`,
    /// retiring the resting order if it is exhausted.
    #[inline]
    fn fill_against(
        &mut self,
        oi: u32,
        li: u32,
        incoming_id: OrderId,
        level_price: PriceTicks,
        remaining: &mut Qty,
    ) {
        let (resting_id, traded, resting_done) = {
            let rec = self.arena.get_mut(oi);
            let traded = (*remaining).min(rec.qty_remaining);
            rec.qty_remaining -= traded;
            (rec.order_id, traded, rec.qty_remaining == 0)
        };
        *remaining -= traded;

        self.sink.on_trade(&Trade {
            resting_id,
            incoming_id,
            price: level_price,
            qty: traded,
        });

        if resting_done {
            let popped = self.ladder.level_mut(li).pop_front(&mut self.arena);
            debug_assert_eq!(popped, Some(oi));
            self.ids.clear(resting_id);
            self.arena.free(oi);
        }
    }

    #[inline]
    fn assign_time_seq(&mut self) -> u64 {
        let seq = self.next_time_seq;
        self.next_time_seq += 1;
        seq
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Best bid price, if any bid is resting.
    #[inline]
    pub fn best_bid(&self) -> Option<PriceTicks> {
        self.ladder
            .best_bid_level()
            .map(|li| self.ladder.level(li).price_ticks)
    }

    /// Best ask price, if any ask is resting.
    #[inline]
    pub fn best_ask(&self) -> Option<PriceTicks> {
        self.ladder
            .best_ask_level()
            .map(|li| self.ladder.level(li).price_ticks)
    }

    #[inline]
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.ids.exists(order_id)
    }

    /// Remaining quantity of a resting order.
    #[inline]
    pub fn resting_qty(&self, order_id: OrderId) -> Option<Qty> {
        self.ids
            .get(order_id)
            .map(|oi| self.arena.get(oi).qty_remaining)
    }

    #[inline]
    pub fn live_orders(&self) -> usize {
        self.arena.live_count()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    #[inline]
    pub fn min_price_ticks(&self) -> PriceTicks {
        self.ladder.min_price_ticks()
    }

    #[inline]
    pub fn max_price_ticks(&self) -> PriceTicks {
        self.ladder.max_price_ticks()
    }

    /// Total quantity and order count queued at `price`. Walks the level
    /// FIFO; diagnostic use, not a hot-path query.
    pub fn level_depth(&self, price: PriceTicks) -> (Qty, usize) {
        if !self.ladder.is_valid_price(price) {
            return (0, 0);
        }
        let lvl = self.ladder.level(self.ladder.level_index(price));
        let mut qty = 0;
        let mut count = 0;
        let mut cur = lvl.front();
        while let Some(oi) = cur {
            let rec = self.arena.get(oi);
            qty += rec.qty_remaining;
            count += 1;
            cur = if rec.next == NULL_INDEX {
                None
            } else {
                Some(rec.next)
            };
        }
        (qty, count)
    }

    /// Assert every structural invariant of the book. O(levels + orders +
    /// id space); intended for tests and debugging, panics on violation.
    pub fn check_invariants(&self) {
        let mut live_seen = 0usize;

        // Bid list: strictly descending, flags and sides consistent.
        let mut prev_price: Option<PriceTicks> = None;
        let mut cur = self.ladder.best_bid_level();
        while let Some(li) = cur {
            let lvl = self.ladder.level(li);
            assert!(lvl.in_bid && !lvl.in_ask, "bid level flag mismatch");
            assert!(!lvl.is_empty(), "empty level on bid list");
            if let Some(p) = prev_price {
                assert!(lvl.price_ticks < p, "bid list not descending");
            }
            prev_price = Some(lvl.price_ticks);
            live_seen += self.check_level_queue(li, Side::Buy);
            let next = lvl.bid_next;
            cur = if next == NULL_INDEX { None } else { Some(next) };
        }

        // Ask list: strictly ascending.
        let mut prev_price: Option<PriceTicks> = None;
        let mut cur = self.ladder.best_ask_level();
        while let Some(li) = cur {
            let lvl = self.ladder.level(li);
            assert!(lvl.in_ask && !lvl.in_bid, "ask level flag mismatch");
            assert!(!lvl.is_empty(), "empty level on ask list");
            if let Some(p) = prev_price {
                assert!(lvl.price_ticks > p, "ask list not ascending");
            }
            prev_price = Some(lvl.price_ticks);
            live_seen += self.check_level_queue(li, Side::Sell);
            let next = lvl.ask_next;
            cur = if next == NULL_INDEX { None } else { Some(next) };
        }

        assert_eq!(
            live_seen,
            self.arena.live_count(),
            "orders reachable from the ladder disagree with arena accounting"
        );
        assert_eq!(
            self.arena.free_count() + live_seen,
            self.arena.capacity(),
            "arena slots leaked"
        );

        // Every bound id slot points at a live record that carries that id.
        for id in 1..=self.ids.max_id() {
            if let Some(oi) = self.ids.get(id) {
                let rec = self.arena.get(oi);
                assert_eq!(rec.order_id, id, "id slot bound to a foreign record");
                assert!(rec.qty_remaining > 0, "id slot bound to a dead record");
            }
        }

        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            assert!(bid < ask, "book is crossed");
        }
    }

    fn check_level_queue(&self, li: u32, side: Side) -> usize {
        let lvl = self.ladder.level(li);
        let mut count = 0;
        let mut last_seq = 0u64;
        let mut cur = lvl.front();
        while let Some(oi) = cur {
            let rec = self.arena.get(oi);
            assert!(rec.qty_remaining > 0, "dead order queued");
            assert_eq!(rec.price_ticks, lvl.price_ticks, "order price differs from level");
            assert_eq!(rec.side, side, "order side differs from level membership");
            assert!(rec.time_seq > last_seq, "time priority out of order");
            last_seq = rec.time_seq;
            assert_eq!(
                self.ids.get(rec.order_id),
                Some(oi),
                "queued order missing from id index"
            );
            count += 1;
            cur = if rec.next == NULL_INDEX {
                None
            } else {
                Some(rec.next)
            };
        }
        count
    }

    fn reject_add(&mut self, order_id: OrderId, why: &'static str) -> AddResult {
        self.sink.on_reject_add(&RejectAdd {
            order_id,
            reason: why,
        });
        AddResult::rejected(why)
    }
}
