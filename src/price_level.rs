//! Price level: the FIFO queue of resting orders at one tick.
//!
//! A level is a doubly-linked list threaded through the order records'
//! `prev`/`next` fields, so push, pop, and interior erase are all O(1).
//! The level also carries its ladder membership links (`bid_*`/`ask_*` and
//! the `in_bid`/`in_ask` flags); those belong to the [`Ladder`], which is
//! the only code that touches them.
//!
//! [`Ladder`]: crate::ladder::Ladder

use crate::arena::{OrderArena, OrderIdx, NULL_INDEX};
use crate::events::PriceTicks;
use crate::ladder::LevelIdx;

/// One price point. `price_ticks` is set at ladder construction and never
/// changes; a level's index is a pure function of its price.
#[derive(Clone, Copy, Debug)]
pub struct PriceLevel {
    pub price_ticks: PriceTicks,

    head: OrderIdx,
    tail: OrderIdx,

    pub(crate) bid_prev: LevelIdx,
    pub(crate) bid_next: LevelIdx,
    pub(crate) ask_prev: LevelIdx,
    pub(crate) ask_next: LevelIdx,

    pub(crate) in_bid: bool,
    pub(crate) in_ask: bool,
}

impl PriceLevel {
    pub(crate) const fn new(price_ticks: PriceTicks) -> Self {
        Self {
            price_ticks,
            head: NULL_INDEX,
            tail: NULL_INDEX,
            bid_prev: NULL_INDEX,
            bid_next: NULL_INDEX,
            ask_prev: NULL_INDEX,
            ask_next: NULL_INDEX,
            in_bid: false,
            in_ask: false,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == NULL_INDEX
    }

    /// Oldest resting order at this level, or `None` when empty.
    #[inline]
    pub fn front(&self) -> Option<OrderIdx> {
        if self.head == NULL_INDEX {
            None
        } else {
            Some(self.head)
        }
    }

    /// Newest resting order at this level, or `None` when empty.
    #[inline]
    pub fn back(&self) -> Option<OrderIdx> {
        if self.tail == NULL_INDEX {
            None
        } else {
            Some(self.tail)
        }
    }

    /// Append an order at the tail. The order's intra-level links must be
    /// null (a freshly allocated record satisfies this).
    #[inline]
    pub fn push_back(&mut self, arena: &mut OrderArena, idx: OrderIdx) {
        debug_assert_eq!(arena.get(idx).prev, NULL_INDEX, "order already linked");
        debug_assert_eq!(arena.get(idx).next, NULL_INDEX, "order already linked");

        let old_tail = self.tail;
        {
            let rec = arena.get_mut(idx);
            rec.prev = old_tail;
            rec.next = NULL_INDEX;
        }

        if old_tail == NULL_INDEX {
            debug_assert_eq!(self.head, NULL_INDEX);
            self.head = idx;
        } else {
            arena.get_mut(old_tail).next = idx;
        }
        self.tail = idx;
    }

    /// Detach and return the head, clearing its links. `None` when empty.
    #[inline]
    pub fn pop_front(&mut self, arena: &mut OrderArena) -> Option<OrderIdx> {
        if self.head == NULL_INDEX {
            return None;
        }

        let idx = self.head;
        let next = arena.get(idx).next;

        self.head = next;
        if next == NULL_INDEX {
            self.tail = NULL_INDEX;
        } else {
            arena.get_mut(next).prev = NULL_INDEX;
        }

        let rec = arena.get_mut(idx);
        rec.prev = NULL_INDEX;
        rec.next = NULL_INDEX;

        Some(idx)
    }

    /// Unlink an order from anywhere in the queue, clearing its links.
    /// The order must currently be queued at this level.
    #[inline]
    pub fn erase(&mut self, arena: &mut OrderArena, idx: OrderIdx) {
        let (prev, next) = {
            let rec = arena.get(idx);
            (rec.prev, rec.next)
        };

        if prev == NULL_INDEX {
            debug_assert_eq!(self.head, idx);
            self.head = next;
        } else {
            arena.get_mut(prev).next = next;
        }

        if next == NULL_INDEX {
            debug_assert_eq!(self.tail, idx);
            self.tail = prev;
        } else {
            arena.get_mut(next).prev = prev;
        }

        let rec = arena.get_mut(idx);
        rec.prev = NULL_INDEX;
        rec.next = NULL_INDEX;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc_n(arena: &mut OrderArena, n: usize) -> Vec<OrderIdx> {
        (0..n)
            .map(|i| {
                let idx = arena.allocate().unwrap();
                let rec = arena.get_mut(idx);
                rec.order_id = (i + 1) as u32;
                rec.qty_remaining = 10;
                idx
            })
            .collect()
    }

    #[test]
    fn test_new_level_is_empty() {
        let level = PriceLevel::new(100);
        assert!(level.is_empty());
        assert_eq!(level.front(), None);
        assert_eq!(level.back(), None);
        assert_eq!(level.price_ticks, 100);
    }

    #[test]
    fn test_push_back_preserves_fifo_links() {
        let mut arena = OrderArena::new(8);
        let mut level = PriceLevel::new(100);
        let orders = alloc_n(&mut arena, 3);

        for &idx in &orders {
            level.push_back(&mut arena, idx);
        }

        assert_eq!(level.front(), Some(orders[0]));
        assert_eq!(level.back(), Some(orders[2]));
        assert_eq!(arena.get(orders[0]).next, orders[1]);
        assert_eq!(arena.get(orders[1]).prev, orders[0]);
        assert_eq!(arena.get(orders[1]).next, orders[2]);
        assert_eq!(arena.get(orders[2]).prev, orders[1]);
        assert_eq!(arena.get(orders[2]).next, NULL_INDEX);
    }

    #[test]
    fn test_pop_front_in_arrival_order() {
        let mut arena = OrderArena::new(8);
        let mut level = PriceLevel::new(100);
        let orders = alloc_n(&mut arena, 3);

        for &idx in &orders {
            level.push_back(&mut arena, idx);
        }

        assert_eq!(level.pop_front(&mut arena), Some(orders[0]));
        assert_eq!(arena.get(orders[1]).prev, NULL_INDEX);
        assert_eq!(level.pop_front(&mut arena), Some(orders[1]));
        assert_eq!(level.pop_front(&mut arena), Some(orders[2]));
        assert!(level.is_empty());
        assert_eq!(level.pop_front(&mut arena), None);
    }

    #[test]
    fn test_pop_clears_links() {
        let mut arena = OrderArena::new(8);
        let mut level = PriceLevel::new(100);
        let orders = alloc_n(&mut arena, 2);

        for &idx in &orders {
            level.push_back(&mut arena, idx);
        }

        let popped = level.pop_front(&mut arena).unwrap();
        assert_eq!(arena.get(popped).prev, NULL_INDEX);
        assert_eq!(arena.get(popped).next, NULL_INDEX);
    }

    #[test]
    fn test_erase_only_order() {
        let mut arena = OrderArena::new(8);
        let mut level = PriceLevel::new(100);
        let orders = alloc_n(&mut arena, 1);

        level.push_back(&mut arena, orders[0]);
        level.erase(&mut arena, orders[0]);

        assert!(level.is_empty());
        assert_eq!(level.front(), None);
        assert_eq!(level.back(), None);
    }

    #[test]
    fn test_erase_head_tail_middle() {
        let mut arena = OrderArena::new(8);
        let mut level = PriceLevel::new(100);
        let orders = alloc_n(&mut arena, 4);

        for &idx in &orders {
            level.push_back(&mut arena, idx);
        }

        // Middle.
        level.erase(&mut arena, orders[1]);
        assert_eq!(arena.get(orders[0]).next, orders[2]);
        assert_eq!(arena.get(orders[2]).prev, orders[0]);

        // Head.
        level.erase(&mut arena, orders[0]);
        assert_eq!(level.front(), Some(orders[2]));
        assert_eq!(arena.get(orders[2]).prev, NULL_INDEX);

        // Tail.
        level.erase(&mut arena, orders[3]);
        assert_eq!(level.back(), Some(orders[2]));
        assert_eq!(arena.get(orders[2]).next, NULL_INDEX);

        // Last one standing.
        level.erase(&mut arena, orders[2]);
        assert!(level.is_empty());
    }
}
