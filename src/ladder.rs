//! Ladder: the dense tick grid plus the two sorted best-price lists.
//!
//! Every price in the configured range gets a preconstructed [`PriceLevel`],
//! so `level_index` is pure arithmetic and level indices stay valid for the
//! life of the engine. Occupied levels are additionally threaded onto one of
//! two doubly-linked membership lists: bids in descending price order and
//! asks in ascending price order. The head of each list is the touch, read
//! in O(1).
//!
//! The lists are linked lists rather than a heap because the common case is
//! streaming: the best level drains and is removed from the head, or a new
//! best appears one tick away and is prepended. Insertions away from the
//! touch walk from the best level, which in practice stays short because
//! order flow clusters near the touch.

use crate::events::PriceTicks;
use crate::price_level::PriceLevel;

pub use crate::arena::NULL_INDEX;

/// Index of a level inside the ladder's dense array.
pub type LevelIdx = u32;

/// Inclusive tick range the book accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LadderConfig {
    pub min_price_ticks: PriceTicks,
    pub max_price_ticks: PriceTicks,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            min_price_ticks: 0,
            max_price_ticks: 1_000_000,
        }
    }
}

/// The full price grid and the bid/ask membership lists.
pub struct Ladder {
    cfg: LadderConfig,
    levels: Vec<PriceLevel>,
    best_bid: LevelIdx,
    best_ask: LevelIdx,
}

impl Ladder {
    /// Build the dense grid, one level per tick in the closed range.
    ///
    /// # Panics
    /// Panics if the range is inverted.
    pub fn new(cfg: LadderConfig) -> Self {
        assert!(
            cfg.min_price_ticks <= cfg.max_price_ticks,
            "inverted tick range"
        );
        let span = (cfg.max_price_ticks as i64 - cfg.min_price_ticks as i64 + 1) as usize;

        let mut levels = Vec::with_capacity(span);
        for off in 0..span {
            levels.push(PriceLevel::new(cfg.min_price_ticks + off as PriceTicks));
        }

        Self {
            cfg,
            levels,
            best_bid: NULL_INDEX,
            best_ask: NULL_INDEX,
        }
    }

    #[inline]
    pub fn is_valid_price(&self, p: PriceTicks) -> bool {
        self.cfg.min_price_ticks <= p && p <= self.cfg.max_price_ticks
    }

    #[inline]
    pub fn min_price_ticks(&self) -> PriceTicks {
        self.cfg.min_price_ticks
    }

    #[inline]
    pub fn max_price_ticks(&self) -> PriceTicks {
        self.cfg.max_price_ticks
    }

    /// Level index for a valid price.
    #[inline]
    pub fn level_index(&self, p: PriceTicks) -> LevelIdx {
        debug_assert!(self.is_valid_price(p));
        (p - self.cfg.min_price_ticks) as LevelIdx
    }

    #[inline]
    pub fn level(&self, idx: LevelIdx) -> &PriceLevel {
        &self.levels[idx as usize]
    }

    #[inline]
    pub fn level_mut(&mut self, idx: LevelIdx) -> &mut PriceLevel {
        &mut self.levels[idx as usize]
    }

    /// Highest-priced occupied bid level, or `None`.
    #[inline]
    pub fn best_bid_level(&self) -> Option<LevelIdx> {
        if self.best_bid == NULL_INDEX {
            None
        } else {
            Some(self.best_bid)
        }
    }

    /// Lowest-priced occupied ask level, or `None`.
    #[inline]
    pub fn best_ask_level(&self) -> Option<LevelIdx> {
        if self.best_ask == NULL_INDEX {
            None
        } else {
            Some(self.best_ask)
        }
    }

    /// Splice a newly occupied level into the bid list. Idempotent: a level
    /// that is already a member is left where it is.
    pub fn on_bid_level_became_non_empty(&mut self, idx: LevelIdx) {
        debug_assert!(!self.levels[idx as usize].is_empty());
        if self.levels[idx as usize].in_bid {
            return;
        }
        self.bid_insert_sorted(idx);
    }

    /// Remove a drained level from the bid list. Idempotent when absent.
    pub fn on_bid_level_became_empty(&mut self, idx: LevelIdx) {
        debug_assert!(self.levels[idx as usize].is_empty());
        if !self.levels[idx as usize].in_bid {
            return;
        }
        self.bid_erase(idx);
    }

    /// Ask-side counterpart of [`Self::on_bid_level_became_non_empty`].
    pub fn on_ask_level_became_non_empty(&mut self, idx: LevelIdx) {
        debug_assert!(!self.levels[idx as usize].is_empty());
        if self.levels[idx as usize].in_ask {
            return;
        }
        self.ask_insert_sorted(idx);
    }

    /// Ask-side counterpart of [`Self::on_bid_level_became_empty`].
    pub fn on_ask_level_became_empty(&mut self, idx: LevelIdx) {
        debug_assert!(self.levels[idx as usize].is_empty());
        if !self.levels[idx as usize].in_ask {
            return;
        }
        self.ask_erase(idx);
    }

    fn bid_insert_sorted(&mut self, idx: LevelIdx) {
        let price = self.levels[idx as usize].price_ticks;
        {
            let lvl = &mut self.levels[idx as usize];
            lvl.in_bid = true;
            lvl.bid_prev = NULL_INDEX;
            lvl.bid_next = NULL_INDEX;
        }

        if self.best_bid == NULL_INDEX {
            self.best_bid = idx;
            return;
        }

        // New best: prepend in O(1).
        if price > self.levels[self.best_bid as usize].price_ticks {
            self.levels[idx as usize].bid_next = self.best_bid;
            self.levels[self.best_bid as usize].bid_prev = idx;
            self.best_bid = idx;
            return;
        }

        // Walk down from the touch. Distinct levels hold distinct prices, so
        // strict comparison terminates without a tie case.
        let mut cur = self.best_bid;
        loop {
            let next = self.levels[cur as usize].bid_next;
            if next == NULL_INDEX || self.levels[next as usize].price_ticks < price {
                break;
            }
            cur = next;
        }

        let next = self.levels[cur as usize].bid_next;
        self.levels[idx as usize].bid_prev = cur;
        self.levels[idx as usize].bid_next = next;
        if next != NULL_INDEX {
            self.levels[next as usize].bid_prev = idx;
        }
        self.levels[cur as usize].bid_next = idx;
    }

    fn ask_insert_sorted(&mut self, idx: LevelIdx) {
        let price = self.levels[idx as usize].price_ticks;
        {
            let lvl = &mut self.levels[idx as usize];
            lvl.in_ask = true;
            lvl.ask_prev = NULL_INDEX;
            lvl.ask_next = NULL_INDEX;
        }

        if self.best_ask == NULL_INDEX {
            self.best_ask = idx;
            return;
        }

        if price < self.levels[self.best_ask as usize].price_ticks {
            self.levels[idx as usize].ask_next = self.best_ask;
            self.levels[self.best_ask as usize].ask_prev = idx;
            self.best_ask = idx;
            return;
        }

        let mut cur = self.best_ask;
        loop {
            let next = self.levels[cur as usize].ask_next;
            if next == NULL_INDEX || self.levels[next as usize].price_ticks > price {
                break;
            }
            cur = next;
        }

        let next = self.levels[cur as usize].ask_next;
        self.levels[idx as usize].ask_prev = cur;
        self.levels[idx as usize].ask_next = next;
        if next != NULL_INDEX {
            self.levels[next as usize].ask_prev = idx;
        }
        self.levels[cur as usize].ask_next = idx;
    }

    fn bid_erase(&mut self, idx: LevelIdx) {
        let (prev, next) = {
            let lvl = &self.levels[idx as usize];
            (lvl.bid_prev, lvl.bid_next)
        };

        if prev == NULL_INDEX {
            debug_assert_eq!(self.best_bid, idx);
            self.best_bid = next;
        } else {
            self.levels[prev as usize].bid_next = next;
        }
        if next != NULL_INDEX {
            self.levels[next as usize].bid_prev = prev;
        }

        let lvl = &mut self.levels[idx as usize];
        lvl.bid_prev = NULL_INDEX;
        lvl.bid_next = NULL_INDEX;
        lvl.in_bid = false;
    }

    fn ask_erase(&mut self, idx: LevelIdx) {
        let (prev, next) = {
            let lvl = &self.levels[idx as usize];
            (lvl.ask_prev, lvl.ask_next)
        };

        if prev == NULL_INDEX {
            debug_assert_eq!(self.best_ask, idx);
            self.best_ask = next;
        } else {
            self.levels[prev as usize].ask_next = next;
        }
        if next != NULL_INDEX {
            self.levels[next as usize].ask_prev = prev;
        }

        let lvl = &mut self.levels[idx as usize];
        lvl.ask_prev = NULL_INDEX;
        lvl.ask_next = NULL_INDEX;
        lvl.in_ask = false;
    }
}
