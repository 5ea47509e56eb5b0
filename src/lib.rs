//! # Tickbook
//!
//! A deterministic, single-instrument central limit order book.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one thread owns the book exclusively (no locks)
//! - **O(1) Operations**: allocate, cancel, and best-price reads are constant time
//! - **Arena Allocation**: no heap traffic on the hot path after construction
//! - **Dense Price Grid**: every tick pre-materialized, level lookup is arithmetic
//!
//! ## Architecture
//!
//! ```text
//! add_limit / cancel --> [Book] --> [Ladder] --> [PriceLevel FIFO]
//!                           |            \------> best bid / best ask lists
//!                           |--> [OrderArena + OrderIdIndex]
//!                           '--> [EventSink] (acks, rejects, trades)
//! ```
//!
//! Orders and price levels are linked by `u32` indices, never pointers: the
//! arena owns every record, the ladder owns every level, and all list
//! surgery happens through those indices.

pub mod arena;
pub mod book;
pub mod events;
pub mod hash;
pub mod ladder;
pub mod price_level;

// Re-exports for convenience
pub use arena::{OrderArena, OrderIdIndex, OrderIdx, OrderRecord, NULL_INDEX};
pub use book::{AddResult, Book};
pub use events::{
    reason, AckAdd, AckCancel, Done, Event, EventSink, NullSink, OrderId, PriceTicks, Qty,
    RecordingSink, RejectAdd, RejectCancel, Side, Trade,
};
pub use hash::HashingSink;
pub use ladder::{Ladder, LadderConfig, LevelIdx};
pub use price_level::PriceLevel;
