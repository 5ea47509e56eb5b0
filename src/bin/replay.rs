//! Replay tool: runs the canned order sequence and prints a digest of the
//! emitted event stream.
//!
//! The output line is the cross-implementation determinism check: any
//! conforming engine replaying this sequence must print the same hash and
//! event count.

use tickbook::{Book, HashingSink, LadderConfig, Side};

fn main() {
    let mut book = Book::with_sink(1_000_000, LadderConfig::default(), HashingSink::new());

    book.add_limit(1, 10, Side::Sell, 101);
    book.add_limit(2, 10, Side::Sell, 101);
    book.add_limit(3, 10, Side::Buy, 99);
    book.add_limit(4, 5, Side::Buy, 101);

    book.cancel(3);
    book.cancel(999_999);

    book.add_limit(1, 1, Side::Buy, 200);

    book.add_limit(5, 20, Side::Buy, 1000);
    book.add_limit(6, 20, Side::Sell, 1000);

    let sink = book.into_sink();
    println!("hash={} events={}", sink.hash(), sink.count());
}
