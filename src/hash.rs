//! Event-stream hashing for determinism checks.
//!
//! [`HashingSink`] folds every event into a single FNV-1a-64 digest, mixing
//! a tag byte per event kind and each field's little-endian bytes. Two
//! engines that emit byte-identical event streams produce identical digests
//! regardless of platform, which is the replay tool's entire correctness
//! criterion.

use crate::events::{AckAdd, AckCancel, Done, EventSink, RejectAdd, RejectCancel, Trade};

const FNV_OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

/// Mix `bytes` into an FNV-1a-64 state.
#[inline]
pub fn fnv1a64(mut h: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Sink that digests the tagged event stream.
///
/// Tags: AckAdd=1, RejectAdd=2, AckCancel=3, RejectCancel=4, Trade=5,
/// Done=6. Reason strings hash as a u64 length followed by their bytes.
#[derive(Clone, Copy, Debug)]
pub struct HashingSink {
    hash: u64,
    count: u64,
}

impl HashingSink {
    pub fn new() -> Self {
        Self {
            hash: FNV_OFFSET_BASIS,
            count: 0,
        }
    }

    /// Digest over everything seen so far.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Number of events seen.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    fn mix(&mut self, bytes: &[u8]) {
        self.hash = fnv1a64(self.hash, bytes);
    }

    #[inline]
    fn mix_str(&mut self, s: &str) {
        self.mix(&(s.len() as u64).to_le_bytes());
        self.mix(s.as_bytes());
    }
}

impl Default for HashingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for HashingSink {
    fn on_ack_add(&mut self, ev: &AckAdd) {
        self.mix(&[1u8]);
        self.mix(&ev.order_id.to_le_bytes());
        self.count += 1;
    }

    fn on_reject_add(&mut self, ev: &RejectAdd) {
        self.mix(&[2u8]);
        self.mix(&ev.order_id.to_le_bytes());
        self.mix_str(ev.reason);
        self.count += 1;
    }

    fn on_ack_cancel(&mut self, ev: &AckCancel) {
        self.mix(&[3u8]);
        self.mix(&ev.order_id.to_le_bytes());
        self.count += 1;
    }

    fn on_reject_cancel(&mut self, ev: &RejectCancel) {
        self.mix(&[4u8]);
        self.mix(&ev.order_id.to_le_bytes());
        self.mix_str(ev.reason);
        self.count += 1;
    }

    fn on_trade(&mut self, ev: &Trade) {
        self.mix(&[5u8]);
        self.mix(&ev.resting_id.to_le_bytes());
        self.mix(&ev.incoming_id.to_le_bytes());
        self.mix(&ev.price.to_le_bytes());
        self.mix(&ev.qty.to_le_bytes());
        self.count += 1;
    }

    fn on_done(&mut self, ev: &Done) {
        self.mix(&[6u8]);
        self.mix(&ev.order_id.to_le_bytes());
        self.count += 1;
    }
}
