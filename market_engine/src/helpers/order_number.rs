//! Human-readable order numbers of the form `YYMMDDHHmm-NNNN`.
//!
//! The sequence part comes from a process-local counter that wraps from 9999 back to 0000. Order numbers are for
//! display only and are never used to look an order up, so collisions across restarts or server instances are
//! tolerated.
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use rand::Rng;

pub const ORDER_SEQUENCE_MODULUS: u32 = 10_000;

pub trait OrderNumberGenerator: Send + Sync {
    fn next_order_number(&self, now: DateTime<Utc>) -> String;
}

#[derive(Debug)]
pub struct SequentialOrderNumbers {
    counter: AtomicU32,
}

impl SequentialOrderNumbers {
    pub fn new(seed: u32) -> Self {
        Self { counter: AtomicU32::new(seed % ORDER_SEQUENCE_MODULUS) }
    }

    /// Seeds the counter with a random value, so that restarts are unlikely to reuse recent numbers.
    pub fn random() -> Self {
        Self::new(rand::thread_rng().gen_range(0..ORDER_SEQUENCE_MODULUS))
    }

    fn next_sequence(&self) -> u32 {
        self.counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some((c + 1) % ORDER_SEQUENCE_MODULUS))
            .unwrap_or_else(|c| c)
    }
}

impl Default for SequentialOrderNumbers {
    fn default() -> Self {
        Self::random()
    }
}

impl OrderNumberGenerator for SequentialOrderNumbers {
    fn next_order_number(&self, now: DateTime<Utc>) -> String {
        format!("{}-{:04}", now.format("%y%m%d%H%M"), self.next_sequence())
    }
}
