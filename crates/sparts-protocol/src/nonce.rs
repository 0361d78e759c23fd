use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

/// Source of transaction nonces.
///
/// A nonce only has to make otherwise identical headers distinct, so that a
/// replayed transaction is recognisable as a duplicate.
pub trait NonceSource: Send + Sync {
    fn next_nonce(&self) -> String;
}

/// Wall-clock nanoseconds, forced strictly increasing, as lowercase hex.
///
/// Rapid submissions within one clock tick (or across a clock step backwards)
/// still get distinct nonces.
#[derive(Debug, Default)]
pub struct MonotonicNonce {
    last: AtomicU64,
}

static SHARED: MonotonicNonce = MonotonicNonce::new();

impl MonotonicNonce {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Process-wide instance, used when a builder is given no nonce source.
    pub fn shared() -> &'static MonotonicNonce {
        &SHARED
    }

    fn now_nanos() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }

    fn next_value(&self) -> u64 {
        let now = Self::now_nanos();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

impl NonceSource for MonotonicNonce {
    fn next_nonce(&self) -> String {
        format!("{:x}", self.next_value())
    }
}

/// 128 random bits as 32 hex characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNonce;

impl NonceSource for RandomNonce {
    fn next_nonce(&self) -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}
