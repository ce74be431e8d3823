//! Atomic per-`(agent, message_type)` counter enforcing a message-limit cap.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotone counter bounded to `[0, cap]`. Acquiring past `cap` fails
/// without mutating the count; releasing below zero cannot happen because
/// release is only ever called once per successful acquire.
#[derive(Debug)]
pub struct LimitCounter {
    count: AtomicU64,
    cap: u64,
}

impl LimitCounter {
    /// Build a counter with the given cap. `cap == 0` rejects every
    /// acquire.
    pub fn new(cap: u64) -> Self {
        Self {
            count: AtomicU64::new(0),
            cap,
        }
    }

    /// Attempt to increment. Returns `true` and increments on success,
    /// `false` and leaves the counter untouched when already at cap.
    ///
    /// Uses a compare-exchange loop rather than fetch_add-then-check so the
    /// counter never transiently exceeds `cap` under concurrent callers.
    pub fn try_acquire(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);
        loop {
            if current >= self.cap {
                return false;
            }
            match self.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Release one previously acquired slot.
    pub fn release(&self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }

    /// Configured cap.
    pub fn cap(&self) -> u64 {
        self.cap
    }

    /// Current in-flight count.
    pub fn current(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }
}
