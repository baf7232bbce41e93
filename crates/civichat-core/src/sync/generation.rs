//! Generation tokens for discarding superseded async results.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Token handed to one fetch; compared against the counter when it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// Monotonic counter of fetch generations, closeable once.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: AtomicU64,
    closed: AtomicBool,
}

impl GenerationCounter {
    /// Creates a counter at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation, superseding every earlier token.
    pub fn next(&self) -> Generation {
        Generation(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `token` is the latest generation and the counter is open.
    #[must_use]
    pub fn is_current(&self, token: Generation) -> bool {
        self.is_open() && self.current.load(Ordering::Acquire) == token.0
    }

    /// Whether the owner is still alive.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Invalidates all tokens, past and future.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_token_wins() {
        let counter = GenerationCounter::new();
        let first = counter.next();
        assert!(counter.is_current(first));

        let second = counter.next();
        assert!(!counter.is_current(first));
        assert!(counter.is_current(second));
    }

    #[test]
    fn test_close_invalidates_everything() {
        let counter = GenerationCounter::new();
        let token = counter.next();
        counter.close();

        assert!(!counter.is_open());
        assert!(!counter.is_current(token));
        assert!(!counter.is_current(counter.next()));
    }
}
