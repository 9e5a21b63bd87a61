//! # Clock Abstraction
//!
//! Every wait in the node (sensor retry delay, Wi-Fi connect polling,
//! reconnect throttling, HTTP retry backoff) goes through [`Clock`], so the
//! retry contracts can be exercised in tests without real delays.

use async_trait::async_trait;
use tokio::time::{Duration, Instant};

/// Monotonic millisecond clock with a sleep primitive
#[async_trait]
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since the clock was created
    fn now_ms(&self) -> u64;

    /// Suspend the caller for `ms` milliseconds
    async fn sleep_ms(&self, ms: u64);
}

/// Clock backed by the tokio timer
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    start: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Virtual clock for tests
    ///
    /// `sleep_ms` returns immediately, advances virtual time and records the
    /// requested duration. Clones share the same timeline.
    #[derive(Clone, Default)]
    pub struct MockClock {
        pub now: Arc<Mutex<u64>>,
        pub sleeps: Arc<Mutex<Vec<u64>>>,
    }

    impl MockClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn advance(&self, ms: u64) {
            *self.now.lock().unwrap() += ms;
        }

        pub fn get_sleeps(&self) -> Vec<u64> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clock for MockClock {
        fn now_ms(&self) -> u64 {
            *self.now.lock().unwrap()
        }

        async fn sleep_ms(&self, ms: u64) {
            self.sleeps.lock().unwrap().push(ms);
            self.advance(ms);
        }
    }
}
