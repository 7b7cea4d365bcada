//! Minimum spacing between outbound requests
//!
//! Every caller reserves the next free slot before it sends a request. Slots
//! are at least `delay` apart, so the spacing holds even when several tasks
//! share one governor.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Paces requests to one source
#[derive(Debug)]
pub struct DelayGovernor {
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl DelayGovernor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits until this caller's reserved slot arrives
    ///
    /// The first call returns immediately.
    pub async fn wait(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next_slot = Some(slot + self.delay);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_wait_is_immediate() {
        let governor = DelayGovernor::new(Duration::from_secs(5));
        let start = Instant::now();
        governor.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_sequential_waits_are_spaced() {
        let governor = DelayGovernor::new(Duration::from_millis(40));
        let start = Instant::now();
        for _ in 0..3 {
            governor.wait().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_slots() {
        let governor = Arc::new(DelayGovernor::new(Duration::from_millis(30)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let governor = Arc::clone(&governor);
                tokio::spawn(async move {
                    governor.wait().await;
                    Instant::now()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap());
        }
        finished.sort();

        assert!(finished[3].duration_since(start) >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_zero_delay() {
        let governor = DelayGovernor::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            governor.wait().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
