//! Process-wide request pacing for the platform API.
//!
//! Every outbound call reserves the next free slot under a mutex and then
//! sleeps until its slot comes up, which keeps the minimum inter-call
//! interval intact no matter how many workers are fanned out.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct RequestPacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    /// `requests_per_second <= 0` disables pacing.
    pub fn new(requests_per_second: f64) -> Self {
        let interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Suspend until this caller's slot. Mandatory for every API request.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let at = match *next {
                Some(t) if t > now => t,
                _ => now,
            };
            *next = Some(at + self.interval);
            at
        };
        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_concurrent_callers_by_the_interval() {
        let pacer = std::sync::Arc::new(RequestPacer::new(10.0)); // 100ms apart
        let started = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let pacer = std::sync::Arc::clone(&pacer);
            handles.push(tokio::spawn(async move {
                pacer.acquire().await;
                started.elapsed()
            }));
        }
        let mut elapsed: Vec<Duration> = Vec::new();
        for handle in handles {
            elapsed.push(handle.await.unwrap());
        }
        elapsed.sort();
        // First caller goes immediately; the rest wait a full interval each.
        assert_eq!(elapsed[0], Duration::ZERO);
        assert_eq!(elapsed[1], Duration::from_millis(100));
        assert_eq!(elapsed[2], Duration::from_millis(200));
    }

    #[tokio::test]
    async fn zero_rate_is_unpaced() {
        let pacer = RequestPacer::new(0.0);
        pacer.acquire().await;
        assert_eq!(pacer.interval(), Duration::ZERO);
    }
}
