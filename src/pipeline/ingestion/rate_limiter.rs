use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub requests_per_min: Option<u64>,
    pub concurrency: Option<u32>,
}

/// Token bucket on requests per minute plus an optional cap on requests in
/// flight. Cloning shares the same buckets.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    limits: Limits,
    // token bucket modeled by the current tokens and the time of last refill
    rpm_tokens: Mutex<(f64, Instant)>,
    sem: Option<Arc<Semaphore>>,
}

/// Held for the duration of one request; dropping it frees the
/// concurrency slot.
#[derive(Debug)]
pub struct RequestPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl RateLimiter {
    pub fn new(limits: Limits) -> Self {
        let now = Instant::now();
        let rpm_capacity = limits.requests_per_min.unwrap_or(0) as f64;
        let sem = limits
            .concurrency
            .filter(|c| *c > 0)
            .map(|c| Arc::new(Semaphore::new(c as usize)));
        Self {
            inner: Arc::new(Inner {
                limits,
                rpm_tokens: Mutex::new((rpm_capacity, now)),
                sem,
            }),
        }
    }

    /// Wait for a concurrency slot and a request token.
    pub async fn acquire(&self) -> RequestPermit {
        // Concurrency first. The semaphore is never closed, so an error
        // just means running without a slot.
        let permit = match &self.inner.sem {
            Some(sem) => sem.clone().acquire_owned().await.ok(),
            None => None,
        };

        if let Some(rpm) = self.inner.limits.requests_per_min {
            if rpm > 0 {
                self.consume_tokens(rpm as f64, 60.0, 1.0).await;
            }
        }

        RequestPermit { _permit: permit }
    }

    async fn consume_tokens(&self, capacity: f64, period_secs: f64, cost: f64) {
        // Refill continuously, wait until enough tokens accumulate
        loop {
            let mut guard = self.inner.rpm_tokens.lock().await;
            let (ref mut tokens, ref mut last) = *guard;
            let now = Instant::now();
            let elapsed = now.duration_since(*last).as_secs_f64();
            let refill_rate = capacity / period_secs; // tokens per second
            *tokens = (*tokens + elapsed * refill_rate).min(capacity);
            *last = now;
            if *tokens >= cost {
                *tokens -= cost;
                break;
            }
            let need = cost - *tokens;
            let secs = need / refill_rate;
            drop(guard);
            tokio::time::sleep(Duration::from_secs_f64(secs.max(0.001))).await;
        }
    }
}
