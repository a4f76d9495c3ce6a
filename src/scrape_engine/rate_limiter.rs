//! Global token-bucket throttle for outbound interactions
//!
//! One `RateLimiter` is shared by every collector in an engine run. Token
//! accounting happens under a short `parking_lot` critical section; the wait
//! for a deficit happens after the lock is released so unrelated callers can
//! keep accounting.
//!
//! A caller that finds too few tokens reserves them anyway and drives the
//! balance negative. Later callers see that debt and wait behind it, so a
//! token promised to a sleeping caller is never handed out twice.

use log::trace;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Rate limit decision for one `take`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimitDecision {
    /// Tokens were available and have been consumed
    Allow,
    /// Tokens are not yet available
    /// Contains the duration to wait before they are
    Deny { retry_after: Duration },
}

/// Mutable bucket state, only touched under the limiter's lock
#[derive(Debug)]
struct RateBucket {
    /// May go negative while callers wait on reserved tokens
    tokens: f64,
    last_refill: Instant,
}

impl RateBucket {
    fn refill(&mut self, now: Instant, rate: f64, capacity: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(capacity);
        self.last_refill = now;
    }
}

/// Time for `deficit` tokens to refill, saturating for very slow rates
fn refill_wait(deficit: f64, rate: f64) -> Duration {
    Duration::try_from_secs_f64(deficit / rate).unwrap_or(Duration::MAX)
}

/// Token bucket shared across an engine run
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<RateBucket>,
    /// Tokens per second; zero or negative disables limiting
    rate: f64,
    capacity: f64,
}

impl RateLimiter {
    /// Create a full bucket
    ///
    /// # Arguments
    /// * `rate_rps` - Refill rate in tokens per second (`<= 0` disables limiting)
    /// * `capacity` - Burst size; clamped to at least one token
    #[must_use]
    pub fn new(rate_rps: f64, capacity: u32) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            bucket: Mutex::new(RateBucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            rate: rate_rps,
            capacity,
        }
    }

    /// A limiter that never waits
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(0.0, 1)
    }

    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    #[must_use]
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Tokens currently in the bucket after refill (negative while debt is outstanding)
    #[must_use]
    pub fn available(&self) -> f64 {
        if self.rate <= 0.0 {
            return self.capacity;
        }
        let mut bucket = self.bucket.lock();
        bucket.refill(Instant::now(), self.rate, self.capacity);
        bucket.tokens
    }

    /// Take `n` tokens, waiting for a deficit to refill
    pub async fn take(&self, n: u32) {
        if let RateLimitDecision::Deny { retry_after } = self.reserve(n) {
            trace!("Rate limited: waiting {retry_after:?} for {n} token(s)");
            tokio::time::sleep(retry_after).await;
        }
    }

    /// Consume `n` tokens, reserving them when the bucket is short
    ///
    /// `Deny` means the tokens are already charged and the caller must wait
    /// `retry_after` before acting.
    pub fn reserve(&self, n: u32) -> RateLimitDecision {
        if self.rate <= 0.0 {
            return RateLimitDecision::Allow;
        }
        let requested = f64::from(n);
        let mut bucket = self.bucket.lock();
        bucket.refill(Instant::now(), self.rate, self.capacity);

        if bucket.tokens >= requested {
            bucket.tokens -= requested;
            return RateLimitDecision::Allow;
        }

        let deficit = requested - bucket.tokens;
        bucket.tokens -= requested;
        RateLimitDecision::Deny {
            retry_after: refill_wait(deficit, self.rate),
        }
    }

    /// Consume `n` tokens only if they are available right now
    ///
    /// Unlike `reserve`, a `Deny` leaves the bucket untouched.
    pub fn try_take(&self, n: u32) -> RateLimitDecision {
        if self.rate <= 0.0 {
            return RateLimitDecision::Allow;
        }
        let requested = f64::from(n);
        let mut bucket = self.bucket.lock();
        bucket.refill(Instant::now(), self.rate, self.capacity);

        if bucket.tokens >= requested {
            bucket.tokens -= requested;
            RateLimitDecision::Allow
        } else {
            let deficit = requested - bucket.tokens;
            RateLimitDecision::Deny {
                retry_after: refill_wait(deficit, self.rate),
            }
        }
    }
}
