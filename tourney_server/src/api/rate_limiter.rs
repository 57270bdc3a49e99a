//! Sliding-window rate limiting for WebSocket client messages.
//!
//! Every connection owns a [`ConnectionLimiter`], so a noisy client only
//! throttles itself.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Messages allowed per second before the burst window rejects
pub const BURST_LIMIT: usize = 10;

/// Messages allowed per minute before the sustained window rejects
pub const SUSTAINED_LIMIT: usize = 100;

/// Sliding window over the last `window` of accepted messages
#[derive(Debug)]
pub struct RateLimiter {
    accepted: VecDeque<Instant>,
    max_messages: usize,
    window: Duration,
}

impl RateLimiter {
    /// Allow `max_messages` per `window`
    ///
    /// # Example
    ///
    /// ```
    /// use tourney_server::api::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// let mut limiter = RateLimiter::new(2, Duration::from_secs(1));
    /// assert!(limiter.check());
    /// assert!(limiter.check());
    /// assert!(!limiter.check());
    /// ```
    pub fn new(max_messages: usize, window: Duration) -> Self {
        Self {
            accepted: VecDeque::with_capacity(max_messages),
            max_messages,
            window,
        }
    }

    /// Record a message if the window has room; rejected messages are not
    /// counted.
    pub fn check(&mut self) -> bool {
        self.check_at(Instant::now())
    }

    fn check_at(&mut self, now: Instant) -> bool {
        while self
            .accepted
            .front()
            .is_some_and(|at| now.duration_since(*at) > self.window)
        {
            self.accepted.pop_front();
        }

        if self.accepted.len() >= self.max_messages {
            return false;
        }
        self.accepted.push_back(now);
        true
    }
}

/// Why a message was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttled {
    Burst,
    Sustained,
}

impl Throttled {
    pub fn message(&self) -> &'static str {
        match self {
            Throttled::Burst => "Rate limit exceeded. Please slow down.",
            Throttled::Sustained => "Too many messages. Please wait before sending more.",
        }
    }
}

/// Burst and sustained limits for one connection
#[derive(Debug)]
pub struct ConnectionLimiter {
    burst: RateLimiter,
    sustained: RateLimiter,
}

impl Default for ConnectionLimiter {
    fn default() -> Self {
        Self {
            burst: RateLimiter::new(BURST_LIMIT, Duration::from_secs(1)),
            sustained: RateLimiter::new(SUSTAINED_LIMIT, Duration::from_secs(60)),
        }
    }
}

impl ConnectionLimiter {
    /// Admit one client message
    pub fn admit(&mut self) -> Result<(), Throttled> {
        if !self.burst.check() {
            return Err(Throttled::Burst);
        }
        if !self.sustained.check() {
            return Err(Throttled::Sustained);
        }
        Ok(())
    }
}
