//! Per-client fixed-window request limiter.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Result of admitting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Counts requests per client IP in fixed windows. A limit of zero admits
/// everything.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    clients: DashMap<IpAddr, Window>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            clients: DashMap::new(),
        }
    }

    pub fn check(&self, client: IpAddr) -> Decision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> Decision {
        if self.limit == 0 {
            return Decision::Allowed { remaining: u32::MAX };
        }

        let mut entry = self.clients.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.limit {
            let elapsed = now.saturating_duration_since(entry.started);
            return Decision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            };
        }
        entry.count += 1;
        Decision::Allowed {
            remaining: self.limit - entry.count,
        }
    }

    /// Drop clients whose window has ended.
    pub fn purge_expired(&self) {
        self.purge_expired_at(Instant::now());
    }

    fn purge_expired_at(&self, now: Instant) {
        self.clients
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}
