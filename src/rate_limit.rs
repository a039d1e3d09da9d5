//! Rate Limiting
//!
//! Sliding-window counters, independent per endpoint category, keyed by the
//! caller. Injectable so a deployment can swap in a shared keyed store with
//! TTL instead of process-local memory; advisory to the core, not part of
//! its correctness.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::error::Result;

/// Endpoint categories with independent windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateCategory {
    Login,
    PasswordChange,
    UserCreation,
    Mutation,
}

/// Injectable rate-limit seam
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record a hit and report whether the caller is within the limit.
    async fn allow(&self, category: RateCategory, key: &str) -> Result<bool>;
}

/// Limiter that never rejects; useful for tests and batch tooling
#[derive(Debug, Default)]
pub struct NoopRateLimiter;

#[async_trait]
impl RateLimiter for NoopRateLimiter {
    async fn allow(&self, _category: RateCategory, _key: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Per-category limit over a sliding window
#[derive(Debug, Clone, Copy)]
pub struct WindowLimit {
    pub max_hits: usize,
    pub window: Duration,
}

/// In-memory sliding-window limiter
pub struct MemoryRateLimiter {
    limits: HashMap<RateCategory, WindowLimit>,
    hits: Mutex<HashMap<(RateCategory, String), Vec<DateTime<Utc>>>>,
}

impl MemoryRateLimiter {
    pub fn new(limits: HashMap<RateCategory, WindowLimit>) -> Self {
        Self {
            limits,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Production-ish defaults: tight on credentials, loose on general writes.
    pub fn with_defaults() -> Self {
        let minute = Duration::minutes(1);
        let limits = HashMap::from([
            (
                RateCategory::Login,
                WindowLimit {
                    max_hits: 5,
                    window: minute * 5,
                },
            ),
            (
                RateCategory::PasswordChange,
                WindowLimit {
                    max_hits: 3,
                    window: minute * 15,
                },
            ),
            (
                RateCategory::UserCreation,
                WindowLimit {
                    max_hits: 10,
                    window: minute * 60,
                },
            ),
            (
                RateCategory::Mutation,
                WindowLimit {
                    max_hits: 120,
                    window: minute,
                },
            ),
        ]);
        Self::new(limits)
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn allow(&self, category: RateCategory, key: &str) -> Result<bool> {
        let Some(limit) = self.limits.get(&category).copied() else {
            return Ok(true);
        };
        let now = Utc::now();
        let floor = now - limit.window;

        let mut hits = self.hits.lock().await;
        let bucket = hits.entry((category, key.to_string())).or_default();
        bucket.retain(|t| *t >= floor);
        if bucket.len() >= limit.max_hits {
            return Ok(false);
        }
        bucket.push(now);
        Ok(true)
    }
}
