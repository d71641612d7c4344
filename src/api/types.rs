//! Shared types for the API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

const HOUR: Duration = Duration::from_secs(3600);
const DAY: Duration = Duration::from_secs(86_400);

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        let limiter = RateLimiter::new(core.config.rate_limit_per_hour, core.config.rate_limit_per_day);
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(limiter)),
        }
    }

    /// Run blocking work (SQLite, hashing, model calls) off the async runtime.
    pub async fn blocking<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&CoreState) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let core = self.core.clone();
        tokio::task::spawn_blocking(move || work(&core)).await?
    }
}

/// `{"success": true, "message": ...}` for mutations with nothing else to return.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

impl MessageResponse {
    pub fn ok(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Rate limiter: per-client sliding window
// ═══════════════════════════════════════════════════════════

/// Per-client rate limiter with per-hour and per-day limits.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_hour: u32,
    per_day: u32,
}

impl RateLimiter {
    pub fn new(per_hour: u32, per_day: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_hour,
            per_day,
        }
    }

    /// Check if a client is within rate limits. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, client: &str) -> Result<(), u64> {
        let now = Instant::now();
        if self.windows.len() > 10_000 {
            self.windows
                .retain(|_, entries| entries.iter().any(|ts| now.duration_since(*ts) < DAY));
        }
        let entries = self.windows.entry(client.to_string()).or_default();

        entries.retain(|ts| now.duration_since(*ts) < DAY);

        let last_hour = entries
            .iter()
            .filter(|ts| now.duration_since(**ts) < HOUR)
            .count() as u32;
        if last_hour >= self.per_hour {
            return Err(HOUR.as_secs());
        }
        if entries.len() as u32 >= self.per_day {
            return Err(DAY.as_secs());
        }

        entries.push(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_allows_under_limit() {
        let mut limiter = RateLimiter::new(50, 200);
        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_ok());
    }

    #[test]
    fn rate_limiter_rejects_over_per_hour() {
        let mut limiter = RateLimiter::new(2, 200);
        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_ok());
        assert_eq!(limiter.check("10.0.0.1"), Err(3600));
    }

    #[test]
    fn rate_limiter_rejects_over_per_day() {
        let mut limiter = RateLimiter::new(100, 3);
        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1").is_ok());
        }
        assert_eq!(limiter.check("10.0.0.1"), Err(86_400));
    }

    #[test]
    fn rate_limiter_isolates_clients() {
        let mut limiter = RateLimiter::new(1, 200);
        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.2").is_ok());
        assert_eq!(limiter.check("10.0.0.1"), Err(3600));
    }

    #[test]
    fn rejected_requests_do_not_count() {
        let mut limiter = RateLimiter::new(1, 200);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("a").is_err());
        assert_eq!(limiter.windows["a"].len(), 1);
    }
}
