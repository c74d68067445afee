//! Store-backed rate limiter (spec §4.C).
//!
//! Buckets are keyed by `(limiter_type, key)` and track hourly and daily
//! windows independently; `check` is a read, `consume` deducts only when
//! both windows have headroom. The Rate Limiter must be consulted on the
//! accepting side of any cross-zone RPC, never trusted from the caller.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use astrid_storage::{
    Database, StorageResult,
    tables::{GenericTable, Table, names},
};
use serde::{Deserialize, Serialize};

/// One hour, in milliseconds.
const HOUR_MILLIS: i64 = 60 * 60 * 1000;
/// One day, in milliseconds.
const DAY_MILLIS: i64 = 24 * HOUR_MILLIS;

/// Per-window quota for one limiter type.
#[derive(Debug, Clone, Copy)]
pub struct Quota {
    /// Maximum requests within a rolling hour.
    pub hourly_limit: u32,
    /// Maximum requests within a rolling day.
    pub daily_limit: u32,
}

impl Quota {
    /// Build a quota from explicit hourly/daily limits.
    #[must_use]
    pub fn new(hourly_limit: u32, daily_limit: u32) -> Self {
        Self {
            hourly_limit,
            daily_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RateBucket {
    hour_count: u32,
    hour_reset_at: i64,
    day_count: u32,
    day_reset_at: i64,
}

impl RateBucket {
    fn fresh(now: i64) -> Self {
        Self {
            hour_count: 0,
            hour_reset_at: now + HOUR_MILLIS,
            day_count: 0,
            day_reset_at: now + DAY_MILLIS,
        }
    }

    fn rolled_over(&self, now: i64) -> Self {
        Self {
            hour_count: if now >= self.hour_reset_at { 0 } else { self.hour_count },
            hour_reset_at: if now >= self.hour_reset_at { now + HOUR_MILLIS } else { self.hour_reset_at },
            day_count: if now >= self.day_reset_at { 0 } else { self.day_count },
            day_reset_at: if now >= self.day_reset_at { now + DAY_MILLIS } else { self.day_reset_at },
        }
    }
}

/// Outcome of a limiter check, with a denial reason when refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitDecision {
    /// Request has headroom in both windows.
    Allowed,
    /// Request would exceed a window; carries a short opaque reason.
    Denied {
        /// Human-readable denial reason, e.g. `"hourly quota exceeded"`.
        reason: String,
    },
}

impl LimitDecision {
    /// `true` if the request may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Token-bucket rate limiter backed by the Store.
pub struct RateLimiter {
    buckets: GenericTable,
}

impl RateLimiter {
    /// Build a limiter writing its buckets to `db`'s `rate_bucket` table.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            buckets: GenericTable::new(db, names::RATE_BUCKET),
        }
    }

    fn row_id(limiter_type: &str, key: &str) -> String {
        format!("{limiter_type}:{key}")
    }

    fn decide(bucket: &RateBucket, quota: Quota) -> LimitDecision {
        if bucket.hour_count >= quota.hourly_limit {
            return LimitDecision::Denied {
                reason: "hourly quota exceeded".to_string(),
            };
        }
        if bucket.day_count >= quota.daily_limit {
            return LimitDecision::Denied {
                reason: "daily quota exceeded".to_string(),
            };
        }
        LimitDecision::Allowed
    }

    /// Read-only check: does `(limiter_type, key)` currently have headroom
    /// under `quota`? Does not deduct.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn check(&self, limiter_type: &str, key: &str, quota: Quota) -> StorageResult<LimitDecision> {
        let now = astrid_core::Timestamp::now().into_millis();
        let id = Self::row_id(limiter_type, key);
        let bucket = match self.buckets.get(&id).await? {
            Some(b) => b.rolled_over(now),
            None => RateBucket::fresh(now),
        };
        Ok(Self::decide(&bucket, quota))
    }

    /// Consult `quota` and, only if the request is allowed, deduct one
    /// token from both windows.
    ///
    /// # Errors
    ///
    /// Propagates Store errors.
    pub async fn consume(&self, limiter_type: &str, key: &str, quota: Quota) -> StorageResult<LimitDecision> {
        let now = astrid_core::Timestamp::now().into_millis();
        let id = Self::row_id(limiter_type, key);
        let mut bucket = match self.buckets.get(&id).await? {
            Some(b) => b.rolled_over(now),
            None => RateBucket::fresh(now),
        };

        let decision = Self::decide(&bucket, quota);
        if decision.is_allowed() {
            bucket.hour_count += 1;
            bucket.day_count += 1;
            self.buckets.upsert(&id, &bucket).await?;
        }
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn limiter() -> RateLimiter {
        let db = Database::connect_memory().await.unwrap();
        RateLimiter::new(db)
    }

    #[tokio::test]
    async fn allows_until_hourly_quota_exhausted() {
        let limiter = limiter().await;
        let quota = Quota::new(2, 100);
        assert!(limiter.consume("broker", "user-1", quota).await.unwrap().is_allowed());
        assert!(limiter.consume("broker", "user-1", quota).await.unwrap().is_allowed());
        let denied = limiter.consume("broker", "user-1", quota).await.unwrap();
        assert!(!denied.is_allowed());
    }

    #[tokio::test]
    async fn check_does_not_deduct() {
        let limiter = limiter().await;
        let quota = Quota::new(1, 100);
        assert!(limiter.check("broker", "user-2", quota).await.unwrap().is_allowed());
        assert!(limiter.check("broker", "user-2", quota).await.unwrap().is_allowed());
        assert!(limiter.consume("broker", "user-2", quota).await.unwrap().is_allowed());
        assert!(!limiter.consume("broker", "user-2", quota).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn different_keys_have_independent_buckets() {
        let limiter = limiter().await;
        let quota = Quota::new(1, 100);
        assert!(limiter.consume("broker", "a", quota).await.unwrap().is_allowed());
        assert!(limiter.consume("broker", "b", quota).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn daily_quota_caps_even_with_headroom_hourly() {
        let limiter = limiter().await;
        let quota = Quota::new(100, 1);
        assert!(limiter.consume("broker", "user-3", quota).await.unwrap().is_allowed());
        let denied = limiter.consume("broker", "user-3", quota).await.unwrap();
        assert!(!denied.is_allowed());
    }
}
