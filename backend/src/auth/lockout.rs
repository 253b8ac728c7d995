//! Failed-signin throttling.
//!
//! Each account carries its own throttle state (`failed_attempts`,
//! `last_failed_at`, `locked_until`). The functions here are pure: they read an
//! account and the current instant and either report the lock status or
//! compute the next state to persist. Nothing is ever cleared proactively, so
//! an expired lock stays in the row until the next write overwrites it.
//!
//! The failure window is rolling and anchored on the previous failure: a new
//! failure counts towards the lockout only when the previous one happened less
//! than one window ago, otherwise the counter restarts at 1. A lock lasts one
//! window from the failure that triggered it.

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::database::models::{Account, ThrottleUpdate};

/// Tunables for the lockout state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            window: Duration::minutes(5),
        }
    }
}

impl LockoutPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.auth_max_attempts,
            window: Duration::minutes(config.auth_window_minutes),
        }
    }

    pub fn window_minutes(&self) -> i64 {
        self.window.num_minutes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Unlocked,
    /// Remaining lock time, rounded up to whole minutes.
    Locked { remaining_minutes: i64 },
}

impl LockStatus {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockStatus::Locked { .. })
    }
}

/// Evaluates whether `account` is locked at `now`.
pub fn lock_status(account: &Account, now: DateTime<Utc>) -> LockStatus {
    match account.locked_until {
        Some(until) if until > now => {
            let remaining_ms = (until - now).num_milliseconds();
            // Sub-millisecond remainders still count as a minute left.
            let remaining_minutes = ((remaining_ms + 59_999) / 60_000).max(1);
            LockStatus::Locked { remaining_minutes }
        }
        _ => LockStatus::Unlocked,
    }
}

/// Computes the throttle state after a failed signin at `now`.
pub fn record_failure(account: &Account, now: DateTime<Utc>, policy: &LockoutPolicy) -> ThrottleUpdate {
    let window_start = now - policy.window;

    let failed_attempts = match account.last_failed_at {
        Some(last_failed_at) if last_failed_at > window_start => account.failed_attempts + 1,
        _ => 1,
    };

    let locked_until =
        (failed_attempts >= i64::from(policy.max_attempts)).then(|| now + policy.window);

    ThrottleUpdate {
        failed_attempts,
        last_failed_at: Some(now),
        locked_until,
    }
}
