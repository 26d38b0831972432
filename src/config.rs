//! Tunables for the engine.
//!
//! The lock retry budget is not a correctness property: any budget gives the
//! same guarantees, it only changes how long a contended caller waits before
//! seeing `LockTimeout`.

use crate::error::{BankingError, Result};
use std::time::Duration;

pub const DEFAULT_LOCK_ATTEMPTS: u32 = 50;
pub const DEFAULT_LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Retry budget for acquiring an account lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// Number of bounded waits before giving up.
    pub max_attempts: u32,
    /// Upper bound of a single wait.
    pub retry_interval: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_LOCK_ATTEMPTS,
            retry_interval: DEFAULT_LOCK_RETRY_INTERVAL,
        }
    }
}

impl LockConfig {
    pub fn new(max_attempts: u32, retry_interval: Duration) -> Result<Self> {
        let config = Self {
            max_attempts,
            retry_interval,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(BankingError::validation("Lock attempts must be at least 1"));
        }
        if self.retry_interval.is_zero() {
            return Err(BankingError::validation("Lock retry interval must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub lock: LockConfig,
}
