//! Per-account exclusivity with deadlock-free multi-account acquisition.
//!
//! Each account has its own `tokio::sync::Mutex<()>`; holding its guard is the
//! account's exclusivity flag. A caller that needs several accounts gets them
//! through [`LockCoordinator::acquire_all`], which always locks in ascending
//! [`AccountId`] order. Since every caller uses the same total order, no two
//! operations can wait on each other in a cycle.
//!
//! Only registered accounts have a lock. Acquiring an unregistered id fails
//! with `AccountNotFound` and leaves the coordinator unchanged.
//!
//! Waiting is blocking, not polling: each attempt parks on the mutex for at
//! most `retry_interval`, and after `max_attempts` attempts the acquisition
//! fails with `LockTimeout`. Locks already taken by a failed `acquire_all` are
//! released before the error is returned.

use crate::config::LockConfig;
use crate::domain::account::AccountId;
use crate::error::{BankingError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::timeout;
use tracing::{debug, warn};

type AccountLock = Arc<Mutex<()>>;

pub struct LockCoordinator {
    config: LockConfig,
    locks: RwLock<HashMap<AccountId, AccountLock>>,
}

impl LockCoordinator {
    pub fn new(config: LockConfig) -> Self {
        Self {
            config,
            locks: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> LockConfig {
        self.config
    }

    /// Makes an account lockable. Registering twice keeps the existing lock.
    pub async fn register(&self, id: AccountId) {
        self.locks.write().await.entry(id).or_default();
    }

    /// Drops the lock of an account that no longer exists.
    pub async fn forget(&self, id: AccountId) {
        self.locks.write().await.remove(&id);
    }

    pub async fn is_registered(&self, id: AccountId) -> bool {
        self.locks.read().await.contains_key(&id)
    }

    /// Takes exclusive access to one account.
    pub async fn acquire(&self, id: AccountId) -> Result<LockGuard> {
        self.acquire_all(&[id]).await
    }

    /// Takes exclusive access to every account in `ids`.
    ///
    /// Duplicates are ignored. Accounts are locked one at a time in ascending
    /// id order regardless of the order they were passed in. Nothing is
    /// locked if any of them is unregistered.
    pub async fn acquire_all(&self, ids: &[AccountId]) -> Result<LockGuard> {
        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let locks = self.locks_for(&ordered).await?;
        let mut guard = LockGuard {
            held: Vec::with_capacity(ordered.len()),
        };
        for (id, lock) in ordered.into_iter().zip(locks) {
            // On error `guard` is dropped here, releasing what was taken so far.
            let held = self.wait_for(id, lock).await?;
            guard.held.push((id, held));
        }
        Ok(guard)
    }

    /// Releases one account. Equivalent to dropping the guard.
    pub fn release(&self, guard: LockGuard) {
        guard.release();
    }

    /// Releases every account held by `guard`.
    pub fn release_all(&self, guard: LockGuard) {
        guard.release();
    }

    /// Whether some operation currently holds the account.
    pub async fn is_locked(&self, id: AccountId) -> bool {
        let locks = self.locks.read().await;
        locks.get(&id).is_some_and(|lock| lock.try_lock().is_err())
    }

    async fn locks_for(&self, ids: &[AccountId]) -> Result<Vec<AccountLock>> {
        let table = self.locks.read().await;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let lock = table.get(id).ok_or(BankingError::AccountNotFound(*id))?;
            found.push(Arc::clone(lock));
        }
        Ok(found)
    }

    async fn wait_for(&self, id: AccountId, lock: AccountLock) -> Result<OwnedMutexGuard<()>> {
        for attempt in 1..=self.config.max_attempts {
            match timeout(self.config.retry_interval, Arc::clone(&lock).lock_owned()).await {
                Ok(held) => {
                    debug!(account = %id, attempt, "account lock acquired");
                    return Ok(held);
                }
                Err(_) => debug!(account = %id, attempt, "account lock busy"),
            }
        }
        warn!(
            account = %id,
            attempts = self.config.max_attempts,
            "gave up waiting for account lock"
        );
        Err(BankingError::LockTimeout {
            account: id,
            attempts: self.config.max_attempts,
        })
    }
}

/// Exclusive access to a set of accounts, released on drop.
#[must_use = "dropping the guard releases the accounts immediately"]
pub struct LockGuard {
    held: Vec<(AccountId, OwnedMutexGuard<()>)>,
}

impl LockGuard {
    /// Locked accounts in acquisition order.
    pub fn accounts(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.held.iter().map(|(id, _)| *id)
    }

    pub fn holds(&self, id: AccountId) -> bool {
        self.held.iter().any(|(held, _)| *held == id)
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        for (id, _) in &self.held {
            debug!(account = %id, "account lock released");
        }
    }
}
