use super::account::{Account, AccountId};
use super::transaction::{Transaction, TransactionId};
use crate::error::Result;
use async_trait::async_trait;

/// Persistence for accounts.
///
/// Every call is a suspension point and may fail; callers must not assume an
/// implementation is synchronous or infallible.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn save(&self, account: Account) -> Result<()>;
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>>;
    /// Replaces a stored account. Fails with `AccountNotFound` if it was never saved.
    async fn update(&self, account: Account) -> Result<()>;
    /// Returns whether an account was removed.
    async fn delete(&self, id: AccountId) -> Result<bool>;
}

/// Persistence for finalized ledger entries.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn save(&self, tx: Transaction) -> Result<()>;
    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>>;
    /// All stored entries involving `id` as source or target, in save order.
    async fn find_by_account_id(&self, id: AccountId) -> Result<Vec<Transaction>>;
}

pub type AccountStoreBox = Box<dyn AccountStore>;
pub type TransactionStoreBox = Box<dyn TransactionStore>;
