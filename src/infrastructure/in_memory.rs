use crate::domain::account::{Account, AccountId};
use crate::domain::ports::{AccountStore, TransactionStore};
use crate::domain::transaction::{Transaction, TransactionId};
use crate::error::{BankingError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for accounts.
///
/// Uses `Arc<RwLock<HashMap<AccountId, Account>>>` so clones share the same
/// data. Suitable for tests and for running the engine without persistence.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
}

impl InMemoryAccountStore {
    /// Creates a new, empty in-memory account store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn save(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id, account);
        Ok(())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn update(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account;
                Ok(())
            }
            None => Err(BankingError::AccountNotFound(account.id)),
        }
    }

    async fn delete(&self, id: AccountId) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.remove(&id).is_some())
    }
}

#[derive(Default)]
struct TransactionTable {
    rows: Vec<Transaction>,
    index: HashMap<TransactionId, usize>,
}

/// A thread-safe in-memory store for ledger entries.
///
/// Keeps entries in save order so per-account lookups come back in the
/// order they were recorded. Saving an existing id replaces it in place.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    table: Arc<RwLock<TransactionTable>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory transaction store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn save(&self, tx: Transaction) -> Result<()> {
        let mut table = self.table.write().await;
        match table.index.get(&tx.id()).copied() {
            Some(position) => table.rows[position] = tx,
            None => {
                let position = table.rows.len();
                table.index.insert(tx.id(), position);
                table.rows.push(tx);
            }
        }
        Ok(())
    }

    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let table = self.table.read().await;
        let row = table.index.get(&id).map(|&i| table.rows[i].clone());
        Ok(row)
    }

    async fn find_by_account_id(&self, id: AccountId) -> Result<Vec<Transaction>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .iter()
            .filter(|tx| tx.involves(id))
            .cloned()
            .collect())
    }
}
