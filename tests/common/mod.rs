#![allow(dead_code)]

use async_trait::async_trait;
use banking_ledger::domain::account::{Account, AccountId};
use banking_ledger::domain::ports::{AccountStore, TransactionStore};
use banking_ledger::domain::transaction::{Transaction, TransactionId};
use banking_ledger::error::{BankingError, Result};
use banking_ledger::infrastructure::in_memory::{InMemoryAccountStore, InMemoryTransactionStore};
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Writes `opens` followed by `rows` deposits of 1.0 spread over the opened accounts.
pub fn generate_operations_csv(
    path: &Path,
    opens: usize,
    rows: usize,
) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["type", "account", "counterparty", "amount"])?;
    for i in 0..opens {
        wtr.write_record(["open", &format!("acct{i}"), "", "0"])?;
    }
    for i in 0..rows {
        wtr.write_record(["deposit", &format!("acct{}", i % opens), "", "1.0"])?;
    }

    wtr.flush()?;
    Ok(())
}

fn injected() -> BankingError {
    BankingError::StoreError("injected failure".to_string())
}

/// Account store that sleeps before every call, widening race windows.
#[derive(Clone)]
pub struct LatentAccountStore {
    pub inner: InMemoryAccountStore,
    delay: Duration,
}

impl LatentAccountStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryAccountStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl AccountStore for LatentAccountStore {
    async fn save(&self, account: Account) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(account).await
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_id(id).await
    }

    async fn update(&self, account: Account) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.update(account).await
    }

    async fn delete(&self, id: AccountId) -> Result<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(id).await
    }
}

/// Account store whose updates of one chosen account fail while armed.
#[derive(Clone, Default)]
pub struct FlakyAccountStore {
    pub inner: InMemoryAccountStore,
    failing: Arc<Mutex<Option<AccountId>>>,
}

impl FlakyAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_updates_of(&self, id: AccountId) {
        *self.failing.lock().unwrap() = Some(id);
    }

    pub fn heal(&self) {
        *self.failing.lock().unwrap() = None;
    }
}

#[async_trait]
impl AccountStore for FlakyAccountStore {
    async fn save(&self, account: Account) -> Result<()> {
        self.inner.save(account).await
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        self.inner.find_by_id(id).await
    }

    async fn update(&self, account: Account) -> Result<()> {
        let failing = *self.failing.lock().unwrap();
        if failing == Some(account.id) {
            return Err(injected());
        }
        self.inner.update(account).await
    }

    async fn delete(&self, id: AccountId) -> Result<bool> {
        self.inner.delete(id).await
    }
}

/// Transaction store that rejects completed entries while armed. Failed
/// entries are still stored and their ids collected.
#[derive(Clone, Default)]
pub struct FlakyTransactionStore {
    pub inner: InMemoryTransactionStore,
    armed: Arc<AtomicBool>,
    failed: Arc<Mutex<Vec<TransactionId>>>,
}

impl FlakyTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn failed_ids(&self) -> Vec<TransactionId> {
        self.failed.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionStore for FlakyTransactionStore {
    async fn save(&self, tx: Transaction) -> Result<()> {
        if !tx.is_completed() {
            self.failed.lock().unwrap().push(tx.id());
        } else if self.armed.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.save(tx).await
    }

    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_account_id(&self, id: AccountId) -> Result<Vec<Transaction>> {
        self.inner.find_by_account_id(id).await
    }
}
