use crate::application::lock::{LockCoordinator, LockGuard};
use crate::config::EngineConfig;
use crate::domain::account::{Account, AccountId, Amount};
use crate::domain::ports::{AccountStoreBox, TransactionStoreBox};
use crate::domain::transaction::{PendingTransaction, Transaction, TransactionId};
use crate::error::{BankingError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

/// Outcome of a deposit or a withdrawal.
#[derive(Debug, Clone, Serialize)]
pub struct AccountTransaction {
    pub account: Account,
    pub transaction: Transaction,
}

/// Outcome of a transfer. Both accounts reference the same transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub from_account: Account,
    pub to_account: Account,
    pub transaction: Transaction,
}

/// One page of an account's ledger.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

/// The balance-mutation and ledger engine.
///
/// Every mutating operation runs validate, lock, read, mutate, record,
/// persist, unlock. Locks are held through [`LockGuard`] values, so they are
/// released on every exit path. Account reads take the same locks.
///
/// The engine is `Send + Sync` and meant to be shared behind an `Arc`.
pub struct BankingEngine {
    account_store: AccountStoreBox,
    transaction_store: TransactionStoreBox,
    locks: LockCoordinator,
}

impl BankingEngine {
    /// Creates an engine with the default lock budget.
    pub fn new(account_store: AccountStoreBox, transaction_store: TransactionStoreBox) -> Self {
        Self {
            account_store,
            transaction_store,
            locks: LockCoordinator::new(EngineConfig::default().lock),
        }
    }

    pub fn with_config(
        account_store: AccountStoreBox,
        transaction_store: TransactionStoreBox,
        config: EngineConfig,
    ) -> Result<Self> {
        config.lock.validate()?;
        Ok(Self {
            account_store,
            transaction_store,
            locks: LockCoordinator::new(config.lock),
        })
    }

    pub fn locks(&self) -> &LockCoordinator {
        &self.locks
    }

    /// Opens an account. A positive initial balance is booked as a completed
    /// deposit in the same step, so the new account never exists without it.
    #[instrument(skip(self))]
    pub async fn create_account(&self, name: &str, initial_balance: Decimal) -> Result<Account> {
        if initial_balance.is_sign_negative() && !initial_balance.is_zero() {
            return Err(BankingError::validation("Initial balance cannot be negative"));
        }
        let account = Account::new(name)?;
        let id = account.id;

        self.locks.register(id).await;
        let opened = self.open(account, initial_balance).await;
        if opened.is_err() {
            self.locks.forget(id).await;
        }
        opened
    }

    async fn open(&self, mut account: Account, initial_balance: Decimal) -> Result<Account> {
        let _guard = self.locks.acquire(account.id).await?;

        if initial_balance.is_zero() {
            self.account_store.save(account.clone()).await?;
            info!(account = %account.id, "account created");
            return Ok(account);
        }

        let amount = Amount::new(initial_balance)?;
        let mut pending = PendingTransaction::deposit(account.id, amount);
        pending.record_change(account.credit(amount)?);
        account.record(pending.id());
        let opening = pending.clone().complete()?;

        self.account_store.save(account.clone()).await?;
        if let Err(err) = self.transaction_store.save(opening).await {
            if let Err(cleanup) = self.account_store.delete(account.id).await {
                error!(account = %account.id, error = %cleanup, "failed to remove half-created account");
            }
            return Err(self.abandon(pending, err).await);
        }

        info!(account = %account.id, balance = %account.balance, "account created");
        Ok(account)
    }

    /// Reads an account under its lock, so an operation in flight on it is
    /// observed either fully applied or not at all.
    pub async fn get_account(&self, id: AccountId) -> Result<Account> {
        let _guard = self.lock_existing(&[id]).await?;
        self.fetch(id).await
    }

    /// Reads several accounts as one snapshot, in the order given. No
    /// operation touching any of them can interleave with the read.
    pub async fn get_accounts(&self, ids: &[AccountId]) -> Result<Vec<Account>> {
        let _guard = self.lock_existing(ids).await?;
        let mut accounts = Vec::with_capacity(ids.len());
        for id in ids {
            accounts.push(self.fetch(*id).await?);
        }
        Ok(accounts)
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction> {
        self.transaction_store
            .find_by_id(id)
            .await?
            .ok_or(BankingError::TransactionNotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn deposit(&self, id: AccountId, amount: Decimal) -> Result<AccountTransaction> {
        let amount = Amount::new(amount)?;
        let guard = self.lock_existing(&[id]).await?;
        let mut account = self.fetch(id).await?;
        let original = account.clone();

        let mut pending = PendingTransaction::deposit(id, amount);
        match account.credit(amount) {
            Ok(change) => pending.record_change(change),
            Err(err) => return Err(self.abandon(pending, err).await),
        }
        account.record(pending.id());

        let (mut accounts, transaction) = self
            .commit(pending, vec![original], vec![account])
            .await?;
        drop(guard);

        info!(account = %id, %amount, transaction = %transaction.id(), "deposit completed");
        Ok(AccountTransaction {
            account: accounts.remove(0),
            transaction,
        })
    }

    #[instrument(skip(self))]
    pub async fn withdraw(&self, id: AccountId, amount: Decimal) -> Result<AccountTransaction> {
        let amount = Amount::new(amount)?;
        let guard = self.lock_existing(&[id]).await?;
        let mut account = self.fetch(id).await?;
        if let Err(err) = account.ensure_covers(amount) {
            warn!(account = %id, %amount, balance = %account.balance, "withdrawal rejected");
            return Err(err);
        }
        let original = account.clone();

        let mut pending = PendingTransaction::withdraw(id, amount);
        match account.debit(amount) {
            Ok(change) => pending.record_change(change),
            Err(err) => return Err(self.abandon(pending, err).await),
        }
        account.record(pending.id());

        let (mut accounts, transaction) = self
            .commit(pending, vec![original], vec![account])
            .await?;
        drop(guard);

        info!(account = %id, %amount, transaction = %transaction.id(), "withdrawal completed");
        Ok(AccountTransaction {
            account: accounts.remove(0),
            transaction,
        })
    }

    /// Moves `amount` from `from` to `to` as one ledger entry.
    ///
    /// Both accounts are locked through `acquire_all`, so a concurrent
    /// transfer in the opposite direction waits instead of deadlocking.
    #[instrument(skip(self))]
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<TransferReceipt> {
        let amount = Amount::new(amount)?;
        if from == to {
            return Err(BankingError::validation("Cannot transfer to the same account"));
        }

        let guard = self.lock_existing(&[from, to]).await?;
        let mut source = self.fetch(from).await?;
        let mut target = self.fetch(to).await?;
        if let Err(err) = source.ensure_covers(amount) {
            warn!(from = %from, to = %to, %amount, balance = %source.balance, "transfer rejected");
            return Err(err);
        }
        let originals = vec![source.clone(), target.clone()];

        let mut pending = PendingTransaction::transfer(from, to, amount);
        let legs = source
            .debit(amount)
            .and_then(|debit| Ok((debit, target.credit(amount)?)));
        match legs {
            Ok((debit, credit)) => {
                pending.record_change(debit);
                pending.record_change(credit);
            }
            Err(err) => return Err(self.abandon(pending, err).await),
        }
        source.record(pending.id());
        target.record(pending.id());

        let (accounts, transaction) = self.commit(pending, originals, vec![source, target]).await?;
        drop(guard);

        info!(from = %from, to = %to, %amount, transaction = %transaction.id(), "transfer completed");
        let [from_account, to_account]: [Account; 2] = accounts
            .try_into()
            .map_err(|_| BankingError::StoreError("transfer lost an account".to_string()))?;
        Ok(TransferReceipt {
            from_account,
            to_account,
            transaction,
        })
    }

    /// Returns page `page` (1-based) of `limit` entries from the account's
    /// ledger, in append order.
    ///
    /// The account is locked while the page is read so that every referenced
    /// entry is already persisted.
    pub async fn get_transaction_history(
        &self,
        id: AccountId,
        page: usize,
        limit: usize,
    ) -> Result<TransactionPage> {
        if page == 0 {
            return Err(BankingError::validation("Page must be at least 1"));
        }
        if limit == 0 {
            return Err(BankingError::validation("Limit must be at least 1"));
        }

        let _guard = self.lock_existing(&[id]).await?;
        let account = self.fetch(id).await?;
        let ledger = account.transactions();
        let start = (page - 1).saturating_mul(limit).min(ledger.len());
        let end = start.saturating_add(limit).min(ledger.len());

        let mut transactions = Vec::with_capacity(end - start);
        for tx_id in &ledger[start..end] {
            transactions.push(self.get_transaction(*tx_id).await?);
        }

        Ok(TransactionPage {
            transactions,
            page,
            limit,
            total: ledger.len(),
        })
    }

    /// Locks `ids`, registering locks for accounts that exist in the store but
    /// were not opened through this engine.
    async fn lock_existing(&self, ids: &[AccountId]) -> Result<LockGuard> {
        for &id in ids {
            if self.locks.is_registered(id).await {
                continue;
            }
            if self.account_store.find_by_id(id).await?.is_none() {
                return Err(BankingError::AccountNotFound(id));
            }
            self.locks.register(id).await;
        }
        self.locks.acquire_all(ids).await
    }

    /// Store read without locking. Callers must hold the account's lock.
    async fn fetch(&self, id: AccountId) -> Result<Account> {
        self.account_store
            .find_by_id(id)
            .await?
            .ok_or(BankingError::AccountNotFound(id))
    }

    /// Persists mutated accounts, then the completed entry.
    ///
    /// If any write fails, accounts already written are restored from
    /// `originals`, the entry is finalized as failed and the store error is
    /// returned. Must be called with every account in `updated` locked.
    async fn commit(
        &self,
        pending: PendingTransaction,
        originals: Vec<Account>,
        updated: Vec<Account>,
    ) -> Result<(Vec<Account>, Transaction)> {
        let completed = match pending.clone().complete() {
            Ok(tx) => tx,
            Err(err) => return Err(self.abandon(pending, err).await),
        };

        for (written, account) in updated.iter().enumerate() {
            if let Err(err) = self.account_store.update(account.clone()).await {
                self.roll_back(&originals[..written]).await;
                return Err(self.abandon(pending, err).await);
            }
        }

        if let Err(err) = self.transaction_store.save(completed.clone()).await {
            self.roll_back(&originals).await;
            return Err(self.abandon(pending, err).await);
        }

        Ok((updated, completed))
    }

    async fn roll_back(&self, originals: &[Account]) {
        for account in originals {
            if let Err(err) = self.account_store.update(account.clone()).await {
                error!(account = %account.id, error = %err, "rollback failed, stored balance may be stale");
            }
        }
    }

    /// Finalizes `pending` as failed, records it best effort and hands back
    /// the error that caused it.
    async fn abandon(&self, pending: PendingTransaction, err: BankingError) -> BankingError {
        let failed = pending.fail(err.to_string());
        warn!(transaction = %failed.id(), kind = %failed.kind(), error = %err, "transaction failed");
        if let Err(save_err) = self.transaction_store.save(failed).await {
            warn!(error = %save_err, "could not record failed transaction");
        }
        err
    }
}
