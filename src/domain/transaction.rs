use crate::domain::account::{AccountId, Amount, Balance};
use crate::error::{BankingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Transfer,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Transfer => "transfer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed(String),
}

/// Balance of one involved account right before and right after the event.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct BalanceChange {
    pub account_id: AccountId,
    pub before: Balance,
    pub after: Balance,
}

impl BalanceChange {
    pub fn new(account_id: AccountId, before: Balance, after: Balance) -> Self {
        Self {
            account_id,
            before,
            after,
        }
    }

    pub fn delta(&self) -> Decimal {
        self.after.0 - self.before.0
    }
}

/// A ledger entry that is still being assembled.
///
/// This is the only mutable form of a transaction. It is owned by the single
/// operation that created it and leaves the pending state by value, through
/// [`PendingTransaction::complete`] or [`PendingTransaction::fail`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransaction {
    id: TransactionId,
    kind: TransactionKind,
    amount: Amount,
    source: AccountId,
    target: Option<AccountId>,
    balance_changes: Vec<BalanceChange>,
    created_at: DateTime<Utc>,
}

impl PendingTransaction {
    pub fn deposit(account: AccountId, amount: Amount) -> Self {
        Self::new(TransactionKind::Deposit, amount, account, None)
    }

    pub fn withdraw(account: AccountId, amount: Amount) -> Self {
        Self::new(TransactionKind::Withdraw, amount, account, None)
    }

    pub fn transfer(source: AccountId, target: AccountId, amount: Amount) -> Self {
        Self::new(TransactionKind::Transfer, amount, source, Some(target))
    }

    fn new(
        kind: TransactionKind,
        amount: Amount,
        source: AccountId,
        target: Option<AccountId>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            kind,
            amount,
            source,
            target,
            balance_changes: Vec::with_capacity(2),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn status(&self) -> TransactionStatus {
        TransactionStatus::Pending
    }

    /// Records the change of one involved account, replacing any earlier
    /// record for the same account.
    pub fn record_change(&mut self, change: BalanceChange) {
        match self
            .balance_changes
            .iter_mut()
            .find(|c| c.account_id == change.account_id)
        {
            Some(existing) => *existing = change,
            None => self.balance_changes.push(change),
        }
    }

    fn change_for(&self, id: AccountId) -> Option<&BalanceChange> {
        self.balance_changes.iter().find(|c| c.account_id == id)
    }

    /// Checks that the recorded legs match the kind and amount. For a
    /// transfer the two legs must net to zero.
    fn check_legs(&self) -> Result<()> {
        let amount = self.amount.value();
        let source_delta = self.change_for(self.source).map(BalanceChange::delta);
        let balanced = match (self.kind, self.target) {
            (TransactionKind::Deposit, None) => source_delta == Some(amount),
            (TransactionKind::Withdraw, None) => source_delta == Some(-amount),
            (TransactionKind::Transfer, Some(target)) => {
                let target_delta = self.change_for(target).map(BalanceChange::delta);
                source_delta == Some(-amount) && target_delta == Some(amount)
            }
            _ => false,
        };
        if balanced && self.balance_changes.len() == self.involved().len() {
            Ok(())
        } else {
            Err(BankingError::validation(format!(
                "{} {} has unbalanced ledger legs",
                self.kind, self.id
            )))
        }
    }

    fn involved(&self) -> Vec<AccountId> {
        std::iter::once(self.source).chain(self.target).collect()
    }

    /// Finalizes as completed. Fails if the recorded legs do not balance.
    pub fn complete(self) -> Result<Transaction> {
        self.check_legs()?;
        Ok(self.finalize(TransactionStatus::Completed))
    }

    /// Finalizes as failed. Balance changes recorded so far are kept for audit.
    pub fn fail(self, reason: impl Into<String>) -> Transaction {
        self.finalize(TransactionStatus::Failed(reason.into()))
    }

    fn finalize(self, status: TransactionStatus) -> Transaction {
        Transaction {
            id: self.id,
            kind: self.kind,
            amount: self.amount,
            source: self.source,
            target: self.target,
            balance_changes: self.balance_changes,
            status,
            created_at: self.created_at,
            finalized_at: Utc::now(),
        }
    }
}

/// A finalized ledger entry. It has no mutators and is safe to share and
/// read without holding any account lock.
///
/// Deserialization rejects records whose status is still pending.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(try_from = "TransactionRecord")]
pub struct Transaction {
    id: TransactionId,
    kind: TransactionKind,
    amount: Amount,
    source: AccountId,
    target: Option<AccountId>,
    balance_changes: Vec<BalanceChange>,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
    finalized_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TransactionRecord {
    id: TransactionId,
    kind: TransactionKind,
    amount: Amount,
    source: AccountId,
    target: Option<AccountId>,
    balance_changes: Vec<BalanceChange>,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
    finalized_at: DateTime<Utc>,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = BankingError;

    fn try_from(record: TransactionRecord) -> Result<Self> {
        if record.status == TransactionStatus::Pending {
            return Err(BankingError::validation(format!(
                "Transaction {} is not finalized",
                record.id
            )));
        }
        Ok(Self {
            id: record.id,
            kind: record.kind,
            amount: record.amount,
            source: record.source,
            target: record.target,
            balance_changes: record.balance_changes,
            status: record.status,
            created_at: record.created_at,
            finalized_at: record.finalized_at,
        })
    }
}

impl Transaction {
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn source(&self) -> AccountId {
        self.source
    }

    pub fn target(&self) -> Option<AccountId> {
        self.target
    }

    pub fn balance_changes(&self) -> &[BalanceChange] {
        &self.balance_changes
    }

    pub fn change_for(&self, id: AccountId) -> Option<&BalanceChange> {
        self.balance_changes.iter().find(|c| c.account_id == id)
    }

    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            TransactionStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn involves(&self, account: AccountId) -> bool {
        self.source == account || self.target == Some(account)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finalized_at(&self) -> DateTime<Utc> {
        self.finalized_at
    }
}
