use crate::domain::transaction::{BalanceChange, TransactionId};
use crate::error::{BankingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of an account.
///
/// The derived `Ord` is the global total order used when several accounts
/// have to be locked together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A signed monetary value held by an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A strictly positive amount moved by a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(BankingError::validation(format!(
                "Amount must be positive, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = BankingError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A named holder of a balance and of an append-only ledger.
///
/// `balance` and `transactions` are only changed by the engine while it holds
/// the account's lock. The ledger stores references; the records themselves
/// live in the transaction store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub balance: Balance,
    transactions: Vec<TransactionId>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates an empty account. The name is trimmed and must not be blank.
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BankingError::validation("Account name is required"));
        }
        Ok(Self {
            id: AccountId::new(),
            name: name.to_string(),
            balance: Balance::ZERO,
            transactions: Vec::new(),
            created_at: Utc::now(),
        })
    }

    /// Ledger references in append order.
    pub fn transactions(&self) -> &[TransactionId] {
        &self.transactions
    }

    pub fn ledger_len(&self) -> usize {
        self.transactions.len()
    }

    /// Increases the balance, returning the before/after pair.
    pub fn credit(&mut self, amount: Amount) -> Result<BalanceChange> {
        let before = self.balance;
        let after = before
            .0
            .checked_add(amount.value())
            .ok_or(BankingError::ArithmeticOverflow { account: self.id })?;
        self.balance = Balance(after);
        Ok(BalanceChange::new(self.id, before, self.balance))
    }

    /// Decreases the balance if it covers `amount`. On error nothing changes.
    pub fn debit(&mut self, amount: Amount) -> Result<BalanceChange> {
        self.ensure_covers(amount)?;
        let before = self.balance;
        let after = before
            .0
            .checked_sub(amount.value())
            .ok_or(BankingError::ArithmeticOverflow { account: self.id })?;
        self.balance = Balance(after);
        Ok(BalanceChange::new(self.id, before, self.balance))
    }

    pub fn ensure_covers(&self, amount: Amount) -> Result<()> {
        if self.balance.0 >= amount.value() {
            Ok(())
        } else {
            Err(BankingError::InsufficientFunds {
                account: self.id,
                balance: self.balance.0,
                requested: amount.value(),
            })
        }
    }

    /// Appends a ledger reference.
    pub fn record(&mut self, tx_id: TransactionId) {
        self.transactions.push(tx_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(BankingError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(BankingError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_deserialization_is_validated() {
        let amount: Amount = serde_json::from_str("\"2.5\"").unwrap();
        assert_eq!(amount.value(), dec!(2.5));
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"2.5\"");

        assert!(serde_json::from_str::<Amount>("\"-1\"").is_err());
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
    }

    #[test]
    fn test_account_name_is_trimmed_and_required() {
        let account = Account::new("  Savings ").unwrap();
        assert_eq!(account.name, "Savings");
        assert_eq!(account.balance, Balance::ZERO);
        assert_eq!(account.ledger_len(), 0);

        assert!(matches!(Account::new("   "), Err(BankingError::ValidationError(_))));
    }

    #[test]
    fn test_credit_reports_change() {
        let mut account = Account::new("a").unwrap();
        let change = account.credit(Amount::new(dec!(10.5)).unwrap()).unwrap();
        assert_eq!(change.before, Balance::ZERO);
        assert_eq!(change.after, Balance::new(dec!(10.5)));
        assert_eq!(account.balance, Balance::new(dec!(10.5)));
    }

    #[test]
    fn test_debit_insufficient_leaves_balance() {
        let mut account = Account::new("a").unwrap();
        account.balance = Balance::new(dec!(10));

        let result = account.debit(Amount::new(dec!(20)).unwrap());
        assert!(matches!(result, Err(BankingError::InsufficientFunds { .. })));
        assert_eq!(account.balance, Balance::new(dec!(10)));
    }

    #[test]
    fn test_debit_to_zero() {
        let mut account = Account::new("a").unwrap();
        account.balance = Balance::new(dec!(10));

        let change = account.debit(Amount::new(dec!(10)).unwrap()).unwrap();
        assert_eq!(change.delta(), dec!(-10));
        assert_eq!(account.balance, Balance::ZERO);
        assert!(!account.balance.is_negative());
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let mut account = Account::new("a").unwrap();
        account.balance = Balance::new(Decimal::MAX);

        let result = account.credit(Amount::new(dec!(1)).unwrap());
        assert!(matches!(result, Err(BankingError::ArithmeticOverflow { .. })));
        assert_eq!(account.balance, Balance::new(Decimal::MAX));
    }

    #[test]
    fn test_account_ids_are_totally_ordered() {
        let mut ids = vec![AccountId::new(), AccountId::new(), AccountId::new()];
        ids.sort();
        assert!(ids[0] <= ids[1] && ids[1] <= ids[2]);
    }
}
