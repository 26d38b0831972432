use crate::domain::account::AccountId;
use crate::domain::transaction::TransactionId;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BankingError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),
    #[error("Transaction {0} not found")]
    TransactionNotFound(TransactionId),
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: Decimal,
        requested: Decimal,
    },
    #[error("Timed out acquiring lock on account {account} after {attempts} attempts")]
    LockTimeout { account: AccountId, attempts: u32 },
    #[error("Arithmetic overflow on account {account}")]
    ArithmeticOverflow { account: AccountId },
    #[error("Store error: {0}")]
    StoreError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BankingError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound(_) | Self::TransactionNotFound(_)
        )
    }

    /// Whether retrying the same request can succeed without changing its input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound(_)
                | Self::TransactionNotFound(_)
                | Self::InsufficientFunds { .. }
                | Self::LockTimeout { .. }
                | Self::StoreError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BankingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_classification() {
        let id = AccountId::new();
        assert!(BankingError::AccountNotFound(id).is_not_found());
        assert!(BankingError::TransactionNotFound(TransactionId::new()).is_not_found());
        assert!(!BankingError::validation("bad").is_not_found());

        assert!(!BankingError::validation("bad").is_recoverable());
        let timeout = BankingError::LockTimeout {
            account: id,
            attempts: 3,
        };
        assert!(timeout.is_recoverable());
        assert!(
            BankingError::InsufficientFunds {
                account: id,
                balance: dec!(1),
                requested: dec!(2),
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_insufficient_funds_display() {
        let id = AccountId::new();
        let err = BankingError::InsufficientFunds {
            account: id,
            balance: dec!(10.5),
            requested: dec!(20),
        };
        assert_eq!(
            err.to_string(),
            format!("Insufficient funds in account {id}: balance 10.5, requested 20")
        );
    }
}
