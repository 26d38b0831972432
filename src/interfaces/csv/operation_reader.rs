use crate::error::{BankingError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Open,
    Deposit,
    Withdraw,
    Transfer,
}

/// One raw CSV row: `type, account, counterparty, amount`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OperationRecord {
    pub r#type: OperationType,
    pub account: String,
    pub counterparty: Option<String>,
    pub amount: Option<Decimal>,
}

/// A request against the engine, with accounts still named by alias.
#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Open {
        name: String,
        initial_balance: Decimal,
    },
    Deposit {
        account: String,
        amount: Decimal,
    },
    Withdraw {
        account: String,
        amount: Decimal,
    },
    Transfer {
        from: String,
        to: String,
        amount: Decimal,
    },
}

impl TryFrom<OperationRecord> for Operation {
    type Error = BankingError;

    fn try_from(record: OperationRecord) -> Result<Self> {
        let amount = |kind: &str| {
            record
                .amount
                .ok_or_else(|| BankingError::validation(format!("{kind} requires an amount")))
        };
        match record.r#type {
            OperationType::Open => Ok(Operation::Open {
                initial_balance: record.amount.unwrap_or(Decimal::ZERO),
                name: record.account,
            }),
            OperationType::Deposit => Ok(Operation::Deposit {
                amount: amount("deposit")?,
                account: record.account,
            }),
            OperationType::Withdraw => Ok(Operation::Withdraw {
                amount: amount("withdraw")?,
                account: record.account,
            }),
            OperationType::Transfer => {
                let amount = amount("transfer")?;
                let to = record
                    .counterparty
                    .ok_or_else(|| BankingError::validation("transfer requires a counterparty"))?;
                Ok(Operation::Transfer {
                    from: record.account,
                    to,
                    amount,
                })
            }
        }
    }
}

/// Reads operations from a CSV source.
///
/// Wraps `csv::Reader` and yields one `Result<Operation>` per row, trimming
/// whitespace and tolerating short rows.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    /// Creates a new `OperationReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and converts rows, so large files are streamed.
    pub fn operations(self) -> impl Iterator<Item = Result<Operation>> {
        self.reader
            .into_deserialize::<OperationRecord>()
            .map(|result| result.map_err(BankingError::from).and_then(Operation::try_from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "type, account, counterparty, amount\n\
                    open, alice, , 1000\n\
                    open, bob\n\
                    transfer, alice, bob, 300.5";
        let reader = OperationReader::new(data.as_bytes());
        let results: Vec<Result<Operation>> = reader.operations().collect();

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Operation::Open {
                name: "alice".to_string(),
                initial_balance: dec!(1000),
            }
        );
        assert_eq!(
            results[1].as_ref().unwrap(),
            &Operation::Open {
                name: "bob".to_string(),
                initial_balance: Decimal::ZERO,
            }
        );
        assert_eq!(
            results[2].as_ref().unwrap(),
            &Operation::Transfer {
                from: "alice".to_string(),
                to: "bob".to_string(),
                amount: dec!(300.5),
            }
        );
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "type, account, counterparty, amount\ninvalid, alice, , 1.0";
        let reader = OperationReader::new(data.as_bytes());
        let results: Vec<Result<Operation>> = reader.operations().collect();

        assert!(matches!(results[0], Err(BankingError::CsvError(_))));
    }

    #[test]
    fn test_missing_amount_and_counterparty() {
        let data = "type, account, counterparty, amount\n\
                    deposit, alice, ,\n\
                    transfer, alice, , 5";
        let reader = OperationReader::new(data.as_bytes());
        let results: Vec<Result<Operation>> = reader.operations().collect();

        assert!(matches!(results[0], Err(BankingError::ValidationError(_))));
        assert!(matches!(results[1], Err(BankingError::ValidationError(_))));
    }
}
