use crate::domain::account::{Account, AccountId};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AccountRow<'a> {
    name: &'a str,
    id: AccountId,
    balance: Decimal,
    entries: usize,
}

/// Writes final account state as CSV with header `name,id,balance,entries`.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts<'a>(
        &mut self,
        accounts: impl IntoIterator<Item = &'a Account>,
    ) -> Result<()> {
        for account in accounts {
            self.writer.serialize(AccountRow {
                name: &account.name,
                id: account.id,
                balance: account.balance.value().normalize(),
                entries: account.ledger_len(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
