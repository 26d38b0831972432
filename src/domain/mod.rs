//! Domain layer: accounts, ledger entries and the storage ports the
//! application layer depends on.

pub mod account;
pub mod ports;
pub mod transaction;
