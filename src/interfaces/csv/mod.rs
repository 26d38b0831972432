//! CSV front end used by the command-line shell.

pub mod account_writer;
pub mod operation_reader;
