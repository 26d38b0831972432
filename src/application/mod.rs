//! Application layer containing the core business logic orchestration.
//!
//! [`engine::BankingEngine`] is the entry point for every account operation.
//! It serializes access to each account through [`lock::LockCoordinator`] and
//! talks to persistence only through the domain ports, so any store
//! implementation can be plugged in.

pub mod engine;
pub mod lock;
