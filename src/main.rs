use banking_ledger::application::engine::BankingEngine;
use banking_ledger::config::{
    DEFAULT_LOCK_ATTEMPTS, DEFAULT_LOCK_RETRY_INTERVAL, EngineConfig, LockConfig,
};
use banking_ledger::domain::account::AccountId;
use banking_ledger::domain::ports::{AccountStoreBox, TransactionStoreBox};
use banking_ledger::error::{BankingError, Result as EngineResult};
use banking_ledger::infrastructure::in_memory::{InMemoryAccountStore, InMemoryTransactionStore};
use banking_ledger::interfaces::csv::account_writer::AccountWriter;
use banking_ledger::interfaces::csv::operation_reader::{Operation, OperationReader};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Attempts made to lock an account before giving up
    #[arg(long, default_value_t = DEFAULT_LOCK_ATTEMPTS)]
    lock_attempts: u32,

    /// Upper bound in milliseconds of a single lock attempt
    #[arg(long, default_value_t = DEFAULT_LOCK_RETRY_INTERVAL.as_millis() as u64)]
    lock_retry_ms: u64,
}

/// Maps the aliases used in the input file to engine account ids.
#[derive(Default)]
struct Aliases {
    ids: HashMap<String, AccountId>,
    opened: Vec<AccountId>,
}

impl Aliases {
    fn resolve(&self, alias: &str) -> EngineResult<AccountId> {
        self.ids
            .get(alias)
            .copied()
            .ok_or_else(|| BankingError::validation(format!("Unknown account '{alias}'")))
    }
}

async fn apply(engine: &BankingEngine, aliases: &mut Aliases, op: Operation) -> EngineResult<()> {
    match op {
        Operation::Open {
            name,
            initial_balance,
        } => {
            if aliases.ids.contains_key(name.trim()) {
                return Err(BankingError::validation(format!(
                    "Account '{name}' already opened"
                )));
            }
            let account = engine.create_account(&name, initial_balance).await?;
            aliases.ids.insert(account.name.clone(), account.id);
            aliases.opened.push(account.id);
        }
        Operation::Deposit { account, amount } => {
            engine.deposit(aliases.resolve(&account)?, amount).await?;
        }
        Operation::Withdraw { account, amount } => {
            engine.withdraw(aliases.resolve(&account)?, amount).await?;
        }
        Operation::Transfer { from, to, amount } => {
            let (from, to) = (aliases.resolve(&from)?, aliases.resolve(&to)?);
            engine.transfer(from, to, amount).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = EngineConfig {
        lock: LockConfig::new(cli.lock_attempts, Duration::from_millis(cli.lock_retry_ms))
            .into_diagnostic()?,
    };
    let as_store: AccountStoreBox = Box::new(InMemoryAccountStore::new());
    let ts_store: TransactionStoreBox = Box::new(InMemoryTransactionStore::new());
    let engine = BankingEngine::with_config(as_store, ts_store, config).into_diagnostic()?;

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    let mut aliases = Aliases::default();
    for op_result in reader.operations() {
        match op_result {
            Ok(op) => {
                if let Err(e) = apply(&engine, &mut aliases, op).await {
                    eprintln!("Error processing operation: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
            }
        }
    }

    let accounts = engine.get_accounts(&aliases.opened).await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(&accounts).into_diagnostic()?;

    Ok(())
}
