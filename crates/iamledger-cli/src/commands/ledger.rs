//! Ledger commands - init, invoke, query and chain verification.

use std::sync::Arc;

use anyhow::{Context, bail};
use colored::Colorize;
use iamledger_chaincode::Dispatcher;
use iamledger_config::{Config, StorageBackend};
use iamledger_core::{ChainVerification, Ledger};
use iamledger_storage::{KvStore, MemoryKvStore, SurrealKvStore};
use tracing::debug;

use crate::theme::Theme;

/// A dispatcher over the configured substrate.
pub(crate) struct Session {
    dispatcher: Dispatcher,
    surreal: Option<Arc<SurrealKvStore>>,
}

impl Session {
    /// Open the substrate named by `config` and build a dispatcher over it.
    pub(crate) fn open(config: &Config) -> anyhow::Result<Self> {
        let (kv, surreal): (Arc<dyn KvStore>, _) = match config.storage.backend {
            StorageBackend::Memory => {
                eprintln!(
                    "{}",
                    Theme::warning("memory backend: ledger state is discarded on exit")
                );
                (Arc::new(MemoryKvStore::new()) as Arc<dyn KvStore>, None)
            },
            StorageBackend::Surrealkv => {
                let Some(path) = &config.storage.path else {
                    bail!("storage.path is required for the surrealkv backend");
                };
                let store = Arc::new(
                    SurrealKvStore::open(path)
                        .with_context(|| format!("failed to open ledger at {}", path.display()))?,
                );
                debug!(path = %path.display(), "opened surrealkv ledger");
                (Arc::clone(&store) as Arc<dyn KvStore>, Some(store))
            },
        };

        let ledger = Ledger::new(kv).with_max_fetch_span(config.access_log.max_fetch_span);
        let dispatcher = Dispatcher::new(ledger)?;
        Ok(Self {
            dispatcher,
            surreal,
        })
    }

    /// Flush and close the substrate.
    pub(crate) async fn close(self) -> anyhow::Result<()> {
        if let Some(store) = self.surreal {
            store.close().await?;
        }
        Ok(())
    }
}

/// Create the ledger tables.
pub(crate) fn run_init(session: &Session) -> anyhow::Result<()> {
    session.dispatcher.init(&[])?;
    println!("{}", Theme::success("Ledger initialized"));
    Ok(())
}

/// Run an invoke operation and print its payload.
pub(crate) fn run_invoke(session: &Session, operation: &str, args: &[String]) -> anyhow::Result<()> {
    let payload = session.dispatcher.invoke(operation, args)?;
    print_payload(operation, &payload)
}

/// Run a query operation and print its payload.
pub(crate) fn run_query(session: &Session, operation: &str, args: &[String]) -> anyhow::Result<()> {
    let payload = session.dispatcher.query(operation, args)?;
    print_payload(operation, &payload)
}

/// List the operations each surface accepts.
pub(crate) fn list_operations(session: &Session) {
    println!("\n{}", Theme::header("Invoke operations"));
    println!("{}", Theme::separator());
    for name in session.dispatcher.invoke_operations() {
        println!("  {name}");
    }
    println!("\n{}", Theme::header("Query operations"));
    println!("{}", Theme::separator());
    for name in session.dispatcher.query_operations() {
        println!("  {name}");
    }
    println!();
}

/// Verify the access log chain and report every break.
pub(crate) fn run_verify(session: &Session) -> anyhow::Result<()> {
    if !session.dispatcher.is_initialized() {
        bail!("ledger not initialized; run `iamledger init` first");
    }
    let result: ChainVerification = session.dispatcher.ledger().access_log().verify()?;

    if result.valid {
        println!(
            "{}",
            Theme::success(&format!(
                "Access log intact ({} entries verified)",
                result.entries_verified
            ))
        );
        return Ok(());
    }

    println!(
        "{}",
        Theme::error(&format!(
            "Access log chain broken ({} issues)",
            result.issues.len()
        ))
    );
    for issue in &result.issues {
        println!("  {} {issue}", "-".red());
    }
    bail!("access log verification failed")
}

fn print_payload(operation: &str, payload: &[u8]) -> anyhow::Result<()> {
    if payload.is_empty() {
        println!("{}", Theme::success(&format!("{operation} completed")));
        return Ok(());
    }
    let value: serde_json::Value =
        serde_json::from_slice(payload).context("operation returned a non-JSON payload")?;
    if value.as_array().is_some_and(Vec::is_empty) {
        println!("{}", Theme::info("No records"));
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&value)?);

    // Access log records carry a decision worth calling out.
    if let (Some(user), Some(url), Some(authorized)) = (
        value.get("UserName").and_then(serde_json::Value::as_str),
        value.get("ResourceURL").and_then(serde_json::Value::as_str),
        value.get("IsAuthorized").and_then(serde_json::Value::as_bool),
    ) && value.get("Sequence").is_some()
    {
        println!("{}", Theme::verdict(user, url, authorized));
    }
    Ok(())
}
