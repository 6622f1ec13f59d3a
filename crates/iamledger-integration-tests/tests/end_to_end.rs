//! End-to-end tests for the chaincode surface.
//!
//! Drives the dispatcher the way a hosting platform would: operation names
//! and string arguments in, JSON payloads out.

use std::sync::Arc;

use iamledger_chaincode::{ChaincodeError, Dispatcher};
use iamledger_core::{ChainVerification, Ledger, LedgerError, LogRecord, Policy, Resource};
use iamledger_storage::{KvStore, SurrealKvStore};
use serde_json::Value;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_owned()).collect()
}

fn ready() -> Dispatcher {
    let dispatcher = Dispatcher::new(Ledger::in_memory()).unwrap();
    dispatcher.init(&[]).unwrap();
    dispatcher
}

fn record_args<'a>(user: &'a str, date_time: &'a str) -> [&'a str; 7] {
    ["srv1", "10.0.0.1", "/api", user, "enroll-1", "true", date_time]
}

#[test]
fn test_register_grant_record_and_fetch() {
    let dispatcher = ready();

    dispatcher
        .invoke("resourcecreate", &args(&["srv1", "10.0.0.1", "/api"]))
        .unwrap();
    dispatcher
        .invoke("policycreate", &args(&["pol1", "/api", "alice", "true"]))
        .unwrap();
    dispatcher
        .invoke(
            "recordaccess",
            &args(&record_args("alice", "2024-01-01T00:00:00Z")),
        )
        .unwrap();

    let payload = dispatcher.invoke("fetchlogs", &args(&["0", "10"])).unwrap();
    let records: Vec<LogRecord> = serde_json::from_slice(&payload).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sequence, 0);
    assert!(records[0].previous_hash.is_genesis());
    assert_eq!(records[0].entry.user_name, "alice");
    assert!(records[0].entry.is_authorized);

    // Query and invoke return the same page.
    let queried = dispatcher.query("fetchlogs", &args(&["0", "10"])).unwrap();
    assert_eq!(payload, queried);
}

#[test]
fn test_payload_field_names_match_columns() {
    let dispatcher = ready();
    dispatcher
        .invoke("policycreate", &args(&["pol1", "/api", "alice", "false"]))
        .unwrap();

    let payload = dispatcher.query("policy", &args(&["pol1"])).unwrap();
    let value: Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(value["PolicyName"], "pol1");
    assert_eq!(value["ResourceURL"], "/api");
    assert_eq!(value["UserName"], "alice");
    assert_eq!(value["IsAuthorized"], false);

    dispatcher
        .invoke(
            "recordaccess",
            &args(&record_args("alice", "2024-01-01T00:00:00Z")),
        )
        .unwrap();
    let logs = dispatcher.query("fetchlogs", &args(&["0", "1"])).unwrap();
    let logs: Value = serde_json::from_slice(&logs).unwrap();
    for column in [
        "Sequence",
        "PreviousHash",
        "ResourceName",
        "ResourceIP",
        "ResourceURL",
        "UserName",
        "EnrollID",
        "IsAuthorized",
        "DateTime",
    ] {
        assert!(logs[0].get(column).is_some(), "missing {column}");
    }
}

#[test]
fn test_rejects_bad_arity_and_unknown_operations() {
    let dispatcher = ready();

    for (operation, count) in [
        ("resourcecreate", 2),
        ("policycreate", 3),
        ("policydelete", 0),
        ("policymodify", 4),
        ("fetchlogs", 1),
        ("recordaccess", 6),
        ("checkaccess", 5),
    ] {
        let supplied = vec!["x".to_owned(); count];
        assert!(
            matches!(
                dispatcher.invoke(operation, &supplied),
                Err(ChaincodeError::Ledger(LedgerError::InvalidArgument { .. }))
            ),
            "{operation} accepted {count} arguments"
        );
    }

    assert!(matches!(
        dispatcher.invoke("policyupsert", &[]),
        Err(ChaincodeError::UnknownOperation { .. })
    ));
    assert!(matches!(
        dispatcher.query("policydelete", &args(&["pol1"])),
        Err(ChaincodeError::UnknownOperation { .. })
    ));
}

#[test]
fn test_operations_before_init_are_rejected() {
    let dispatcher = Dispatcher::new(Ledger::in_memory()).unwrap();
    assert!(matches!(
        dispatcher.query("policies", &[]),
        Err(ChaincodeError::NotInitialized)
    ));
    dispatcher.init(&[]).unwrap();
    assert!(matches!(
        dispatcher.init(&[]),
        Err(ChaincodeError::AlreadyInitialized)
    ));
}

#[test]
fn test_policy_modify_then_get() {
    let dispatcher = ready();
    dispatcher
        .invoke("policycreate", &args(&["pol1", "/api", "alice", "true"]))
        .unwrap();

    dispatcher
        .invoke(
            "policymodify",
            &args(&["pol2", "pol1", "/admin", "alice", "true"]),
        )
        .unwrap();

    let payload = dispatcher.query("policy", &args(&["pol2"])).unwrap();
    let policy: Policy = serde_json::from_slice(&payload).unwrap();
    assert_eq!(policy, Policy::new("pol2", "/admin", "alice", true));

    assert!(matches!(
        dispatcher.query("policy", &args(&["pol1"])),
        Err(ChaincodeError::Ledger(LedgerError::NotFound { .. }))
    ));
}

#[test]
fn test_rejected_modify_keeps_old_policy() {
    let dispatcher = ready();
    dispatcher
        .invoke("policycreate", &args(&["pol1", "/api", "alice", "true"]))
        .unwrap();
    dispatcher
        .invoke("policycreate", &args(&["pol2", "/api", "bob", "true"]))
        .unwrap();

    // pol2 is live, so pol1 cannot be renamed onto it.
    assert!(matches!(
        dispatcher.invoke(
            "policymodify",
            &args(&["pol2", "pol1", "/admin", "alice", "true"])
        ),
        Err(ChaincodeError::Ledger(LedgerError::DuplicateKey { .. }))
    ));
    let kept: Policy =
        serde_json::from_slice(&dispatcher.query("policy", &args(&["pol1"])).unwrap()).unwrap();
    assert_eq!(kept, Policy::new("pol1", "/api", "alice", true));
}

#[test]
fn test_user_granted_on_several_resources() {
    let dispatcher = ready();
    for (name, url) in [("srv1", "/api"), ("srv2", "/admin")] {
        dispatcher
            .invoke("resourcecreate", &args(&[name, "10.0.0.1", url]))
            .unwrap();
    }
    dispatcher
        .invoke("policycreate", &args(&["pol1", "/api", "alice", "true"]))
        .unwrap();
    dispatcher
        .invoke("policycreate", &args(&["pol2", "/admin", "alice", "true"]))
        .unwrap();

    for (resource, at) in [("srv1", "2024-01-01T00:00:00Z"), ("srv2", "2024-01-01T00:00:01Z")] {
        let record: LogRecord = serde_json::from_slice(
            &dispatcher
                .invoke("checkaccess", &args(&[resource, "alice", "e1", at]))
                .unwrap(),
        )
        .unwrap();
        assert!(record.entry.is_authorized, "{resource} denied");
    }

    let policies: Vec<Policy> =
        serde_json::from_slice(&dispatcher.query("policies", &[]).unwrap()).unwrap();
    assert_eq!(policies.len(), 2);
}

#[test]
fn test_policy_delete_is_idempotent() {
    let dispatcher = ready();
    dispatcher
        .invoke("policycreate", &args(&["pol1", "/api", "alice", "true"]))
        .unwrap();

    let first = dispatcher.invoke("policydelete", &args(&["pol1"])).unwrap();
    let second = dispatcher.invoke("policydelete", &args(&["pol1"])).unwrap();
    assert!(first.is_empty());
    assert!(second.is_empty());

    let listed: Vec<Policy> =
        serde_json::from_slice(&dispatcher.query("policies", &[]).unwrap()).unwrap();
    assert!(listed.is_empty());
}

#[test]
fn test_duplicate_resource_is_rejected() {
    let dispatcher = ready();
    dispatcher
        .invoke("resourcecreate", &args(&["srv1", "10.0.0.1", "/api"]))
        .unwrap();
    assert!(matches!(
        dispatcher.invoke("resourcecreate", &args(&["srv1", "10.0.0.2", "/other"])),
        Err(ChaincodeError::Ledger(LedgerError::DuplicateKey { .. }))
    ));

    let payload = dispatcher.query("resource", &args(&["srv1"])).unwrap();
    let resource: Resource = serde_json::from_slice(&payload).unwrap();
    assert_eq!(resource.resource_ip, "10.0.0.1");
}

#[test]
fn test_payloads_escape_quotes_and_backticks() {
    let dispatcher = ready();
    let name = "pol \"quoted\" `ticked`";
    let payload = dispatcher
        .invoke("policycreate", &args(&[name, "/api?q=\"x\"", "alice", "true"]))
        .unwrap();

    let value: Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(value["PolicyName"], name);
    assert_eq!(value["ResourceURL"], "/api?q=\"x\"");

    let queried = dispatcher.query("policy", &args(&[name])).unwrap();
    assert_eq!(payload, queried);
}

#[test]
fn test_checkaccess_deny_wins() {
    let dispatcher = ready();
    dispatcher
        .invoke("resourcecreate", &args(&["srv1", "10.0.0.1", "/api"]))
        .unwrap();
    dispatcher
        .invoke("policycreate", &args(&["grant", "/api", "alice", "true"]))
        .unwrap();

    let granted: LogRecord = serde_json::from_slice(
        &dispatcher
            .invoke(
                "checkaccess",
                &args(&["srv1", "alice", "e1", "2024-01-01T00:00:00Z"]),
            )
            .unwrap(),
    )
    .unwrap();
    assert!(granted.entry.is_authorized);

    dispatcher
        .invoke("policycreate", &args(&["deny", "/api", "alice", "false"]))
        .unwrap();
    let denied: LogRecord = serde_json::from_slice(
        &dispatcher
            .invoke(
                "checkaccess",
                &args(&["srv1", "alice", "e1", "2024-01-01T00:00:01Z"]),
            )
            .unwrap(),
    )
    .unwrap();
    assert!(!denied.entry.is_authorized);
    assert_eq!(denied.sequence, 1);
    assert_eq!(denied.previous_hash, granted.content_hash());

    // Without a timestamp the current time is recorded.
    dispatcher
        .invoke("checkaccess", &args(&["srv1", "bob", "e2"]))
        .unwrap();
    assert_eq!(dispatcher.ledger().access_log().count().unwrap(), 3);
}

#[test]
fn test_fetchlogs_window_and_verification() {
    let dispatcher = ready();
    for (i, ts) in [
        "2024-01-01T00:00:00Z",
        "2024-01-01T00:00:01Z",
        "2024-01-01T00:00:02Z",
    ]
    .into_iter()
    .enumerate()
    {
        let user = format!("user{i}");
        dispatcher
            .invoke("recordaccess", &args(&record_args(&user, ts)))
            .unwrap();
    }

    let page: Vec<LogRecord> =
        serde_json::from_slice(&dispatcher.query("fetchlogs", &args(&["1", "3"])).unwrap())
            .unwrap();
    let sequences: Vec<u64> = page.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![1, 2]);

    let empty: Vec<LogRecord> =
        serde_json::from_slice(&dispatcher.query("fetchlogs", &args(&["5", "9"])).unwrap())
            .unwrap();
    assert!(empty.is_empty());

    assert!(matches!(
        dispatcher.query("fetchlogs", &args(&["3", "1"])),
        Err(ChaincodeError::Ledger(LedgerError::InvalidRange { .. }))
    ));

    let verification: ChainVerification =
        serde_json::from_slice(&dispatcher.query("verifylogs", &[]).unwrap()).unwrap();
    assert!(verification.valid);
    assert_eq!(verification.entries_verified, 3);
}

#[test]
fn test_ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    {
        let store = Arc::new(SurrealKvStore::open(dir.path()).unwrap());
        let dispatcher =
            Dispatcher::new(Ledger::new(Arc::clone(&store) as Arc<dyn KvStore>)).unwrap();
        dispatcher.init(&[]).unwrap();
        dispatcher
            .invoke("resourcecreate", &args(&["srv1", "10.0.0.1", "/api"]))
            .unwrap();
        dispatcher
            .invoke("policycreate", &args(&["pol1", "/api", "alice", "true"]))
            .unwrap();
        dispatcher
            .invoke(
                "checkaccess",
                &args(&["srv1", "alice", "e1", "2024-01-01T00:00:00Z"]),
            )
            .unwrap();
        drop(dispatcher);
        runtime.block_on(store.close()).unwrap();
    }

    let store = Arc::new(SurrealKvStore::open(dir.path()).unwrap());
    let dispatcher = Dispatcher::new(Ledger::new(Arc::clone(&store) as Arc<dyn KvStore>)).unwrap();
    assert!(dispatcher.is_initialized());
    assert!(matches!(
        dispatcher.init(&[]),
        Err(ChaincodeError::AlreadyInitialized)
    ));

    let policy: Policy =
        serde_json::from_slice(&dispatcher.query("policy", &args(&["pol1"])).unwrap()).unwrap();
    assert_eq!(policy.user_name, "alice");

    // The chain continues from the persisted tail.
    dispatcher
        .invoke(
            "checkaccess",
            &args(&["srv1", "bob", "e2", "2024-01-01T00:00:01Z"]),
        )
        .unwrap();
    let records: Vec<LogRecord> =
        serde_json::from_slice(&dispatcher.query("fetchlogs", &args(&["0", "10"])).unwrap())
            .unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[1].follows(&records[0]));

    let verification = dispatcher.ledger().access_log().verify().unwrap();
    assert!(verification.valid);
    drop(dispatcher);
    runtime.block_on(store.close()).unwrap();
}
