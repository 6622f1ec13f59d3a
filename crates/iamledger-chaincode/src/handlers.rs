//! Invoke and query handlers.
//!
//! Every handler parses its string arguments, delegates to the ledger and
//! encodes the result as JSON whose field names match the table columns.

use chrono::{SecondsFormat, Utc};
use iamledger_core::{AccessLogEntry, Ledger, LedgerError, Policy, Resource};
use serde::Serialize;

use crate::error::ChaincodeResult;
use crate::registry::{Arity, Operation};

/// Operations accepted by `invoke`.
pub(crate) fn invoke_operations() -> Vec<Operation> {
    vec![
        Operation::new("resourcecreate", Arity::Exact(3), resource_create),
        Operation::new("policycreate", Arity::Exact(4), policy_create),
        Operation::new("policydelete", Arity::Exact(1), policy_delete),
        Operation::new("policymodify", Arity::Exact(5), policy_modify),
        Operation::new("fetchlogs", Arity::Exact(2), fetch_logs),
        Operation::new("recordaccess", Arity::Exact(7), record_access),
        Operation::new("checkaccess", Arity::Between(3, 4), check_access),
    ]
}

/// Operations accepted by `query`. None of them writes.
pub(crate) fn query_operations() -> Vec<Operation> {
    vec![
        Operation::new("policy", Arity::Exact(1), get_policy),
        Operation::new("resource", Arity::Exact(1), get_resource),
        Operation::new("policies", Arity::Exact(0), list_policies),
        Operation::new("resources", Arity::Exact(0), list_resources),
        Operation::new("fetchlogs", Arity::Exact(2), fetch_logs),
        Operation::new("verifylogs", Arity::Exact(0), verify_logs),
    ]
}

fn payload<T: Serialize>(value: &T) -> ChaincodeResult<Vec<u8>> {
    Ok(serde_json::to_vec(value).map_err(LedgerError::from)?)
}

fn parse_flag(operation: &str, field: &str, value: &str) -> Result<bool, LedgerError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(LedgerError::invalid_argument(
            operation,
            format!("{field} must be 'true' or 'false', got '{other}'"),
        )),
    }
}

fn parse_index(operation: &str, field: &str, value: &str) -> Result<u64, LedgerError> {
    value.parse().map_err(|_| {
        LedgerError::invalid_argument(
            operation,
            format!("{field} must be a non-negative integer, got '{value}'"),
        )
    })
}

fn resource_create(ledger: &Ledger, args: &[String]) -> ChaincodeResult<Vec<u8>> {
    let resource = ledger
        .resources()
        .create(Resource::new(&args[0], &args[1], &args[2]))?;
    payload(&resource)
}

fn policy_create(ledger: &Ledger, args: &[String]) -> ChaincodeResult<Vec<u8>> {
    let is_authorized = parse_flag("policycreate", "IsAuthorized", &args[3])?;
    let policy = ledger
        .policies()
        .create(Policy::new(&args[0], &args[1], &args[2], is_authorized))?;
    payload(&policy)
}

fn policy_delete(ledger: &Ledger, args: &[String]) -> ChaincodeResult<Vec<u8>> {
    ledger.policies().delete(&args[0])?;
    Ok(Vec::new())
}

fn policy_modify(ledger: &Ledger, args: &[String]) -> ChaincodeResult<Vec<u8>> {
    let is_authorized = parse_flag("policymodify", "IsAuthorized", &args[4])?;
    let policy = ledger
        .policies()
        .modify(&args[1], Policy::new(&args[0], &args[2], &args[3], is_authorized))?;
    payload(&policy)
}

fn fetch_logs(ledger: &Ledger, args: &[String]) -> ChaincodeResult<Vec<u8>> {
    let from = parse_index("fetchlogs", "fromIndex", &args[0])?;
    let to = parse_index("fetchlogs", "toIndex", &args[1])?;
    payload(&ledger.access_log().fetch(from, to)?)
}

fn record_access(ledger: &Ledger, args: &[String]) -> ChaincodeResult<Vec<u8>> {
    let entry = AccessLogEntry {
        resource_name: args[0].clone(),
        resource_ip: args[1].clone(),
        resource_url: args[2].clone(),
        user_name: args[3].clone(),
        enroll_id: args[4].clone(),
        is_authorized: parse_flag("recordaccess", "IsAuthorized", &args[5])?,
        date_time: args[6].clone(),
    };
    payload(&ledger.access_log().record(entry)?)
}

fn check_access(ledger: &Ledger, args: &[String]) -> ChaincodeResult<Vec<u8>> {
    let date_time = args
        .get(3)
        .cloned()
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    payload(&ledger.check_access(&args[0], &args[1], &args[2], &date_time)?)
}

fn get_policy(ledger: &Ledger, args: &[String]) -> ChaincodeResult<Vec<u8>> {
    payload(&ledger.policies().get(&args[0])?)
}

fn get_resource(ledger: &Ledger, args: &[String]) -> ChaincodeResult<Vec<u8>> {
    payload(&ledger.resources().get(&args[0])?)
}

fn list_policies(ledger: &Ledger, _args: &[String]) -> ChaincodeResult<Vec<u8>> {
    payload(&ledger.policies().list()?)
}

fn list_resources(ledger: &Ledger, _args: &[String]) -> ChaincodeResult<Vec<u8>> {
    payload(&ledger.resources().list()?)
}

fn verify_logs(ledger: &Ledger, _args: &[String]) -> ChaincodeResult<Vec<u8>> {
    payload(&ledger.access_log().verify()?)
}
