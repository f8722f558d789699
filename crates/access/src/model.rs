use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A transaction as returned by an access service, with its execution result
/// already folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    /// Identifier of the block that sealed the transaction.
    pub block_id: String,
    /// Raw script bytes exactly as submitted.
    pub script: Vec<u8>,
    pub arguments: Vec<Argument>,
    pub authorizers: Vec<String>,
    /// Role name to the addresses acting in that role.
    pub stakeholders: BTreeMap<String, Vec<String>>,
    pub payer: String,
    pub proposal_key: ProposalKey,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub execution_effort: f64,
    pub fee: f64,
    pub status: String,
    /// Execution error message, if execution failed.
    pub error: Option<String>,
    pub events: Vec<Event>,
    pub imports: Vec<Import>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub name: String,
    pub address: String,
}

/// Proposal key metadata. Exposed to API consumers unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalKey {
    pub address: String,
    pub key_index: u32,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: String,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Returns the execution error message when it is present and non-empty.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|msg| !msg.is_empty())
    }
}
