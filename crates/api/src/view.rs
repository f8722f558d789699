//! Flattened JSON shape returned by the lookup endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use txlookup_access::{Block, ProposalKey, Transaction};

/// Status reported for every transaction whose execution failed.
pub const ERROR_STATUS: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: String,
    pub block: BlockView,
    pub events: Vec<EventView>,
    pub error: String,
    pub fee: f64,
    pub status: String,
    pub arguments: Vec<KeyValue>,
    pub authorizers: Vec<String>,
    pub stakeholders: BTreeMap<String, Vec<String>>,
    pub payer: String,
    pub proposal_key: ProposalKey,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub execution_effort: f64,
    pub body: String,
    pub body_hash: String,
    pub imports: Vec<ImportView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockView {
    pub height: u64,
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventView {
    pub name: String,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportView {
    pub name: String,
    pub address: String,
}

impl TransactionView {
    /// Flatten a transaction and the block that contains it.
    pub fn new(tx: Transaction, block: Block) -> Self {
        let error = tx.error_message().unwrap_or_default().to_string();
        let status = if error.is_empty() {
            tx.status
        } else {
            ERROR_STATUS.to_string()
        };

        Self {
            id: tx.id,
            block: BlockView::from(block),
            events: tx
                .events
                .into_iter()
                .map(|ev| EventView {
                    name: ev.name,
                    fields: ev.fields,
                })
                .collect(),
            error,
            fee: tx.fee,
            status,
            arguments: tx
                .arguments
                .into_iter()
                .map(|arg| KeyValue {
                    key: arg.key,
                    value: arg.value,
                })
                .collect(),
            authorizers: tx.authorizers,
            stakeholders: tx.stakeholders,
            payer: tx.payer,
            proposal_key: tx.proposal_key,
            gas_limit: tx.gas_limit,
            gas_used: tx.gas_used,
            execution_effort: tx.execution_effort,
            body: String::from_utf8_lossy(&tx.script).into_owned(),
            body_hash: script_hash(&tx.script),
            imports: tx
                .imports
                .into_iter()
                .map(|import| ImportView {
                    name: import.name,
                    address: import.address,
                })
                .collect(),
        }
    }
}

impl From<Block> for BlockView {
    fn from(block: Block) -> Self {
        Self {
            height: block.height,
            id: block.id,
            timestamp: block.timestamp,
        }
    }
}

/// Lowercase hex SHA-256 of the raw script bytes.
pub fn script_hash(script: &[u8]) -> String {
    hex::encode(Sha256::digest(script))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use txlookup_access::{Argument, Event, Import};

    pub(crate) fn sample_transaction(id: &str) -> Transaction {
        let mut stakeholders = BTreeMap::new();
        stakeholders.insert("payer".to_string(), vec!["0x01".to_string()]);
        Transaction {
            id: id.to_string(),
            block_id: "block-1".to_string(),
            script: b"import FlowToken from 0x02\ntransaction(amount: UFix64) {}".to_vec(),
            arguments: vec![
                Argument {
                    key: "zeta".into(),
                    value: json!(1),
                },
                Argument {
                    key: "alpha".into(),
                    value: json!("two"),
                },
            ],
            authorizers: vec!["0x01".into()],
            stakeholders,
            payer: "0x01".into(),
            proposal_key: ProposalKey {
                address: "0x01".into(),
                key_index: 0,
                sequence_number: 9,
            },
            gas_limit: 9999,
            gas_used: 42,
            execution_effort: 0.25,
            fee: 0.001,
            status: "SEALED".into(),
            error: None,
            events: vec![
                Event {
                    name: "A.02.Z.Last".into(),
                    fields: Map::new(),
                },
                Event {
                    name: "A.02.A.First".into(),
                    fields: json!({"amount": 1.5}).as_object().cloned().unwrap(),
                },
            ],
            imports: vec![
                Import {
                    name: "Zed".into(),
                    address: "0x02".into(),
                },
                Import {
                    name: "Alpha".into(),
                    address: "0x03".into(),
                },
            ],
        }
    }

    pub(crate) fn sample_block() -> Block {
        Block {
            id: "block-1".into(),
            height: 77,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
        }
    }

    #[test]
    fn test_status_kept_without_error() {
        let view = TransactionView::new(sample_transaction("abc123"), sample_block());
        assert_eq!(view.status, "SEALED");
        assert_eq!(view.error, "");
    }

    #[test]
    fn test_status_overridden_on_error() {
        let mut tx = sample_transaction("abc123");
        tx.status = "EXECUTED".into();
        tx.error = Some("insufficient funds".into());
        let view = TransactionView::new(tx, sample_block());
        assert_eq!(view.status, ERROR_STATUS);
        assert_eq!(view.error, "insufficient funds");
    }

    #[test]
    fn test_empty_error_is_not_failure() {
        let mut tx = sample_transaction("abc123");
        tx.error = Some(String::new());
        let view = TransactionView::new(tx, sample_block());
        assert_eq!(view.status, "SEALED");
    }

    #[test]
    fn test_body_hash_uses_raw_bytes() {
        let mut tx = sample_transaction("abc123");
        tx.script = vec![0x66, 0x6f, 0xff, 0x6f];
        let view = TransactionView::new(tx, sample_block());
        assert_eq!(view.body, "fo\u{fffd}o");
        assert_eq!(view.body_hash, script_hash(&[0x66, 0x6f, 0xff, 0x6f]));
        assert_ne!(view.body_hash, script_hash(view.body.as_bytes()));
    }

    #[test]
    fn test_script_hash_known_value() {
        assert_eq!(
            script_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_lists_keep_source_order() {
        let view = TransactionView::new(sample_transaction("abc123"), sample_block());
        let args: Vec<_> = view.arguments.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(args, vec!["zeta", "alpha"]);
        let events: Vec<_> = view.events.iter().map(|ev| ev.name.as_str()).collect();
        assert_eq!(events, vec!["A.02.Z.Last", "A.02.A.First"]);
        let imports: Vec<_> = view.imports.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(imports, vec!["Zed", "Alpha"]);
    }

    #[test]
    fn test_json_shape() {
        let view = TransactionView::new(sample_transaction("abc123"), sample_block());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json["block"],
            json!({"height": 77, "id": "block-1", "timestamp": "2024-05-06T07:08:09Z"})
        );
        assert_eq!(json["proposalKey"]["sequenceNumber"], json!(9));
        assert_eq!(json["gasLimit"], json!(9999));
        assert_eq!(json["executionEffort"], json!(0.25));
        assert_eq!(json["bodyHash"], json!(view.body_hash));
        assert_eq!(json["imports"][0], json!({"name": "Zed", "address": "0x02"}));
        assert_eq!(json["arguments"][1], json!({"key": "alpha", "value": "two"}));
    }

    #[test]
    fn test_json_round_trip() {
        let mut tx = sample_transaction("abc123");
        tx.error = Some("boom".into());
        let view = TransactionView::new(tx, sample_block());
        let encoded = serde_json::to_string(&view).unwrap();
        let decoded: TransactionView = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, view);
    }
}
