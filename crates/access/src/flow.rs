//! Access service backed by the Flow Access REST API.

use crate::cadence;
use crate::script;
use crate::service::{AccessService, Session};
use crate::{AccessError, Argument, Block, Event, ProposalKey, Transaction};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Public REST endpoints for the well-known networks.
pub const KNOWN_NETWORKS: &[(&str, &str)] = &[
    ("mainnet", "https://rest-mainnet.onflow.org/v1/"),
    ("testnet", "https://rest-testnet.onflow.org/v1/"),
    ("emulator", "http://127.0.0.1:8888/v1/"),
];

const FEES_DEDUCTED_SUFFIX: &str = ".FlowFees.FeesDeducted";

/// Connects to Flow networks by name.
#[derive(Clone)]
pub struct FlowAccessService {
    endpoints: HashMap<String, Url>,
    http: Client,
}

impl FlowAccessService {
    /// Service knowing the public networks, with a 10 second request timeout.
    pub fn new() -> Result<Self, AccessError> {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AccessError> {
        Self::with_http_client(Client::builder().timeout(timeout).build()?)
    }

    /// Use an existing reqwest client (useful for custom TLS or middleware).
    pub fn with_http_client(http: Client) -> Result<Self, AccessError> {
        let mut service = Self {
            endpoints: HashMap::new(),
            http,
        };
        for (name, url) in KNOWN_NETWORKS {
            service.set_endpoint(name, url)?;
        }
        Ok(service)
    }

    /// Register or replace the REST base URL used for `network`.
    pub fn set_endpoint(&mut self, network: &str, base_url: &str) -> Result<(), AccessError> {
        let url = normalize_base_url(base_url)?;
        self.endpoints.insert(network.to_string(), url);
        Ok(())
    }

    pub fn endpoint(&self, network: &str) -> Option<&Url> {
        self.endpoints.get(network)
    }

    /// Names of every configured network, sorted.
    pub fn networks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.endpoints.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl AccessService for FlowAccessService {
    async fn connect(&self, network: &str) -> Result<Box<dyn Session>, AccessError> {
        let base_url = self
            .endpoints
            .get(network)
            .cloned()
            .ok_or_else(|| AccessError::UnknownNetwork(network.to_string()))?;
        Ok(Box::new(FlowSession {
            network: network.to_string(),
            base_url,
            http: self.http.clone(),
        }))
    }
}

/// Session against one network's REST endpoint.
pub struct FlowSession {
    network: String,
    base_url: Url,
    http: Client,
}

impl FlowSession {
    async fn get_json<T>(&self, path: &str) -> Result<T, AccessError>
    where
        T: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        debug!(network = %self.network, %url, "flow access request");
        let response = self.http.get(url).send().await?;
        Self::map_response(response).await
    }

    async fn map_response<T>(response: Response) -> Result<T, AccessError>
    where
        T: DeserializeOwned,
    {
        if !response.status().is_success() {
            return Err(Self::map_api_error(response).await);
        }
        Ok(response.json::<T>().await?)
    }

    async fn map_api_error(response: Response) -> AccessError {
        let status = response.status().as_u16();
        let bytes = response.bytes().await.unwrap_or_default();
        if let Ok(api_error) = serde_json::from_slice::<ApiErrorResponse>(&bytes) {
            if let Some(message) = api_error.message {
                return AccessError::server(status, message);
            }
        }
        AccessError::server(status, String::from_utf8_lossy(&bytes))
    }
}

#[async_trait]
impl Session for FlowSession {
    fn network(&self) -> &str {
        &self.network
    }

    async fn get_transaction_by_id(&self, id: &str) -> Result<Transaction, AccessError> {
        let id = normalize_id(id)?;
        let raw: RestTransaction = self
            .get_json(&format!("transactions/{id}?expand=result"))
            .await?;
        raw.into_transaction()
    }

    async fn get_block_by_id(&self, id: &str) -> Result<Block, AccessError> {
        let id = normalize_id(id)?;
        let blocks: Vec<RestBlock> = self.get_json(&format!("blocks/{id}")).await?;
        blocks
            .into_iter()
            .next()
            .ok_or_else(|| AccessError::NotFound {
                kind: "block",
                id: id.clone(),
            })?
            .into_block()
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url, AccessError> {
    let mut url =
        Url::parse(base_url).map_err(|_| AccessError::InvalidBaseUrl(base_url.to_string()))?;
    if !url.path().ends_with('/') {
        let mut path = url.path().trim_end_matches('/').to_owned();
        path.push('/');
        url.set_path(&path);
    }
    Ok(url)
}

/// Flow identifiers are 32 bytes, written as 64 hex characters.
fn normalize_id(id: &str) -> Result<String, AccessError> {
    let trimmed = id.trim();
    let bare = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(bare, &mut bytes)
        .map_err(|_| AccessError::InvalidIdentifier(format!("{id}: expected 32-byte hex string")))?;
    Ok(hex::encode(bytes))
}

fn with_prefix(address: &str) -> String {
    if address.starts_with("0x") {
        address.to_string()
    } else {
        format!("0x{address}")
    }
}

fn parse_u64(field: &str, value: &str) -> Result<u64, AccessError> {
    value
        .parse()
        .map_err(|err| AccessError::decode(format!("invalid {field} {value}: {err}")))
}

fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>, AccessError> {
    general_purpose::STANDARD
        .decode(value)
        .map_err(|err| AccessError::decode(format!("invalid base64 in {field}: {err}")))
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestTransaction {
    id: String,
    script: String,
    #[serde(default)]
    arguments: Vec<String>,
    gas_limit: String,
    payer: String,
    proposal_key: RestProposalKey,
    #[serde(default)]
    authorizers: Vec<String>,
    result: Option<RestTransactionResult>,
}

#[derive(Debug, Deserialize)]
struct RestProposalKey {
    address: String,
    key_index: String,
    sequence_number: String,
}

#[derive(Debug, Deserialize)]
struct RestTransactionResult {
    block_id: String,
    status: String,
    #[serde(default)]
    error_message: String,
    #[serde(default)]
    computation_used: Option<String>,
    #[serde(default)]
    events: Vec<RestEvent>,
}

#[derive(Debug, Deserialize)]
struct RestEvent {
    #[serde(rename = "type")]
    event_type: String,
    payload: String,
}

#[derive(Debug, Deserialize)]
struct RestBlock {
    header: RestBlockHeader,
}

#[derive(Debug, Deserialize)]
struct RestBlockHeader {
    id: String,
    height: String,
    timestamp: DateTime<Utc>,
}

impl RestBlock {
    fn into_block(self) -> Result<Block, AccessError> {
        Ok(Block {
            height: parse_u64("block height", &self.header.height)?,
            id: self.header.id,
            timestamp: self.header.timestamp,
        })
    }
}

impl RestEvent {
    fn into_event(self) -> Result<Event, AccessError> {
        let payload = decode_base64("event payload", &self.payload)?;
        let raw: Value = serde_json::from_slice(&payload)
            .map_err(|err| AccessError::decode(format!("invalid event payload: {err}")))?;
        let value = raw
            .get("value")
            .ok_or_else(|| AccessError::decode("event payload is missing its value"))?;
        Ok(Event {
            name: self.event_type,
            fields: cadence::decode_composite(value)?,
        })
    }
}

impl RestTransaction {
    fn into_transaction(self) -> Result<Transaction, AccessError> {
        let result = self
            .result
            .ok_or_else(|| AccessError::decode(format!("transaction {} has no result", self.id)))?;

        let script_bytes = decode_base64("script", &self.script)?;
        let source = String::from_utf8_lossy(&script_bytes);
        let imports = script::imports(&source);

        let values = self
            .arguments
            .iter()
            .map(|arg| cadence::decode_slice(&decode_base64("argument", arg)?))
            .collect::<Result<Vec<_>, _>>()?;
        let names = script::parameter_names(&source)
            .filter(|names| names.len() == values.len())
            .unwrap_or_else(|| (0..values.len()).map(|i| i.to_string()).collect());
        let arguments = names
            .into_iter()
            .zip(values)
            .map(|(key, value)| Argument { key, value })
            .collect();

        let events = result
            .events
            .into_iter()
            .map(RestEvent::into_event)
            .collect::<Result<Vec<_>, _>>()?;
        let (fee, execution_effort) = fees(&events);

        let payer = with_prefix(&self.payer);
        let authorizers: Vec<String> = self.authorizers.iter().map(|a| with_prefix(a)).collect();
        let proposal_key = ProposalKey {
            address: with_prefix(&self.proposal_key.address),
            key_index: self
                .proposal_key
                .key_index
                .parse()
                .map_err(|err| AccessError::decode(format!("invalid key index: {err}")))?,
            sequence_number: parse_u64("sequence number", &self.proposal_key.sequence_number)?,
        };
        let stakeholders = stakeholders(&authorizers, &payer, &proposal_key.address);

        Ok(Transaction {
            id: self.id,
            block_id: result.block_id,
            script: script_bytes,
            arguments,
            authorizers,
            stakeholders,
            payer,
            proposal_key,
            gas_limit: parse_u64("gas limit", &self.gas_limit)?,
            gas_used: result
                .computation_used
                .as_deref()
                .map(|used| parse_u64("computation used", used))
                .transpose()?
                .unwrap_or_default(),
            execution_effort,
            fee,
            status: result.status.to_uppercase(),
            error: Some(result.error_message).filter(|msg| !msg.is_empty()),
            events,
            imports,
        })
    }
}

/// Fee and execution effort reported by the fee deduction event.
fn fees(events: &[Event]) -> (f64, f64) {
    events
        .iter()
        .find(|ev| ev.name.ends_with(FEES_DEDUCTED_SUFFIX))
        .map(|ev| {
            let field = |name: &str| ev.fields.get(name).and_then(Value::as_f64).unwrap_or(0.0);
            (field("amount"), field("executionEffort"))
        })
        .unwrap_or((0.0, 0.0))
}

fn stakeholders(
    authorizers: &[String],
    payer: &str,
    proposer: &str,
) -> BTreeMap<String, Vec<String>> {
    let mut roles = BTreeMap::new();
    let mut unique = Vec::new();
    for address in authorizers {
        if !unique.contains(address) {
            unique.push(address.clone());
        }
    }
    roles.insert("authorizer".to_string(), unique);
    roles.insert("payer".to_string(), vec![payer.to_string()]);
    roles.insert("proposer".to_string(), vec![proposer.to_string()]);
    roles
}
