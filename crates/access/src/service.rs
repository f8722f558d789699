use crate::{AccessError, Block, Transaction};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Network used when a caller does not name one.
pub const DEFAULT_NETWORK: &str = "mainnet";

/// Entry point to a blockchain access service.
#[async_trait]
pub trait AccessService: Send + Sync {
    /// Open a session bound to the named network.
    async fn connect(&self, network: &str) -> Result<Box<dyn Session>, AccessError>;
}

/// Read-only view of one network.
#[async_trait]
pub trait Session: Send + Sync {
    fn network(&self) -> &str;

    async fn get_transaction_by_id(&self, id: &str) -> Result<Transaction, AccessError>;

    async fn get_block_by_id(&self, id: &str) -> Result<Block, AccessError>;
}

#[derive(Default)]
struct NetworkData {
    transactions: HashMap<String, Transaction>,
    blocks: HashMap<String, Block>,
}

/// In-memory access service keyed by network name. Counts every call it
/// serves so callers can assert which lookups actually happened.
#[derive(Clone, Default)]
pub struct MemoryAccessService {
    networks: Arc<RwLock<HashMap<String, NetworkData>>>,
    calls: Arc<AtomicUsize>,
    connected: Arc<RwLock<Vec<String>>>,
}

impl MemoryAccessService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a network with no content so `connect` succeeds for it.
    pub fn add_network(&self, network: &str) {
        self.networks
            .write()
            .entry(network.to_string())
            .or_default();
    }

    pub fn insert_transaction(&self, network: &str, tx: Transaction) {
        self.networks
            .write()
            .entry(network.to_string())
            .or_default()
            .transactions
            .insert(tx.id.clone(), tx);
    }

    pub fn insert_block(&self, network: &str, block: Block) {
        self.networks
            .write()
            .entry(network.to_string())
            .or_default()
            .blocks
            .insert(block.id.clone(), block);
    }

    /// Total number of connect and fetch calls served.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Networks passed to `connect`, in call order.
    pub fn connected_networks(&self) -> Vec<String> {
        self.connected.read().clone()
    }
}

#[async_trait]
impl AccessService for MemoryAccessService {
    async fn connect(&self, network: &str) -> Result<Box<dyn Session>, AccessError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.connected.write().push(network.to_string());
        if !self.networks.read().contains_key(network) {
            return Err(AccessError::UnknownNetwork(network.to_string()));
        }
        Ok(Box::new(MemorySession {
            service: self.clone(),
            network: network.to_string(),
        }))
    }
}

struct MemorySession {
    service: MemoryAccessService,
    network: String,
}

#[async_trait]
impl Session for MemorySession {
    fn network(&self) -> &str {
        &self.network
    }

    async fn get_transaction_by_id(&self, id: &str) -> Result<Transaction, AccessError> {
        self.service.calls.fetch_add(1, Ordering::Relaxed);
        self.service
            .networks
            .read()
            .get(&self.network)
            .and_then(|data| data.transactions.get(id).cloned())
            .ok_or_else(|| AccessError::NotFound {
                kind: "transaction",
                id: id.to_string(),
            })
    }

    async fn get_block_by_id(&self, id: &str) -> Result<Block, AccessError> {
        self.service.calls.fetch_add(1, Ordering::Relaxed);
        self.service
            .networks
            .read()
            .get(&self.network)
            .and_then(|data| data.blocks.get(id).cloned())
            .ok_or_else(|| AccessError::NotFound {
                kind: "block",
                id: id.to_string(),
            })
    }
}
