//! In-memory chain store

use crate::error::StoreError;
use crate::ports::{ChainStore, ExecutionState};
use parking_lot::RwLock;
use shared_bus::{BlockchainEvent, EventFilter, EventTopic, InMemoryEventBus, Subscription};
use shared_types::{Block, Hash, Header, Log, Receipt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

struct StoredBlock<S> {
    block: Block,
    receipts: Vec<Receipt>,
    logs: Vec<Log>,
    state: S,
}

struct ChainInner<S> {
    blocks: HashMap<Hash, StoredBlock<S>>,
    canonical: BTreeMap<u64, Hash>,
    head: Hash,
    bad_blocks: HashSet<Hash>,
    writes: u64,
}

/// Chain store holding every block, its receipts and a copy of its state.
///
/// Head updates are announced on the event bus as `ChainHead`.
pub struct InMemoryChainStore<S> {
    inner: RwLock<ChainInner<S>>,
    bus: Arc<InMemoryEventBus>,
}

impl<S: ExecutionState> InMemoryChainStore<S> {
    /// Create a chain whose genesis carries `state`
    pub fn new(genesis_state: S, bus: Arc<InMemoryEventBus>) -> Self {
        let header = Header {
            state_root: genesis_state.root(),
            gas_limit: crate::DEFAULT_GAS_LIMIT,
            ..Header::default()
        };
        Self::with_genesis(Block::new(header, vec![]), genesis_state, bus)
    }

    /// Create a chain from an explicit genesis block
    pub fn with_genesis(genesis: Block, genesis_state: S, bus: Arc<InMemoryEventBus>) -> Self {
        let hash = genesis.hash();
        let mut blocks = HashMap::new();
        let mut canonical = BTreeMap::new();
        canonical.insert(genesis.number(), hash);
        blocks.insert(
            hash,
            StoredBlock {
                block: genesis,
                receipts: Vec::new(),
                logs: Vec::new(),
                state: genesis_state,
            },
        );

        Self {
            inner: RwLock::new(ChainInner {
                blocks,
                canonical,
                head: hash,
                bad_blocks: HashSet::new(),
                writes: 0,
            }),
            bus,
        }
    }

    /// Block by hash
    pub fn block(&self, hash: &Hash) -> Option<Block> {
        self.inner.read().blocks.get(hash).map(|b| b.block.clone())
    }

    /// Canonical block at `number`
    pub fn block_by_number(&self, number: u64) -> Option<Block> {
        let inner = self.inner.read();
        let hash = inner.canonical.get(&number)?;
        inner.blocks.get(hash).map(|b| b.block.clone())
    }

    /// Receipts stored with block `hash`
    pub fn receipts(&self, hash: &Hash) -> Option<Vec<Receipt>> {
        self.inner.read().blocks.get(hash).map(|b| b.receipts.clone())
    }

    /// Logs stored with block `hash`
    pub fn logs(&self, hash: &Hash) -> Option<Vec<Log>> {
        self.inner.read().blocks.get(hash).map(|b| b.logs.clone())
    }

    /// Number of successful writes since creation
    pub fn write_count(&self) -> u64 {
        self.inner.read().writes
    }

    /// Record `hash` as a bad block
    pub fn mark_bad(&self, hash: Hash) {
        self.inner.write().bad_blocks.insert(hash);
    }

    /// Announce the current head again
    pub fn notify_head(&self) {
        let header = self.current_header();
        self.bus.emit(BlockchainEvent::ChainHead {
            hash: header.hash(),
            header,
        });
    }
}

impl<S: ExecutionState> ChainStore<S> for InMemoryChainStore<S> {
    fn current_header(&self) -> Header {
        let inner = self.inner.read();
        inner
            .blocks
            .get(&inner.head)
            .map(|b| b.block.header.clone())
            .unwrap_or_default()
    }

    fn has_block(&self, hash: &Hash, number: u64) -> bool {
        self.inner
            .read()
            .blocks
            .get(hash)
            .is_some_and(|b| b.block.number() == number)
    }

    fn state_at(&self, hash: &Hash) -> Option<S> {
        self.inner.read().blocks.get(hash).map(|b| b.state.copy())
    }

    fn write_block(
        &self,
        block: &Block,
        receipts: &[Receipt],
        logs: &[Log],
        state: &S,
        update_head: bool,
    ) -> Result<(), StoreError> {
        let hash = block.hash();
        {
            let mut inner = self.inner.write();
            if !inner.blocks.contains_key(&block.header.parent_hash) {
                return Err(StoreError::UnknownParent(block.header.parent_hash));
            }
            inner.blocks.insert(
                hash,
                StoredBlock {
                    block: block.clone(),
                    receipts: receipts.to_vec(),
                    logs: logs.to_vec(),
                    state: state.copy(),
                },
            );
            inner.writes += 1;
            if !update_head {
                return Ok(());
            }
            let number = block.number();
            inner.canonical.retain(|height, _| *height < number);
            inner.canonical.insert(block.number(), hash);
            inner.head = hash;
        }

        debug!(number = block.number(), hash = %hex::encode(hash), "[qc-17] Chain head updated");
        self.bus.emit(BlockchainEvent::ChainHead {
            header: block.header.clone(),
            hash,
        });
        Ok(())
    }

    fn has_bad_block(&self, hash: &Hash) -> bool {
        self.inner.read().bad_blocks.contains(hash)
    }

    fn subscribe_chain_head(&self) -> Subscription {
        self.bus.subscribe(EventFilter::topics(vec![EventTopic::Chain]))
    }
}
