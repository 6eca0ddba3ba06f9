//! # Sealing Pipeline Integration
//!
//! Drives `BlockProducer` end to end over the in-memory chain store, pool
//! and state:
//!
//! 1. **Start → seal → commit**: first block lands at genesis + 1, commit
//!    metrics grow with the age of the committed block
//! 2. **Transactions**: a head event after new transactions yields a block carrying them
//! 3. **Dedup / supersession**: identical candidates are sealed once, superseded builds never
//! 4. **Result resolution**: duplicate and unknown results never reach the chain twice
//! 5. **Voting engines**: block processors installed on start are usable for validation

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use parking_lot::Mutex;
    use qc_17_block_production::adapters::{InstantSealEngine, MemoryState, ReferenceExecutor};
    use qc_17_block_production::{
        BlockProcessors, BlockProducerService, ChainStore, ConsensusEngine, ExecutionState,
        InterruptReason, MinerConfig, PipelineHooks, SealError, SealingTask, VotingEngine,
    };
    use shared_bus::{EventFilter, EventTopic};
    use shared_types::{Block, Hash, Header, ZERO_HASH};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    // =============================================================================
    // END TO END
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_empty_block_then_transactions() {
        let node = Node::new(Arc::new(InstantSealEngine::new()));
        let mut mined = node
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::BlockProduction]));

        node.producer.start().await.unwrap();
        let first = next_mined(&mut mined).await;
        assert_eq!(first.number(), 1);
        assert!(first.transactions.is_empty());
        let sealed_after_first = node.metrics.blocks_sealed();
        assert!(sealed_after_first >= 1);

        // Placeholders are never sealed, so empty-block production stops here
        node.producer.set_allow_empty_blocks(false);

        let txs = vec![funded_transfer(0), funded_transfer(1)];
        let hashes: Vec<Hash> = txs.iter().map(|tx| tx.hash()).collect();
        assert_eq!(node.pool.add_transactions(txs), 2);
        node.chain.notify_head();

        let with_txs = loop {
            let block = next_mined(&mut mined).await;
            if !block.transactions.is_empty() {
                break block;
            }
        };
        let included: Vec<Hash> = with_txs.transactions.iter().map(|tx| tx.hash()).collect();
        assert_eq!(included, hashes);
        assert!(with_txs.number() > first.number());
        assert!(node.metrics.blocks_sealed() > sealed_after_first);

        let stored = node.chain.block(&with_txs.hash()).expect("block in chain");
        assert_eq!(stored, with_txs);
        let state = node.chain.state_at(&with_txs.hash()).expect("state in chain");
        assert_eq!(state.nonce(&FUNDED), 2);

        quantum_telemetry::register_metrics().unwrap();
        let exposition = quantum_telemetry::encode_metrics().unwrap();
        assert!(exposition.contains("qc_miner_blocks_sealed_total"));

        node.producer.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_finalization_time_increases() {
        let clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            - 60;
        let engine = Arc::new(ScriptedEngine::default());
        let node = Node::with(
            MinerConfig::default(),
            engine.clone(),
            Arc::new(PinnedClockExecutor::at(clock)),
            PipelineHooks::default(),
        );

        node.producer.start().await.unwrap();
        eventually("first seal", || engine.seal_calls() == 1).await;
        let empty = engine.candidate(0);
        assert!(empty.transactions.is_empty());
        assert_eq!(empty.time(), clock);

        engine.deliver(Some(empty.with_seal(vec![1]))).await;
        eventually("first commit", || node.chain.current_height() == 1).await;
        let first_finalization = node.metrics.last_finalization_ms();
        let first_latency = node.metrics.last_commit_latency_ms();
        assert!(first_finalization >= 60_000);

        // The head advance rebuilds an empty block 2 first
        eventually("empty rebuild", || engine.seal_calls() == 2).await;
        node.pool
            .add_transactions(vec![funded_transfer(0), funded_transfer(1)]);
        node.chain.notify_head();
        eventually("rebuild with transactions", || engine.seal_calls() == 3).await;
        let full = engine.candidate(2);
        assert_eq!(full.number(), 2);
        assert_eq!(full.transactions.len(), 2);
        assert_eq!(full.time(), clock + 1);

        // Block 2 is one second younger; waiting longer than that makes it
        // strictly older at commit time
        tokio::time::sleep(Duration::from_millis(1_200)).await;
        engine.deliver(Some(full.with_seal(vec![2]))).await;
        eventually("second commit", || node.chain.current_height() == 2).await;

        assert!(node.metrics.last_finalization_ms() > first_finalization);
        assert!(node.metrics.last_commit_latency_ms() >= 1_200);
        assert!(node.metrics.last_commit_latency_ms() > first_latency);
        assert_eq!(node.metrics.blocks_sealed(), 2);

        node.producer.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_receipts_stamped_in_chain_store() {
        let config = MinerConfig {
            allow_empty_blocks: false,
            ..MinerConfig::default()
        };
        let node = Node::with(
            config,
            Arc::new(InstantSealEngine::new()),
            Arc::new(ReferenceExecutor::new().with_finalization_log()),
            PipelineHooks::default(),
        );
        let mut mined = node
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::BlockProduction]));
        node.pool
            .add_transactions((0..3).map(funded_transfer).collect());

        node.producer.start().await.unwrap();
        let block = next_mined(&mut mined).await;
        assert_eq!(block.transactions.len(), 3);

        let hash = block.hash();
        let receipts = node.chain.receipts(&hash).unwrap();
        assert_eq!(receipts.len(), 4);
        for (index, receipt) in receipts.iter().enumerate() {
            assert_eq!(receipt.block_hash, hash);
            assert_eq!(receipt.block_number, block.number());
            assert_eq!(receipt.transaction_index, index as u32);
        }
        for (receipt, tx) in receipts.iter().zip(&block.transactions) {
            assert_eq!(receipt.logs[0].tx_hash, tx.hash());
            assert_eq!(receipt.logs[0].block_hash, hash);
        }
        assert_eq!(receipts[3].tx_hash, ZERO_HASH);
        assert_eq!(receipts[3].logs[0].tx_hash, hash);

        let logs = node.chain.logs(&hash).unwrap();
        assert_eq!(logs.len(), 4);
        assert!(logs.iter().all(|log| log.block_number == block.number()));

        node.producer.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_snapshot_pairs_stay_consistent() {
        let node = Node::new(Arc::new(InstantSealEngine::new()));
        node.pool
            .add_transactions((0..5).map(funded_transfer).collect());
        node.producer.start().await.unwrap();

        let mut reads = 0;
        let deadline = tokio::time::Instant::now() + WAIT;
        while reads < 200 || node.metrics.blocks_sealed() < 5 {
            assert!(tokio::time::Instant::now() < deadline, "pipeline stalled");
            if let Some((block, state)) = node.producer.pending() {
                assert_eq!(block.header.state_root, state.root());
                reads += 1;
            }
            tokio::task::yield_now().await;
        }

        node.producer.close().await;
    }

    // =============================================================================
    // DEDUP AND SUPERSESSION
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_identical_candidates_sealed_once() {
        let received = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&received);
        let hooks = PipelineHooks {
            new_task: Some(Arc::new(move |_task: &SealingTask<MemoryState>| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            ..PipelineHooks::default()
        };
        let engine = Arc::new(ScriptedEngine::default());
        let node = Node::with(
            MinerConfig::default(),
            engine.clone(),
            Arc::new(PinnedClockExecutor::default()),
            hooks,
        );

        node.producer.start().await.unwrap();
        eventually("first seal", || engine.seal_calls() == 1).await;

        // Same head, same pool, same clock: the rebuild has the same seal hash
        node.chain.notify_head();
        eventually("second task", || received.load(Ordering::SeqCst) == 2).await;

        assert_eq!(engine.seal_calls(), 1);
        assert!(!engine.stop_token(0).is_cancelled());
        assert_eq!(node.producer.pending_task_count(), 1);

        node.producer.close().await;
        assert!(engine.stop_token(0).is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_superseded_build_never_sealed() {
        let engine = Arc::new(ScriptedEngine::default());
        let executor = Arc::new(GatedExecutor::default());
        let node = Node::with(
            MinerConfig::default(),
            engine.clone(),
            executor.clone(),
            PipelineHooks::default(),
        );

        node.producer.start().await.unwrap();
        eventually("first build", || executor.tokens().len() == 1).await;

        node.chain.notify_head();
        eventually("supersession", || executor.tokens()[0].is_superseded()).await;
        executor.open();

        eventually("second build sealed", || engine.seal_calls() == 1).await;
        let tokens = executor.tokens();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].reason(), InterruptReason::NewHead);
        assert!(!tokens[1].is_superseded());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.seal_calls(), 1);

        let sealed = engine.candidate(0).with_seal(vec![1]);
        engine.deliver(Some(sealed.clone())).await;
        eventually("commit", || node.chain.current_height() == 1).await;
        assert_eq!(node.chain.current_header().hash(), sealed.hash());

        node.producer.close().await;
    }

    // =============================================================================
    // RESULT RESOLUTION
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_duplicate_result_written_once() {
        let engine = Arc::new(ScriptedEngine::default());
        let node = Node::new(engine.clone());

        node.producer.start().await.unwrap();
        eventually("first seal", || engine.seal_calls() == 1).await;

        let first = engine.candidate(0).with_seal(vec![1]);
        engine.deliver(Some(first.clone())).await;
        engine.deliver(Some(first.clone())).await;
        engine.deliver(None).await;
        eventually("first commit", || node.chain.current_height() == 1).await;

        // The head advance triggers the next candidate; committing it proves
        // the duplicate ahead of it in the queue was already handled
        eventually("second seal", || engine.seal_calls() == 2).await;
        let second = engine.candidate(1).with_seal(vec![2]);
        assert_eq!(second.number(), 2);
        engine.deliver(Some(second)).await;
        eventually("second commit", || node.chain.current_height() == 2).await;

        assert_eq!(node.chain.write_count(), 2);
        assert_eq!(node.chain.block_by_number(1).unwrap().hash(), first.hash());

        node.producer.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unknown_result_dropped() {
        let engine = Arc::new(ScriptedEngine::default());
        let node = Node::new(engine.clone());

        node.producer.start().await.unwrap();
        eventually("first seal", || engine.seal_calls() == 1).await;

        let candidate = engine.candidate(0);
        let mut forged = candidate.clone();
        forged.header.extra_data = b"forged".to_vec();
        let forged = forged.with_seal(vec![1]);
        engine.deliver(Some(forged.clone())).await;

        let genuine = candidate.with_seal(vec![2]);
        engine.deliver(Some(genuine.clone())).await;
        eventually("genuine commit", || node.chain.current_height() == 1).await;

        assert_eq!(node.chain.write_count(), 1);
        assert!(node.chain.block(&forged.hash()).is_none());
        assert_eq!(node.chain.current_header().hash(), genuine.hash());

        node.producer.close().await;
    }

    // =============================================================================
    // VOTING ENGINES
    // =============================================================================

    /// Replays every candidate through the installed processors before sealing
    #[derive(Default)]
    struct ValidatingEngine {
        processors: Mutex<Option<BlockProcessors<MemoryState>>>,
        validating: AtomicBool,
        verified: AtomicUsize,
    }

    impl ConsensusEngine<MemoryState> for ValidatingEngine {
        fn seal_hash(&self, header: &Header) -> Hash {
            header.seal_hash()
        }

        fn seal(
            &self,
            chain: &dyn ChainStore<MemoryState>,
            block: Block,
            results: mpsc::Sender<Option<Block>>,
            stop: CancellationToken,
        ) -> Result<(), SealError> {
            if !self.validating.load(Ordering::SeqCst) {
                return Err(SealError::Rejected("not validating".into()));
            }
            let processors = self.processors.lock().clone().ok_or(SealError::Unsupported)?;
            if (processors.has_bad_block)(&block.header.parent_hash) {
                return Err(SealError::Rejected("bad parent".into()));
            }
            let parent = chain
                .state_at(&block.header.parent_hash)
                .ok_or_else(|| SealError::Rejected("unknown parent".into()))?;

            let processed = (processors.process)(&block, parent)
                .map_err(|e| SealError::Rejected(e.to_string()))?;
            (processors.validate_state)(
                &block,
                &processed.state,
                &processed.receipts,
                processed.used_gas,
            )
            .map_err(|e| SealError::Rejected(e.to_string()))?;
            self.verified.fetch_add(1, Ordering::SeqCst);

            let sealed = block.with_seal(b"quorum".to_vec());
            tokio::spawn(async move {
                tokio::select! {
                    _ = stop.cancelled() => {}
                    _ = results.send(Some(sealed)) => {}
                }
            });
            Ok(())
        }

        fn as_voting(&self) -> Option<&dyn VotingEngine<MemoryState>> {
            Some(self)
        }
    }

    impl VotingEngine<MemoryState> for ValidatingEngine {
        fn set_block_processors(&self, processors: BlockProcessors<MemoryState>) {
            *self.processors.lock() = Some(processors);
        }

        fn start_validating(&self) -> Result<(), SealError> {
            self.validating.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop_validating(&self) -> Result<(), SealError> {
            self.validating.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_primary(&self) -> bool {
            true
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_voting_engine_validates_before_sealing() {
        let config = MinerConfig {
            allow_empty_blocks: false,
            ..MinerConfig::default()
        };
        let engine = Arc::new(ValidatingEngine::default());
        let node = Node::with(
            config,
            engine.clone(),
            Arc::new(ReferenceExecutor::new()),
            PipelineHooks::default(),
        );
        let mut mined = node
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::BlockProduction]));
        node.pool.add_transactions(vec![funded_transfer(0)]);

        node.producer.start().await.unwrap();
        assert!(engine.validating.load(Ordering::SeqCst));

        let block = next_mined(&mut mined).await;
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.header.seal, b"quorum".to_vec());
        assert!(engine.verified.load(Ordering::SeqCst) >= 1);
        assert_eq!(node.metrics.seal_failures(), 0);

        node.producer.stop().await.unwrap();
        assert!(!engine.validating.load(Ordering::SeqCst));
        assert!(!node.producer.is_running());

        node.producer.close().await;
    }
}
