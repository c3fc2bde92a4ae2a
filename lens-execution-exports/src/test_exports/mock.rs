// Copyright (c) 2022 MASSA LABS <info@massa.net>
// This file defines utilities to mock the crate for testing purposes

use crate::controller_traits::ChainStateController;
use crate::error::ExecutionError;
use lens_models::ChainId;
use lens_time::LensTime;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// One simulated chain: regularly spaced blocks from a genesis timestamp.
struct MockChain {
    /// timestamp of block 0
    genesis_timestamp: LensTime,
    /// time between consecutive blocks
    block_period: LensTime,
    /// current head height
    head: u64,
    /// heights at which `read` fails, to simulate provider outages
    failing_read_heights: HashSet<u64>,
}

/// Deterministic in-memory chain-state provider.
///
/// Block `h` of a chain has timestamp `genesis + h * period`, so timestamp
/// resolution is exact and reproducible. `read` echoes its arguments back as
/// a JSON object, letting tests assert on what a model body observed
/// (including the provider url routing) without a real data source.
#[derive(Default)]
pub struct MockChainState {
    chains: Mutex<HashMap<ChainId, MockChain>>,
}

impl MockChainState {
    /// Creates a provider with no chains
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a simulated chain
    pub fn add_chain(
        &self,
        chain_id: ChainId,
        genesis_timestamp: LensTime,
        block_period: LensTime,
        head: u64,
    ) {
        self.chains.lock().unwrap().insert(
            chain_id,
            MockChain {
                genesis_timestamp,
                block_period,
                head,
                failing_read_heights: Default::default(),
            },
        );
    }

    /// Moves the head of a chain
    pub fn set_head(&self, chain_id: ChainId, head: u64) {
        if let Some(chain) = self.chains.lock().unwrap().get_mut(&chain_id) {
            chain.head = head;
        }
    }

    /// Makes every `read` at the given height fail, to exercise
    /// partial-failure behavior
    pub fn fail_reads_at(&self, chain_id: ChainId, height: u64) {
        if let Some(chain) = self.chains.lock().unwrap().get_mut(&chain_id) {
            chain.failing_read_heights.insert(height);
        }
    }

    fn with_chain<T>(
        &self,
        chain_id: ChainId,
        f: impl FnOnce(&MockChain) -> Result<T, ExecutionError>,
    ) -> Result<T, ExecutionError> {
        let chains = self.chains.lock().unwrap();
        let chain = chains
            .get(&chain_id)
            .ok_or_else(|| ExecutionError::ChainState(format!("unknown chain {}", chain_id)))?;
        f(chain)
    }
}

impl ChainStateController for MockChainState {
    fn latest_height(&self, chain_id: ChainId) -> Result<u64, ExecutionError> {
        self.with_chain(chain_id, |chain| Ok(chain.head))
    }

    fn block_timestamp(&self, chain_id: ChainId, height: u64) -> Result<LensTime, ExecutionError> {
        self.with_chain(chain_id, |chain| {
            if height > chain.head {
                return Err(ExecutionError::ChainState(format!(
                    "no block at height {} on chain {}",
                    height, chain_id
                )));
            }
            Ok(chain
                .genesis_timestamp
                .saturating_add(chain.block_period.saturating_mul(height)))
        })
    }

    fn height_at_or_before(
        &self,
        chain_id: ChainId,
        timestamp: LensTime,
    ) -> Result<u64, ExecutionError> {
        self.with_chain(chain_id, |chain| {
            if timestamp < chain.genesis_timestamp {
                return Err(ExecutionError::BlockResolution(format!(
                    "chain {} has no block at or before timestamp {}",
                    chain_id, timestamp
                )));
            }
            let elapsed = timestamp.saturating_sub(chain.genesis_timestamp);
            let height = elapsed
                .checked_div_time(chain.block_period)
                .map_err(|err| ExecutionError::ChainState(err.to_string()))?;
            Ok(height.min(chain.head))
        })
    }

    fn read(
        &self,
        chain_id: ChainId,
        height: u64,
        provider_url: Option<&str>,
        method: &str,
        params: &Value,
    ) -> Result<Value, ExecutionError> {
        self.with_chain(chain_id, |chain| {
            if chain.failing_read_heights.contains(&height) {
                return Err(ExecutionError::ChainState(format!(
                    "injected read failure at height {} on chain {}",
                    height, chain_id
                )));
            }
            Ok(json!({
                "chain_id": chain_id,
                "height": height,
                "provider_url": provider_url,
                "method": method,
                "params": params,
            }))
        })
    }
}
