// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Integration-style tests of the runner worker, driven through the engine
//! and through the worker thread, against the deterministic mock chain-state
//! provider exported by `lens-execution-exports`.

mod scenarios_mandatories;

use crate::execution::RunEngine;
use lens_execution_exports::test_exports::MockChainState;
use lens_execution_exports::{
    ExecutionConfig, ModelBody, ModelDescriptor, RunRequest, StaticModelRegistry,
};
use lens_models::{BlockSpec, ChainId, ModelSlug, Version};
use lens_time::LensTime;
use std::str::FromStr;
use std::sync::Arc;

/// chain used by most scenarios
pub const CHAIN: ChainId = ChainId(1);
/// timestamp of block 0 of the mock chains
pub const GENESIS: u64 = 1_000_000;
/// time between consecutive blocks of the main mock chain
pub const PERIOD: u64 = 1_000;
/// head height of the mock chains
pub const HEAD: u64 = 10_000;

pub fn slug(s: &str) -> ModelSlug {
    ModelSlug::from_str(s).unwrap()
}

pub fn version(s: &str) -> Version {
    Version::from_str(s).unwrap()
}

/// A provider with one chain: block `h` at timestamp `GENESIS + h * PERIOD`
pub fn mock_chain_state() -> Arc<MockChainState> {
    let chain_state = MockChainState::new();
    chain_state.add_chain(
        CHAIN,
        LensTime::from_millis(GENESIS),
        LensTime::from_millis(PERIOD),
        HEAD,
    );
    Arc::new(chain_state)
}

pub fn descriptor(slug_str: &str, version_str: &str, body: Arc<dyn ModelBody>) -> ModelDescriptor {
    ModelDescriptor::new(slug(slug_str), version(version_str), body)
}

pub fn registry_with(descriptors: Vec<ModelDescriptor>) -> Arc<StaticModelRegistry> {
    let mut registry = StaticModelRegistry::new();
    for descriptor in descriptors {
        registry.register(descriptor).unwrap();
    }
    Arc::new(registry)
}

pub fn engine(
    registry: Arc<StaticModelRegistry>,
    chain_state: Arc<MockChainState>,
) -> RunEngine {
    RunEngine::new(ExecutionConfig::default(), registry, chain_state)
}

/// A run request on `CHAIN` with every optional field left at its default
pub fn base_request(slug_str: &str, block: BlockSpec) -> RunRequest {
    RunRequest {
        chain_id: CHAIN,
        block,
        slug: slug(slug_str),
        version: None,
        input: serde_json::Value::Null,
        from_block: None,
        run_id: None,
        depth: 0,
        provider_map: None,
        cache_policy: Default::default(),
        deadline: None,
    }
}
