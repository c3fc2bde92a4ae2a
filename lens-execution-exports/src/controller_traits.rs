// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! This module exports generic traits representing interfaces for interacting
//! with the runner worker, and the boundary capabilities the embedder supplies:
//! a chain-state provider and a model registry.

use crate::error::ExecutionError;
use crate::types::{ModelDescriptor, ModelManifestEntry, RunOutcome, RunRequest};
use crate::types::{SeriesOutcome, SeriesRequest};
use lens_models::{ChainId, ModelSlug, Version};
use lens_time::LensTime;
use serde_json::Value;
use std::sync::Arc;

/// Capability to fetch chain state at a given block, supplied by an external
/// data provider. The engine never interprets chain data itself: it only
/// needs block coordinates and the ability to route pinned-height reads.
pub trait ChainStateController: Send + Sync {
    /// Current head height of a chain
    fn latest_height(&self, chain_id: ChainId) -> Result<u64, ExecutionError>;

    /// Canonical timestamp of the block at `height`
    fn block_timestamp(&self, chain_id: ChainId, height: u64) -> Result<LensTime, ExecutionError>;

    /// Height of the block whose timestamp is the closest one at or before `timestamp`.
    ///
    /// Must be deterministic against an unchanged chain tip, and monotonic:
    /// for T1 <= T2, the height returned for T1 is never greater than the
    /// height returned for T2. If the chain has no block at or before
    /// `timestamp`, fails with `ExecutionError::BlockResolution`.
    fn height_at_or_before(
        &self,
        chain_id: ChainId,
        timestamp: LensTime,
    ) -> Result<u64, ExecutionError>;

    /// Arbitrary read call at a pinned height (contract call, ledger query...).
    ///
    /// # Arguments
    /// * `provider_url`: explicit provider routing resolved from the run's
    ///   provider map, `None` to use the provider's own default
    fn read(
        &self,
        chain_id: ChainId,
        height: u64,
        provider_url: Option<&str>,
        method: &str,
        params: &Value,
    ) -> Result<Value, ExecutionError>;
}

/// Lookup capability over the process-lifetime set of loaded models.
/// Populated at startup by an external loader and never mutated during
/// request handling, so it requires no locking.
pub trait ModelRegistry: Send + Sync {
    /// Resolves a (slug, optional version) pair to a loaded descriptor.
    /// An unspecified version resolves to the highest version known at load time.
    fn resolve(
        &self,
        slug: &ModelSlug,
        version: Option<&Version>,
    ) -> Result<Arc<ModelDescriptor>, ExecutionError>;

    /// Lists all known (slug, version) tuples
    fn manifest(&self) -> Vec<ModelManifestEntry>;
}

/// interface that communicates with the runner worker thread
pub trait RunnerController: Send + Sync {
    /// Executes a top-level run request: resolves the block, builds the root
    /// context, executes the target model (which may recursively invoke other
    /// models), and returns its output.
    fn execute_run(&self, req: RunRequest) -> Result<RunOutcome, ExecutionError>;

    /// Executes a model across a sequence of resolved blocks, producing an
    /// ordered time series of samples.
    fn execute_series(&self, req: SeriesRequest) -> Result<SeriesOutcome, ExecutionError>;

    /// Returns a boxed clone of self.
    /// Useful to allow cloning `Box<dyn RunnerController>`.
    fn clone_box(&self) -> Box<dyn RunnerController>;
}

/// Allow cloning `Box<dyn RunnerController>`
/// Uses `RunnerController::clone_box` internally
impl Clone for Box<dyn RunnerController> {
    fn clone(&self) -> Box<dyn RunnerController> {
        self.clone_box()
    }
}

/// Runner manager used to stop the runner thread
pub trait RunnerManager {
    /// Stop the runner thread
    /// Note that we do not take self by value to consume it
    /// because it is not allowed to move out of `Box<dyn RunnerManager>`
    /// This will improve if the `unsized_fn_params` feature stabilizes enough to be safely usable.
    fn stop(&mut self);
}
