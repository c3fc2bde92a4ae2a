// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! The per-invocation execution context.
//!
//! A context is an immutable value: deriving a child context never changes
//! the parent, so concurrent sibling invocations can hold references to the
//! same parent without coordination.

use lens_execution_exports::{CachePolicy, ExecutionConfig, ExecutionError};
use lens_models::{ChainId, ResolvedBlock, RunId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Immutable bundle of chain identity, resolved block, run identity, depth
/// and routing under which one invocation executes.
#[derive(Debug, Clone)]
pub(crate) struct ExecutionContext {
    /// chain the invocation is pinned to
    pub chain_id: ChainId,
    /// block the invocation is pinned to
    pub block: ResolvedBlock,
    /// optional window start block carried by the top-level request
    pub from_block: Option<ResolvedBlock>,
    /// identity of the whole run, fixed across the call tree
    pub run_id: RunId,
    /// nesting depth; strictly increases by exactly 1 per nested invocation
    pub depth: u32,
    /// memoization policy for this run
    pub cache_policy: CachePolicy,
    /// per-run provider routing overrides
    pub provider_map: Arc<HashMap<ChainId, String>>,
    /// cooperative cancellation deadline of the run
    pub deadline: Option<Instant>,
}

impl ExecutionContext {
    /// Fails if deriving one more level of nesting would exceed the depth ceiling.
    /// Checked at the start of every invocation so that a cycle is rejected
    /// before any other work is done.
    pub fn ensure_depth_available(&self, max_depth: u32) -> Result<(), ExecutionError> {
        let depth = self.depth.saturating_add(1);
        if depth > max_depth {
            return Err(ExecutionError::RecursionLimitExceeded { depth, max_depth });
        }
        Ok(())
    }

    /// Derives the context of a nested invocation: depth+1, same run id,
    /// same routing and deadline, pinned to the given chain and block.
    pub fn derive_child(
        &self,
        chain_id: ChainId,
        block: ResolvedBlock,
        max_depth: u32,
    ) -> Result<Self, ExecutionError> {
        self.ensure_depth_available(max_depth)?;
        Ok(ExecutionContext {
            chain_id,
            block,
            depth: self.depth.saturating_add(1),
            ..self.clone()
        })
    }

    /// Cooperative cancellation check, performed at the start of every
    /// invocation and before each series step.
    pub fn check_deadline(&self) -> Result<(), ExecutionError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ExecutionError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Provider url for the pinned chain: the run's explicit map first,
    /// then the process-wide default routing.
    pub fn provider_url<'a>(&'a self, config: &'a ExecutionConfig) -> Option<&'a str> {
        self.provider_map
            .get(&self.chain_id)
            .or_else(|| config.default_provider_map.get(&self.chain_id))
            .map(String::as_str)
    }
}
