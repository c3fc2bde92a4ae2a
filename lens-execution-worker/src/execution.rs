// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! The run engine: turns top-level requests into root execution contexts
//! and drives single runs and series through the invoker.

use crate::context::ExecutionContext;
use crate::invoker::Invoker;
use crate::result_cache::ResultCache;
use crate::sampler::HistoricalSampler;
use lens_execution_exports::{
    ChainStateController, ExecutionConfig, ExecutionError, ModelRegistry, RunOutcome, RunRequest,
    SeriesOutcome, SeriesRequest,
};
use lens_models::RunId;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Stateless between requests: each top-level request gets a fresh result
/// cache, so memoization never leaks across runs.
pub(crate) struct RunEngine {
    config: ExecutionConfig,
    registry: Arc<dyn ModelRegistry>,
    chain_state: Arc<dyn ChainStateController>,
}

impl RunEngine {
    pub fn new(
        config: ExecutionConfig,
        registry: Arc<dyn ModelRegistry>,
        chain_state: Arc<dyn ChainStateController>,
    ) -> Self {
        RunEngine {
            config,
            registry,
            chain_state,
        }
    }

    /// Builds the root context and invoker of a top-level request.
    fn prepare(&self, req: &RunRequest) -> Result<(Invoker, ExecutionContext), ExecutionError> {
        if req.depth > self.config.max_depth {
            return Err(ExecutionError::RecursionLimitExceeded {
                depth: req.depth,
                max_depth: self.config.max_depth,
            });
        }
        let run_id = req.run_id.unwrap_or_else(RunId::generate);
        let cache = Arc::new(ResultCache::new(self.config.result_cache_size));
        let invoker = Invoker::new(
            self.config.clone(),
            self.registry.clone(),
            self.chain_state.clone(),
            cache,
        );
        let block = invoker.resolver.resolve(req.chain_id, &req.block)?;
        let from_block = match &req.from_block {
            Some(spec) => Some(invoker.resolver.resolve(req.chain_id, spec)?),
            None => None,
        };
        let deadline = req
            .deadline
            .or(self.config.run_deadline)
            .map(|d| Instant::now() + d.to_duration());
        let provider_map = Arc::new(req.provider_map.clone().unwrap_or_default());
        let context = ExecutionContext {
            chain_id: req.chain_id,
            block,
            from_block,
            run_id,
            depth: req.depth,
            cache_policy: req.cache_policy,
            provider_map,
            deadline,
        };
        debug!(
            "run {}: executing {} against chain {} at block {}",
            run_id, req.slug, req.chain_id, block
        );
        Ok((invoker, context))
    }

    /// Executes a single top-level run request.
    pub fn execute_run(&self, req: RunRequest) -> Result<RunOutcome, ExecutionError> {
        let (invoker, context) = self.prepare(&req)?;
        let output = invoker.execute_in(&context, &req.slug, req.version.as_ref(), req.input)?;
        Ok(RunOutcome {
            run_id: context.run_id,
            chain_id: context.chain_id,
            block: context.block,
            output,
        })
    }

    /// Executes a series request: the anchor block is resolved once from
    /// the inner run request, then the window is walked from it.
    pub fn execute_series(&self, req: SeriesRequest) -> Result<SeriesOutcome, ExecutionError> {
        let (invoker, context) = self.prepare(&req.run)?;
        let sampler = HistoricalSampler::new(invoker);
        let samples = sampler.run_series(
            &context,
            &req.run.slug,
            req.run.version.as_ref(),
            &req.run.input,
            &req.window,
        )?;
        Ok(SeriesOutcome {
            run_id: context.run_id,
            chain_id: context.chain_id,
            anchor: context.block,
            samples,
        })
    }
}
