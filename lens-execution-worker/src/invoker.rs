// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Dispatch of a single model invocation: depth guard, registry lookup,
//! block override resolution, memoization and schema validation.

use crate::block_resolver::BlockResolver;
use crate::context::ExecutionContext;
use crate::model_api::ModelApiImpl;
use crate::result_cache::{CacheLookup, Fingerprint, InvocationOutcome, ResultCache};
use lens_execution_exports::{
    ChainStateController, ExecutionConfig, ExecutionError, ModelCall, ModelDescriptor,
    ModelRegistry,
};
use lens_models::{BlockSpec, ChainId, ModelSlug, ResolvedBlock, Version};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// Runs model invocations under a given run's cache and configuration.
///
/// Cloned freely: every nested `run_model` call re-enters the same invoker
/// through the API handle given to the body.
#[derive(Clone)]
pub(crate) struct Invoker {
    /// execution config
    pub(crate) config: ExecutionConfig,
    /// loaded models
    pub(crate) registry: Arc<dyn ModelRegistry>,
    /// chain state access
    pub(crate) chain_state: Arc<dyn ChainStateController>,
    /// block designation resolution
    pub(crate) resolver: BlockResolver,
    /// per-run memoization cache
    pub(crate) cache: Arc<ResultCache>,
}

impl Invoker {
    pub fn new(
        config: ExecutionConfig,
        registry: Arc<dyn ModelRegistry>,
        chain_state: Arc<dyn ChainStateController>,
        cache: Arc<ResultCache>,
    ) -> Self {
        let resolver = BlockResolver::new(chain_state.clone());
        Invoker {
            config,
            registry,
            chain_state,
            resolver,
            cache,
        }
    }

    /// Runs a nested invocation requested by a model body.
    pub fn invoke(
        &self,
        parent: &ExecutionContext,
        call: ModelCall,
    ) -> Result<Value, ExecutionError> {
        parent.check_deadline()?;
        parent.ensure_depth_available(self.config.max_depth)?;
        let descriptor = self.registry.resolve(&call.slug, call.version.as_ref())?;
        let chain_id = call.chain_id.unwrap_or(parent.chain_id);
        let block = self.resolve_target(parent, chain_id, call.block.as_ref())?;
        let context = parent.derive_child(chain_id, block, self.config.max_depth)?;
        self.invoke_with_context(context, descriptor, call.input)
    }

    /// Runs the root invocation of a top-level request, at the context's own depth.
    pub fn execute_in(
        &self,
        context: &ExecutionContext,
        slug: &ModelSlug,
        version: Option<&Version>,
        input: Value,
    ) -> Result<Value, ExecutionError> {
        context.check_deadline()?;
        let descriptor = self.registry.resolve(slug, version)?;
        self.invoke_with_context(context.clone(), descriptor, input)
    }

    /// Runs one series sample: a nested invocation of the anchor context,
    /// pinned to an already resolved block.
    pub fn invoke_resolved(
        &self,
        parent: &ExecutionContext,
        slug: &ModelSlug,
        version: Option<&Version>,
        input: Value,
        block: ResolvedBlock,
    ) -> Result<Value, ExecutionError> {
        parent.check_deadline()?;
        let descriptor = self.registry.resolve(slug, version)?;
        let context = parent.derive_child(parent.chain_id, block, self.config.max_depth)?;
        self.invoke_with_context(context, descriptor, input)
    }

    /// Resolves the block a call targets.
    ///
    /// Without an explicit override the call inherits the parent's resolved
    /// block on the same chain; on a different chain it resolves to that
    /// chain's block at the parent block's timestamp, so cross-chain reads
    /// still observe the same instant.
    fn resolve_target(
        &self,
        parent: &ExecutionContext,
        chain_id: ChainId,
        block: Option<&BlockSpec>,
    ) -> Result<ResolvedBlock, ExecutionError> {
        match block {
            Some(spec) => self.resolver.resolve(chain_id, spec),
            None if chain_id == parent.chain_id => Ok(parent.block),
            None => self
                .resolver
                .resolve(chain_id, &BlockSpec::at_timestamp(parent.block.timestamp)),
        }
    }

    /// Memoized execution of a descriptor in a fully derived context.
    fn invoke_with_context(
        &self,
        context: ExecutionContext,
        descriptor: Arc<ModelDescriptor>,
        input: Value,
    ) -> Result<Value, ExecutionError> {
        let fingerprint = Fingerprint::compute(
            &descriptor.slug,
            &descriptor.version,
            context.chain_id,
            context.block.height,
            &input,
        );
        match self.cache.begin(fingerprint, context.cache_policy) {
            CacheLookup::Hit(outcome) => {
                debug!(
                    "run {}: cache hit for {}@{} at {}",
                    context.run_id, descriptor.slug, descriptor.version, context.block
                );
                outcome
            }
            CacheLookup::Miss(guard) => {
                let policy = context.cache_policy;
                let outcome = self.execute_body(context, &descriptor, input);
                guard.complete(outcome.clone(), policy);
                outcome
            }
        }
    }

    /// Validates input, runs the body (catching panics), validates output.
    fn execute_body(
        &self,
        context: ExecutionContext,
        descriptor: &ModelDescriptor,
        input: Value,
    ) -> InvocationOutcome {
        descriptor.input_schema.validate(&input).map_err(|msg| {
            ExecutionError::InputValidation(format!(
                "{}@{}: {}",
                descriptor.slug, descriptor.version, msg
            ))
        })?;
        let api = ModelApiImpl::new(self.clone(), context);
        let body = descriptor.body.clone();
        let output = match catch_unwind(AssertUnwindSafe(|| body.run(&api, &input))) {
            Ok(result) => result?,
            Err(payload) => {
                let message = if let Some(msg) = payload.downcast_ref::<&str>() {
                    (*msg).to_string()
                } else if let Some(msg) = payload.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "model body panicked".to_string()
                };
                return Err(ExecutionError::ModelRun(format!(
                    "{}@{} panicked: {}",
                    descriptor.slug, descriptor.version, message
                )));
            }
        };
        descriptor.output_schema.validate(&output).map_err(|msg| {
            ExecutionError::OutputValidation(format!(
                "{}@{}: {}",
                descriptor.slug, descriptor.version, msg
            ))
        })?;
        Ok(output)
    }
}
