// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Implementation of the capability handle given to executing model bodies.

use crate::context::ExecutionContext;
use crate::invoker::Invoker;
use lens_execution_exports::{ExecutionError, ModelApi, ModelCall};
use lens_models::{ChainId, ResolvedBlock, RunId};
use serde_json::Value;

/// The `ModelApi` handle of one invocation. Holds the invocation's own
/// immutable context, so nested calls derive from it and sibling
/// invocations never observe each other's overrides.
pub(crate) struct ModelApiImpl {
    invoker: Invoker,
    context: ExecutionContext,
}

impl ModelApiImpl {
    pub fn new(invoker: Invoker, context: ExecutionContext) -> Self {
        ModelApiImpl { invoker, context }
    }
}

impl ModelApi for ModelApiImpl {
    fn run_model(&self, call: ModelCall) -> Result<Value, ExecutionError> {
        self.invoker.invoke(&self.context, call)
    }

    fn chain_read(&self, method: &str, params: &Value) -> Result<Value, ExecutionError> {
        self.context.check_deadline()?;
        let provider_url = self.context.provider_url(&self.invoker.config);
        self.invoker.chain_state.read(
            self.context.chain_id,
            self.context.block.height,
            provider_url,
            method,
            params,
        )
    }

    fn chain_id(&self) -> ChainId {
        self.context.chain_id
    }

    fn block(&self) -> ResolvedBlock {
        self.context.block
    }

    fn from_block(&self) -> Option<ResolvedBlock> {
        self.context.from_block
    }

    fn run_id(&self) -> RunId {
        self.context.run_id
    }

    fn depth(&self) -> u32 {
        self.context.depth
    }
}
