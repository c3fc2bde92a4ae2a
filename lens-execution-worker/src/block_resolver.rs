// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Block resolution: converting an ambiguous `BlockSpec` into a concrete
//! `ResolvedBlock` against the chain-state provider.
//!
//! Separating "what block" from "what value" lets every other component
//! treat the block as an opaque, already-resolved coordinate, so recursive
//! calls never re-interpret ambiguous specs inconsistently.

use lens_execution_exports::{ChainStateController, ExecutionError};
use lens_models::{BlockSpec, ChainId, ResolvedBlock};
use std::sync::Arc;

/// Resolves block specifications against the external chain-state provider.
#[derive(Clone)]
pub(crate) struct BlockResolver {
    chain_state: Arc<dyn ChainStateController>,
}

impl BlockResolver {
    /// Creates a new `BlockResolver`
    pub fn new(chain_state: Arc<dyn ChainStateController>) -> Self {
        BlockResolver { chain_state }
    }

    /// Resolves a `BlockSpec` to a concrete block height plus its canonical timestamp.
    ///
    /// For an exact height, a height beyond the chain's current head is an
    /// error, never a silent clamp. For a timestamp sample, resolution is
    /// idempotent against an unchanged chain tip: the same target timestamp
    /// always yields the same height.
    pub fn resolve(
        &self,
        chain_id: ChainId,
        spec: &BlockSpec,
    ) -> Result<ResolvedBlock, ExecutionError> {
        match spec {
            // the timestamps a pinned spec carries are the caller's
            // observation: resolution still uses the height and the chain's
            // canonical timestamp
            BlockSpec::Number(height) | BlockSpec::Pinned { number: height, .. } => {
                let head = self.chain_state.latest_height(chain_id)?;
                if *height > head {
                    return Err(ExecutionError::BlockResolution(format!(
                        "block {} is beyond chain {} head {}",
                        height, chain_id, head
                    )));
                }
                let timestamp = self.chain_state.block_timestamp(chain_id, *height)?;
                Ok(ResolvedBlock {
                    height: *height,
                    timestamp,
                })
            }
            BlockSpec::Sample {
                target_timestamp, ..
            } => {
                let height = self
                    .chain_state
                    .height_at_or_before(chain_id, *target_timestamp)?;
                let timestamp = self.chain_state.block_timestamp(chain_id, height)?;
                Ok(ResolvedBlock { height, timestamp })
            }
        }
    }
}
