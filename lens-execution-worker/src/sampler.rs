// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Historical sampling: repeated execution of one model across a sequence
//! of resolved blocks derived from a window specification.

use crate::block_resolver::BlockResolver;
use crate::context::ExecutionContext;
use crate::invoker::Invoker;
use lens_execution_exports::{ErrorPayload, ExecutionError, SeriesSample, WindowSpec};
use lens_models::{BlockSpec, ModelSlug, ResolvedBlock, Version};
use lens_time::LensTime;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// One expanded sample point, before block resolution.
#[derive(Debug)]
enum SamplePoint {
    Height(u64),
    Timestamp(LensTime),
}

/// Expands a window into sample points and runs one invocation per resolved
/// block. Execution failures stay local to their sample; only structural
/// failures (invalid window, exhausted deadline) abort the series.
pub(crate) struct HistoricalSampler {
    invoker: Invoker,
    resolver: BlockResolver,
}

impl HistoricalSampler {
    pub fn new(invoker: Invoker) -> Self {
        let resolver = invoker.resolver.clone();
        HistoricalSampler { invoker, resolver }
    }

    /// Runs the series anchored at `anchor_ctx.block`.
    ///
    /// Sample points that resolve to the same block height are collapsed to
    /// one sample. Points the chain cannot resolve at all (before genesis)
    /// are dropped with a warning. The returned samples are ordered by
    /// height ascending.
    pub fn run_series(
        &self,
        anchor_ctx: &ExecutionContext,
        slug: &ModelSlug,
        version: Option<&Version>,
        input: &Value,
        window: &WindowSpec,
    ) -> Result<Vec<SeriesSample>, ExecutionError> {
        let points = expand_window(anchor_ctx.block, window)?;
        let mut samples: Vec<SeriesSample> = Vec::with_capacity(points.len());
        let mut seen_heights: HashSet<u64> = HashSet::with_capacity(points.len());
        for point in points {
            anchor_ctx.check_deadline()?;
            let (spec, sample_timestamp) = match point {
                SamplePoint::Height(height) => (BlockSpec::Number(height), None),
                SamplePoint::Timestamp(ts) => (BlockSpec::at_timestamp(ts), Some(ts)),
            };
            let block = match self.resolver.resolve(anchor_ctx.chain_id, &spec) {
                Ok(block) => block,
                Err(err) => {
                    warn!(
                        "run {}: dropping series sample point {}: {}",
                        anchor_ctx.run_id, spec, err
                    );
                    continue;
                }
            };
            // distinct points may land on the same block; keep the first
            if !seen_heights.insert(block.height) {
                continue;
            }
            let sample_timestamp = sample_timestamp.unwrap_or(block.timestamp);
            let sample = match self.invoker.invoke_resolved(
                anchor_ctx,
                slug,
                version,
                input.clone(),
                block,
            ) {
                Ok(output) => SeriesSample {
                    height: block.height,
                    block_timestamp: block.timestamp,
                    sample_timestamp,
                    output: Some(output),
                    error: None,
                },
                Err(err @ ExecutionError::DeadlineExceeded) => return Err(err),
                Err(err) => SeriesSample {
                    height: block.height,
                    block_timestamp: block.timestamp,
                    sample_timestamp,
                    output: None,
                    error: Some(ErrorPayload::from(&err)),
                },
            };
            samples.push(sample);
        }
        samples.sort_by_key(|s| s.height);
        Ok(samples)
    }
}

/// Expands a window specification into sample points, anchor first.
fn expand_window(
    anchor: ResolvedBlock,
    window: &WindowSpec,
) -> Result<Vec<SamplePoint>, ExecutionError> {
    match window {
        WindowSpec::Blocks {
            window_blocks,
            interval_blocks,
        } => {
            if *interval_blocks == 0 {
                return Err(ExecutionError::InvalidWindow(
                    "interval_blocks must be strictly positive".to_string(),
                ));
            }
            let floor = anchor.height.saturating_sub(*window_blocks);
            let mut points = Vec::new();
            let mut height = anchor.height;
            loop {
                points.push(SamplePoint::Height(height));
                match height.checked_sub(*interval_blocks) {
                    Some(prev) if prev >= floor => height = prev,
                    _ => break,
                }
            }
            Ok(points)
        }
        WindowSpec::Time {
            window,
            interval,
            exclusive_end,
        } => {
            if interval.to_millis() == 0 {
                return Err(ExecutionError::InvalidWindow(
                    "interval must be strictly positive".to_string(),
                ));
            }
            let mut points = Vec::new();
            let mut k: u64 = 0;
            loop {
                let offset = interval.saturating_mul(k);
                if offset > *window {
                    break;
                }
                if *exclusive_end && offset == *window {
                    break;
                }
                points.push(SamplePoint::Timestamp(
                    anchor.timestamp.saturating_sub(offset),
                ));
                k = k.saturating_add(1);
            }
            Ok(points)
        }
        WindowSpec::BlockList { heights } => Ok(heights
            .iter()
            .map(|height| SamplePoint::Height(*height))
            .collect()),
        WindowSpec::TimestampList { timestamps } => Ok(timestamps
            .iter()
            .map(|ts| SamplePoint::Timestamp(*ts))
            .collect()),
    }
}
