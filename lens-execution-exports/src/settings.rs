// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! This module provides the structures used to provide configuration parameters to the execution system

use lens_models::ChainId;
use lens_time::LensTime;
use std::collections::HashMap;

/// Execution module configuration
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// maximum nesting depth of model invocations within one run
    /// (recursion/cycle guard: legitimate repeated calls to the same
    /// model at different blocks are expected and are not cycles,
    /// so the guard is a depth ceiling rather than identity-based
    /// cycle detection)
    pub max_depth: u32,
    /// maximum number of memoized invocation results kept per run
    pub result_cache_size: u32,
    /// run/series request queue length
    pub request_queue_length: usize,
    /// default deadline applied to a top-level run when the request
    /// does not carry one; `None` disables the deadline
    pub run_deadline: Option<LensTime>,
    /// process-wide default routing of chain id to provider url,
    /// overridable per run by the request's provider map
    pub default_provider_map: HashMap<ChainId, String>,
}
