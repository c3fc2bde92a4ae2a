// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! This file defines testing tools related to the configuration

use crate::ExecutionConfig;

impl Default for ExecutionConfig {
    /// default config used for testing
    fn default() -> Self {
        Self {
            max_depth: 64,
            result_cache_size: 16_384,
            request_queue_length: 128,
            run_deadline: None,
            default_provider_map: Default::default(),
        }
    }
}
