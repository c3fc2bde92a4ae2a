// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! this file defines all possible execution error categories

use displaydoc::Display;
use thiserror::Error;

/// Errors of the execution component.
///
/// None of these are retried by the engine itself: every error is fatal to
/// the invocation that raised it and reported to its caller. Retrying, if
/// desired at all, is a caller or model-body policy layered on top.
#[non_exhaustive]
#[derive(Clone, Display, Error, Debug)]
pub enum ExecutionError {
    /// Block resolution error: {0}
    BlockResolution(String),

    /// Model not found: {0}
    ModelNotFound(String),

    /// Model load error: {0}
    ModelLoad(String),

    /// Input validation error: {0}
    InputValidation(String),

    /// Output validation error: {0}
    OutputValidation(String),

    /// Recursion limit exceeded: depth {depth} exceeds maximum {max_depth}
    RecursionLimitExceeded {
        /// depth the rejected invocation would have run at
        depth: u32,
        /// configured depth ceiling
        max_depth: u32,
    },

    /// Model run error: {0}
    ModelRun(String),

    /// Model data error ({code}): {message}
    ModelData {
        /// error code declared by the model's contract, passed through unmodified
        code: String,
        /// human readable message
        message: String,
    },

    /// Chain state provider error: {0}
    ChainState(String),

    /// Invalid series window: {0}
    InvalidWindow(String),

    /// Run deadline exceeded
    DeadlineExceeded,

    /// Channel error: {0}
    ChannelError(String),
}

impl ExecutionError {
    /// Stable machine-readable code for the error kind, used in boundary payloads.
    /// Domain-declared data errors keep the code declared by the model.
    pub fn code(&self) -> String {
        match self {
            ExecutionError::BlockResolution(_) => "block_resolution".into(),
            ExecutionError::ModelNotFound(_) => "model_not_found".into(),
            ExecutionError::ModelLoad(_) => "model_load".into(),
            ExecutionError::InputValidation(_) => "input_validation".into(),
            ExecutionError::OutputValidation(_) => "output_validation".into(),
            ExecutionError::RecursionLimitExceeded { .. } => "recursion_limit_exceeded".into(),
            ExecutionError::ModelRun(_) => "model_run".into(),
            ExecutionError::ModelData { code, .. } => code.clone(),
            ExecutionError::ChainState(_) => "chain_state".into(),
            ExecutionError::InvalidWindow(_) => "invalid_window".into(),
            ExecutionError::DeadlineExceeded => "deadline_exceeded".into(),
            ExecutionError::ChannelError(_) => "channel_error".into(),
        }
    }
}
