// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! # Overview
//!
//! This crate provides all the facilities to interact with a running model runner worker
//! (lens-execution-worker crate) that is in charge of executing named, versioned models
//! against a pinned snapshot of chain state, recursively and with per-run memoization.
//!
//! # Usage
//!
//! When a runner worker is launched to run in a separate thread for the whole duration of
//! the process, an instance of `RunnerManager` is returned (see the documentation of
//! `start_runner_worker` in lens-execution-worker), as well as an instance of
//! `RunnerController`.
//!
//! The non-clonable `RunnerManager` allows stopping the runner worker thread.
//!
//! The clonable `RunnerController` allows submitting top-level run requests (single model
//! invocations) and series requests (repeated execution of one model across a sequence of
//! resolved blocks).
//!
//! # Architecture
//!
//! ## settings.rs
//! Contains configuration parameters for the execution system.
//!
//! ## controller_traits.rs
//! Defines the `RunnerManager` and `RunnerController` traits for interacting with the
//! runner worker, and the boundary traits supplied by the embedder:
//! `ChainStateController` (chain-state provider) and `ModelRegistry` (model loader).
//!
//! ## error.rs
//! Defines error types for the crate.
//!
//! ## registry.rs
//! Defines a process-lifetime in-memory model registry populated at startup.
//!
//! ## types.rs
//! Defines useful shared structures: model descriptors and bodies, run and series
//! requests/outcomes, window specifications, cache policy.
//!
//! ## Test exports
//!
//! When the crate feature `test-exports` is enabled, tooling useful for testing purposes
//! is exported. See test_exports/mod.rs for details.

#![warn(missing_docs)]

mod controller_traits;
mod error;
mod registry;
mod settings;
mod types;

pub use controller_traits::{ChainStateController, ModelRegistry, RunnerController, RunnerManager};
pub use error::ExecutionError;
pub use registry::StaticModelRegistry;
pub use settings::ExecutionConfig;
pub use types::{
    CachePolicy, ErrorPayload, FieldKind, ModelApi, ModelBody, ModelCall, ModelDescriptor,
    ModelManifestEntry, RunOutcome, RunRequest, Schema, SeriesOutcome, SeriesRequest, SeriesSample,
    WindowSpec,
};

#[cfg(any(test, feature = "test-exports"))]
pub mod test_exports;
