// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! # Overview
//!
//! This crate implements the model runner worker: the execution context and
//! recursive invocation engine behind `lens-execution-exports`.
//!
//! A top-level run request names a chain, an ambiguous block designation
//! (an exact height or a timestamp to sample), a model and its input.
//! The worker resolves the block once, builds an immutable root context
//! (chain id, resolved block, run id, depth, provider routing, cache policy)
//! and invokes the target model. A model body may recursively invoke other
//! models through the same engine: each nested invocation derives a child
//! context at depth+1 that observes the same chain snapshot as its caller
//! unless it explicitly pins a different block or chain. Results are
//! memoized per run, keyed by a content fingerprint of
//! (slug, version, chain, block, canonical input), with at most one
//! concurrent execution per fingerprint.
//!
//! # Architecture
//!
//! ## block_resolver.rs
//! Turns a `BlockSpec` into a concrete `ResolvedBlock` against the chain-state provider.
//!
//! ## context.rs
//! The immutable per-invocation `ExecutionContext` and child-context derivation.
//!
//! ## invoker.rs
//! Model dispatch: registry lookup, override resolution, memoization, body
//! execution and failure classification.
//!
//! ## model_api.rs
//! Implementation of the `ModelApi` capability handed to model bodies.
//!
//! ## result_cache.rs
//! Per-run memoization cache with per-fingerprint in-flight coalescing.
//!
//! ## sampler.rs
//! Historical/series execution of one model across a window of blocks.
//!
//! ## controller.rs, runner_thread.rs, request_queue.rs
//! The worker thread owning the engine, and the controller used to talk to it.

#![warn(missing_docs)]

mod block_resolver;
mod context;
mod controller;
mod execution;
mod invoker;
mod model_api;
mod request_queue;
mod result_cache;
mod runner_thread;
mod sampler;

pub use runner_thread::start_runner_worker;

#[cfg(test)]
mod tests;
