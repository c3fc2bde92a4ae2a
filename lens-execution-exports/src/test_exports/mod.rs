// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! This module exposes useful tooling for testing.
//! It is only compiled and exported by the crate if the "test-exports" feature is enabled.
//!
//!
//! # Architecture
//!
//! ## config.rs
//! Provides a default execution configuration for testing.
//!
//! ## mock.rs
//! Provides a deterministic in-memory chain-state provider to simulate
//! interactions with a blockchain data source within tests.

mod config;
mod mock;

pub use mock::*;
