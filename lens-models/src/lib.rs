// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Core value types shared by every crate of the model execution engine:
//! chain identities, block coordinates, model names and versions,
//! run identities and canonical input serialization.

#![warn(missing_docs)]

/// block specifications and resolved block coordinates
pub mod block;
/// chain identity
pub mod chain_id;
/// models errors
pub mod error;
/// model slugs and versions
pub mod model;
/// run identity
pub mod run_id;
/// canonical JSON serialization
pub mod serialization;

pub use block::{BlockSpec, ResolvedBlock};
pub use chain_id::ChainId;
pub use error::{ModelsError, ModelsResult};
pub use model::{ModelSlug, Version};
pub use run_id::RunId;
pub use serialization::canonical_json;
