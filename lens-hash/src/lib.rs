// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Content hashing used for fingerprints and run identities.

#![warn(missing_docs)]

pub use error::LensHashError;
pub use settings::HASH_SIZE_BYTES;

mod error;
pub mod hash;
mod settings;

pub use hash::Hash;
