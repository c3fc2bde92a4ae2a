// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// Result alias for `ModelsError`
pub type ModelsResult<T, E = ModelsError> = core::result::Result<T, E>;

/// models error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum ModelsError {
    /// Serialization error: {0}
    SerializeError(String),
    /// Deserialization error: {0}
    DeserializeError(String),
    /// invalid model slug: {0}
    InvalidSlug(String),
    /// invalid version identifier: {0}
    InvalidVersionError(String),
    /// hash error: {0}
    LensHashError(#[from] lens_hash::LensHashError),
    /// time error: {0}
    TimeError(#[from] lens_time::TimeError),
    /// Wrong prefix for hash: expected {0}, got {1}
    WrongPrefix(String, String),
}
