// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// Hash error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum LensHashError {
    /// Parsing error: {0}
    ParsingError(String),
    /// Wrong hash size, expected 32 bytes
    WrongSize,
}
