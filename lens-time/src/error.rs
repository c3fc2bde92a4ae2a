// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// Time error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum TimeError {
    /// Time overflow error
    TimeOverflowError,
    /// Time conversion error
    ConversionError,
    /// Checked operation error: {0}
    CheckedOperationError(String),
}
