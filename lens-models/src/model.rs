// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::ModelsError;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::cmp::Ordering;
use std::str::FromStr;

/// Name of a model: lowercase ascii alphanumerics separated by `.`, `-` or `_`
/// (e.g. `token.price`, `uniswap-v3.pool-tvl`).
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct ModelSlug(String);

impl ModelSlug {
    /// View the slug as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ModelSlug {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ModelsError::InvalidSlug("empty slug".to_string()));
        }
        let valid = s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'));
        if !valid {
            return Err(ModelsError::InvalidSlug(s.to_string()));
        }
        Ok(ModelSlug(s.to_string()))
    }
}

/// Version of a model, `major.minor.patch`.
/// Multiple versions of one slug may coexist in a registry;
/// an unspecified version resolves to the highest one known at load time.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub struct Version {
    /// major component
    pub major: u32,
    /// minor component
    pub minor: u32,
    /// patch component
    pub patch: u32,
}

impl Version {
    /// Builds a `Version` from its components
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(ModelsError::InvalidVersionError(s.to_string()));
        }
        let parse = |p: &str| {
            u32::from_str(p).map_err(|_| ModelsError::InvalidVersionError(s.to_string()))
        };
        Ok(Version {
            major: parse(parts[0])?,
            minor: parse(parts[1])?,
            patch: parse(parts[2])?,
        })
    }
}
