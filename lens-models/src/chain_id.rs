// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::ModelsError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identity of a blockchain network (1 = ethereum mainnet, 137 = polygon, ...)
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Builds a `ChainId` from its raw numeric identifier
    pub const fn new(id: u64) -> Self {
        ChainId(id)
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ChainId(u64::from_str(s).map_err(|_| {
            ModelsError::DeserializeError(format!("invalid chain id: {}", s))
        })?))
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId(id)
    }
}
