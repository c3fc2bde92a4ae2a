// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::ModelsError;
use lens_hash::Hash;
use rand::Rng;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::str::FromStr;

/// run id prefix used in its string representation
const RUNID_PREFIX: char = 'R';

/// Identity of one top-level run.
/// Fixed for the whole call tree of a request: every nested invocation
/// carries the run id of its root.
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub struct RunId(pub lens_hash::Hash);

impl RunId {
    /// Generates a fresh random run id.
    /// Used at the root of a run when the inbound request did not supply one.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let entropy: [u8; 32] = rng.gen();
        RunId(Hash::compute_from(&entropy))
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", RUNID_PREFIX, self.0.to_bs58_check())
    }
}

impl FromStr for RunId {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match chars.next() {
            Some(prefix) if prefix == RUNID_PREFIX => Ok(RunId(
                Hash::from_bs58_check(chars.as_str()).map_err(ModelsError::LensHashError)?,
            )),
            Some(prefix) => Err(ModelsError::WrongPrefix(
                RUNID_PREFIX.to_string(),
                prefix.to_string(),
            )),
            None => Err(ModelsError::DeserializeError("empty run id".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_string_roundtrip() {
        let run_id = RunId::generate();
        let s = run_id.to_string();
        assert!(s.starts_with(RUNID_PREFIX));
        assert_eq!(RunId::from_str(&s).unwrap(), run_id);
    }

    #[test]
    fn test_run_id_rejects_wrong_prefix() {
        let s = RunId::generate().to_string().replacen('R', "B", 1);
        assert!(RunId::from_str(&s).is_err());
    }

    #[test]
    fn test_generated_run_ids_differ() {
        assert_ne!(RunId::generate(), RunId::generate());
    }
}
