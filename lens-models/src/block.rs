// Copyright (c) 2022 MASSA LABS <info@massa.net>

use lens_time::LensTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ambiguous block designation provided by a caller.
///
/// Resolution against a given chain is deterministic:
/// a `BlockSpec` maps to exactly one concrete block height,
/// and resolving a later timestamp never yields an earlier block
/// than resolving an earlier timestamp (monotonicity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockSpec {
    /// an exact block height
    Number(u64),
    /// an exact block height accompanied by the timestamps the caller
    /// observed it at; resolution uses the height only (validated against
    /// the chain head, never clamped) and the chain's canonical timestamp,
    /// the carried values are kept so inbound requests round-trip
    Pinned {
        /// exact block height
        number: u64,
        /// block timestamp as known by the caller
        timestamp: LensTime,
        /// when the caller observed the block
        sample_timestamp: LensTime,
    },
    /// "the block whose timestamp is the closest one at or before `target_timestamp`,
    /// recorded as having been observed at `sample_timestamp`"
    Sample {
        /// point in time to sample the chain at
        target_timestamp: LensTime,
        /// when the sample was requested (kept for series bookkeeping)
        sample_timestamp: LensTime,
    },
}

impl BlockSpec {
    /// Convenience constructor for a timestamp sample observed at the same instant
    pub fn at_timestamp(timestamp: LensTime) -> Self {
        BlockSpec::Sample {
            target_timestamp: timestamp,
            sample_timestamp: timestamp,
        }
    }
}

impl std::fmt::Display for BlockSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BlockSpec::Number(height) => write!(f, "#{}", height),
            BlockSpec::Pinned { number, .. } => write!(f, "#{}", number),
            BlockSpec::Sample {
                target_timestamp, ..
            } => write!(f, "@{}", target_timestamp),
        }
    }
}

/// A concrete, immutable block coordinate: height plus canonical timestamp.
/// Produced once by block resolution and never mutated afterwards.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBlock {
    /// block height
    pub height: u64,
    /// canonical timestamp of the block
    pub timestamp: LensTime,
}

impl PartialOrd for ResolvedBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResolvedBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.height.cmp(&other.height)
    }
}

impl std::fmt::Display for ResolvedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{} ({})", self.height, self.timestamp.format_instant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_spec_serde_number() {
        let spec: BlockSpec = serde_json::from_str("15000000").unwrap();
        assert_eq!(spec, BlockSpec::Number(15_000_000));
        assert_eq!(serde_json::to_string(&spec).unwrap(), "15000000");
    }

    #[test]
    fn test_block_spec_serde_pinned_triple() {
        let json = r#"{"number":100,"timestamp":1640995200000,"sample_timestamp":1640995300000}"#;
        let spec: BlockSpec = serde_json::from_str(json).unwrap();
        assert_eq!(
            spec,
            BlockSpec::Pinned {
                number: 100,
                timestamp: LensTime::from_millis(1_640_995_200_000),
                sample_timestamp: LensTime::from_millis(1_640_995_300_000),
            }
        );
        // the triple form round-trips unchanged
        assert_eq!(serde_json::to_string(&spec).unwrap(), json);
    }

    #[test]
    fn test_block_spec_serde_sample() {
        let spec: BlockSpec = serde_json::from_str(
            r#"{"target_timestamp": 1640995200000, "sample_timestamp": 1640995300000}"#,
        )
        .unwrap();
        assert_eq!(
            spec,
            BlockSpec::Sample {
                target_timestamp: LensTime::from_millis(1_640_995_200_000),
                sample_timestamp: LensTime::from_millis(1_640_995_300_000),
            }
        );
    }

    #[test]
    fn test_resolved_block_orders_by_height() {
        let a = ResolvedBlock {
            height: 10,
            timestamp: LensTime::from_millis(99),
        };
        let b = ResolvedBlock {
            height: 11,
            timestamp: LensTime::from_millis(0),
        };
        assert!(a < b);
    }
}
