// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Per-run memoization of invocation outcomes, keyed by fingerprint.
//!
//! The cache also coalesces concurrent duplicate work: at most one thread
//! computes a given fingerprint at a time, all others block until the
//! computation finishes and then observe its published outcome.

use lens_execution_exports::{CachePolicy, ExecutionError};
use lens_hash::Hash;
use lens_models::{canonical_json, ChainId, ModelSlug, Version};
use parking_lot::{Condvar, Mutex};
use schnellru::{ByLength, LruMap};
use serde_json::Value;
use std::collections::HashMap;
use std::thread::{self, ThreadId};

/// Identity of one invocation for memoization purposes: model, resolved
/// version, chain, block height and canonical input, hashed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Fingerprint(Hash);

impl Fingerprint {
    /// Computes the fingerprint of an invocation.
    ///
    /// The input value is canonicalized first so that two JSON objects with
    /// the same keys in a different order produce the same fingerprint.
    pub fn compute(
        slug: &ModelSlug,
        version: &Version,
        chain_id: ChainId,
        height: u64,
        input: &Value,
    ) -> Self {
        let version = version.to_string();
        let input = canonical_json(input);
        Fingerprint(Hash::compute_from_tuple(&[
            slug.as_str().as_bytes(),
            version.as_bytes(),
            &chain_id.0.to_be_bytes(),
            &height.to_be_bytes(),
            input.as_bytes(),
        ]))
    }
}

/// Outcome of one invocation as stored in the cache. Errors are cached as
/// well: a deterministic failure repeats on retry, so there is no point
/// re-running the body within the same run.
pub(crate) type InvocationOutcome = Result<Value, ExecutionError>;

/// Outcomes that depend on where in the run they surfaced rather than on
/// the fingerprint itself must never be published: a recursion failure deep
/// in one call chain does not mean a shallower invocation of the same
/// fingerprint fails, and a deadline failure is a property of the clock.
fn is_cacheable(outcome: &InvocationOutcome) -> bool {
    !matches!(
        outcome,
        Err(ExecutionError::RecursionLimitExceeded { .. }) | Err(ExecutionError::DeadlineExceeded)
    )
}

struct CacheState {
    /// published outcomes
    results: LruMap<Fingerprint, InvocationOutcome>,
    /// fingerprints currently being computed, with the computing thread
    in_flight: HashMap<Fingerprint, ThreadId>,
}

/// Memoization cache scoped to a single top-level run.
pub(crate) struct ResultCache {
    state: Mutex<CacheState>,
    /// notified whenever an in-flight computation finishes or is abandoned
    wakeup: Condvar,
}

/// Result of a cache lookup.
pub(crate) enum CacheLookup<'a> {
    /// a published outcome was found
    Hit(InvocationOutcome),
    /// the caller owns the computation and must consume the guard
    Miss(ComputeGuard<'a>),
}

impl ResultCache {
    pub fn new(capacity: u32) -> Self {
        ResultCache {
            state: Mutex::new(CacheState {
                results: LruMap::new(ByLength::new(capacity)),
                in_flight: HashMap::new(),
            }),
            wakeup: Condvar::new(),
        }
    }

    /// Looks up a fingerprint, blocking while another thread computes it.
    ///
    /// On a miss the fingerprint is marked in-flight and a guard is returned:
    /// the caller must run the body and call [`ComputeGuard::complete`].
    /// With [`CachePolicy::BypassRead`] published outcomes are ignored but
    /// the in-flight coalescing still applies.
    ///
    /// A re-entrant lookup — the computing thread reaching the same
    /// fingerprint again through a cyclic call chain — must not wait on
    /// itself: it gets a non-owning guard and computes without the token,
    /// letting the depth ceiling terminate the cycle.
    pub fn begin(&self, fingerprint: Fingerprint, policy: CachePolicy) -> CacheLookup<'_> {
        let current = thread::current().id();
        let mut state = self.state.lock();
        loop {
            if policy != CachePolicy::BypassRead {
                if let Some(outcome) = state.results.get(&fingerprint) {
                    return CacheLookup::Hit(outcome.clone());
                }
            }
            match state.in_flight.get(&fingerprint) {
                Some(owner) if *owner == current => {
                    return CacheLookup::Miss(ComputeGuard {
                        cache: self,
                        fingerprint,
                        armed: false,
                    });
                }
                Some(_) => {
                    self.wakeup.wait(&mut state);
                    continue;
                }
                None => {
                    state.in_flight.insert(fingerprint, current);
                    return CacheLookup::Miss(ComputeGuard {
                        cache: self,
                        fingerprint,
                        armed: true,
                    });
                }
            }
        }
    }
}

/// Ownership token of an in-flight computation.
///
/// `armed` means the guard owns the in-flight mark; re-entrant guards never
/// do. Dropping an owning guard without completing it (a panic in the
/// caller) releases the mark so waiters can retry instead of blocking
/// forever.
pub(crate) struct ComputeGuard<'a> {
    cache: &'a ResultCache,
    fingerprint: Fingerprint,
    armed: bool,
}

impl ComputeGuard<'_> {
    /// Publishes the outcome of the computation and wakes all waiters.
    /// With [`CachePolicy::SkipWrite`], or when the outcome is not a
    /// function of the fingerprint (recursion/deadline failures), nothing
    /// is published and the next lookup recomputes. Non-owning re-entrant
    /// guards never touch the cache.
    pub fn complete(mut self, outcome: InvocationOutcome, policy: CachePolicy) {
        if !self.armed {
            return;
        }
        self.armed = false;
        let mut state = self.cache.state.lock();
        state.in_flight.remove(&self.fingerprint);
        if policy != CachePolicy::SkipWrite && is_cacheable(&outcome) {
            state.results.insert(self.fingerprint, outcome);
        }
        drop(state);
        self.cache.wakeup.notify_all();
    }
}

impl Drop for ComputeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.cache.state.lock();
            state.in_flight.remove(&self.fingerprint);
            drop(state);
            self.cache.wakeup.notify_all();
        }
    }
}
