//! Per-aircraft memoization of match results.
//!
//! One component owns the validity rule so call sites cannot drift: an
//! entry is served only while its TTL has not elapsed AND it was stored
//! under the current world version AND the flight's content signature is
//! unchanged. A signature mismatch evicts immediately, catching route or
//! airport edits that do not bump the world version.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use crate::store::RuleHandle;

/// Hash of the per-flight facts that can change without any world-version
/// bump: origin, destination and the ordered route.
pub fn flight_signature(origin: &str, destination: &str, route: &[String]) -> u64 {
    let mut hasher = DefaultHasher::new();
    origin.hash(&mut hasher);
    destination.hash(&mut hasher);
    for point in route {
        point.hash(&mut hasher);
    }
    hasher.finish()
}

#[derive(Debug, Clone, Copy)]
struct MatchEntry {
    result: Option<RuleHandle>,
    resolved_at: Instant,
    version: u64,
    signature: u64,
}

/// Memoized match results keyed by aircraft identity.
#[derive(Debug)]
pub struct MatchCache {
    entries: HashMap<String, MatchEntry>,
    ttl: Duration,
}

impl MatchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// The cached result, or `None` when the entry is absent or no
    /// longer valid. The outer `Option` is the cache verdict; the inner
    /// one is the memoized match outcome (a miss is a valid outcome).
    pub fn get(
        &mut self,
        aircraft_id: &str,
        now: Instant,
        version: u64,
        signature: u64,
    ) -> Option<Option<RuleHandle>> {
        let entry = self.entries.get(aircraft_id)?;
        if entry.signature != signature {
            // The flight plan itself changed; drop the entry regardless
            // of TTL and version.
            self.entries.remove(aircraft_id);
            return None;
        }
        if entry.version != version {
            return None;
        }
        if now.duration_since(entry.resolved_at) >= self.ttl {
            return None;
        }
        Some(entry.result)
    }

    pub fn put(
        &mut self,
        aircraft_id: impl Into<String>,
        result: Option<RuleHandle>,
        now: Instant,
        version: u64,
        signature: u64,
    ) {
        self.entries.insert(
            aircraft_id.into(),
            MatchEntry {
                result,
                resolved_at: now,
                version,
                signature,
            },
        );
    }

    pub fn evict(&mut self, aircraft_id: &str) {
        self.entries.remove(aircraft_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
