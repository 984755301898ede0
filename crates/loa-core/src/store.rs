//! Rule storage: a generation-tagged arena with lookup indices.
//!
//! Rules are destroyed only by a wholesale reload. References out of the
//! store are [`RuleHandle`]s carrying the generation they were issued in;
//! a handle from an older generation is rejected by [`RuleStore::get`]
//! rather than dereferenced into replaced storage.

use std::collections::{HashMap, HashSet};

use crate::authority::SectorOwnershipTable;
use crate::models::{AirportFilter, CoordinationRule, LoaConfig, RuleCategory, SectorRuleSet};

/// Stable reference to a rule in one store generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleHandle {
    generation: u64,
    index: usize,
}

impl RuleHandle {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// The authoritative rule set for the currently relevant sectors.
#[derive(Debug, Default)]
pub struct RuleStore {
    generation: u64,
    rules: Vec<CoordinationRule>,
    /// Lowercased waypoint name -> rule indices. Rebuilt fully on every
    /// reload, never patched incrementally.
    by_waypoint: HashMap<String, Vec<usize>>,
    by_next_sector: HashMap<String, Vec<usize>>,
    /// Union of the loaded sectors' area-of-responsibility destinations.
    aor_destinations: AirportFilter,
    loaded_sectors: Vec<String>,
}

impl RuleStore {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Sectors whose rules are loaded, in load order.
    pub fn loaded_sectors(&self) -> &[String] {
        &self.loaded_sectors
    }

    /// Dereference a handle, rejecting handles from older generations.
    pub fn get(&self, handle: RuleHandle) -> Option<&CoordinationRule> {
        if handle.generation != self.generation {
            return None;
        }
        self.rules.get(handle.index)
    }

    fn handle(&self, index: usize) -> RuleHandle {
        RuleHandle {
            generation: self.generation,
            index,
        }
    }

    /// Replace the store contents for `my_sector` and everything it owns.
    ///
    /// Load order is deterministic: the caller's own sector first, then
    /// each owned sector in the order the ownership table lists them,
    /// case-insensitive duplicates skipped. Later sectors append after
    /// earlier ones, which only matters as an implicit tie-break in
    /// exhaustive scans.
    pub fn reload(&mut self, my_sector: &str, table: &SectorOwnershipTable, config: &LoaConfig) {
        let mut sectors: Vec<String> = vec![my_sector.to_string()];
        for owned in table.owned_by(my_sector) {
            if !sectors.iter().any(|s| s.eq_ignore_ascii_case(owned)) {
                sectors.push(owned.clone());
            }
        }

        let mut rules = Vec::new();
        let mut aor_codes: Vec<String> = Vec::new();
        let mut loaded = Vec::new();
        for sector in &sectors {
            let Some(set) = config.sector(sector) else {
                continue;
            };
            append_sector_rules(&mut rules, set, sector);
            aor_codes.extend(set.aor_airports.iter().cloned());
            loaded.push(sector.clone());
        }

        let mut by_waypoint: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_next_sector: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, rule) in rules.iter().enumerate() {
            for waypoint in &rule.waypoints {
                by_waypoint.entry(waypoint.clone()).or_default().push(index);
            }
            for next in &rule.next_sectors {
                by_next_sector.entry(next.clone()).or_default().push(index);
            }
        }

        // Swap in the new contents only after everything is built; the
        // generation bump is what retires outstanding handles.
        self.generation += 1;
        self.rules = rules;
        self.by_waypoint = by_waypoint;
        self.by_next_sector = by_next_sector;
        self.aor_destinations = AirportFilter::from_codes(&aor_codes);
        self.loaded_sectors = loaded;
    }

    /// Union of rules indexed under any of the given canonical route
    /// points, first-seen order preserved (ties in scoring keep the
    /// first encountered candidate).
    pub fn candidates_for_route(&self, route: &[String]) -> Vec<RuleHandle> {
        let mut seen: HashSet<usize> = HashSet::new();
        let mut candidates = Vec::new();
        for point in route {
            let Some(indices) = self.by_waypoint.get(point) else {
                continue;
            };
            for &index in indices {
                if seen.insert(index) {
                    candidates.push(self.handle(index));
                }
            }
        }
        candidates
    }

    /// All rules of a category, in load order.
    pub fn rules_in(
        &self,
        category: RuleCategory,
    ) -> impl Iterator<Item = (RuleHandle, &CoordinationRule)> + '_ {
        self.rules
            .iter()
            .enumerate()
            .filter(move |(_, rule)| rule.category == category)
            .map(|(index, rule)| (self.handle(index), rule))
    }

    /// Rules indexed under one waypoint (case-folded here, for callers
    /// outside the canonical-route path).
    pub fn rules_for_waypoint(&self, waypoint: &str) -> Vec<&CoordinationRule> {
        let key = waypoint.to_ascii_lowercase();
        self.by_waypoint
            .get(&key)
            .map(|indices| indices.iter().map(|&i| &self.rules[i]).collect())
            .unwrap_or_default()
    }

    pub fn rules_for_next_sector(&self, sector: &str) -> Vec<&CoordinationRule> {
        self.by_next_sector
            .get(sector)
            .map(|indices| indices.iter().map(|&i| &self.rules[i]).collect())
            .unwrap_or_default()
    }

    /// Waypoints present in the index, for diagnostics and tests.
    pub fn indexed_waypoints(&self) -> impl Iterator<Item = &str> {
        self.by_waypoint.keys().map(String::as_str)
    }

    /// Whether a destination airport lies in a loaded sector's declared
    /// area of responsibility.
    pub fn destination_in_aor(&self, destination: &str) -> bool {
        self.aor_destinations.matches(destination)
    }
}

fn append_sector_rules(rules: &mut Vec<CoordinationRule>, set: &SectorRuleSet, sector: &str) {
    let lists = [
        (RuleCategory::Destination, &set.destination_loas),
        (RuleCategory::Departure, &set.departure_loas),
        (
            RuleCategory::DestinationFallback,
            &set.destination_fallback_loas,
        ),
        (
            RuleCategory::DepartureFallback,
            &set.departure_fallback_loas,
        ),
    ];
    for (category, specs) in lists {
        rules.extend(
            specs
                .iter()
                .map(|spec| CoordinationRule::from_spec(spec, sector, category)),
        );
    }
}
