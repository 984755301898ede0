//! Best-rule selection for a single flight.
//!
//! Three passes, each consulted only when the previous one found
//! nothing: waypoint-indexed candidates, an exhaustive scan of
//! destination- then origin-anchored rules, and finally the fallback
//! lists (no waypoint requirement, minimum-altitude gated). Every pass
//! applies the same exclusion, suppression and gating filters and the
//! same scoring; the matcher returns at most one rule.

use std::collections::HashSet;

use crate::authority::{OnlineSnapshot, SectorOwnershipTable};
use crate::models::{CoordinationRule, FlightFacts, RuleCategory};
use crate::store::{RuleHandle, RuleStore};

pub fn match_rule(
    store: &RuleStore,
    table: &SectorOwnershipTable,
    facts: &FlightFacts,
    my_sector: &str,
    online: &OnlineSnapshot,
) -> Option<RuleHandle> {
    let ctx = MatchContext {
        store,
        table,
        facts,
        my_sector,
        online,
        route_set: facts.route.iter().map(String::as_str).collect(),
    };

    // Fast path: rules anchored on any of the flight's route points.
    // Covers the overwhelming majority of real rules.
    let candidates = store.candidates_for_route(&facts.route);
    if let Some(best) = ctx.best_of(candidates.into_iter(), Pass::Standard) {
        return Some(best);
    }

    // Exhaustive scan for unindexed flights (no route points, or none
    // indexed): destination-anchored rules strictly before departures.
    let scanned = ctx
        .best_of(
            store.rules_in(RuleCategory::Destination).map(|(h, _)| h),
            Pass::Standard,
        )
        .or_else(|| {
            ctx.best_of(
                store.rules_in(RuleCategory::Departure).map(|(h, _)| h),
                Pass::Standard,
            )
        });
    if scanned.is_some() {
        return scanned;
    }

    // Fallback lists, destination before departure.
    ctx.best_of(
        store
            .rules_in(RuleCategory::DestinationFallback)
            .map(|(h, _)| h),
        Pass::Fallback,
    )
    .or_else(|| {
        ctx.best_of(
            store
                .rules_in(RuleCategory::DepartureFallback)
                .map(|(h, _)| h),
            Pass::Fallback,
        )
    })
}

#[derive(Clone, Copy)]
enum Pass {
    /// Full filter chain including the all-waypoints-present check.
    Standard,
    /// No waypoint requirement; gated on minimum cleared altitude.
    Fallback,
}

struct MatchContext<'a> {
    store: &'a RuleStore,
    table: &'a SectorOwnershipTable,
    facts: &'a FlightFacts,
    my_sector: &'a str,
    online: &'a OnlineSnapshot,
    route_set: HashSet<&'a str>,
}

impl MatchContext<'_> {
    /// Highest-scoring surviving candidate; ties keep the first
    /// encountered.
    fn best_of(
        &self,
        handles: impl Iterator<Item = RuleHandle>,
        pass: Pass,
    ) -> Option<RuleHandle> {
        let mut best: Option<(RuleHandle, i32)> = None;
        for handle in handles {
            let Some(rule) = self.store.get(handle) else {
                continue;
            };
            if !self.passes_filters(rule, pass) {
                continue;
            }
            let score = self.score(rule);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((handle, score));
            }
        }
        best.map(|(handle, _)| handle)
    }

    fn passes_filters(&self, rule: &CoordinationRule, pass: Pass) -> bool {
        if self.is_excluded(rule) {
            return false;
        }
        if self
            .table
            .is_outranked_on_source(rule, self.my_sector, self.online)
        {
            return false;
        }
        if !rule.next_sectors.is_empty()
            && !self
                .table
                .gate_by_next_sectors(&rule.next_sectors, self.my_sector, self.online)
        {
            return false;
        }
        if !self.airports_match(rule) {
            return false;
        }
        match pass {
            Pass::Standard => self.waypoints_match(rule),
            Pass::Fallback => self.facts.cleared_altitude_ft >= rule.min_altitude_ft,
        }
    }

    /// An exclusion airport overrides any positive match.
    fn is_excluded(&self, rule: &CoordinationRule) -> bool {
        rule.exclude_destination.matches(&self.facts.destination)
            || rule.exclude_origin.matches(&self.facts.origin)
    }

    fn airports_match(&self, rule: &CoordinationRule) -> bool {
        if !rule.origin.is_empty() && !rule.origin.matches(&self.facts.origin) {
            return false;
        }
        if !rule.destination.is_empty() && !rule.destination.matches(&self.facts.destination) {
            return false;
        }
        true
    }

    fn waypoints_match(&self, rule: &CoordinationRule) -> bool {
        rule.waypoints
            .iter()
            .all(|wp| self.route_set.contains(wp.as_str()))
    }

    fn score(&self, rule: &CoordinationRule) -> i32 {
        let mut score = 0;

        // Arrivals take precedence over departures on ties.
        if rule.is_destination_anchored() {
            score += 20;
        }

        // Only the first next sector that resolves to an online
        // controller contributes.
        for next in &rule.next_sectors {
            if let Some(actual) = self.table.resolve_controller(next, self.online) {
                if actual.eq_ignore_ascii_case(self.my_sector) {
                    // Gated out upstream; make sure it cannot win anyway.
                    score -= 10_000;
                } else if self.table.outranks(next, actual, self.my_sector) {
                    score += 50;
                }
                break;
            }
        }

        if !rule.handoff_text.is_empty() {
            score += 5;
        }

        // Final numeric tie-break: prefer the higher published level.
        score + rule.exit_flight_level
    }
}
