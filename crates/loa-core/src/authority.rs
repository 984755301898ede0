//! Sector authority: who controls a sector right now.
//!
//! Two static tables drive this. `ownership` says which sectors a home
//! sector absorbs when they are unstaffed; `priority` ranks the positions
//! eligible to control a sector, most senior first. They are loaded as
//! one unit and never partially updated.

use std::collections::{HashMap, HashSet};

use crate::models::{CoordinationRule, OwnershipConfig};

/// The set of controller positions currently connected.
///
/// Refreshed wholesale on a fixed cadence by the engine; callers within
/// one query cycle always see the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct OnlineSnapshot {
    positions: HashSet<String>,
}

impl OnlineSnapshot {
    pub fn new<I, S>(positions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            positions: positions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, position: &str) -> bool {
        self.positions.contains(position)
    }
}

/// Static ownership and priority tables for sector authority resolution.
#[derive(Debug, Clone, Default)]
pub struct SectorOwnershipTable {
    ownership: HashMap<String, Vec<String>>,
    priority: HashMap<String, Vec<String>>,
}

impl SectorOwnershipTable {
    pub fn from_config(config: &OwnershipConfig) -> Self {
        Self {
            ownership: config.ownership.clone().into_iter().collect(),
            priority: config.priority.clone().into_iter().collect(),
        }
    }

    /// Sectors the given home sector absorbs when they are unstaffed, in
    /// declared order.
    pub fn owned_by(&self, sector: &str) -> &[String] {
        self.ownership
            .get(sector)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn owns(&self, owner: &str, sector: &str) -> bool {
        self.owned_by(owner)
            .iter()
            .any(|s| s.eq_ignore_ascii_case(sector))
    }

    /// A sector with no priority list is external: nobody we know of is
    /// declared eligible to control it.
    pub fn has_priority_list(&self, sector: &str) -> bool {
        self.priority.contains_key(sector)
    }

    fn rank(&self, sector: &str, position: &str) -> Option<usize> {
        self.priority
            .get(sector)?
            .iter()
            .position(|p| p.eq_ignore_ascii_case(position))
    }

    /// True when `a` is ranked ahead of `b` for the sector. Unranked
    /// positions never outrank anything.
    pub fn outranks(&self, sector: &str, a: &str, b: &str) -> bool {
        match (self.rank(sector, a), self.rank(sector, b)) {
            (Some(rank_a), Some(rank_b)) => rank_a < rank_b,
            _ => false,
        }
    }

    /// The highest-ranked position for the sector that is currently
    /// online, or `None` when the sector is unstaffed.
    pub fn resolve_controller<'a>(
        &'a self,
        sector: &str,
        online: &OnlineSnapshot,
    ) -> Option<&'a str> {
        self.priority
            .get(sector)?
            .iter()
            .find(|position| online.contains(position))
            .map(String::as_str)
    }

    /// A rule is suppressed when any of its publishing sectors is
    /// currently controlled by someone other than me who outranks me
    /// there: the agreement is that controller's to apply, not mine.
    pub fn is_outranked_on_source(
        &self,
        rule: &CoordinationRule,
        my_sector: &str,
        online: &OnlineSnapshot,
    ) -> bool {
        rule.source_sectors.iter().any(|source| {
            match self.resolve_controller(source, online) {
                None => false,
                Some(actual) if actual.eq_ignore_ascii_case(my_sector) => false,
                Some(actual) => self.outranks(source, actual, my_sector),
            }
        })
    }

    /// Gate a rule on who controls its next sector.
    ///
    /// Only the first listed next sector decides; every branch of the
    /// policy reaches a verdict for it. The three cases:
    ///
    /// 1. I already control the next sector: the hand-off is to myself,
    ///    so the rule does not apply.
    /// 2. The sector has a priority list. Unstaffed but statically mine
    ///    through ownership: ineligible. Staffed by someone I outrank:
    ///    ineligible (the hand-off would go the wrong way). Anything
    ///    else, including unstaffed-and-not-mine: eligible.
    /// 3. The sector is external (no priority list). Unstaffed: eligible.
    ///    Staffed by anyone who is not me: eligible.
    pub fn gate_by_next_sectors(
        &self,
        next_sectors: &[String],
        my_sector: &str,
        online: &OnlineSnapshot,
    ) -> bool {
        for next in next_sectors {
            let controller = self.resolve_controller(next, online);

            if controller.is_some_and(|c| c.eq_ignore_ascii_case(my_sector)) {
                return false;
            }

            if self.has_priority_list(next) {
                if controller.is_none() && self.owns(my_sector, next) {
                    return false;
                }
                if let Some(actual) = controller {
                    if self.outranks(next, my_sector, actual) {
                        return false;
                    }
                }
                return true;
            }

            // External sector: eligible while unstaffed or staffed by
            // someone else. The I-control-it case was handled above.
            return true;
        }
        false
    }
}
