//! The engine facade.
//!
//! [`LoaEngine`] owns the rule store, the ownership table, the online
//! snapshot and the per-aircraft caches, and sequences every mutation so
//! the pieces stay coherent: configuration is parsed before anything is
//! replaced, and every replacement bumps the world version that gates
//! cached results.

use std::time::{Duration, Instant};

use crate::authority::{OnlineSnapshot, SectorOwnershipTable};
use crate::cache::{flight_signature, MatchCache};
use crate::coordination::{CoordinationLedger, CoordinationState, CoordinationStatus};
use crate::error::ConfigError;
use crate::matcher;
use crate::models::{
    CoordinationRule, FlightFacts, FlightPlanState, LoaConfig, OwnershipConfig, PlanType,
};
use crate::store::{RuleHandle, RuleStore};

/// Where the engine learns which controller positions are connected.
pub trait ControllerDirectory {
    fn connected_positions(&self) -> Vec<String>;
}

/// Where the engine loads its two configuration documents from.
pub trait ConfigSource {
    fn load_rules(&self) -> Result<LoaConfig, ConfigError>;
    fn load_ownership(&self) -> Result<OwnershipConfig, ConfigError>;
}

/// Engine timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// How long a memoized match result is served before recomputing.
    pub match_ttl: Duration,
    /// How long an online snapshot is trusted before asking the
    /// directory again.
    pub online_refresh: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_ttl: Duration::from_secs(10),
            online_refresh: Duration::from_secs(10),
        }
    }
}

pub struct LoaEngine {
    config: EngineConfig,
    my_sector: String,
    table: SectorOwnershipTable,
    store: RuleStore,
    cache: MatchCache,
    coordination: CoordinationLedger,
    online: OnlineSnapshot,
    online_fetched_at: Option<Instant>,
    world_version: u64,
}

impl LoaEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            cache: MatchCache::new(config.match_ttl),
            config,
            my_sector: String::new(),
            table: SectorOwnershipTable::default(),
            store: RuleStore::default(),
            coordination: CoordinationLedger::default(),
            online: OnlineSnapshot::default(),
            online_fetched_at: None,
            world_version: 0,
        }
    }

    /// Set the controlling sector and perform the initial load.
    pub fn init(&mut self, my_sector: &str, source: &dyn ConfigSource) -> Result<(), ConfigError> {
        self.my_sector = my_sector.to_string();
        self.reload(source)
    }

    /// Reload both configuration documents and rebuild the store.
    ///
    /// Both documents are parsed before any state is replaced, so a bad
    /// file leaves the previous rule set serving.
    pub fn reload(&mut self, source: &dyn ConfigSource) -> Result<(), ConfigError> {
        let rules = source.load_rules()?;
        let ownership = source.load_ownership()?;

        self.bump_world_version();
        self.coordination.clear();
        self.table = SectorOwnershipTable::from_config(&ownership);
        self.store.reload(&self.my_sector, &self.table, &rules);
        tracing::info!(
            sector = %self.my_sector,
            rules = self.store.len(),
            sectors = self.store.loaded_sectors().len(),
            "rule set reloaded"
        );
        Ok(())
    }

    /// The host moved us to a different position. Returns whether a
    /// reload actually happened.
    ///
    /// A failed reload restores the previous sector identity: cached
    /// results stay consistent with whichever sector the engine answers
    /// for, so the identity must only change together with the rule set.
    pub fn notify_own_sector_changed(
        &mut self,
        new_sector: &str,
        source: &dyn ConfigSource,
    ) -> Result<bool, ConfigError> {
        if self.my_sector.eq_ignore_ascii_case(new_sector) {
            return Ok(false);
        }
        let previous = std::mem::replace(&mut self.my_sector, new_sector.to_string());
        if let Err(error) = self.reload(source) {
            self.my_sector = previous;
            return Err(error);
        }
        Ok(true)
    }

    /// Refresh the online snapshot and invalidate cached matches if any
    /// watched sector changed hands. Returns whether a change was seen.
    pub fn notify_online_controllers_changed(&mut self, directory: &dyn ControllerDirectory) -> bool {
        self.notify_online_controllers_changed_at(directory, Instant::now())
    }

    pub fn notify_online_controllers_changed_at(
        &mut self,
        directory: &dyn ControllerDirectory,
        now: Instant,
    ) -> bool {
        let fresh = OnlineSnapshot::new(directory.connected_positions());
        let changed = self.controllers_changed(&fresh);
        self.online = fresh;
        self.online_fetched_at = Some(now);
        if changed {
            tracing::debug!(sector = %self.my_sector, "watched sector changed hands");
            self.bump_world_version();
        }
        changed
    }

    /// Whether any sector we either work or own resolves to a different
    /// controller under the fresh snapshot.
    fn controllers_changed(&self, fresh: &OnlineSnapshot) -> bool {
        let mut watched: Vec<&str> = vec![self.my_sector.as_str()];
        for owned in self.table.owned_by(&self.my_sector) {
            watched.push(owned);
        }
        watched.iter().any(|sector| {
            self.table.resolve_controller(sector, &self.online)
                != self.table.resolve_controller(sector, fresh)
        })
    }

    /// Resolve the matching rule for one flight, memoized per aircraft.
    pub fn match_rule(
        &mut self,
        facts: &FlightFacts,
        directory: &dyn ControllerDirectory,
    ) -> Option<RuleHandle> {
        self.match_rule_at(facts, directory, Instant::now())
    }

    pub fn match_rule_at(
        &mut self,
        facts: &FlightFacts,
        directory: &dyn ControllerDirectory,
        now: Instant,
    ) -> Option<RuleHandle> {
        if !facts.state.is_loa_relevant() || facts.plan_type != PlanType::Ifr {
            self.cache.evict(&facts.aircraft_id);
            return None;
        }
        self.refresh_online_if_stale(directory, now);

        let signature = flight_signature(&facts.origin, &facts.destination, &facts.route);
        if let Some(result) =
            self.cache
                .get(&facts.aircraft_id, now, self.world_version, signature)
        {
            return result;
        }

        let result = matcher::match_rule(
            &self.store,
            &self.table,
            facts,
            &self.my_sector,
            &self.online,
        );
        self.cache
            .put(&facts.aircraft_id, result, now, self.world_version, signature);
        result
    }

    fn refresh_online_if_stale(&mut self, directory: &dyn ControllerDirectory, now: Instant) {
        let stale = self
            .online_fetched_at
            .map_or(true, |at| now.duration_since(at) >= self.config.online_refresh);
        if stale {
            self.notify_online_controllers_changed_at(directory, now);
        }
    }

    /// Who actually works a sector under the current online snapshot.
    pub fn resolve_sector_controller(&self, sector: &str) -> Option<&str> {
        self.table.resolve_controller(sector, &self.online)
    }

    /// Dereference a handle from a previous match.
    pub fn rule(&self, handle: RuleHandle) -> Option<&CoordinationRule> {
        self.store.get(handle)
    }

    pub fn evict_aircraft(&mut self, aircraft_id: &str) {
        self.cache.evict(aircraft_id);
        self.coordination.evict(aircraft_id);
    }

    /// Track host flight-plan state transitions; dropped flights lose
    /// their cached state immediately.
    pub fn note_flight_plan_state(&mut self, aircraft_id: &str, state: FlightPlanState) {
        if state.is_dropped() {
            self.evict_aircraft(aircraft_id);
        }
    }

    pub fn coordination_state(&self, aircraft_id: &str) -> Option<&CoordinationState> {
        self.coordination.get(aircraft_id)
    }

    pub fn note_exit_altitude(
        &mut self,
        aircraft_id: &str,
        altitude_ft: i32,
        status: CoordinationStatus,
    ) {
        self.coordination
            .note_exit_altitude(aircraft_id, altitude_ft, status);
    }

    pub fn note_exit_point(&mut self, aircraft_id: &str, point: &str, status: CoordinationStatus) {
        self.coordination.note_exit_point(aircraft_id, point, status);
    }

    pub fn settle_exit_altitude(&mut self, aircraft_id: &str, altitude_ft: i32) {
        self.coordination.settle_exit_altitude(aircraft_id, altitude_ft);
    }

    pub fn settle_exit_point(&mut self, aircraft_id: &str, point: &str) {
        self.coordination.settle_exit_point(aircraft_id, point);
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn table(&self) -> &SectorOwnershipTable {
        &self.table
    }

    pub fn online_snapshot(&self) -> &OnlineSnapshot {
        &self.online
    }

    pub fn my_sector(&self) -> &str {
        &self.my_sector
    }

    pub fn world_version(&self) -> u64 {
        self.world_version
    }

    /// Drop all per-aircraft state, e.g. on disconnect.
    pub fn shutdown(&mut self) {
        self.cache.clear();
        self.coordination.clear();
        self.online = OnlineSnapshot::default();
        self.online_fetched_at = None;
        tracing::info!(sector = %self.my_sector, "engine shut down");
    }

    fn bump_world_version(&mut self) {
        self.world_version += 1;
        self.cache.clear();
    }
}
