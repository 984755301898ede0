//! Core data models for the LOA engine.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

/// Displayed change-over point when no agreement applies.
pub const NO_AGREEMENT_TEXT: &str = "COPX";

/// Airport constraint holding exact codes and ICAO-region prefixes.
///
/// Four-letter entries are full ICAO codes and go into the exact-match
/// set; shorter entries are region prefixes ("ED" covers every German
/// airport). The split happens once at ingestion so match-time lookups
/// are a set probe plus a short prefix scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AirportFilter {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl AirportFilter {
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for code in codes {
            let code = code.as_ref().trim().to_ascii_uppercase();
            if code.is_empty() {
                continue;
            }
            if code.len() == 4 {
                filter.exact.insert(code);
            } else {
                filter.prefixes.push(code);
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }

    /// Exact match first, then prefix match. Expects an uppercased code.
    pub fn matches(&self, airport: &str) -> bool {
        if self.exact.contains(airport) {
            return true;
        }
        self.prefixes
            .iter()
            .any(|prefix| airport.starts_with(prefix.as_str()))
    }
}

/// Which configuration list a rule came from.
///
/// Fallback rules carry no waypoint requirement and are consulted only
/// after every waypoint-anchored pass has come up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    Destination,
    Departure,
    DestinationFallback,
    DepartureFallback,
}

impl RuleCategory {
    pub fn is_fallback(self) -> bool {
        matches!(
            self,
            RuleCategory::DestinationFallback | RuleCategory::DepartureFallback
        )
    }
}

/// One Letter-of-Agreement entry.
///
/// Waypoints are stored lowercased; the matcher compares them against the
/// flight's canonical route without folding case again.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinationRule {
    /// Sectors this rule is published by; used for suppression when a
    /// higher-priority controller of the publishing sector is online.
    pub source_sectors: Vec<String>,
    pub origin: AirportFilter,
    pub destination: AirportFilter,
    pub exclude_origin: AirportFilter,
    pub exclude_destination: AirportFilter,
    /// Canonical lowercase route point names; all must appear in the route.
    pub waypoints: Vec<String>,
    /// Candidate downstream sectors, most preferred first.
    pub next_sectors: Vec<String>,
    /// Exit flight level (hundreds of feet).
    pub exit_flight_level: i32,
    /// Minimum cleared altitude in feet; gates fallback rules only.
    pub min_altitude_ft: i32,
    /// Change-over point text shown to the controller.
    pub handoff_text: String,
    pub category: RuleCategory,
}

impl CoordinationRule {
    /// Build a rule from its configuration form, tagging the publishing
    /// sector and normalizing airports and waypoints.
    pub fn from_spec(spec: &RuleSpec, sector: &str, category: RuleCategory) -> Self {
        Self {
            source_sectors: vec![sector.to_string()],
            origin: AirportFilter::from_codes(&spec.origins),
            destination: AirportFilter::from_codes(&spec.destinations),
            exclude_origin: AirportFilter::from_codes(&spec.exclude_origins),
            exclude_destination: AirportFilter::from_codes(&spec.exclude_destinations),
            waypoints: spec
                .waypoints
                .iter()
                .map(|wp| wp.trim().to_ascii_lowercase())
                .filter(|wp| !wp.is_empty())
                .collect(),
            next_sectors: spec.next_sectors.clone(),
            exit_flight_level: spec.xfl,
            min_altitude_ft: spec.min_altitude_ft,
            handoff_text: spec.cop_text.clone(),
            category,
        }
    }

    /// Arrivals outrank departures in scoring; fallback rules carry the
    /// preference of the list they were published in.
    pub fn is_destination_anchored(&self) -> bool {
        match self.category {
            RuleCategory::DestinationFallback => true,
            RuleCategory::DepartureFallback => false,
            _ => !self.destination.is_empty(),
        }
    }
}

/// Lifecycle state of a flight plan as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightPlanState {
    NonConcerned,
    Notified,
    Coordinated,
    TransferToMeInitiated,
    TransferFromMeInitiated,
    Assumed,
    Redundant,
}

impl FlightPlanState {
    /// States in which an agreement applies to the flight.
    pub fn is_loa_relevant(self) -> bool {
        matches!(
            self,
            FlightPlanState::Notified
                | FlightPlanState::Coordinated
                | FlightPlanState::TransferToMeInitiated
                | FlightPlanState::TransferFromMeInitiated
                | FlightPlanState::Assumed
        )
    }

    /// States whose arrival drops the aircraft from every cache.
    pub fn is_dropped(self) -> bool {
        matches!(
            self,
            FlightPlanState::NonConcerned | FlightPlanState::Redundant
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Instrument flight rules; the only type agreements apply to.
    Ifr,
    Vfr,
}

/// The per-query facts the engine consumes about one flight.
///
/// Construction is the ingestion point: origin and destination are
/// uppercased and route points lowercased here, once, so the matcher
/// never folds case on the hot path.
#[derive(Debug, Clone)]
pub struct FlightFacts {
    /// Stable aircraft identity (callsign).
    pub aircraft_id: String,
    pub origin: String,
    pub destination: String,
    /// Canonical lowercase route point names, in route order.
    pub route: Vec<String>,
    pub tracking_sector: String,
    pub state: FlightPlanState,
    pub plan_type: PlanType,
    pub cleared_altitude_ft: i32,
    pub final_altitude_ft: i32,
}

impl FlightFacts {
    pub fn new(
        aircraft_id: impl Into<String>,
        origin: impl AsRef<str>,
        destination: impl AsRef<str>,
    ) -> Self {
        Self {
            aircraft_id: aircraft_id.into(),
            origin: origin.as_ref().trim().to_ascii_uppercase(),
            destination: destination.as_ref().trim().to_ascii_uppercase(),
            route: Vec::new(),
            tracking_sector: String::new(),
            state: FlightPlanState::Assumed,
            plan_type: PlanType::Ifr,
            cleared_altitude_ft: 0,
            final_altitude_ft: 0,
        }
    }

    pub fn with_route<I, S>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.route = points
            .into_iter()
            .map(|p| p.as_ref().trim().to_ascii_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    pub fn with_state(mut self, state: FlightPlanState) -> Self {
        self.state = state;
        self
    }

    pub fn with_plan_type(mut self, plan_type: PlanType) -> Self {
        self.plan_type = plan_type;
        self
    }

    pub fn with_tracking_sector(mut self, sector: impl Into<String>) -> Self {
        self.tracking_sector = sector.into();
        self
    }

    pub fn with_altitudes(mut self, cleared_ft: i32, final_ft: i32) -> Self {
        self.cleared_altitude_ft = cleared_ft;
        self.final_altitude_ft = final_ft;
        self
    }
}

// ========== CONFIGURATION SHAPE ==========

/// One rule as it appears in the configuration source.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    #[serde(default)]
    pub origins: Vec<String>,
    #[serde(default)]
    pub destinations: Vec<String>,
    #[serde(default)]
    pub exclude_origins: Vec<String>,
    #[serde(default)]
    pub exclude_destinations: Vec<String>,
    #[serde(default)]
    pub waypoints: Vec<String>,
    #[serde(default)]
    pub next_sectors: Vec<String>,
    #[serde(default = "default_cop_text")]
    pub cop_text: String,
    #[serde(default)]
    pub xfl: i32,
    #[serde(default)]
    pub min_altitude_ft: i32,
}

fn default_cop_text() -> String {
    NO_AGREEMENT_TEXT.to_string()
}

/// The rule lists one sector publishes, plus its optional area of
/// responsibility (destination airports it claims outright).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorRuleSet {
    #[serde(default)]
    pub destination_loas: Vec<RuleSpec>,
    #[serde(default)]
    pub departure_loas: Vec<RuleSpec>,
    #[serde(default)]
    pub destination_fallback_loas: Vec<RuleSpec>,
    #[serde(default)]
    pub departure_fallback_loas: Vec<RuleSpec>,
    #[serde(default)]
    pub aor_airports: Vec<String>,
}

/// Full rule configuration: a mapping from sector id to its rule lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoaConfig {
    #[serde(flatten)]
    pub sectors: BTreeMap<String, SectorRuleSet>,
}

impl LoaConfig {
    /// Sector keys are position ids as configured; lookups are
    /// case-insensitive to match how the host reports positions.
    pub fn sector(&self, sector_id: &str) -> Option<&SectorRuleSet> {
        self.sectors
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(sector_id))
            .map(|(_, rules)| rules)
    }
}

/// Static ownership and priority declarations, loaded as one unit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnershipConfig {
    #[serde(default)]
    pub ownership: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub priority: BTreeMap<String, Vec<String>>,
}
